//! Per-request execution context.

use tokio_util::sync::CancellationToken;

/// Execution context handed to every collaborator call of one HTTP request.
///
/// The cancellation token is cancelled once the request is finished or the
/// caller went away, so work spawned outside the handler future can stop.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancellation: CancellationToken,
    user_login: Option<String>,
    request_id: Option<String>,
}

impl RequestContext {
    #[must_use]
    pub fn new(cancellation: CancellationToken) -> Self {
        Self {
            cancellation,
            user_login: None,
            request_id: None,
        }
    }

    /// Attach the login of the user the request is made for.
    #[must_use]
    pub fn with_user_login(mut self, login: impl Into<String>) -> Self {
        self.user_login = Some(login.into());
        self
    }

    /// Attach the inbound request id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    #[must_use]
    pub fn user_login(&self) -> Option<&str> {
        self.user_login.as_deref()
    }

    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
