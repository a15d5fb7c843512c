//! REST error mapping for the datasource.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::error::{DomainError, ErrorKind};

/// Prefix of every user-facing error message.
pub const MESSAGE_PREFIX: &str = "Azure query unsuccessful";

/// Detail used when the success body itself could not be encoded.
const SERIALIZATION_DETAIL: &str = "failed to encode response";

/// JSON error body returned by every failing route.
///
/// `message` is always derived from `error`; there is no way to set it
/// independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpError {
    status_code: u16,
    error: String,
    message: String,
}

impl HttpError {
    #[must_use]
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        let error = error.into();
        let message = format!("{MESSAGE_PREFIX}: {error}");
        Self {
            status_code: status.as_u16(),
            error,
            message,
        }
    }

    /// Error for a success response that could not be encoded.
    #[must_use]
    pub fn serialization() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, SERIALIZATION_DETAIL)
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    #[must_use]
    pub fn error(&self) -> &str {
        &self.error
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// HTTP status for a domain failure kind.
#[must_use]
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::TokenUnavailable | ErrorKind::UpstreamUnauthenticated => {
            StatusCode::UNAUTHORIZED
        }
        ErrorKind::CallerForbidden | ErrorKind::UpstreamForbidden => StatusCode::FORBIDDEN,
        ErrorKind::UpstreamBadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::UpstreamNotFound => StatusCode::NOT_FOUND,
        ErrorKind::UpstreamThrottled => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::UpstreamUnreachable => StatusCode::BAD_GATEWAY,
        ErrorKind::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Unclassified => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<DomainError> for HttpError {
    fn from(e: DomainError) -> Self {
        let status = status_for(e.kind());
        if status.is_server_error() {
            tracing::error!(error = %e, kind = ?e.kind(), "datasource request failed");
        } else {
            tracing::warn!(error = %e, kind = ?e.kind(), "datasource request rejected");
        }
        Self::new(status, e.detail())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}
