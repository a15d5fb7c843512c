//! Domain errors for the datasource.

use azure_data_explorer_sdk::{AuthorizationError, QueryError, QueryErrorKind};
use thiserror::Error;

/// Failure class of a datasource operation.
///
/// The REST layer maps each kind to exactly one HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No token could be obtained for the upstream call.
    TokenUnavailable,
    /// The caller may not use this datasource.
    CallerForbidden,
    UpstreamBadRequest,
    UpstreamUnauthenticated,
    UpstreamForbidden,
    UpstreamNotFound,
    UpstreamThrottled,
    UpstreamUnreachable,
    UpstreamTimeout,
    /// Any upstream failure without a more specific class.
    Unclassified,
}

impl From<QueryErrorKind> for ErrorKind {
    fn from(kind: QueryErrorKind) -> Self {
        match kind {
            QueryErrorKind::BadRequest => Self::UpstreamBadRequest,
            QueryErrorKind::Unauthenticated => Self::UpstreamUnauthenticated,
            QueryErrorKind::Forbidden => Self::UpstreamForbidden,
            QueryErrorKind::NotFound => Self::UpstreamNotFound,
            QueryErrorKind::Throttled => Self::UpstreamThrottled,
            QueryErrorKind::Unreachable => Self::UpstreamUnreachable,
            QueryErrorKind::Timeout => Self::UpstreamTimeout,
            QueryErrorKind::Unclassified => Self::Unclassified,
        }
    }
}

/// Domain-level errors for datasource operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl DomainError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authorization(AuthorizationError::TokenAcquisition(_)) => {
                ErrorKind::TokenUnavailable
            }
            Self::Authorization(AuthorizationError::Forbidden(_)) => ErrorKind::CallerForbidden,
            Self::Query(e) => e.kind().into(),
        }
    }

    /// Raw failure text surfaced to the caller.
    ///
    /// Upstream failures are passed through verbatim.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Authorization(e) => e.to_string(),
            Self::Query(e) => e.message().to_owned(),
        }
    }
}
