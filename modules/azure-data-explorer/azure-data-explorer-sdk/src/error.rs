//! Datasource error types.
//!
//! Transport-agnostic error definitions shared by the handlers and their
//! collaborators.

use thiserror::Error;

/// Class of upstream failure reported by a [`QueryClient`](crate::QueryClient).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryErrorKind {
    /// The cluster rejected the request as malformed.
    BadRequest,
    /// The cluster did not accept the presented credentials.
    Unauthenticated,
    /// The credentials are valid but lack access.
    Forbidden,
    /// The database or entity does not exist.
    NotFound,
    /// The cluster is throttling the caller.
    Throttled,
    /// The cluster could not be reached.
    Unreachable,
    /// The request did not complete in time.
    Timeout,
    /// Any failure without a more specific class.
    Unclassified,
}

impl QueryErrorKind {
    /// Classify an upstream HTTP status code.
    #[must_use]
    pub fn from_upstream_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::Unauthenticated,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            429 => Self::Throttled,
            408 | 504 => Self::Timeout,
            _ => Self::Unclassified,
        }
    }
}

/// Failure returned by a [`QueryClient`](crate::QueryClient) call.
///
/// `message` is the verbatim failure text; it is surfaced to callers as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct QueryError {
    kind: QueryErrorKind,
    message: String,
}

impl QueryError {
    #[must_use]
    pub fn new(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create an error without a specific class.
    #[must_use]
    pub fn unclassified(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::Unclassified, message)
    }

    /// Create an error for a non-success upstream HTTP status.
    ///
    /// The message follows the `HTTP error: <status> - <body>` format.
    #[must_use]
    pub fn http_status(status: u16, body: &str) -> Self {
        Self::new(
            QueryErrorKind::from_upstream_status(status),
            format!("HTTP error: {status} - {body}"),
        )
    }

    #[must_use]
    pub fn kind(&self) -> QueryErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure to produce an `Authorization` value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// The token could not be acquired from the identity provider.
    #[error("token acquisition failed: {0}")]
    TokenAcquisition(String),

    /// The caller is not allowed to act through this datasource.
    #[error("forbidden: {0}")]
    Forbidden(String),
}

impl AuthorizationError {
    #[must_use]
    pub fn token_acquisition(message: impl Into<String>) -> Self {
        Self::TokenAcquisition(message.into())
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }
}
