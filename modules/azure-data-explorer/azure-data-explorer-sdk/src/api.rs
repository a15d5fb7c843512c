//! Datasource collaborator traits.
//!
//! The request handlers depend only on these traits. Production code wires in
//! an HTTP transport and a service principal token source; tests wire in
//! doubles.

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::error::{AuthorizationError, QueryError};
use crate::models::{
    AdditionalHeaders, DatasourceSettings, Properties, RequestPayload, TableResponse,
};

/// Client for the upstream analytics cluster.
///
/// Implementations own retries, if any. Callers treat every error as terminal.
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Validate connectivity and credentials without returning tabular data.
    ///
    /// # Arguments
    /// * `settings` - Datasource settings identifying the cluster
    /// * `properties` - Request properties sent with the probe
    /// * `additional_headers` - Headers forwarded verbatim (including `Authorization`)
    async fn test_request(
        &self,
        settings: &DatasourceSettings,
        properties: &Properties,
        additional_headers: &AdditionalHeaders,
    ) -> Result<(), QueryError>;

    /// Execute a query or management command and return its tables.
    ///
    /// # Arguments
    /// * `url` - Fully composed upstream endpoint
    /// * `payload` - Database, command text, and properties
    /// * `additional_headers` - Headers forwarded verbatim (including `Authorization`)
    async fn kusto_request(
        &self,
        url: &str,
        payload: RequestPayload,
        additional_headers: &AdditionalHeaders,
    ) -> Result<TableResponse, QueryError>;
}

/// Source of `Authorization` header values for outbound calls.
#[async_trait]
pub trait AuthorizationProvider: Send + Sync {
    /// Bearer value for administrative calls made on behalf of the service
    /// itself (for example connectivity tests).
    async fn service_principal_authorization(
        &self,
        ctx: &RequestContext,
    ) -> Result<String, AuthorizationError>;

    /// Bearer value scoped to a single query request.
    ///
    /// Implementations may take the caller identity from `ctx` into account.
    /// The default delegates to [`Self::service_principal_authorization`].
    async fn query_data_authorization(
        &self,
        ctx: &RequestContext,
    ) -> Result<String, AuthorizationError> {
        self.service_principal_authorization(ctx).await
    }
}
