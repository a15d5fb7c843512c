//! Domain service for the datasource.
//!
//! Orchestrates every resource request: obtain an `Authorization` value,
//! compose the upstream call, delegate it to the query client.

use std::sync::Arc;

use azure_data_explorer_sdk::{
    AdditionalHeaders, AuthorizationProvider, DatasourceSettings, QueryClient, RequestContext,
    RequestPayload, TableResponse,
};
use tracing::{Instrument, info_span, instrument};
use uuid::Uuid;

use super::error::DomainError;
use super::properties::connection_properties;

const AUTHORIZATION_HEADER: &str = "Authorization";
const APPLICATION_HEADER: &str = "x-ms-app";
const CLIENT_REQUEST_ID_HEADER: &str = "x-ms-client-request-id";
const USER_ID_HEADER: &str = "x-ms-user-id";

const SHOW_DATABASES: &str = ".show databases";
const SHOW_DATABASES_SCHEMA: &str = ".show databases schema as json";

/// Domain service for datasource resource requests.
pub struct Service {
    settings: DatasourceSettings,
    client: Arc<dyn QueryClient>,
    authorization: Arc<dyn AuthorizationProvider>,
}

impl Service {
    #[must_use]
    pub fn new(
        settings: DatasourceSettings,
        client: Arc<dyn QueryClient>,
        authorization: Arc<dyn AuthorizationProvider>,
    ) -> Self {
        Self {
            settings,
            client,
            authorization,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &DatasourceSettings {
        &self.settings
    }

    /// List the databases of the cluster.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if authorization or the upstream call fails.
    #[instrument(skip_all, fields(request_id = ctx.request_id()))]
    pub async fn databases(&self, ctx: &RequestContext) -> Result<TableResponse, DomainError> {
        let payload = RequestPayload {
            db: String::new(),
            csl: SHOW_DATABASES.to_owned(),
            properties: Some(connection_properties(&self.settings)),
        };
        self.resource_request(ctx, "databases", payload).await
    }

    /// Describe the schema of the default database as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if authorization or the upstream call fails.
    #[instrument(skip_all, fields(request_id = ctx.request_id(), db = %self.settings.default_database))]
    pub async fn schema(&self, ctx: &RequestContext) -> Result<TableResponse, DomainError> {
        let payload = RequestPayload {
            db: self.settings.default_database.clone(),
            csl: SHOW_DATABASES_SCHEMA.to_owned(),
            properties: Some(connection_properties(&self.settings)),
        };
        self.resource_request(ctx, "schema", payload).await
    }

    /// Verify that the cluster is reachable with the service principal.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError`] if no token can be obtained or the probe fails.
    #[instrument(skip_all, fields(request_id = ctx.request_id()))]
    pub async fn check_health(&self, ctx: &RequestContext) -> Result<(), DomainError> {
        let authorization = self
            .authorization
            .service_principal_authorization(ctx)
            .await?;
        let headers = self.upstream_headers(ctx, "health", authorization);
        let properties = connection_properties(&self.settings);

        self.client
            .test_request(&self.settings, &properties, &headers)
            .instrument(info_span!("upstream_test_request"))
            .await?;

        tracing::debug!("connectivity check succeeded");
        Ok(())
    }

    async fn resource_request(
        &self,
        ctx: &RequestContext,
        resource: &str,
        payload: RequestPayload,
    ) -> Result<TableResponse, DomainError> {
        let authorization = self.authorization.query_data_authorization(ctx).await?;
        let headers = self.upstream_headers(ctx, resource, authorization);
        let url = self.settings.management_url();

        let response = self
            .client
            .kusto_request(&url, payload, &headers)
            .instrument(info_span!("upstream_kusto_request", resource))
            .await
            .inspect_err(|e| {
                tracing::warn!(error = %e, kind = ?e.kind(), "upstream request failed");
            })?;

        // Tables pass through as returned; the shape is the cluster's responsibility.
        for table in response.tables.iter().filter(|t| t.has_ragged_rows()) {
            tracing::warn!(
                table = %table.table_name,
                columns = table.columns.len(),
                "table has rows whose length differs from the column count"
            );
        }

        Ok(response)
    }

    fn upstream_headers(
        &self,
        ctx: &RequestContext,
        resource: &str,
        authorization: String,
    ) -> AdditionalHeaders {
        let mut headers = AdditionalHeaders::new();
        headers.insert(AUTHORIZATION_HEADER.to_owned(), authorization);
        headers.insert(
            APPLICATION_HEADER.to_owned(),
            self.settings.application.clone(),
        );
        headers.insert(
            CLIENT_REQUEST_ID_HEADER.to_owned(),
            format!("KPROXY.{resource};{}", Uuid::new_v4()),
        );
        if self.settings.enable_user_tracking
            && let Some(login) = ctx.user_login()
        {
            headers.insert(USER_ID_HEADER.to_owned(), login.to_owned());
        }
        headers
    }
}
