//! Azure Data Explorer datasource
//!
//! Resource routes that proxy management commands to an Azure Data Explorer
//! cluster and return the result tables as JSON.
//!
//! The public API is defined in `azure-data-explorer-sdk` and re-exported here.
//!
//! ## Wiring
//!
//! ```ignore
//! let transport = HttpTransport::new(&config.client)?;
//! let client = Arc::new(HttpKustoClient::new(transport.clone(), config.client.request_timeout()));
//! let credentials = Arc::new(ServicePrincipalCredentials::new(
//!     transport,
//!     &settings,
//!     &config.credentials,
//!     config.client.request_timeout(),
//! )?);
//! let service = Arc::new(Service::new(settings, client, credentials));
//! let router = register_routes(Router::new(), service);
//! ```

pub use azure_data_explorer_sdk::{
    AdditionalHeaders, AuthorizationError, AuthorizationProvider, Column, DataConsistency,
    DatasourceSettings, Properties, QueryClient, QueryError, QueryErrorKind, RequestContext,
    RequestPayload, Row, Table, TableResponse,
};

pub mod api;
pub mod config;
pub mod domain;
pub mod infra;

pub use api::rest::routes::register_routes;
pub use config::{ClientConfig, ConfigError, CredentialsConfig, DatasourceConfig};
pub use domain::service::Service;
pub use infra::credentials::ServicePrincipalCredentials;
pub use infra::http::HttpTransport;
pub use infra::kusto_client::HttpKustoClient;
