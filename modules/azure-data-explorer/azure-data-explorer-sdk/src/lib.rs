//! Azure Data Explorer SDK
//!
//! This crate provides the public contract between the datasource request
//! handlers and the collaborators they delegate to.
//!
//! ## API Traits
//!
//! - `QueryClient` - executes connectivity tests and management queries
//!   against the upstream cluster
//! - `AuthorizationProvider` - supplies bearer values for outbound calls
//!
//! ## Usage
//!
//! ```ignore
//! use azure_data_explorer_sdk::{AuthorizationProvider, QueryClient, RequestContext};
//!
//! let authorization = credentials.query_data_authorization(&ctx).await?;
//! let tables = client.kusto_request(&url, payload, &headers).await?;
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod api;
pub mod context;
pub mod error;
pub mod models;

// API traits
pub use api::{AuthorizationProvider, QueryClient};

// Request context
pub use context::RequestContext;

// Error types
pub use error::{AuthorizationError, QueryError, QueryErrorKind};

// Models
pub use models::{
    AdditionalHeaders, Column, DataConsistency, DatasourceSettings, Properties, RequestPayload,
    Row, Table, TableResponse,
};
