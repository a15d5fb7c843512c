//! REST route registration for the datasource.

use std::sync::Arc;

use axum::routing::get;
use axum::{Extension, Router};

use super::handlers;
use crate::domain::service::Service;

/// Register the datasource resource routes.
///
/// Every route accepts GET only. Any other method, HEAD included, is answered
/// with `405 Method Not Allowed` and an empty body before the handler or the
/// service are touched.
pub fn register_routes(router: Router, service: Arc<Service>) -> Router {
    router
        .route("/databases", get(handlers::list_databases).head(handlers::method_not_allowed))
        .route("/schema", get(handlers::get_schema).head(handlers::method_not_allowed))
        .route("/health", get(handlers::check_health).head(handlers::method_not_allowed))
        .layer(Extension(service))
}
