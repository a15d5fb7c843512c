//! HTTP server: wiring, middleware stack, and graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderName, Request, Response, StatusCode};
use azure_data_explorer::{
    HttpKustoClient, HttpTransport, Service, ServicePrincipalCredentials, register_routes,
};
use tokio::signal;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;
use tracing::field::Empty;

use crate::config::{AppConfig, ServerConfig};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the datasource service from its configuration sections.
///
/// # Errors
///
/// Returns an error if the HTTP transport or the credentials cannot be built.
pub fn build_service(config: &AppConfig) -> Result<Arc<Service>> {
    let settings = config.datasource.to_settings();
    let transport = HttpTransport::new(&config.client).context("failed to build HTTP transport")?;
    let client = Arc::new(HttpKustoClient::new(
        transport.clone(),
        config.client.request_timeout(),
    ));
    let credentials = Arc::new(ServicePrincipalCredentials::new(
        transport,
        &settings,
        &config.credentials,
        config.client.request_timeout(),
    )?);

    Ok(Arc::new(Service::new(settings, client, credentials)))
}

/// Register the datasource routes and wrap them in the middleware stack.
///
/// Outermost first: `SetRequestId`, `PropagateRequestId`, trace, timeout.
#[must_use]
pub fn build_router(service: Arc<Service>, config: &ServerConfig) -> Router {
    let x_request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    register_routes(Router::new(), service)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            config.request_timeout(),
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<Body>| {
                    let request_id = req
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("n/a");
                    tracing::info_span!(
                        "http_request",
                        method = %req.method(),
                        uri = %req.uri().path(),
                        request_id = %request_id,
                        status = Empty,
                        latency_ms = Empty,
                    )
                })
                .on_response(|res: &Response<Body>, latency: Duration, span: &Span| {
                    span.record("status", res.status().as_u16());
                    span.record("latency_ms", latency.as_millis());
                }),
        )
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
}

/// Serve until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the service cannot be built, the address cannot be
/// bound, or the server fails.
pub async fn run(config: &AppConfig) -> Result<()> {
    let addr = config.server.socket_addr()?;
    let router = build_router(build_service(config)?, &config.server);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "HTTP server bound");

    axum::serve(listener, router)
        .with_graceful_shutdown(wait_for_shutdown())
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(%e, "error handling Ctrl+C signal");
            std::future::pending::<()>().await;
        }
        tracing::info!("received Ctrl+C signal");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut handler) => {
                handler.recv().await;
                tracing::info!("received SIGTERM signal");
            }
            Err(e) => {
                tracing::error!(%e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received, initiating graceful shutdown");
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use azure_data_explorer::{
        AdditionalHeaders, AuthorizationError, AuthorizationProvider, DataConsistency,
        DatasourceSettings, Properties, QueryClient, QueryError, RequestContext, RequestPayload,
        TableResponse,
    };
    use axum::body::to_bytes;
    use tower::ServiceExt;

    struct EmptyClient;

    #[async_trait]
    impl QueryClient for EmptyClient {
        async fn test_request(
            &self,
            _settings: &DatasourceSettings,
            _properties: &Properties,
            _additional_headers: &AdditionalHeaders,
        ) -> Result<(), QueryError> {
            Ok(())
        }

        async fn kusto_request(
            &self,
            _url: &str,
            _payload: RequestPayload,
            _additional_headers: &AdditionalHeaders,
        ) -> Result<TableResponse, QueryError> {
            Ok(TableResponse::default())
        }
    }

    struct SlowClient;

    #[async_trait]
    impl QueryClient for SlowClient {
        async fn test_request(
            &self,
            _settings: &DatasourceSettings,
            _properties: &Properties,
            _additional_headers: &AdditionalHeaders,
        ) -> Result<(), QueryError> {
            Ok(())
        }

        async fn kusto_request(
            &self,
            _url: &str,
            _payload: RequestPayload,
            _additional_headers: &AdditionalHeaders,
        ) -> Result<TableResponse, QueryError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(TableResponse::default())
        }
    }

    struct StaticToken;

    #[async_trait]
    impl AuthorizationProvider for StaticToken {
        async fn service_principal_authorization(
            &self,
            _ctx: &RequestContext,
        ) -> Result<String, AuthorizationError> {
            Ok("Bearer test-token".to_owned())
        }
    }

    fn service(client: Arc<dyn QueryClient>) -> Arc<Service> {
        let settings = DatasourceSettings {
            cluster_url: "https://help.kusto.windows.net".to_owned(),
            tenant_id: "tenant".to_owned(),
            client_id: "client".to_owned(),
            default_database: "Samples".to_owned(),
            data_consistency: DataConsistency::Strong,
            server_timeout: Duration::from_secs(240),
            enable_user_tracking: false,
            application: "adx-proxy".to_owned(),
        };
        Arc::new(Service::new(settings, client, Arc::new(StaticToken)))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn response_carries_generated_request_id() {
        let router = build_router(service(Arc::new(EmptyClient)), &ServerConfig::default());
        let response = router.oneshot(get("/databases")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let request_id = response.headers().get(REQUEST_ID_HEADER).unwrap();
        assert!(!request_id.is_empty());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"tables":[]}"#);
    }

    #[tokio::test]
    async fn incoming_request_id_is_preserved() {
        let router = build_router(service(Arc::new(EmptyClient)), &ServerConfig::default());
        let request = Request::builder()
            .uri("/schema")
            .header(REQUEST_ID_HEADER, "req-123")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "req-123");
    }

    #[tokio::test]
    async fn slow_upstream_hits_edge_timeout() {
        let config = ServerConfig {
            request_timeout_secs: 1,
            ..Default::default()
        };
        let router = build_router(service(Arc::new(SlowClient)), &config);
        let response = router.oneshot(get("/databases")).await.unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let router = build_router(service(Arc::new(EmptyClient)), &ServerConfig::default());
        let response = router.oneshot(get("/tables")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
