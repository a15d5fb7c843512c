//! Pooled outbound HTTP transport shared by the query client and the token
//! source.

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use thiserror::Error;

use crate::config::ClientConfig;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] http::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Status and fully collected body of an upstream response.
#[derive(Debug)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Cloneable handle to a pooled hyper client.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport").finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Build the transport with webpki roots and HTTP/1.1 + HTTP/2 via ALPN.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Tls`] if the TLS connector cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        if config.allow_insecure_http {
            tracing::warn!("insecure HTTP enabled for upstream calls; use only for local testing");
        }

        let builder = hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(crypto_provider())
            .map_err(|e| TransportError::Tls(e.to_string()))?;
        let https = if config.allow_insecure_http {
            builder.https_or_http().enable_all_versions().build()
        } else {
            builder.https_only().enable_all_versions().build()
        };

        // pool_timer is required for pool_idle_timeout to take effect
        let client = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(config.pool_idle_timeout())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build::<_, Full<Bytes>>(https);

        Ok(Self { client })
    }

    /// Send a POST and collect the whole response.
    ///
    /// Any status is returned as `Ok`; only transport failures are errors.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on malformed requests, connection failures,
    /// body read failures, or when `timeout` elapses.
    pub async fn post(
        &self,
        url: &str,
        headers: HeaderMap,
        body: Bytes,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        let mut request = Request::builder()
            .method(Method::POST)
            .uri(url)
            .body(Full::new(body))?;
        request.headers_mut().extend(headers);

        let exchange = async {
            let response = self.client.request(request).await.map_err(|e| {
                if e.is_connect() {
                    TransportError::Connect(error_chain(&e))
                } else {
                    TransportError::Request(error_chain(&e))
                }
            })?;
            let status = response.status();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| TransportError::Body(error_chain(&e)))?
                .to_bytes();
            Ok(TransportResponse { status, body })
        };

        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
    }
}

/// Use the process-wide provider when one is installed, aws-lc-rs otherwise.
fn crypto_provider() -> Arc<rustls::crypto::CryptoProvider> {
    rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

/// Render an error with its sources, outermost first.
fn error_chain(e: &dyn StdError) -> String {
    let mut rendered = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        rendered.push_str(": ");
        rendered.push_str(&inner.to_string());
        source = inner.source();
    }
    rendered
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn insecure() -> ClientConfig {
        ClientConfig {
            allow_insecure_http: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn post_returns_status_and_body_for_any_status() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/echo").header("x-test", "1").body("ping");
                then.status(418).body("teapot");
            })
            .await;

        let transport = HttpTransport::new(&insecure()).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-test", "1".parse().unwrap());

        let response = transport
            .post(
                &server.url("/echo"),
                headers,
                Bytes::from_static(b"ping"),
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, StatusCode::IM_A_TEAPOT);
        assert_eq!(response.body, Bytes::from_static(b"teapot"));
    }

    #[tokio::test]
    async fn invalid_uri_is_rejected_before_sending() {
        let transport = HttpTransport::new(&insecure()).unwrap();
        let err = transport
            .post(
                "some-baseurl/v1/rest/mgmt",
                HeaderMap::new(),
                Bytes::new(),
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();
        assert!(
            matches!(err, TransportError::InvalidRequest(_) | TransportError::Request(_)),
            "unexpected error: {err:?}"
        );
    }

    #[tokio::test]
    async fn plain_http_is_refused_when_tls_only() {
        let server = MockServer::start_async().await;
        let transport = HttpTransport::new(&ClientConfig::default()).unwrap();

        let err = transport
            .post(
                &server.url("/echo"),
                HeaderMap::new(),
                Bytes::new(),
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/slow");
                then.status(200).delay(Duration::from_secs(2));
            })
            .await;

        let transport = HttpTransport::new(&insecure()).unwrap();
        let err = transport
            .post(
                &server.url("/slow"),
                HeaderMap::new(),
                Bytes::new(),
                Duration::from_millis(100),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)), "unexpected error: {err:?}");
    }
}
