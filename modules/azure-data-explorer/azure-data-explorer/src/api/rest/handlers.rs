//! REST handlers for the datasource.
//!
//! Handlers are thin: build the request context, call the domain service,
//! encode the result or map the error.

use std::sync::Arc;

use axum::extract::Extension;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use azure_data_explorer_sdk::RequestContext;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::dto::{HealthDto, TableResponseDto};
use super::error::HttpError;
use crate::domain::service::Service;

/// Header carrying the login of the user the request is made for.
pub const USER_LOGIN_HEADER: &str = "x-grafana-user";

/// Header carrying the request id assigned at the edge.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// HEAD on a resource route.
///
/// The method router would otherwise run the GET handler for HEAD.
pub async fn method_not_allowed() -> StatusCode {
    StatusCode::METHOD_NOT_ALLOWED
}

/// GET /databases - List cluster databases.
#[tracing::instrument(skip_all)]
pub async fn list_databases(
    Extension(svc): Extension<Arc<Service>>,
    headers: HeaderMap,
) -> Result<Response, HttpError> {
    let cancellation = CancellationToken::new();
    let _cancel_on_drop = cancellation.clone().drop_guard();
    let ctx = request_context(cancellation, &headers);

    let tables = svc.databases(&ctx).await?;
    json_response(&TableResponseDto::from(tables))
}

/// GET /schema - Schema of the default database.
#[tracing::instrument(skip_all)]
pub async fn get_schema(
    Extension(svc): Extension<Arc<Service>>,
    headers: HeaderMap,
) -> Result<Response, HttpError> {
    let cancellation = CancellationToken::new();
    let _cancel_on_drop = cancellation.clone().drop_guard();
    let ctx = request_context(cancellation, &headers);

    let tables = svc.schema(&ctx).await?;
    json_response(&TableResponseDto::from(tables))
}

/// GET /health - Connectivity check with the service principal.
#[tracing::instrument(skip_all)]
pub async fn check_health(
    Extension(svc): Extension<Arc<Service>>,
    headers: HeaderMap,
) -> Result<Response, HttpError> {
    let cancellation = CancellationToken::new();
    let _cancel_on_drop = cancellation.clone().drop_guard();
    let ctx = request_context(cancellation, &headers);

    svc.check_health(&ctx).await?;
    json_response(&HealthDto::connected())
}

fn request_context(cancellation: CancellationToken, headers: &HeaderMap) -> RequestContext {
    let mut ctx = RequestContext::new(cancellation);
    if let Some(login) = header_str(headers, USER_LOGIN_HEADER) {
        ctx = ctx.with_user_login(login);
    }
    if let Some(request_id) = header_str(headers, REQUEST_ID_HEADER) {
        ctx = ctx.with_request_id(request_id);
    }
    ctx
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Encode `body` as a 200 JSON response.
fn json_response<T: Serialize>(body: &T) -> Result<Response, HttpError> {
    let bytes = serde_json::to_vec(body).map_err(|e| {
        tracing::error!(error = %e, "failed to encode response body");
        HttpError::serialization()
    })?;

    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn context_picks_up_login_and_request_id() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_LOGIN_HEADER, HeaderValue::from_static(" alice "));
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("req-42"));

        let ctx = request_context(CancellationToken::new(), &headers);
        assert_eq!(ctx.user_login(), Some("alice"));
        assert_eq!(ctx.request_id(), Some("req-42"));
    }

    #[test]
    fn blank_headers_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_LOGIN_HEADER, HeaderValue::from_static("   "));

        let ctx = request_context(CancellationToken::new(), &headers);
        assert_eq!(ctx.user_login(), None);
        assert_eq!(ctx.request_id(), None);
    }

    #[test]
    fn drop_guard_cancels_context() {
        let cancellation = CancellationToken::new();
        let ctx = request_context(cancellation.clone(), &HeaderMap::new());
        {
            let _cancel_on_drop = cancellation.drop_guard();
            assert!(!ctx.is_cancelled());
        }
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn unencodable_body_becomes_serialization_error() {
        // Non-string map keys cannot be encoded as JSON object keys.
        let mut body = BTreeMap::new();
        body.insert((1, 2), "value");

        let err = json_response(&body).unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error(), "failed to encode response");
    }

    #[test]
    fn json_response_sets_content_type() {
        let response = json_response(&HealthDto::connected()).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
