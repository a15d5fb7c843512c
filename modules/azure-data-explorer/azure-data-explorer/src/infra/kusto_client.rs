//! Query client that talks to the cluster REST endpoint.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use azure_data_explorer_sdk::{
    AdditionalHeaders, Column, DatasourceSettings, Properties, QueryClient, QueryError,
    QueryErrorKind, RequestPayload, Table, TableResponse,
};
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use super::http::{HttpTransport, TransportError};

const TEST_COMMAND: &str = ".show databases";

/// [`QueryClient`] backed by the shared [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpKustoClient {
    transport: HttpTransport,
    timeout: Duration,
}

impl HttpKustoClient {
    #[must_use]
    pub fn new(transport: HttpTransport, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    async fn post(
        &self,
        url: &str,
        payload: &RequestPayload,
        additional_headers: &AdditionalHeaders,
    ) -> Result<Bytes, QueryError> {
        let body = serde_json::to_vec(&WireRequest::from(payload))
            .map_err(|e| QueryError::unclassified(format!("failed to encode request: {e}")))?;
        let headers = header_map(additional_headers)?;

        let response = self
            .transport
            .post(url, headers, Bytes::from(body), self.timeout)
            .await
            .map_err(|e| query_error(&e))?;

        if !response.status.is_success() {
            return Err(QueryError::http_status(
                response.status.as_u16(),
                &String::from_utf8_lossy(&response.body),
            ));
        }
        Ok(response.body)
    }
}

#[async_trait]
impl QueryClient for HttpKustoClient {
    async fn test_request(
        &self,
        settings: &DatasourceSettings,
        properties: &Properties,
        additional_headers: &AdditionalHeaders,
    ) -> Result<(), QueryError> {
        let payload = RequestPayload {
            db: settings.default_database.clone(),
            csl: TEST_COMMAND.to_owned(),
            properties: Some(properties.clone()),
        };
        self.post(&settings.management_url(), &payload, additional_headers)
            .await
            .map(|_| ())
    }

    async fn kusto_request(
        &self,
        url: &str,
        payload: RequestPayload,
        additional_headers: &AdditionalHeaders,
    ) -> Result<TableResponse, QueryError> {
        let body = self.post(url, &payload, additional_headers).await?;
        let wire: WireResponse = serde_json::from_slice(&body)
            .map_err(|e| QueryError::unclassified(format!("failed to decode response: {e}")))?;
        Ok(wire.into())
    }
}

fn header_map(additional_headers: &AdditionalHeaders) -> Result<HeaderMap, QueryError> {
    let mut headers = HeaderMap::with_capacity(additional_headers.len() + 2);
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    for (name, value) in additional_headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| QueryError::unclassified(format!("invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            QueryError::unclassified(format!("invalid value for header '{name}': {e}"))
        })?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn query_error(e: &TransportError) -> QueryError {
    let kind = match e {
        TransportError::Timeout(_) => QueryErrorKind::Timeout,
        TransportError::Connect(_) | TransportError::Tls(_) => QueryErrorKind::Unreachable,
        TransportError::InvalidRequest(_)
        | TransportError::Request(_)
        | TransportError::Body(_) => QueryErrorKind::Unclassified,
    };
    QueryError::new(kind, e.to_string())
}

#[derive(Serialize)]
struct WireRequest<'a> {
    db: &'a str,
    csl: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    properties: Option<WireProperties<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct WireProperties<'a> {
    options: &'a BTreeMap<String, serde_json::Value>,
}

impl<'a> From<&'a RequestPayload> for WireRequest<'a> {
    fn from(payload: &'a RequestPayload) -> Self {
        Self {
            db: &payload.db,
            csl: &payload.csl,
            properties: payload.properties.as_ref().map(|p| WireProperties {
                options: &p.options,
            }),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireResponse {
    #[serde(default)]
    tables: Vec<WireTable>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireTable {
    table_name: String,
    #[serde(default)]
    columns: Vec<WireColumn>,
    #[serde(default)]
    rows: Vec<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireColumn {
    column_name: String,
    #[serde(default)]
    column_type: Option<String>,
    #[serde(default)]
    data_type: Option<String>,
}

impl From<WireResponse> for TableResponse {
    fn from(wire: WireResponse) -> Self {
        Self {
            tables: wire.tables.into_iter().map(Table::from).collect(),
        }
    }
}

impl From<WireTable> for Table {
    fn from(wire: WireTable) -> Self {
        Self {
            table_name: wire.table_name,
            columns: wire
                .columns
                .into_iter()
                .map(|c| Column {
                    column_name: c.column_name,
                    column_type: c.column_type.or(c.data_type),
                })
                .collect(),
            rows: wire.rows,
        }
    }
}
