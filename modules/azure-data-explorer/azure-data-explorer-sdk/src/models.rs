//! Datasource models.

use std::collections::BTreeMap;
use std::time::Duration;

/// Headers passed through unmodified to a [`QueryClient`](crate::QueryClient) call.
pub type AdditionalHeaders = BTreeMap<String, String>;

/// One result row. Values are positional and correspond to the table columns.
pub type Row = Vec<serde_json::Value>;

/// Read consistency requested from the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataConsistency {
    #[default]
    Strong,
    Weak,
}

impl DataConsistency {
    /// Value of the `queryconsistency` request option.
    #[must_use]
    pub fn as_option(self) -> &'static str {
        match self {
            Self::Strong => "strongconsistency",
            Self::Weak => "weakconsistency",
        }
    }
}

/// Connection settings of one datasource instance.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasourceSettings {
    pub cluster_url: String,
    pub tenant_id: String,
    pub client_id: String,
    pub default_database: String,
    pub data_consistency: DataConsistency,
    /// Server-side execution limit sent as `servertimeout`.
    pub server_timeout: Duration,
    /// Forward the caller login as `x-ms-user-id`.
    pub enable_user_tracking: bool,
    /// Application name sent as `x-ms-app`.
    pub application: String,
}

impl DatasourceSettings {
    /// Endpoint for management commands (`.show ...`).
    ///
    /// Composed by concatenation; the cluster URL is not parsed.
    #[must_use]
    pub fn management_url(&self) -> String {
        format!("{}/v1/rest/mgmt", self.cluster_url.trim_end_matches('/'))
    }
}

/// Client request properties sent with an upstream call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Properties {
    pub options: BTreeMap<String, serde_json::Value>,
}

impl Properties {
    #[must_use]
    pub fn with_option(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }
}

/// Body of one upstream call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestPayload {
    /// Target database; empty for cluster-level commands.
    pub db: String,
    /// Query or management command text.
    pub csl: String,
    pub properties: Option<Properties>,
}

/// Tabular result of an upstream call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableResponse {
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub table_name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl Table {
    /// Whether any row length differs from the column count.
    #[must_use]
    pub fn has_ragged_rows(&self) -> bool {
        self.rows.iter().any(|row| row.len() != self.columns.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Column {
    pub column_name: String,
    /// Type reported by the cluster, when it reports one.
    pub column_type: Option<String>,
}

impl Column {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            column_name: name.into(),
            column_type: None,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn settings(cluster_url: &str) -> DatasourceSettings {
        DatasourceSettings {
            cluster_url: cluster_url.to_owned(),
            tenant_id: "9a2ddabe-90c0-4e09-bf28-a91111a56ed7".to_owned(),
            client_id: "client".to_owned(),
            default_database: "db".to_owned(),
            data_consistency: DataConsistency::Strong,
            server_timeout: Duration::from_secs(240),
            enable_user_tracking: false,
            application: "adx-proxy".to_owned(),
        }
    }

    #[test]
    fn management_url_is_concatenated_without_parsing() {
        assert_eq!(
            settings("some-baseurl").management_url(),
            "some-baseurl/v1/rest/mgmt"
        );
    }

    #[test]
    fn management_url_trims_trailing_slashes() {
        assert_eq!(
            settings("https://help.kusto.windows.net//").management_url(),
            "https://help.kusto.windows.net/v1/rest/mgmt"
        );
    }

    #[test]
    fn ragged_rows_are_detected() {
        let table = Table {
            table_name: "table1".to_owned(),
            columns: vec![Column::named("col1"), Column::named("col2")],
            rows: vec![vec!["val1".into()], vec!["val2".into(), "val3".into()]],
        };
        assert!(table.has_ragged_rows());

        let even = Table {
            rows: vec![vec!["a".into(), "b".into()]],
            ..table
        };
        assert!(!even.has_ragged_rows());
    }

    #[test]
    fn consistency_option_values() {
        assert_eq!(DataConsistency::Strong.as_option(), "strongconsistency");
        assert_eq!(DataConsistency::Weak.as_option(), "weakconsistency");
    }
}
