//! Datasource configuration.
//!
//! Three sections: `datasource` (cluster identity and request options),
//! `credentials` (service principal secret and token policy) and `client`
//! (outbound HTTP behavior).

use std::time::Duration;

use azure_data_explorer_sdk::{DataConsistency, DatasourceSettings};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use url::Url;

/// Largest `servertimeout` the cluster accepts.
const MAX_SERVER_TIMEOUT_SECS: u64 = 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{section}.{field}: {message}")]
    Invalid {
        section: &'static str,
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    fn invalid(section: &'static str, field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            section,
            field,
            message: message.into(),
        }
    }
}

/// Read consistency as written in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataConsistencyConfig {
    #[default]
    Strong,
    Weak,
}

impl From<DataConsistencyConfig> for DataConsistency {
    fn from(value: DataConsistencyConfig) -> Self {
        match value {
            DataConsistencyConfig::Strong => Self::Strong,
            DataConsistencyConfig::Weak => Self::Weak,
        }
    }
}

/// Cluster identity and per-request options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatasourceConfig {
    /// Cluster endpoint, e.g. `https://mycluster.westeurope.kusto.windows.net`.
    pub cluster_url: String,
    /// Azure AD tenant of the service principal.
    pub tenant_id: String,
    /// Application (client) id of the service principal.
    pub client_id: String,
    /// Database used by the schema route.
    pub default_database: String,
    pub data_consistency: DataConsistencyConfig,
    /// Server-side execution limit in seconds.
    pub server_timeout_secs: u64,
    /// Forward the caller login (`X-Grafana-User`) as `x-ms-user-id`.
    pub enable_user_tracking: bool,
    /// Application name reported to the cluster.
    pub application: String,
}

impl Default for DatasourceConfig {
    fn default() -> Self {
        Self {
            cluster_url: String::new(),
            tenant_id: String::new(),
            client_id: String::new(),
            default_database: String::new(),
            data_consistency: DataConsistencyConfig::Strong,
            server_timeout_secs: 4 * 60,
            enable_user_tracking: false,
            application: "adx-proxy".to_owned(),
        }
    }
}

impl DatasourceConfig {
    /// Validate that the section is complete and self-consistent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        const SECTION: &str = "datasource";

        let url = Url::parse(&self.cluster_url)
            .map_err(|e| ConfigError::invalid(SECTION, "cluster_url", e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                SECTION,
                "cluster_url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        if self.tenant_id.trim().is_empty() {
            return Err(ConfigError::invalid(SECTION, "tenant_id", "must not be empty"));
        }
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::invalid(SECTION, "client_id", "must not be empty"));
        }
        if self.server_timeout_secs == 0 || self.server_timeout_secs > MAX_SERVER_TIMEOUT_SECS {
            return Err(ConfigError::invalid(
                SECTION,
                "server_timeout_secs",
                format!("must be between 1 and {MAX_SERVER_TIMEOUT_SECS}"),
            ));
        }
        if self.application.trim().is_empty() {
            return Err(ConfigError::invalid(SECTION, "application", "must not be empty"));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_settings(&self) -> DatasourceSettings {
        DatasourceSettings {
            cluster_url: self.cluster_url.clone(),
            tenant_id: self.tenant_id.clone(),
            client_id: self.client_id.clone(),
            default_database: self.default_database.clone(),
            data_consistency: self.data_consistency.into(),
            server_timeout: Duration::from_secs(self.server_timeout_secs),
            enable_user_tracking: self.enable_user_tracking,
            application: self.application.clone(),
        }
    }
}

/// Service principal secret and token refresh policy.
///
/// The secret is redacted when the configuration is printed.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CredentialsConfig {
    /// Azure AD authority, without the tenant segment.
    pub authority_host: String,
    #[serde(
        serialize_with = "serialize_secret",
        deserialize_with = "deserialize_secret"
    )]
    pub client_secret: Option<SecretString>,
    /// Token scope; defaults to `{cluster_url}/.default`.
    pub scope: Option<String>,
    /// Refresh a cached token this long before it expires.
    pub refresh_offset_secs: u64,
    /// Lifetime assumed when the token endpoint omits `expires_in`.
    pub default_ttl_secs: u64,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            authority_host: "https://login.microsoftonline.com".to_owned(),
            client_secret: None,
            scope: None,
            refresh_offset_secs: 5 * 60,
            default_ttl_secs: 60 * 60,
        }
    }
}

impl CredentialsConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the authority is not a URL or the
    /// secret is missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        const SECTION: &str = "credentials";

        Url::parse(&self.authority_host)
            .map_err(|e| ConfigError::invalid(SECTION, "authority_host", e.to_string()))?;
        if self.client_secret.is_none() {
            return Err(ConfigError::invalid(SECTION, "client_secret", "must be set"));
        }
        if self.default_ttl_secs == 0 {
            return Err(ConfigError::invalid(
                SECTION,
                "default_ttl_secs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn refresh_offset(&self) -> Duration {
        Duration::from_secs(self.refresh_offset_secs)
    }

    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

/// Outbound HTTP client behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Timeout of a single upstream request in seconds.
    pub request_timeout_secs: u64,
    pub pool_idle_timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
    /// Permit plain `http://` upstreams (local emulators, tests).
    pub allow_insecure_http: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 5 * 60,
            pool_idle_timeout_secs: 90,
            pool_max_idle_per_host: 8,
            allow_insecure_http: false,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|s| !s.is_empty())
        .map(SecretString::from))
}

#[allow(clippy::ref_option)] // signature required by `serialize_with`
fn serialize_secret<S>(secret: &Option<SecretString>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match secret {
        Some(_) => serializer.serialize_str("[REDACTED]"),
        None => serializer.serialize_none(),
    }
}
