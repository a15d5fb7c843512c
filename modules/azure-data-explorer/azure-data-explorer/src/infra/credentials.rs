//! Service principal credentials.
//!
//! Exchanges the client id and secret for an access token with the OAuth2
//! client credentials grant and caches it until it is close to expiry.

use std::time::Duration;

use async_trait::async_trait;
use azure_data_explorer_sdk::{
    AuthorizationError, AuthorizationProvider, DatasourceSettings, RequestContext,
};
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use zeroize::Zeroizing;

use super::http::HttpTransport;
use crate::config::{ConfigError, CredentialsConfig};

/// [`AuthorizationProvider`] for an Azure AD service principal.
pub struct ServicePrincipalCredentials {
    transport: HttpTransport,
    token_endpoint: String,
    client_id: String,
    client_secret: SecretString,
    scope: String,
    refresh_offset: Duration,
    default_ttl: Duration,
    timeout: Duration,
    cache: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for ServicePrincipalCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServicePrincipalCredentials")
            .field("token_endpoint", &self.token_endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Upper bound on how long a token is trusted, whatever `expires_in` says.
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

struct CachedToken {
    access_token: SecretString,
    refresh_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.refresh_at
    }

    fn authorization(&self) -> String {
        format!("Bearer {}", self.access_token.expose_secret())
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
}

impl ServicePrincipalCredentials {
    /// Build the credentials for the tenant and client of `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the credentials section is invalid.
    pub fn new(
        transport: HttpTransport,
        settings: &DatasourceSettings,
        config: &CredentialsConfig,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let client_secret = config
            .client_secret
            .as_ref()
            .map(|s| SecretString::from(s.expose_secret().to_owned()))
            .ok_or_else(|| ConfigError::Invalid {
                section: "credentials",
                field: "client_secret",
                message: "must be set".to_owned(),
            })?;

        let token_endpoint = format!(
            "{}/{}/oauth2/v2.0/token",
            config.authority_host.trim_end_matches('/'),
            settings.tenant_id
        );
        let scope = config.scope.clone().unwrap_or_else(|| {
            format!("{}/.default", settings.cluster_url.trim_end_matches('/'))
        });

        Ok(Self {
            transport,
            token_endpoint,
            client_id: settings.client_id.clone(),
            client_secret,
            scope,
            refresh_offset: config.refresh_offset(),
            default_ttl: config.default_ttl(),
            timeout,
            cache: Mutex::new(None),
        })
    }

    async fn fetch_token(&self) -> Result<CachedToken, AuthorizationError> {
        let secret = Zeroizing::new(self.client_secret.expose_secret().to_owned());
        let form = Zeroizing::new(
            serde_urlencoded::to_string([
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", secret.as_str()),
                ("scope", self.scope.as_str()),
            ])
            .map_err(|e| AuthorizationError::token_acquisition(e.to_string()))?,
        );

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let requested_at = Instant::now();
        let response = self
            .transport
            .post(
                &self.token_endpoint,
                headers,
                Bytes::copy_from_slice(form.as_bytes()),
                self.timeout,
            )
            .await
            .map_err(|e| AuthorizationError::token_acquisition(e.to_string()))?;

        if !response.status.is_success() {
            let code = match serde_json::from_slice::<TokenErrorResponse>(&response.body) {
                Ok(body) => format!(" ({})", body.error),
                Err(_) => String::new(),
            };
            return Err(AuthorizationError::token_acquisition(format!(
                "token endpoint returned HTTP {}{code}",
                response.status.as_u16()
            )));
        }

        let token: TokenResponse = serde_json::from_slice(&response.body).map_err(|e| {
            AuthorizationError::token_acquisition(format!("invalid token response: {e}"))
        })?;

        if let Some(ref tt) = token.token_type
            && !tt.eq_ignore_ascii_case("bearer")
        {
            return Err(AuthorizationError::token_acquisition(format!(
                "unsupported token type '{tt}'"
            )));
        }

        let lifetime = token
            .expires_in
            .map_or(self.default_ttl, Duration::from_secs)
            .min(MAX_TOKEN_LIFETIME);
        tracing::debug!(lifetime_secs = lifetime.as_secs(), "acquired access token");

        Ok(CachedToken {
            access_token: SecretString::from(token.access_token),
            refresh_at: requested_at
                .checked_add(refresh_delay(lifetime, self.refresh_offset))
                .unwrap_or(requested_at),
        })
    }
}

/// Time after acquisition at which a token is no longer handed out.
///
/// `refresh_offset` before expiry, or half the lifetime when the token lives
/// shorter than the offset. A zero lifetime is never reused.
fn refresh_delay(lifetime: Duration, refresh_offset: Duration) -> Duration {
    if refresh_offset < lifetime {
        lifetime.saturating_sub(refresh_offset)
    } else {
        lifetime / 2
    }
}

#[async_trait]
impl AuthorizationProvider for ServicePrincipalCredentials {
    async fn service_principal_authorization(
        &self,
        ctx: &RequestContext,
    ) -> Result<String, AuthorizationError> {
        // The lock is held across the fetch: one token request in flight.
        let mut cache = tokio::select! {
            biased;
            () = ctx.cancellation().cancelled() => {
                return Err(AuthorizationError::token_acquisition("request cancelled"));
            }
            guard = self.cache.lock() => guard,
        };

        if let Some(token) = cache.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            return Ok(token.authorization());
        }

        let token = tokio::select! {
            biased;
            () = ctx.cancellation().cancelled() => {
                return Err(AuthorizationError::token_acquisition("request cancelled"));
            }
            result = self.fetch_token() => result?,
        };
        let authorization = token.authorization();
        *cache = Some(token);
        Ok(authorization)
    }
}
