//! Auth-header construction for downstream calls
//!
//! Stateless per scheme apart from a small per-service token cache used by the
//! oauth2 path. A full OAuth2 token-endpoint exchange is out of scope:
//! `refresh_oauth2_token` is a manual/administrative operation, never invoked
//! automatically when a cached token expires.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::debug;

use crate::config::{AuthConfig, AuthType};
use crate::error::McpError;

const DEFAULT_TOKEN_TTL_SECONDS: i64 = 3_600;

/// Cached oauth2 token for one service, discarded once expired
#[derive(Debug, Clone)]
struct TokenCacheEntry {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Builds authentication headers per service
#[derive(Debug, Default)]
pub struct AuthManager {
    /// Keyed by service name; never shared across services
    cache: Mutex<HashMap<String, TokenCacheEntry>>,
}

impl AuthManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct the header map for one downstream call.
    pub fn build_headers(
        &self,
        service: &str,
        auth: &AuthConfig,
    ) -> Result<HashMap<String, String>, McpError> {
        let mut headers = HashMap::new();
        match &auth.auth_type {
            AuthType::Bearer => {
                let token = auth.credential("token").ok_or_else(|| {
                    McpError::authentication(format!(
                        "service '{}': bearer auth requires a 'token' credential",
                        service
                    ))
                })?;
                headers.insert("Authorization".to_string(), format!("Bearer {}", token));
            }
            AuthType::ApiKey => {
                let key = auth.credential("apiKey").ok_or_else(|| {
                    McpError::authentication(format!(
                        "service '{}': api-key auth requires an 'apiKey' credential",
                        service
                    ))
                })?;
                headers.insert("X-API-Key".to_string(), key.to_string());
            }
            AuthType::OAuth2 => {
                let token = self
                    .cached_token(service)
                    .or_else(|| auth.credential("accessToken").map(str::to_string))
                    .ok_or_else(|| {
                        McpError::authentication(format!(
                            "service '{}': oauth2 auth requires an 'accessToken' credential",
                            service
                        ))
                    })?;
                headers.insert("Authorization".to_string(), format!("Bearer {}", token));
            }
            AuthType::Other(kind) => {
                return Err(McpError::authentication(format!(
                    "service '{}': unsupported auth type '{}'",
                    service, kind
                )));
            }
        }
        Ok(headers)
    }

    /// Administrative refresh: replace the cached oauth2 entry with a fresh
    /// token/expiry. Fails when no refresh token is configured.
    pub fn refresh_oauth2_token(&self, service: &str, auth: &AuthConfig) -> Result<(), McpError> {
        if auth.credential("refreshToken").is_none() {
            return Err(McpError::authentication(format!(
                "service '{}': no refresh token configured",
                service
            )));
        }
        let token = auth
            .credential("accessToken")
            .ok_or_else(|| {
                McpError::authentication(format!(
                    "service '{}': oauth2 refresh requires an 'accessToken' credential",
                    service
                ))
            })?
            .to_string();
        let ttl_seconds = auth
            .credential("expiresInSeconds")
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(DEFAULT_TOKEN_TTL_SECONDS);

        let mut cache = self.cache.lock().unwrap();
        cache.insert(
            service.to_string(),
            TokenCacheEntry {
                token,
                expires_at: Utc::now() + ChronoDuration::seconds(ttl_seconds),
            },
        );
        debug!(service, ttl_seconds, "oauth2 token cache refreshed");
        Ok(())
    }

    /// Drop the cached entry for one service.
    pub fn clear_token(&self, service: &str) {
        self.cache.lock().unwrap().remove(service);
    }

    /// Unexpired cached token for the service, evicting an expired entry.
    fn cached_token(&self, service: &str) -> Option<String> {
        let mut cache = self.cache.lock().unwrap();
        match cache.get(service) {
            Some(entry) if entry.expires_at > Utc::now() => Some(entry.token.clone()),
            Some(_) => {
                cache.remove(service);
                None
            }
            None => None,
        }
    }
}

/// Startup validation of one auth configuration. Returns a (possibly empty)
/// list of problems, never a hard error; the caller decides whether problems
/// are fatal.
pub fn validate_auth_config(auth: &AuthConfig) -> Vec<String> {
    let mut problems = Vec::new();
    match &auth.auth_type {
        AuthType::Bearer => {
            if auth.credential("token").is_none() {
                problems.push("bearer auth is missing the 'token' credential".to_string());
            }
        }
        AuthType::ApiKey => {
            if auth.credential("apiKey").is_none() {
                problems.push("api-key auth is missing the 'apiKey' credential".to_string());
            }
        }
        AuthType::OAuth2 => {
            if auth.credential("accessToken").is_none() {
                problems.push("oauth2 auth is missing the 'accessToken' credential".to_string());
            }
        }
        AuthType::Other(kind) => {
            problems.push(format!("unsupported auth type '{}'", kind));
        }
    }
    problems
}
