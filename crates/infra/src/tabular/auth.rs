//! Service-account authentication for the Sheets backend.
//!
//! A signed JWT assertion (RS256) is exchanged at the key's token endpoint for a bearer
//! token. The token is cached until shortly before it expires.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use super::StoreError;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

/// Service-account key, as found in a credential file or secret bundle.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl core::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    refresh_at: DateTime<Utc>,
}

/// Issues bearer tokens for one service account.
pub struct TokenSource {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    cached: Mutex<Option<AccessToken>>,
}

impl core::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenSource")
            .field("client_email", &self.key.client_email)
            .finish_non_exhaustive()
    }
}

impl TokenSource {
    /// Fails with `StoreError::Connection` when the private key cannot be used for signing.
    pub fn new(key: ServiceAccountKey) -> Result<Self, StoreError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| StoreError::Connection(format!("invalid service-account key: {e}")))?;
        Ok(Self {
            key,
            encoding_key,
            cached: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// Signed assertion for the token exchange.
    pub fn assertion(&self, now: DateTime<Utc>) -> Result<String, StoreError> {
        let claims = Claims {
            iss: &self.key.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| StoreError::Connection(format!("could not sign token request: {e}")))
    }

    /// Current bearer token, exchanging a fresh assertion when the cached one is stale.
    pub fn bearer(&self, http: &reqwest::blocking::Client) -> Result<String, StoreError> {
        let now = Utc::now();
        if let Ok(cached) = self.cached.lock() {
            if let Some(token) = cached.as_ref().filter(|t| t.refresh_at > now) {
                return Ok(token.value.clone());
            }
        }

        let assertion = self.assertion(now)?;
        let response = http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .map_err(|e| StoreError::Connection(format!("token endpoint unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StoreError::Connection(format!(
                "credentials rejected ({}): {body}",
                status.as_u16()
            )));
        }

        let token: TokenResponse = response
            .json()
            .map_err(|e| StoreError::Protocol(format!("malformed token response: {e}")))?;

        tracing::debug!(
            client_email = %self.key.client_email,
            expires_in = token.expires_in,
            "obtained access token"
        );

        let refresh_at = now + Duration::seconds((token.expires_in - REFRESH_MARGIN_SECS).max(0));
        if let Ok(mut cached) = self.cached.lock() {
            *cached = Some(AccessToken {
                value: token.access_token.clone(),
                refresh_at,
            });
        }
        Ok(token.access_token)
    }
}
