//! Shared Google service-account authentication for the remote store and
//! the Sheets mirror — both are document/row-oriented Google-hosted
//! collaborators authenticated the same way, so the credential is loaded
//! and exchanged for an access token exactly once per client rather than
//! duplicated in each.
//!
//! Builds a JWT assertion from the service-account key and exchanges it at
//! the key's `token_uri` (defaulting to Google's) for a bearer token, per
//! the `urn:ietf:params:oauth:grant-type:jwt-bearer` flow.

mod jwt;

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::GoogleCredentialConfig;

/// Opaque failure from the auth exchange; callers map this into their own
/// component error type.
#[derive(Debug, Clone)]
pub(crate) struct GoogleAuthFailure(pub String);

impl std::fmt::Display for GoogleAuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for GoogleAuthFailure {}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Caches and refreshes a service-account access token for one OAuth scope.
pub(crate) struct GoogleAuthenticator {
    client: reqwest::Client,
    credential: GoogleCredentialConfig,
    scope: String,
    cache: Mutex<Option<CachedToken>>,
}

impl GoogleAuthenticator {
    pub fn new(client: reqwest::Client, credential: GoogleCredentialConfig, scope: &str) -> Self {
        Self {
            client,
            credential,
            scope: scope.to_string(),
            cache: Mutex::new(None),
        }
    }

    fn key_json(&self) -> Result<serde_json::Value, GoogleAuthFailure> {
        if let Some(blob) = &self.credential.credential_blob {
            use base64::Engine;
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(blob.trim())
                .map_err(|e| GoogleAuthFailure(format!("invalid credential_blob base64: {e}")))?;
            return serde_json::from_slice(&decoded)
                .map_err(|e| GoogleAuthFailure(format!("invalid credential_blob JSON: {e}")));
        }
        if let Some(path) = &self.credential.credential_path {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| GoogleAuthFailure(format!("cannot read {path}: {e}")))?;
            return serde_json::from_str(&raw)
                .map_err(|e| GoogleAuthFailure(format!("invalid credential JSON at {path}: {e}")));
        }
        Err(GoogleAuthFailure(
            "no credential_path or credential_blob configured".to_string(),
        ))
    }

    /// Get a valid access token, refreshing if the cached one is within 60s
    /// of expiry or absent.
    pub async fn access_token(&self) -> Result<String, GoogleAuthFailure> {
        if let Ok(cache) = self.cache.lock() {
            if let Some(ref tok) = *cache {
                if tok.expires_at > Instant::now() + Duration::from_secs(60) {
                    return Ok(tok.access_token.clone());
                }
            }
        }

        let token = self.fetch_token().await?;
        let access_token = token.access_token.clone();
        if let Ok(mut cache) = self.cache.lock() {
            *cache = Some(token);
        }
        Ok(access_token)
    }

    async fn fetch_token(&self) -> Result<CachedToken, GoogleAuthFailure> {
        let key_json = self.key_json()?;

        let client_email = key_json["client_email"]
            .as_str()
            .ok_or_else(|| GoogleAuthFailure("missing client_email in credential".to_string()))?;
        let private_key_pem = key_json["private_key"]
            .as_str()
            .ok_or_else(|| GoogleAuthFailure("missing private_key in credential".to_string()))?;
        let token_uri = key_json["token_uri"]
            .as_str()
            .unwrap_or("https://oauth2.googleapis.com/token");

        let now = chrono::Utc::now().timestamp();
        let claims = serde_json::json!({
            "iss": client_email,
            "scope": self.scope,
            "aud": token_uri,
            "iat": now,
            "exp": now + 3600,
        });

        let assertion = jwt::build_jwt(&claims, private_key_pem)
            .map_err(|e| GoogleAuthFailure(format!("JWT assertion failed: {e}")))?;

        let response = self
            .client
            .post(token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", &assertion),
            ])
            .send()
            .await
            .map_err(|e| GoogleAuthFailure(format!("token exchange request failed: {e}")))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GoogleAuthFailure(format!(
                "token endpoint returned an error: {body}"
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GoogleAuthFailure(format!("invalid token response: {e}")))?;

        let access_token = body["access_token"]
            .as_str()
            .ok_or_else(|| GoogleAuthFailure("token response missing access_token".to_string()))?
            .to_string();
        let expires_in = body["expires_in"].as_u64().unwrap_or(3600);

        Ok(CachedToken {
            access_token,
            expires_at: Instant::now() + Duration::from_secs(expires_in),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_fails_fast() {
        let authenticator = GoogleAuthenticator::new(
            reqwest::Client::new(),
            GoogleCredentialConfig::default(),
            "scope",
        );
        let err = authenticator.key_json().unwrap_err();
        assert!(err.0.contains("no credential_path"));
    }

    #[test]
    fn malformed_blob_fails_with_context() {
        let authenticator = GoogleAuthenticator::new(
            reqwest::Client::new(),
            GoogleCredentialConfig {
                credential_path: None,
                credential_blob: Some("not valid base64!!".to_string()),
            },
            "scope",
        );
        let err = authenticator.key_json().unwrap_err();
        assert!(err.0.contains("base64"));
    }
}
