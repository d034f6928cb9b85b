//! Remote control-plane store client: a thin REST wrapper over a
//! Firestore-shaped document store, scoped to the per-user sub-collections
//! the Control-Plane Sync and PDCA Updater need —
//! `users/{uid}/queue_decisions`, `users/{uid}/operation_requests`,
//! `selection_preferences/{uid}`, `api_keys/{uid}`, `dashboard_data/{uid}`,
//! and `persona_profiles/{uid}`.
//!
//! Authentication is a service-account JWT exchange shared with the Sheets
//! Mirror (see [`crate::google_auth`]); this module only adds the
//! document-read/write shape on top.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::config::RemoteStoreConfig;
use crate::error::RemoteStoreError;
use crate::google_auth::GoogleAuthenticator;
use crate::retry::{with_backoff, BackoffConfig};

const FIRESTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// One remote curation decision awaiting local application.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RemoteDecision {
    /// The Firestore document name (used to delete it once processed).
    #[serde(skip)]
    pub doc_name: String,
    /// The candidate's tweet id.
    pub tweet_id: String,
    /// `"approve"` or `"skip"`.
    pub action: String,
    /// Reason text, present only for skip decisions.
    #[serde(default)]
    pub skip_reason: Option<String>,
}

/// One pending operation request from the remote queue.
#[derive(Debug, Clone)]
pub struct OperationRequest {
    /// The Firestore document name.
    pub doc_name: String,
    /// The local command to invoke (`add-tweet`, `collect`, `curate`,
    /// `curate-post`, `export-dashboard`).
    pub command: String,
    /// Arguments to pass to the command, as a flat string map.
    pub args: std::collections::HashMap<String, String>,
}

/// A thin client over the remote control-plane store's REST surface.
pub struct RemoteStoreClient {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    uid: String,
    authenticator: GoogleAuthenticator,
    backoff: BackoffConfig,
}

impl RemoteStoreClient {
    /// Build a client from [`RemoteStoreConfig`].
    ///
    /// Returns [`RemoteStoreError::NotConfigured`] if `project_id` or `uid`
    /// is absent.
    pub fn new(config: &RemoteStoreConfig) -> Result<Self, RemoteStoreError> {
        let project_id = config
            .project_id
            .clone()
            .ok_or(RemoteStoreError::NotConfigured)?;
        let uid = config
            .uid
            .clone()
            .ok_or(RemoteStoreError::NotConfigured)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("remote store HTTP client must build");
        let authenticator = GoogleAuthenticator::new(
            client.clone(),
            config.credential.clone(),
            FIRESTORE_SCOPE,
        );
        Ok(Self {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            project_id,
            uid,
            authenticator,
            backoff: BackoffConfig::default(),
        })
    }

    fn documents_url(&self, path: &str) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}",
            self.base_url, self.project_id, path
        )
    }

    async fn bearer(&self) -> Result<String, RemoteStoreError> {
        self.authenticator
            .access_token()
            .await
            .map_err(|e| RemoteStoreError::Rejected {
                status: 401,
                message: e.to_string(),
            })
    }

    async fn list(&self, collection_path: &str) -> Result<Vec<(String, Value)>, RemoteStoreError> {
        let token = self.bearer().await?;
        let url = self.documents_url(collection_path);
        let send = || async {
            self.client
                .get(&url)
                .bearer_auth(&token)
                .send()
                .await?
                .error_for_status()
        };
        let response = with_backoff(self.backoff, "remote_store.list", send).await?;
        let body: Value = response.json().await?;
        let documents = body
            .get("documents")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(documents
            .into_iter()
            .map(|doc| {
                let name = doc
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                (name, decode_fields(&doc))
            })
            .collect())
    }

    async fn delete(&self, doc_name: &str) -> Result<(), RemoteStoreError> {
        let token = self.bearer().await?;
        let url = format!("{}/{}", self.base_url, doc_name);
        let send = || async {
            self.client
                .delete(&url)
                .bearer_auth(&token)
                .send()
                .await?
                .error_for_status()
        };
        with_backoff(self.backoff, "remote_store.delete", send).await?;
        Ok(())
    }

    async fn patch(&self, path: &str, fields: &Value) -> Result<(), RemoteStoreError> {
        let token = self.bearer().await?;
        let url = self.documents_url(path);
        let body = encode_fields(fields);
        let send = || async {
            self.client
                .patch(&url)
                .bearer_auth(&token)
                .json(&body)
                .send()
                .await?
                .error_for_status()
        };
        with_backoff(self.backoff, "remote_store.patch", send).await?;
        Ok(())
    }

    /// Pull pending decisions from `users/{uid}/queue_decisions`.
    pub async fn pull_decisions(&self) -> Result<Vec<RemoteDecision>, RemoteStoreError> {
        let collection = format!("users/{}/queue_decisions", self.uid);
        let entries = self.list(&collection).await?;
        entries
            .into_iter()
            .map(|(name, value)| {
                let mut decision: RemoteDecision =
                    serde_json::from_value(value).map_err(|e| RemoteStoreError::MalformedResponse {
                        message: format!("queue_decisions entry {name}: {e}"),
                    })?;
                decision.doc_name = name;
                Ok(decision)
            })
            .collect()
    }

    /// Delete a processed decision so it does not re-apply on the next pull.
    /// The caller batches these in groups of at most 500 per §4.9.
    pub async fn ack_decision(&self, decision: &RemoteDecision) -> Result<(), RemoteStoreError> {
        self.delete(&decision.doc_name).await
    }

    /// Pull the flat `selection_preferences/{uid}` document.
    pub async fn pull_preferences_raw(
        &self,
    ) -> Result<std::collections::HashMap<String, Value>, RemoteStoreError> {
        let token = self.bearer().await?;
        let url = self.documents_url(&format!("selection_preferences/{}", self.uid));
        let send = || async { self.client.get(&url).bearer_auth(&token).send().await };
        let response = with_backoff(self.backoff, "remote_store.preferences", send).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(std::collections::HashMap::new());
        }
        let body: Value = response.error_for_status()?.json().await?;
        let map = decode_fields(&body)
            .as_object()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .collect();
        Ok(map)
    }

    /// Pull pending operation requests, oldest first.
    pub async fn pull_operation_requests(
        &self,
    ) -> Result<Vec<OperationRequest>, RemoteStoreError> {
        let collection = format!("users/{}/operation_requests", self.uid);
        let entries = self.list(&collection).await?;
        let mut requests: Vec<(String, OperationRequest)> = entries
            .into_iter()
            .filter(|(_, v)| v.get("status").and_then(Value::as_str) == Some("pending"))
            .map(|(name, v)| {
                let command = v
                    .get("command")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let args = v
                    .get("args")
                    .and_then(Value::as_object)
                    .map(|obj| {
                        obj.iter()
                            .filter_map(|(k, val)| {
                                val.as_str().map(|s| (k.clone(), s.to_string()))
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                (
                    v.get("created_at")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    OperationRequest {
                        doc_name: name,
                        command,
                        args,
                    },
                )
            })
            .collect();
        requests.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(requests.into_iter().map(|(_, r)| r).collect())
    }

    /// Mark an operation request `running`.
    pub async fn mark_operation_running(&self, doc_name: &str) -> Result<(), RemoteStoreError> {
        self.patch(
            &path_suffix(doc_name),
            &serde_json::json!({"status": "running"}),
        )
        .await
    }

    /// Mark an operation request finished, with truncated stdout/stderr.
    pub async fn complete_operation(
        &self,
        doc_name: &str,
        status: &str,
        stdout: &str,
        stderr: &str,
    ) -> Result<(), RemoteStoreError> {
        const MAX_LEN: usize = 4000;
        self.patch(
            &path_suffix(doc_name),
            &serde_json::json!({
                "status": status,
                "stdout": truncate(stdout, MAX_LEN),
                "stderr": truncate(stderr, MAX_LEN),
            }),
        )
        .await
    }

    /// Write/merge the dashboard snapshot to `dashboard_data/{uid}`.
    pub async fn push_snapshot<T: Serialize>(&self, snapshot: &T) -> Result<(), RemoteStoreError> {
        let value = serde_json::to_value(snapshot).map_err(|e| RemoteStoreError::MalformedResponse {
            message: format!("snapshot serialization failed: {e}"),
        })?;
        self.patch(&format!("dashboard_data/{}", self.uid), &value)
            .await
    }

    /// Load per-user API keys from `api_keys/{uid}` for operation-request
    /// subprocess environment injection.
    pub async fn load_api_keys(&self) -> Result<std::collections::HashMap<String, String>, RemoteStoreError> {
        let token = self.bearer().await?;
        let url = self.documents_url(&format!("api_keys/{}", self.uid));
        let send = || async { self.client.get(&url).bearer_auth(&token).send().await };
        let response = with_backoff(self.backoff, "remote_store.api_keys", send).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(std::collections::HashMap::new());
        }
        let body: Value = response.error_for_status()?.json().await?;
        let map = decode_fields(&body)
            .as_object()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
            .collect();
        Ok(map)
    }

    /// Persist a [`crate::persona::PersonaProfile`]-shaped value to
    /// `persona_profiles/{uid}`.
    pub async fn push_persona<T: Serialize>(&self, profile: &T) -> Result<(), RemoteStoreError> {
        let value = serde_json::to_value(profile).map_err(|e| RemoteStoreError::MalformedResponse {
            message: format!("persona serialization failed: {e}"),
        })?;
        self.patch(&format!("persona_profiles/{}", self.uid), &value)
            .await
    }
}

fn path_suffix(doc_name: &str) -> String {
    // `doc_name` is a fully-qualified Firestore resource name
    // (`projects/.../databases/(default)/documents/...`); the documents_url
    // helper needs just the tail after `documents/`.
    doc_name
        .split("/documents/")
        .nth(1)
        .unwrap_or(doc_name)
        .to_string()
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        s.chars().take(max_len).collect::<String>() + "...(truncated)"
    }
}

/// Encode a plain JSON object into Firestore's typed-field document shape.
fn encode_fields(value: &Value) -> Value {
    let obj = match value.as_object() {
        Some(o) => o,
        None => return serde_json::json!({"fields": {}}),
    };
    let fields: serde_json::Map<String, Value> = obj
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect();
    serde_json::json!({ "fields": fields })
}

fn encode_value(value: &Value) -> Value {
    match value {
        Value::String(s) => serde_json::json!({"stringValue": s}),
        Value::Number(n) if n.is_i64() || n.is_u64() => {
            serde_json::json!({"integerValue": n.to_string()})
        }
        Value::Number(n) => serde_json::json!({"doubleValue": n.as_f64().unwrap_or(0.0)}),
        Value::Bool(b) => serde_json::json!({"booleanValue": b}),
        Value::Array(items) => {
            serde_json::json!({"arrayValue": {"values": items.iter().map(encode_value).collect::<Vec<_>>()}})
        }
        Value::Object(_) => encode_fields(value),
        Value::Null => serde_json::json!({"nullValue": null}),
    }
}

/// Decode a Firestore typed-field document back into plain JSON.
fn decode_fields(doc: &Value) -> Value {
    let fields = match doc.get("fields").and_then(Value::as_object) {
        Some(f) => f,
        None => return Value::Object(serde_json::Map::new()),
    };
    let decoded: serde_json::Map<String, Value> = fields
        .iter()
        .map(|(k, v)| (k.clone(), decode_value(v)))
        .collect();
    Value::Object(decoded)
}

fn decode_value(value: &Value) -> Value {
    if let Some(s) = value.get("stringValue").and_then(Value::as_str) {
        return Value::String(s.to_string());
    }
    if let Some(i) = value.get("integerValue").and_then(Value::as_str) {
        return i
            .parse::<i64>()
            .map(|n| serde_json::json!(n))
            .unwrap_or(Value::Null);
    }
    if let Some(d) = value.get("doubleValue").and_then(Value::as_f64) {
        return serde_json::json!(d);
    }
    if let Some(b) = value.get("booleanValue").and_then(Value::as_bool) {
        return Value::Bool(b);
    }
    if let Some(arr) = value
        .get("arrayValue")
        .and_then(|a| a.get("values"))
        .and_then(Value::as_array)
    {
        return Value::Array(arr.iter().map(decode_value).collect());
    }
    if value.get("mapValue").is_some() {
        return decode_fields(value.get("mapValue").unwrap());
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_round_trips_plain_object() {
        let original = serde_json::json!({
            "name": "rust",
            "count": 3,
            "ratio": 0.5,
            "active": true,
            "tags": ["a", "b"],
        });
        let encoded = encode_fields(&original);
        let decoded = decode_fields(&serde_json::json!({"fields": encoded["fields"]}));
        assert_eq!(decoded["name"], "rust");
        assert_eq!(decoded["count"], 3);
        assert_eq!(decoded["active"], true);
        assert_eq!(decoded["tags"], serde_json::json!(["a", "b"]));
    }

    #[test]
    fn truncate_adds_marker_only_when_exceeded() {
        assert_eq!(truncate("short", 10), "short");
        let long = "x".repeat(20);
        let truncated = truncate(&long, 5);
        assert!(truncated.starts_with("xxxxx"));
        assert!(truncated.ends_with("(truncated)"));
    }

    #[test]
    fn path_suffix_strips_resource_prefix() {
        let full = "projects/p/databases/(default)/documents/users/u1/queue_decisions/abc";
        assert_eq!(path_suffix(full), "users/u1/queue_decisions/abc");
    }

    #[test]
    fn new_requires_project_id() {
        let config = RemoteStoreConfig::default();
        let err = RemoteStoreClient::new(&config).unwrap_err();
        assert!(matches!(err, RemoteStoreError::NotConfigured));
    }

    #[test]
    fn new_requires_uid_even_with_project_id() {
        let config = RemoteStoreConfig {
            project_id: Some("proj".to_string()),
            ..Default::default()
        };
        let err = RemoteStoreClient::new(&config).unwrap_err();
        assert!(matches!(err, RemoteStoreError::NotConfigured));
    }
}
