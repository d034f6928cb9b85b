//! Control-Plane Sync: two-way reconciliation between local state and a
//! remote document store (see [`crate::remote_store`]) whose per-user
//! sub-collections mirror the local Queue Store and Preferences document.
//!
//! Three independent responsibilities, each callable on its own cron
//! schedule: pulling operator decisions and preference edits down, pushing a
//! dashboard snapshot up, and draining a queue of remote operation requests
//! by running them as local subprocesses.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::StorageConfig;
use crate::error::RemoteStoreError;
use crate::pdca::PdcaAnalysis;
use crate::preferences::{Preferences, PreferencesStore};
use crate::queue::{CandidateRecord, QueueStats, QueueStore};
use crate::remote_store::{OperationRequest, RemoteDecision, RemoteStoreClient};

const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 300;
const SMALL_OPERATION_TIMEOUT_SECS: u64 = 60;
const SMALL_OPERATIONS: &[&str] = &["add-tweet"];
const PERMITTED_OPERATIONS: &[&str] = &["add-tweet", "collect", "curate", "curate-post", "export-dashboard"];
const MAX_DECISION_BATCH: usize = 500;
const RECENT_POSTED_LIMIT: usize = 30;
const RECENT_METRICS_LIMIT: usize = 7;
const DEFAULT_EXTRA_KEYWORD_WEIGHT: f64 = 2.0;

/// Snapshot of local state pushed to `dashboard_data/{uid}` for the operator
/// dashboard to render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    /// When this snapshot was built.
    pub updated_at: DateTime<Utc>,
    /// Queue aggregate counts.
    pub stats: QueueStats,
    /// All pending-file records, curation state intact.
    pub queue: Vec<CandidateRecord>,
    /// The most recently posted records, newest first, capped at
    /// [`RECENT_POSTED_LIMIT`].
    pub recent_posted: Vec<CandidateRecord>,
    /// Raw contents of the most recent daily-output metrics files, capped at
    /// [`RECENT_METRICS_LIMIT`].
    pub metrics: Vec<Value>,
    /// The last PDCA Updater report, if one has run this process lifetime.
    pub pdca_insights: Option<PdcaAnalysis>,
    /// The current Preferences document.
    pub preferences: Preferences,
}

/// Outcome of processing one operation request.
#[derive(Debug, Clone)]
pub struct OperationResult {
    /// The command that ran.
    pub command: String,
    /// `true` if the subprocess exited with status 0.
    pub success: bool,
    /// Truncated stdout.
    pub stdout: String,
    /// Truncated stderr.
    pub stderr: String,
}

/// Thin client over Control-Plane Sync's three flows: pull, push, and
/// operation-request processing.
pub struct ControlPlaneSync {
    remote: RemoteStoreClient,
}

impl ControlPlaneSync {
    /// Wrap an already-built [`RemoteStoreClient`].
    pub fn new(remote: RemoteStoreClient) -> Self {
        Self { remote }
    }

    /// Apply every pending remote decision to `queue` under I3 semantics,
    /// acknowledging (deleting) each on success so it does not re-apply.
    /// Returns the number of decisions applied.
    pub async fn pull_decisions(&self, queue: &QueueStore) -> Result<usize, RemoteStoreError> {
        let decisions = self.remote.pull_decisions().await?;
        let mut applied = 0;
        for chunk in decisions.chunks(MAX_DECISION_BATCH) {
            for decision in chunk {
                apply_decision(queue, decision)?;
                self.remote.ack_decision(decision).await?;
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Pull `selection_preferences/{uid}` and merge it onto the local
    /// Preferences document, stamping `updated_by = "remote_sync"`.
    /// Returns `false` (and leaves the document untouched) if the remote
    /// document is absent or carries no mapped fields.
    pub async fn pull_preferences(&self, store: &PreferencesStore) -> Result<bool, RemoteStoreError> {
        self.pull_preferences_at(store, Utc::now()).await
    }

    /// [`Self::pull_preferences`] with an injected clock.
    pub async fn pull_preferences_at(
        &self,
        store: &PreferencesStore,
        now: DateTime<Utc>,
    ) -> Result<bool, RemoteStoreError> {
        let raw = self.remote.pull_preferences_raw().await?;
        if raw.is_empty() {
            return Ok(false);
        }
        let mut preferences = store.load()?;
        let changed = apply_remote_preferences(&mut preferences, &raw);
        if changed {
            preferences.touch_at("remote_sync", now);
            store.save(&preferences)?;
        }
        Ok(changed)
    }

    /// Build a [`DashboardSnapshot`] from local state and push it to
    /// `dashboard_data/{uid}`.
    pub async fn push_snapshot(
        &self,
        queue: &QueueStore,
        preferences: &Preferences,
        storage: &StorageConfig,
        pdca_insights: Option<PdcaAnalysis>,
    ) -> Result<(), RemoteStoreError> {
        self.push_snapshot_at(queue, preferences, storage, pdca_insights, Utc::now())
            .await
    }

    /// [`Self::push_snapshot`] with an injected clock.
    pub async fn push_snapshot_at(
        &self,
        queue: &QueueStore,
        preferences: &Preferences,
        storage: &StorageConfig,
        pdca_insights: Option<PdcaAnalysis>,
        now: DateTime<Utc>,
    ) -> Result<(), RemoteStoreError> {
        let snapshot = build_dashboard_snapshot(queue, preferences, storage, pdca_insights, now)?;
        self.remote.push_snapshot(&snapshot).await
    }

    /// Drain pending operation requests oldest-first, running each as a
    /// subprocess of the current executable. Returns one [`OperationResult`]
    /// per request processed.
    pub async fn process_operations(
        &self,
        extra_env: &HashMap<String, String>,
    ) -> Result<Vec<OperationResult>, RemoteStoreError> {
        let mut env = self.remote.load_api_keys().await?;
        env.extend(extra_env.clone());

        let requests = self.remote.pull_operation_requests().await?;
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            self.remote.mark_operation_running(&request.doc_name).await?;
            let outcome = run_operation(&request, &env).await;
            let status = if outcome.success { "completed" } else { "failed" };
            self.remote
                .complete_operation(&request.doc_name, status, &outcome.stdout, &outcome.stderr)
                .await?;
            results.push(outcome);
        }
        Ok(results)
    }
}

fn apply_decision(queue: &QueueStore, decision: &RemoteDecision) -> Result<(), RemoteStoreError> {
    match decision.action.as_str() {
        "approve" => queue.approve(&decision.tweet_id).map_err(RemoteStoreError::from),
        "skip" => queue
            .skip(&decision.tweet_id, decision.skip_reason.clone(), None)
            .map_err(RemoteStoreError::from),
        _ => Ok(()),
    }
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn str_field(raw: &HashMap<String, Value>, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

fn u64_field(raw: &HashMap<String, Value>, key: &str) -> Option<u64> {
    match raw.get(key) {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Map `selection_preferences/{uid}`'s flat fields onto `preferences`,
/// following §4.9's CSV-split/whitespace-trim and silent-skip-on-malformed
/// rules. Returns whether anything actually changed.
fn apply_remote_preferences(preferences: &mut Preferences, raw: &HashMap<String, Value>) -> bool {
    let mut changed = false;

    if let Some(directive) = str_field(raw, "weekly_directive") {
        if preferences.weekly_focus.directive != directive {
            preferences.weekly_focus.directive = directive;
            changed = true;
        }
    }
    if let Some(csv) = raw.get("focus_keywords").and_then(Value::as_str) {
        preferences.weekly_focus.focus_keywords = split_csv(csv);
        changed = true;
    }
    if let Some(csv) = raw.get("focus_accounts").and_then(Value::as_str) {
        preferences.weekly_focus.focus_accounts = split_csv(csv);
        changed = true;
    }
    if let Some(csv) = raw.get("preferred_topics").and_then(Value::as_str) {
        preferences.topic_preferences.preferred = split_csv(csv);
        changed = true;
    }
    if let Some(csv) = raw.get("avoid_topics").and_then(Value::as_str) {
        preferences.topic_preferences.avoid = split_csv(csv);
        changed = true;
    }
    if let Some(csv) = raw.get("boosted_accounts").and_then(Value::as_str) {
        preferences.account_overrides.boosted = split_csv(csv);
        changed = true;
    }
    if let Some(csv) = raw.get("blocked_accounts").and_then(Value::as_str) {
        preferences.account_overrides.blocked = split_csv(csv);
        changed = true;
    }
    if let Some(min_likes) = u64_field(raw, "min_likes") {
        preferences.threshold_overrides.min_likes = min_likes;
        changed = true;
    }
    if let Some(max_age_hours) = u64_field(raw, "max_age_hours") {
        preferences.threshold_overrides.max_age_hours = max_age_hours;
        changed = true;
    }
    if let Some(max_tweets) = u64_field(raw, "max_tweets") {
        preferences.threshold_overrides.max_tweets = max_tweets as u32;
        changed = true;
    }
    if let Some(csv) = raw.get("extra_keywords").and_then(Value::as_str) {
        for keyword in split_csv(csv) {
            preferences
                .keyword_weights
                .entry(keyword)
                .or_insert_with(|| {
                    changed = true;
                    DEFAULT_EXTRA_KEYWORD_WEIGHT
                });
        }
    }

    changed
}

fn build_dashboard_snapshot(
    queue: &QueueStore,
    preferences: &Preferences,
    storage: &StorageConfig,
    pdca_insights: Option<PdcaAnalysis>,
    now: DateTime<Utc>,
) -> Result<DashboardSnapshot, RemoteStoreError> {
    let stats = queue.stats_at(now)?;
    let queue_records = queue.list_pending()?;
    let recent_posted = queue.recent_posted(RECENT_POSTED_LIMIT)?;
    let metrics = recent_metrics(storage);
    Ok(DashboardSnapshot {
        updated_at: now,
        stats,
        queue: queue_records,
        recent_posted,
        metrics,
        pdca_insights,
        preferences: preferences.clone(),
    })
}

fn recent_metrics(storage: &StorageConfig) -> Vec<Value> {
    let dir = storage.data_dir.join("output").join("analysis");
    let mut names: Vec<String> = match std::fs::read_dir(&dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with("metrics_") && name.ends_with(".json"))
            .collect(),
        Err(_) => return Vec::new(),
    };
    names.sort();
    names.reverse();
    names.truncate(RECENT_METRICS_LIMIT);
    names
        .into_iter()
        .filter_map(|name| std::fs::read_to_string(dir.join(&name)).ok())
        .filter_map(|contents| serde_json::from_str(&contents).ok())
        .collect()
}

fn build_args(request: &OperationRequest) -> Vec<String> {
    let mut keys: Vec<&String> = request.args.keys().collect();
    keys.sort();
    let mut args = vec![request.command.clone()];
    for key in keys {
        let value = &request.args[key];
        args.push(format!("--{key}"));
        if !value.is_empty() {
            args.push(value.clone());
        }
    }
    args
}

fn operation_timeout(command: &str) -> Duration {
    if SMALL_OPERATIONS.contains(&command) {
        Duration::from_secs(SMALL_OPERATION_TIMEOUT_SECS)
    } else {
        Duration::from_secs(DEFAULT_OPERATION_TIMEOUT_SECS)
    }
}

async fn run_operation(request: &OperationRequest, env: &HashMap<String, String>) -> OperationResult {
    if !PERMITTED_OPERATIONS.contains(&request.command.as_str()) {
        return OperationResult {
            command: request.command.clone(),
            success: false,
            stdout: String::new(),
            stderr: format!("command '{}' is not permitted", request.command),
        };
    }

    let exe = match std::env::current_exe() {
        Ok(path) => path,
        Err(err) => {
            return OperationResult {
                command: request.command.clone(),
                success: false,
                stdout: String::new(),
                stderr: format!("could not resolve current executable: {err}"),
            }
        }
    };

    let args = build_args(request);
    let timeout = operation_timeout(&request.command);

    let mut cmd = tokio::process::Command::new(&exe);
    cmd.args(&args)
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            return OperationResult {
                command: request.command.clone(),
                success: false,
                stdout: String::new(),
                stderr: format!("failed to spawn subprocess: {err}"),
            }
        }
    };

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => OperationResult {
            command: request.command.clone(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        },
        Ok(Err(err)) => OperationResult {
            command: request.command.clone(),
            success: false,
            stdout: String::new(),
            stderr: format!("subprocess I/O error: {err}"),
        },
        Err(_) => OperationResult {
            command: request.command.clone(),
            success: false,
            stdout: String::new(),
            stderr: format!(
                "operation request '{}' timed out after {}s",
                request.command,
                timeout.as_secs()
            ),
        },
    }
}
