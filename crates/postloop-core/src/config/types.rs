//! Configuration section types.
//!
//! Every field with a non-trivial default carries `#[serde(default = "…")]`
//! pointing at a standalone `fn default_xxx() -> T` in [`super::defaults`], so
//! a partial TOML file only needs to name the fields an operator actually
//! wants to override.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::safety::redact::mask_optional_secret;
use crate::scoring::post_scorer::PostType;

use super::defaults::*;

/// One managed target account.
#[derive(Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Numeric id addressed by `--account N` on the CLI.
    pub id: u32,
    /// The account's handle on the source platform.
    pub username: String,
    /// First day this account posted under the pipeline; drives the warm-up
    /// ramp. `None` disables warm-up caps entirely.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// OAuth1 consumer (API) key, shared by every account under one app.
    #[serde(default)]
    pub api_key: Option<String>,
    /// OAuth1 consumer (API) secret.
    #[serde(default)]
    pub api_secret: Option<String>,
    /// OAuth1 user-context access token for posting.
    #[serde(default)]
    pub access_token: Option<String>,
    /// OAuth1 user-context access token secret.
    #[serde(default)]
    pub access_token_secret: Option<String>,
    /// Bearer token for search/lookup calls.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("start_date", &self.start_date)
            .field("api_key", &mask_optional_secret(&self.api_key))
            .field("api_secret", &mask_optional_secret(&self.api_secret))
            .field("access_token", &mask_optional_secret(&self.access_token))
            .field(
                "access_token_secret",
                &mask_optional_secret(&self.access_token_secret),
            )
            .field("bearer_token", &mask_optional_secret(&self.bearer_token))
            .finish()
    }
}

/// One base publishing slot before jitter is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotConfig {
    /// Hour of day (0-23) before jitter.
    pub base_hour: u32,
    /// Minute of hour before jitter.
    pub base_minute: u32,
    /// Maximum minutes of jitter applied in either direction.
    #[serde(default = "default_jitter_minutes")]
    pub jitter_minutes: i64,
    /// Post types this slot may be assigned.
    #[serde(default = "default_type_pool")]
    pub type_pool: Vec<PostType>,
}

/// Per-warm-up-phase daily caps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WarmUpPhase {
    /// Maximum quote-RTs per day in this phase.
    pub max_quote_rt: u32,
    /// Maximum original posts per day in this phase.
    pub max_original: u32,
}

/// The multi-week warm-up ramp table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarmUpConfig {
    /// Account age 0-6 days.
    pub week_0: WarmUpPhase,
    /// Account age 7-13 days.
    pub week_1: WarmUpPhase,
    /// Account age 14-20 days.
    pub week_2: WarmUpPhase,
    /// Account age 21-27 days.
    pub week_3: WarmUpPhase,
    /// Account age 28+ days: no warm-up caps (set generously high).
    pub week_4_plus: WarmUpPhase,
}

/// Mix Planner configuration: slot roster, interval/consecutive rules, warm-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixPlannerConfig {
    /// Minimum target post count for a day, before warm-up clamping.
    #[serde(default = "default_daily_min")]
    pub daily_min: u32,
    /// Maximum target post count for a day, before warm-up clamping.
    #[serde(default = "default_daily_max")]
    pub daily_max: u32,
    /// Maximum fraction of a day's plan that may be quote-RTs.
    #[serde(default = "default_quote_rt_ratio_max")]
    pub quote_rt_ratio_max: f64,
    /// Maximum run length of consecutive quote-RT slots before an original
    /// is forced.
    #[serde(default = "default_max_consecutive_quotes")]
    pub max_consecutive_quotes: u32,
    /// Minimum minutes between two consecutive scheduled slots.
    #[serde(default = "default_min_interval_minutes")]
    pub min_interval_minutes: i64,
    /// Earliest hour a slot may be scheduled at, after jitter.
    #[serde(default = "default_window_start_hour")]
    pub window_start_hour: u32,
    /// Latest hour a slot may be scheduled at, after jitter.
    #[serde(default = "default_window_end_hour")]
    pub window_end_hour: u32,
    /// The fixed roster of base slots.
    #[serde(default = "default_slots")]
    pub slots: Vec<SlotConfig>,
    /// The warm-up phase table.
    #[serde(default = "default_warm_up")]
    pub warm_up: WarmUpConfig,
}

/// Safety Gate thresholds and NG-word categories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// NG-word category name to its member phrases (case-insensitive substring match).
    #[serde(default)]
    pub ng_word_categories: HashMap<String, Vec<String>>,
    /// Maximum hashtags allowed in a text.
    #[serde(default = "default_max_hashtags")]
    pub max_hashtags: u32,
    /// Maximum links allowed in an original post.
    #[serde(default = "default_max_links")]
    pub max_links: u32,
    /// LCS-similarity threshold above which a text is a near-duplicate.
    #[serde(default = "default_duplicate_threshold")]
    pub duplicate_threshold: f64,
    /// Minimum minutes since the last post.
    #[serde(default = "default_posting_interval_min_minutes")]
    pub posting_interval_min_minutes: i64,
    /// Consecutive quote-RT streak that triggers a warning (not a block).
    #[serde(default = "default_max_consecutive_quotes")]
    pub max_consecutive_quotes: u32,
    /// Patterns that identify a "translation only" quote-RT comment, banned
    /// under the quote-RT-only rules.
    #[serde(default = "default_translation_only_patterns")]
    pub translation_only_patterns: Vec<String>,
}

/// Template-rotation configuration for the Generation Orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Directory containing template files on disk.
    #[serde(default = "default_templates_dir")]
    pub dir: PathBuf,
    /// Maximum uses of a single template per day.
    #[serde(default = "default_max_daily_uses")]
    pub max_daily_uses: u32,
}

/// LLM provider configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name (`"anthropic"`, ...).
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    /// API key, if the provider needs one.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model identifier.
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Override base URL, for testing or self-hosted proxies.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("api_key", &mask_optional_secret(&self.api_key))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// A Google-hosted service-account credential, shared by the remote store
/// and the Sheets Mirror rather than loaded twice.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct GoogleCredentialConfig {
    /// Path to a service-account JSON key file on disk.
    #[serde(default)]
    pub credential_path: Option<String>,
    /// A base64-encoded service-account key, for environments where writing
    /// a file is inconvenient (e.g. a container secret).
    #[serde(default)]
    pub credential_blob: Option<String>,
}

impl std::fmt::Debug for GoogleCredentialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleCredentialConfig")
            .field("credential_path", &self.credential_path)
            .field("credential_blob", &mask_optional_secret(&self.credential_blob))
            .finish()
    }
}

/// Remote control-plane store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteStoreConfig {
    /// The document store's project id.
    #[serde(default)]
    pub project_id: Option<String>,
    /// The operator's user id within the store, if operating on behalf of one.
    #[serde(default)]
    pub uid: Option<String>,
    /// Shared service-account credential (see [`GoogleCredentialConfig`]).
    #[serde(default)]
    pub credential: GoogleCredentialConfig,
    /// Override base URL, for testing.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Sheets Mirror configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetsConfig {
    /// The target spreadsheet id.
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    /// Shared service-account credential (see [`GoogleCredentialConfig`]).
    #[serde(default)]
    pub credential: GoogleCredentialConfig,
}

/// Notifier webhook configuration.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// The webhook URL posts are delivered to. `None` disables notification
    /// silently.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl std::fmt::Debug for NotifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierConfig")
            .field("webhook_url", &mask_optional_secret(&self.webhook_url))
            .finish()
    }
}

/// On-disk layout of persisted state, rooted at `data_dir`/`config_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of mutable pipeline state (queue, feedback, persona, output).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Root of operator-editable configuration documents.
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,
    /// Days to retain processed/archived records before cleanup.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

impl StorageConfig {
    /// `data/queue/pending_tweets.json`.
    pub fn pending_queue_path(&self) -> PathBuf {
        self.data_dir.join("queue").join("pending_tweets.json")
    }

    /// `data/queue/processed_tweets.json`.
    pub fn processed_queue_path(&self) -> PathBuf {
        self.data_dir.join("queue").join("processed_tweets.json")
    }

    /// `data/feedback/selection_feedback.json`.
    pub fn feedback_path(&self) -> PathBuf {
        self.data_dir.join("feedback").join("selection_feedback.json")
    }

    /// `config/selection_preferences.json`.
    pub fn preferences_path(&self) -> PathBuf {
        self.config_dir.join("selection_preferences.json")
    }

    /// `data/persona/account_<id>_persona.json`.
    pub fn persona_path(&self, account_id: u32) -> PathBuf {
        self.data_dir
            .join("persona")
            .join(format!("account_{account_id}_persona.json"))
    }

    /// `data/persona/account_<id>_persona_prompt.md`.
    pub fn persona_prompt_path(&self, account_id: u32) -> PathBuf {
        self.data_dir
            .join("persona")
            .join(format!("account_{account_id}_persona_prompt.md"))
    }

    /// `data/output/daily/<date>_<account>.json`.
    pub fn daily_output_path(&self, date: NaiveDate, account_id: u32) -> PathBuf {
        self.data_dir
            .join("output")
            .join("daily")
            .join(format!("{date}_{account_id}.json"))
    }

    /// `data/output/analysis/metrics_<date>_<account>.json`.
    pub fn metrics_path(&self, date: NaiveDate, account_id: u32) -> PathBuf {
        self.data_dir
            .join("output")
            .join("analysis")
            .join(format!("metrics_{date}_{account_id}.json"))
    }
}

/// PDCA Updater thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdcaConfig {
    /// Minimum decisions in a bucket before it is eligible for adjustment.
    #[serde(default = "default_min_decisions_for_adjust")]
    pub min_decisions_for_adjust: u32,
    /// Approval rate above which a bucket is promoted.
    #[serde(default = "default_promote_threshold")]
    pub promote_threshold: f64,
    /// Approval rate below which a bucket is demoted.
    #[serde(default = "default_demote_threshold")]
    pub demote_threshold: f64,
    /// Maximum absolute change to a keyword weight in one cycle.
    #[serde(default = "default_max_weight_change")]
    pub max_weight_change: f64,
}

/// Logging configuration: the per-command default level, overridable by
/// `RUST_LOG` or CLI flags per the priority order in §4.14.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` level for dispatcher commands.
    #[serde(default = "default_log_level")]
    pub default_level: String,
    /// Default `tracing` level for the operation-request processor, kept
    /// quieter so cron logs aren't drowned.
    #[serde(default = "default_operation_processor_log_level")]
    pub operation_processor_level: String,
}
