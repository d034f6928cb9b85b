//! The Preferences document: the versioned, mutable policy object that the
//! Preference Scorer, Generation Orchestrator, Control-Plane Sync, PDCA
//! Updater, and Sheets Mirror all read and write. Persisted atomically as
//! JSON via [`crate::queue::atomic_json`], distinct from the static
//! [`crate::config::Config`] loaded once at process start.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::QueueError;
use crate::queue::atomic_json;

/// `weekly_focus` section: a short-lived narrative directive plus the
/// keywords/accounts it should bias selection toward.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeeklyFocus {
    /// Free-text directive injected into generation prompts.
    #[serde(default)]
    pub directive: String,
    /// Keywords that earn the focus bonus.
    #[serde(default)]
    pub focus_keywords: Vec<String>,
    /// Accounts that earn the focus bonus.
    #[serde(default)]
    pub focus_accounts: Vec<String>,
}

/// `topic_preferences` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicPreferences {
    /// Topics that earn a positive score adjustment.
    #[serde(default)]
    pub preferred: Vec<String>,
    /// Topics that earn a negative score adjustment.
    #[serde(default)]
    pub avoid: Vec<String>,
}

/// `account_overrides` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountOverrides {
    /// Accounts whose score is multiplied by the boost factor.
    #[serde(default)]
    pub boosted: Vec<String>,
    /// Accounts short-circuited to a score of zero.
    #[serde(default)]
    pub blocked: Vec<String>,
}

/// `threshold_overrides` section: collection-time filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdOverrides {
    /// Minimum like count to collect a candidate.
    #[serde(default = "default_min_likes")]
    pub min_likes: u64,
    /// Maximum candidate age, in hours, to still be collectible.
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,
    /// Maximum candidates to collect per run.
    #[serde(default = "default_max_tweets")]
    pub max_tweets: u32,
}

fn default_min_likes() -> u64 {
    5
}
fn default_max_age_hours() -> u64 {
    48
}
fn default_max_tweets() -> u32 {
    50
}

impl Default for ThresholdOverrides {
    fn default() -> Self {
        Self {
            min_likes: default_min_likes(),
            max_age_hours: default_max_age_hours(),
            max_tweets: default_max_tweets(),
        }
    }
}

/// `prompt_overrides` section: persona/style knobs injected into generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptOverrides {
    /// Display name the persona refers to itself as.
    #[serde(default)]
    pub persona_name: Option<String>,
    /// First-person pronoun the persona uses.
    #[serde(default)]
    pub first_person: Option<String>,
    /// The persona's stated position/stance.
    #[serde(default)]
    pub position: Option<String>,
    /// What differentiates the persona from competitors.
    #[serde(default)]
    pub differentiator: Option<String>,
    /// Desired tone descriptor.
    #[serde(default)]
    pub tone: Option<String>,
    /// Free-form style pattern notes.
    #[serde(default)]
    pub style_patterns: Vec<String>,
    /// Extra NG-words layered on top of the configured categories.
    #[serde(default)]
    pub ng_words: Vec<String>,
    /// Free-text directive appended verbatim before the output instruction.
    #[serde(default)]
    pub custom_directive: Option<String>,
    /// Template ids enabled for selection; empty means all templates.
    #[serde(default)]
    pub enabled_templates: Vec<String>,
}

/// `sheets` section: Sheets Mirror connection details.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetsSettings {
    /// The target spreadsheet id.
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    /// Path to the service-account credential file.
    #[serde(default)]
    pub credential_path: Option<String>,
}

/// The full versioned policy document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    /// Weekly narrative focus.
    #[serde(default)]
    pub weekly_focus: WeeklyFocus,
    /// Topic preference/avoidance sets.
    #[serde(default)]
    pub topic_preferences: TopicPreferences,
    /// Account-level boost/block overrides.
    #[serde(default)]
    pub account_overrides: AccountOverrides,
    /// Per-keyword weight used by the Preference Scorer.
    #[serde(default)]
    pub keyword_weights: HashMap<String, f64>,
    /// Topic name to its defining keyword list.
    #[serde(default)]
    pub topic_clusters: HashMap<String, Vec<String>>,
    /// Collection-time thresholds.
    #[serde(default)]
    pub threshold_overrides: ThresholdOverrides,
    /// Generation-time persona/style overrides.
    #[serde(default)]
    pub prompt_overrides: PromptOverrides,
    /// Sheets Mirror connection settings.
    #[serde(default)]
    pub sheets: SheetsSettings,
    /// Monotonically increasing document version, bumped on every write.
    #[serde(default)]
    pub version: u64,
    /// When this document was last written.
    pub updated_at: DateTime<Utc>,
    /// Who/what last wrote this document (`"operator"`, `"remote_sync"`, `"auto_pdca"`, ...).
    #[serde(default)]
    pub updated_by: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            weekly_focus: WeeklyFocus::default(),
            topic_preferences: TopicPreferences::default(),
            account_overrides: AccountOverrides::default(),
            keyword_weights: HashMap::new(),
            topic_clusters: HashMap::new(),
            threshold_overrides: ThresholdOverrides::default(),
            prompt_overrides: PromptOverrides::default(),
            sheets: SheetsSettings::default(),
            version: 0,
            updated_at: Utc::now(),
            updated_by: "default".to_string(),
        }
    }
}

impl Preferences {
    /// Bump `version` and stamp `updated_at`/`updated_by`.
    pub fn touch(&mut self, updated_by: &str) {
        self.touch_at(updated_by, Utc::now());
    }

    /// [`Preferences::touch`] with an injected clock.
    pub fn touch_at(&mut self, updated_by: &str, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
        self.updated_by = updated_by.to_string();
    }
}

/// Atomic-JSON-backed store for the single Preferences document.
pub struct PreferencesStore {
    path: PathBuf,
}

impl PreferencesStore {
    /// Open a preferences store rooted at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the current document, or a freshly-defaulted one if absent/corrupt.
    pub fn load(&self) -> Result<Preferences, QueueError> {
        atomic_json::load_or_default(&self.path)
    }

    /// Persist `preferences` atomically.
    pub fn save(&self, preferences: &Preferences) -> Result<(), QueueError> {
        atomic_json::save(&self.path, preferences)
    }

    /// Path to the underlying file, for Sheets/dashboard export.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
