//! Configuration management.
//!
//! Three-layer load, each layer overriding the previous:
//! 1. Built-in defaults (one `fn default_xxx() -> T` per non-trivial field).
//! 2. A TOML file at an operator-supplied or platform-default path. A
//!    missing file is not an error; a malformed one is (`ConfigError::ParseError`).
//! 3. Environment-variable overrides (`POSTLOOP__SECTION__FIELD`), applied
//!    last so operators can override any single field, secrets especially,
//!    without touching the file.
//!
//! [`Config::load_and_validate`] additionally checks cross-field
//! constraints and maps violations to `ConfigError::InvalidValue`.

mod defaults;
mod env_overrides;
mod types;
mod validation;

#[cfg(test)]
mod tests;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub use types::{
    AccountConfig, GoogleCredentialConfig, LlmConfig, LoggingConfig, MixPlannerConfig,
    NotifierConfig, PdcaConfig, RemoteStoreConfig, SafetyConfig, SheetsConfig, SlotConfig,
    StorageConfig, TemplatesConfig, WarmUpConfig, WarmUpPhase,
};

/// The fully-resolved configuration for one process invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Managed target accounts, addressed by `--account N`.
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
    /// Mix Planner slot roster, interval rules, and warm-up ramp.
    #[serde(default)]
    pub mix_planner: MixPlannerConfig,
    /// Safety Gate thresholds and NG-word categories.
    #[serde(default)]
    pub safety: SafetyConfig,
    /// Generation Orchestrator template configuration.
    #[serde(default)]
    pub templates: TemplatesConfig,
    /// LLM provider configuration.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Control-Plane Sync remote store configuration.
    #[serde(default)]
    pub remote_store: RemoteStoreConfig,
    /// Sheets Mirror configuration.
    #[serde(default)]
    pub sheets: SheetsConfig,
    /// Notifier webhook configuration.
    #[serde(default)]
    pub notifier: NotifierConfig,
    /// Persisted-state directory layout.
    #[serde(default)]
    pub storage: StorageConfig,
    /// PDCA Updater thresholds.
    #[serde(default)]
    pub pdca: PdcaConfig,
    /// Logging defaults.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            mix_planner: MixPlannerConfig::default(),
            safety: SafetyConfig::default(),
            templates: TemplatesConfig::default(),
            llm: LlmConfig::default(),
            remote_store: RemoteStoreConfig::default(),
            sheets: SheetsConfig::default(),
            notifier: NotifierConfig::default(),
            storage: StorageConfig::default(),
            pdca: PdcaConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load defaults, then overlay a TOML file at `path` (if present), then
    /// environment overrides. Does not validate cross-field constraints; see
    /// [`Config::load_and_validate`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = match fs::read_to_string(path) {
            Ok(contents) => {
                toml::from_str(&contents).map_err(|source| ConfigError::ParseError { source })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(_) => {
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            }
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// [`Config::load`] followed by [`Config::validate`].
    pub fn load_and_validate(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Look up an account by its `--account N` id.
    pub fn account(&self, id: u32) -> Result<&AccountConfig, ConfigError> {
        self.accounts
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| ConfigError::MissingField {
                field: format!("accounts[id={id}]"),
            })
    }
}
