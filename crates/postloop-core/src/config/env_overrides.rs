//! Environment variable overrides for configuration.
//!
//! Variables use the `POSTLOOP_` prefix with double underscores separating
//! nested keys, e.g. `POSTLOOP_LLM__API_KEY`. Applied after file load so an
//! operator can override any single field, secrets especially, without
//! touching the TOML file.

use std::env;

use super::Config;
use crate::error::ConfigError;

impl Config {
    pub(super) fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = env::var("POSTLOOP_LLM__PROVIDER") {
            self.llm.provider = val;
        }
        if let Ok(val) = env::var("POSTLOOP_LLM__API_KEY") {
            self.llm.api_key = Some(val);
        }
        if let Ok(val) = env::var("POSTLOOP_LLM__MODEL") {
            self.llm.model = val;
        }
        if let Ok(val) = env::var("POSTLOOP_LLM__BASE_URL") {
            self.llm.base_url = Some(val);
        }

        if let Ok(val) = env::var("POSTLOOP_NOTIFIER__WEBHOOK_URL") {
            self.notifier.webhook_url = Some(val);
        }

        if let Ok(val) = env::var("POSTLOOP_REMOTE_STORE__PROJECT_ID") {
            self.remote_store.project_id = Some(val);
        }
        if let Ok(val) = env::var("POSTLOOP_REMOTE_STORE__UID") {
            self.remote_store.uid = Some(val);
        }
        if let Ok(val) = env::var("POSTLOOP_REMOTE_STORE__CREDENTIAL_PATH") {
            self.remote_store.credential.credential_path = Some(val);
        }
        if let Ok(val) = env::var("POSTLOOP_REMOTE_STORE__CREDENTIAL_BLOB") {
            self.remote_store.credential.credential_blob = Some(val);
        }
        if let Ok(val) = env::var("POSTLOOP_REMOTE_STORE__BASE_URL") {
            self.remote_store.base_url = Some(val);
        }

        if let Ok(val) = env::var("POSTLOOP_SHEETS__SPREADSHEET_ID") {
            self.sheets.spreadsheet_id = Some(val);
        }
        // Sheets and the remote store share one credential shape; allow
        // either prefix to set it, but default-populate sheets from the
        // remote store's credential when only the latter is set.
        if let Ok(val) = env::var("POSTLOOP_SHEETS__CREDENTIAL_PATH") {
            self.sheets.credential.credential_path = Some(val);
        } else if self.sheets.credential.credential_path.is_none() {
            self.sheets.credential.credential_path =
                self.remote_store.credential.credential_path.clone();
        }
        if let Ok(val) = env::var("POSTLOOP_SHEETS__CREDENTIAL_BLOB") {
            self.sheets.credential.credential_blob = Some(val);
        }

        if let Ok(val) = env::var("POSTLOOP_STORAGE__DATA_DIR") {
            self.storage.data_dir = val.into();
        }
        if let Ok(val) = env::var("POSTLOOP_STORAGE__CONFIG_DIR") {
            self.storage.config_dir = val.into();
        }
        if let Ok(val) = env::var("POSTLOOP_STORAGE__RETENTION_DAYS") {
            self.storage.retention_days = parse_env("POSTLOOP_STORAGE__RETENTION_DAYS", &val)?;
        }

        if let Ok(val) = env::var("POSTLOOP_SAFETY__DUPLICATE_THRESHOLD") {
            self.safety.duplicate_threshold =
                parse_env("POSTLOOP_SAFETY__DUPLICATE_THRESHOLD", &val)?;
        }
        if let Ok(val) = env::var("POSTLOOP_SAFETY__POSTING_INTERVAL_MIN_MINUTES") {
            self.safety.posting_interval_min_minutes =
                parse_env("POSTLOOP_SAFETY__POSTING_INTERVAL_MIN_MINUTES", &val)?;
        }
        if let Ok(val) = env::var("POSTLOOP_SAFETY__MAX_HASHTAGS") {
            self.safety.max_hashtags = parse_env("POSTLOOP_SAFETY__MAX_HASHTAGS", &val)?;
        }
        if let Ok(val) = env::var("POSTLOOP_SAFETY__MAX_LINKS") {
            self.safety.max_links = parse_env("POSTLOOP_SAFETY__MAX_LINKS", &val)?;
        }

        if let Ok(val) = env::var("POSTLOOP_TEMPLATES__DIR") {
            self.templates.dir = val.into();
        }
        if let Ok(val) = env::var("POSTLOOP_TEMPLATES__MAX_DAILY_USES") {
            self.templates.max_daily_uses = parse_env("POSTLOOP_TEMPLATES__MAX_DAILY_USES", &val)?;
        }

        if let Ok(val) = env::var("POSTLOOP_PDCA__MIN_DECISIONS_FOR_ADJUST") {
            self.pdca.min_decisions_for_adjust =
                parse_env("POSTLOOP_PDCA__MIN_DECISIONS_FOR_ADJUST", &val)?;
        }
        if let Ok(val) = env::var("POSTLOOP_PDCA__PROMOTE_THRESHOLD") {
            self.pdca.promote_threshold = parse_env("POSTLOOP_PDCA__PROMOTE_THRESHOLD", &val)?;
        }
        if let Ok(val) = env::var("POSTLOOP_PDCA__DEMOTE_THRESHOLD") {
            self.pdca.demote_threshold = parse_env("POSTLOOP_PDCA__DEMOTE_THRESHOLD", &val)?;
        }
        if let Ok(val) = env::var("POSTLOOP_PDCA__MAX_WEIGHT_CHANGE") {
            self.pdca.max_weight_change = parse_env("POSTLOOP_PDCA__MAX_WEIGHT_CHANGE", &val)?;
        }

        if let Ok(val) = env::var("POSTLOOP_LOGGING__DEFAULT_LEVEL") {
            self.logging.default_level = val;
        }
        if let Ok(val) = env::var("POSTLOOP_LOGGING__OPERATION_PROCESSOR_LEVEL") {
            self.logging.operation_processor_level = val;
        }

        // Per-account credential overrides for a single-account deployment,
        // the common case: `POSTLOOP_ACCOUNT__ACCESS_TOKEN` etc. apply to
        // `accounts[0]` if present.
        if let Some(first) = self.accounts.first_mut() {
            if let Ok(val) = env::var("POSTLOOP_ACCOUNT__API_KEY") {
                first.api_key = Some(val);
            }
            if let Ok(val) = env::var("POSTLOOP_ACCOUNT__API_SECRET") {
                first.api_secret = Some(val);
            }
            if let Ok(val) = env::var("POSTLOOP_ACCOUNT__ACCESS_TOKEN") {
                first.access_token = Some(val);
            }
            if let Ok(val) = env::var("POSTLOOP_ACCOUNT__ACCESS_TOKEN_SECRET") {
                first.access_token_secret = Some(val);
            }
            if let Ok(val) = env::var("POSTLOOP_ACCOUNT__BEARER_TOKEN") {
                first.bearer_token = Some(val);
            }
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(var_name: &str, val: &str) -> Result<T, ConfigError> {
    val.parse::<T>().map_err(|_| ConfigError::InvalidValue {
        field: var_name.to_string(),
        message: format!("'{val}' is not a valid value for {var_name}"),
    })
}
