//! Cross-field configuration validation, invoked by [`Config::load_and_validate`].

use super::Config;
use crate::error::ConfigError;

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            message: format!("must be in [{min}, {max}], got {value}"),
        });
    }
    Ok(())
}

impl Config {
    /// Cross-field checks beyond what serde's per-field defaults/types catch:
    /// thresholds within their valid ranges, the warm-up phase table
    /// well-formed, and at most one LLM provider configured at a time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "safety.duplicate_threshold",
            self.safety.duplicate_threshold,
            0.0,
            1.0,
        )?;
        check_range("pdca.promote_threshold", self.pdca.promote_threshold, 0.0, 1.0)?;
        check_range("pdca.demote_threshold", self.pdca.demote_threshold, 0.0, 1.0)?;
        if self.pdca.demote_threshold >= self.pdca.promote_threshold {
            return Err(ConfigError::InvalidValue {
                field: "pdca.demote_threshold".to_string(),
                message: "must be strictly less than pdca.promote_threshold".to_string(),
            });
        }
        check_range(
            "mix_planner.quote_rt_ratio_max",
            self.mix_planner.quote_rt_ratio_max,
            0.0,
            1.0,
        )?;
        if self.mix_planner.daily_min > self.mix_planner.daily_max {
            return Err(ConfigError::InvalidValue {
                field: "mix_planner.daily_min".to_string(),
                message: format!(
                    "must be <= daily_max ({} > {})",
                    self.mix_planner.daily_min, self.mix_planner.daily_max
                ),
            });
        }
        if self.mix_planner.window_start_hour > 23 || self.mix_planner.window_end_hour > 23 {
            return Err(ConfigError::InvalidValue {
                field: "mix_planner.window_start_hour".to_string(),
                message: "hours must be in [0, 23]".to_string(),
            });
        }
        if self.mix_planner.window_start_hour >= self.mix_planner.window_end_hour {
            return Err(ConfigError::InvalidValue {
                field: "mix_planner.window_start_hour".to_string(),
                message: "must be strictly before window_end_hour".to_string(),
            });
        }
        if self.mix_planner.slots.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "mix_planner.slots".to_string(),
                message: "at least one slot is required".to_string(),
            });
        }
        for slot in &self.mix_planner.slots {
            if slot.base_hour > 23 || slot.base_minute > 59 {
                return Err(ConfigError::InvalidValue {
                    field: "mix_planner.slots[].base_hour".to_string(),
                    message: format!(
                        "invalid time of day {}:{}",
                        slot.base_hour, slot.base_minute
                    ),
                });
            }
            if slot.type_pool.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "mix_planner.slots[].type_pool".to_string(),
                    message: "must name at least one post type".to_string(),
                });
            }
        }

        for id in self.accounts.iter().map(|a| a.id) {
            if self.accounts.iter().filter(|a| a.id == id).count() > 1 {
                return Err(ConfigError::InvalidValue {
                    field: "accounts[].id".to_string(),
                    message: format!("duplicate account id {id}"),
                });
            }
        }

        if self.llm.provider.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "llm.provider".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn duplicate_threshold_out_of_range_is_rejected() {
        let mut config = Config::default();
        config.safety.duplicate_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn demote_threshold_must_be_below_promote_threshold() {
        let mut config = Config::default();
        config.pdca.demote_threshold = 0.9;
        config.pdca.promote_threshold = 0.8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn daily_min_above_daily_max_is_rejected() {
        let mut config = Config::default();
        config.mix_planner.daily_min = 20;
        assert!(config.validate().is_err());
    }

    #[test]
    fn duplicate_account_ids_are_rejected() {
        use super::super::AccountConfig;
        let mut config = Config::default();
        config.accounts.push(AccountConfig {
            id: 1,
            username: "a".to_string(),
            start_date: None,
            api_key: None,
            api_secret: None,
            access_token: None,
            access_token_secret: None,
            bearer_token: None,
        });
        config.accounts.push(AccountConfig {
            id: 1,
            username: "b".to_string(),
            start_date: None,
            api_key: None,
            api_secret: None,
            access_token: None,
            access_token_secret: None,
            bearer_token: None,
        });
        assert!(config.validate().is_err());
    }
}
