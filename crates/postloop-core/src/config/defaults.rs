//! Default values for all configuration sections: one `fn default_xxx() -> T`
//! per non-trivial field, referenced by `#[serde(default = "…")]` in
//! [`super::types`], plus `Default` impls for the composite sections that
//! are meaningful with no operator input at all.

use std::path::PathBuf;

use crate::scoring::post_scorer::PostType;

use super::types::{
    LlmConfig, LoggingConfig, MixPlannerConfig, PdcaConfig, SafetyConfig, SlotConfig,
    StorageConfig, TemplatesConfig, WarmUpConfig, WarmUpPhase,
};

pub(super) fn default_jitter_minutes() -> i64 {
    15
}

pub(super) fn default_type_pool() -> Vec<PostType> {
    vec![PostType::Original, PostType::QuoteRt]
}

pub(super) fn default_daily_min() -> u32 {
    4
}

pub(super) fn default_daily_max() -> u32 {
    10
}

pub(super) fn default_quote_rt_ratio_max() -> f64 {
    0.7
}

pub(super) fn default_max_consecutive_quotes() -> u32 {
    2
}

pub(super) fn default_min_interval_minutes() -> i64 {
    60
}

pub(super) fn default_window_start_hour() -> u32 {
    6
}

pub(super) fn default_window_end_hour() -> u32 {
    23
}

/// The fixed roster of 10 base slots spanning the posting window, matching
/// the worked example in the S2 test scenario (minutes-of-day
/// `[420,510,615,720,855,960,1080,1185,1260,1350]`).
pub(super) fn default_slots() -> Vec<SlotConfig> {
    let bases: [(u32, u32); 10] = [
        (7, 0),
        (8, 30),
        (10, 15),
        (12, 0),
        (14, 15),
        (16, 0),
        (18, 0),
        (19, 45),
        (21, 0),
        (22, 30),
    ];
    bases
        .into_iter()
        .map(|(base_hour, base_minute)| SlotConfig {
            base_hour,
            base_minute,
            jitter_minutes: default_jitter_minutes(),
            type_pool: default_type_pool(),
        })
        .collect()
}

pub(super) fn default_warm_up() -> WarmUpConfig {
    WarmUpConfig {
        week_0: WarmUpPhase {
            max_quote_rt: 0,
            max_original: 3,
        },
        week_1: WarmUpPhase {
            max_quote_rt: 1,
            max_original: 4,
        },
        week_2: WarmUpPhase {
            max_quote_rt: 2,
            max_original: 5,
        },
        week_3: WarmUpPhase {
            max_quote_rt: 3,
            max_original: 6,
        },
        week_4_plus: WarmUpPhase {
            max_quote_rt: 100,
            max_original: 100,
        },
    }
}

impl Default for MixPlannerConfig {
    fn default() -> Self {
        Self {
            daily_min: default_daily_min(),
            daily_max: default_daily_max(),
            quote_rt_ratio_max: default_quote_rt_ratio_max(),
            max_consecutive_quotes: default_max_consecutive_quotes(),
            min_interval_minutes: default_min_interval_minutes(),
            window_start_hour: default_window_start_hour(),
            window_end_hour: default_window_end_hour(),
            slots: default_slots(),
            warm_up: default_warm_up(),
        }
    }
}

pub(super) fn default_max_hashtags() -> u32 {
    3
}

pub(super) fn default_max_links() -> u32 {
    1
}

pub(super) fn default_duplicate_threshold() -> f64 {
    0.8
}

pub(super) fn default_posting_interval_min_minutes() -> i64 {
    45
}

pub(super) fn default_translation_only_patterns() -> Vec<String> {
    vec!["Translation:".to_string(), "翻訳:".to_string(), "訳:".to_string()]
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            ng_word_categories: default_ng_word_categories(),
            max_hashtags: default_max_hashtags(),
            max_links: default_max_links(),
            duplicate_threshold: default_duplicate_threshold(),
            posting_interval_min_minutes: default_posting_interval_min_minutes(),
            max_consecutive_quotes: default_max_consecutive_quotes(),
            translation_only_patterns: default_translation_only_patterns(),
        }
    }
}

fn default_ng_word_categories() -> std::collections::HashMap<String, Vec<String>> {
    let mut categories = std::collections::HashMap::new();
    categories.insert(
        "violence".to_string(),
        vec!["死ね".to_string(), "殺す".to_string()],
    );
    categories.insert(
        "discrimination".to_string(),
        vec!["差別".to_string()],
    );
    categories.insert(
        "spam".to_string(),
        vec!["今すぐ登録".to_string(), "無料で稼げる".to_string()],
    );
    categories
}

pub(super) fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}

pub(super) fn default_max_daily_uses() -> u32 {
    3
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            dir: default_templates_dir(),
            max_daily_uses: default_max_daily_uses(),
        }
    }
}

pub(super) fn default_llm_provider() -> String {
    "anthropic".to_string()
}

pub(super) fn default_llm_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_key: None,
            model: default_llm_model(),
            base_url: None,
        }
    }
}

pub(super) fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

pub(super) fn default_config_dir() -> PathBuf {
    PathBuf::from("config")
}

pub(super) fn default_retention_days() -> i64 {
    90
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            config_dir: default_config_dir(),
            retention_days: default_retention_days(),
        }
    }
}

pub(super) fn default_min_decisions_for_adjust() -> u32 {
    10
}

pub(super) fn default_promote_threshold() -> f64 {
    0.80
}

pub(super) fn default_demote_threshold() -> f64 {
    0.30
}

pub(super) fn default_max_weight_change() -> f64 {
    0.5
}

impl Default for PdcaConfig {
    fn default() -> Self {
        Self {
            min_decisions_for_adjust: default_min_decisions_for_adjust(),
            promote_threshold: default_promote_threshold(),
            demote_threshold: default_demote_threshold(),
            max_weight_change: default_max_weight_change(),
        }
    }
}

pub(super) fn default_log_level() -> String {
    "info".to_string()
}

pub(super) fn default_operation_processor_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_level: default_log_level(),
            operation_processor_level: default_operation_processor_log_level(),
        }
    }
}
