//! Safety Gate: the pre-publication validator every candidate text must
//! clear before it can be marked posted (invariant I5).
//!
//! One entry point, [`check`], combines NG-word filtering, length/hashtag/
//! link caps, near-duplicate detection, posting-interval enforcement, and
//! quote-RT-specific rules into a single `SafetyResult`.

pub mod dedup;
pub mod redact;

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::SafetyConfig;
use crate::scoring::post_scorer::PostType;

/// Extra context available only when the candidate is a quote-retweet.
#[derive(Debug, Clone, Default)]
pub struct QuoteRtContext {
    /// The URL or id of the quoted source post.
    pub source_url: String,
    /// Whether this source has already been used in a quote-RT today.
    pub same_source_used_today: bool,
    /// How many quote-RTs have been posted back-to-back, including this one.
    pub consecutive_quote_streak: u32,
}

/// Safety Gate output: `is_safe` plus human-readable violation/warning
/// strings, ready for direct inclusion in a retry hint or notifier message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SafetyResult {
    /// `false` if any hard violation fired.
    pub is_safe: bool,
    /// Hard blocks: reasons `is_safe` is `false`.
    pub violations: Vec<String>,
    /// Soft flags: do not block, but worth surfacing.
    pub warnings: Vec<String>,
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://\S+").expect("url regex must compile"))
}

fn hashtag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#\S+").expect("hashtag regex must compile"))
}

fn emoji_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[\u{1F300}-\u{1FAFF}\u{2600}-\u{27BF}]").expect("emoji regex must compile")
    })
}

const EXCESS_EMOJI_THRESHOLD: usize = 3;

/// Validate `text` against every Safety Gate rule.
///
/// `past_posts` should cover a reasonable recent-history window (the
/// orchestrator decides how far back); `last_post_minutes_ago` is `None`
/// when there is no prior post at all (nothing to space against).
pub fn check(
    text: &str,
    past_posts: &[String],
    last_post_minutes_ago: Option<i64>,
    is_quote_rt: bool,
    quote_rt_context: Option<&QuoteRtContext>,
    config: &SafetyConfig,
) -> SafetyResult {
    let mut violations = Vec::new();
    let mut warnings = Vec::new();

    let lower = text.to_lowercase();
    for (category, words) in &config.ng_word_categories {
        for word in words {
            if lower.contains(&word.to_lowercase()) {
                violations.push(format!("NG word '{word}' from category '{category}'"));
            }
        }
    }

    let post_type = if is_quote_rt {
        PostType::QuoteRt
    } else {
        PostType::Original
    };
    let (min_len, max_len) = post_type.length_band();
    let no_newlines: String = text.chars().filter(|c| *c != '\n' && *c != '\r').collect();
    let char_len = no_newlines.chars().count();
    if char_len < min_len || char_len > max_len {
        violations.push(format!(
            "length {char_len} outside [{min_len}, {max_len}] for {post_type:?}"
        ));
    }

    let hashtag_count = hashtag_re().find_iter(text).count();
    if hashtag_count > config.max_hashtags as usize {
        violations.push(format!(
            "hashtag count {hashtag_count} exceeds max_hashtags {}",
            config.max_hashtags
        ));
    }

    let link_count = url_re().find_iter(text).count();
    if !is_quote_rt && link_count > config.max_links as usize {
        violations.push(format!(
            "link count {link_count} exceeds max_links {}",
            config.max_links
        ));
    }
    if is_quote_rt && link_count > 0 {
        warnings.push(
            "URL present inside a quote-RT; the platform auto-appends the quoted link"
                .to_string(),
        );
    }

    if let Some((_, ratio)) =
        dedup::find_near_duplicate(text, past_posts, config.duplicate_threshold)
    {
        violations.push(format!(
            "near-duplicate of a prior post: similarity {ratio:.2} >= threshold {}",
            config.duplicate_threshold
        ));
    }

    if let Some(elapsed) = last_post_minutes_ago {
        if elapsed < config.posting_interval_min_minutes {
            violations.push(format!(
                "only {elapsed} minutes since the last post, below posting_interval_min_minutes {}",
                config.posting_interval_min_minutes
            ));
        }
    }

    if is_quote_rt {
        if let Some(ctx) = quote_rt_context {
            if ctx.same_source_used_today {
                violations.push(format!(
                    "source '{}' already used in a quote-RT today",
                    ctx.source_url
                ));
            }
            if ctx.consecutive_quote_streak >= config.max_consecutive_quotes {
                warnings.push(format!(
                    "consecutive quote-RT streak {} reached max_consecutive_quotes {}",
                    ctx.consecutive_quote_streak, config.max_consecutive_quotes
                ));
            }
        }
        for pattern in &config.translation_only_patterns {
            if text.contains(pattern.as_str()) {
                violations.push(format!(
                    "contains translation-only banned pattern '{pattern}'"
                ));
            }
        }
    }

    let emoji_count = emoji_re().find_iter(text).count();
    if emoji_count > EXCESS_EMOJI_THRESHOLD {
        warnings.push(format!("excess emoji: {emoji_count} found"));
    }

    SafetyResult {
        is_safe: violations.is_empty(),
        violations,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample_config() -> SafetyConfig {
        let mut ng_word_categories = HashMap::new();
        ng_word_categories.insert("spam".to_string(), vec!["今すぐ登録".to_string()]);
        SafetyConfig {
            ng_word_categories,
            max_hashtags: 3,
            max_links: 1,
            duplicate_threshold: 0.8,
            posting_interval_min_minutes: 45,
            max_consecutive_quotes: 2,
            translation_only_patterns: vec!["Translation:".to_string()],
        }
    }

    fn long_enough_original() -> String {
        "これは安全確認のための十分な長さを持つ独立した投稿本文です。最近のAI活用について書いています。".repeat(2)
    }

    #[test]
    fn ng_word_is_a_hard_violation() {
        let config = sample_config();
        let text = format!("{} 今すぐ登録してください。", long_enough_original());
        let result = check(&text, &[], Some(60), false, None, &config);
        assert!(!result.is_safe);
        assert!(result.violations.iter().any(|v| v.contains("NG word")));
    }

    #[test]
    fn too_short_original_is_a_violation() {
        let config = sample_config();
        let result = check("短い", &[], Some(60), false, None, &config);
        assert!(!result.is_safe);
        assert!(result.violations.iter().any(|v| v.contains("length")));
    }

    #[test]
    fn too_many_hashtags_is_a_violation() {
        let config = sample_config();
        let text = format!("{} #a #b #c #d", long_enough_original());
        let result = check(&text, &[], Some(60), false, None, &config);
        assert!(!result.is_safe);
        assert!(result.violations.iter().any(|v| v.contains("hashtag")));
    }

    #[test]
    fn original_with_too_many_links_is_a_violation() {
        let config = sample_config();
        let text = format!(
            "{} https://example.com/a https://example.com/b",
            long_enough_original()
        );
        let result = check(&text, &[], Some(60), false, None, &config);
        assert!(!result.is_safe);
        assert!(result.violations.iter().any(|v| v.contains("link count")));
    }

    #[test]
    fn quote_rt_link_is_a_warning_not_a_violation() {
        let config = sample_config();
        let text = format!(
            "{} https://example.com/a",
            "これは引用RTのコメント文です。十分な長さを満たす文章。".repeat(2)
        );
        let result = check(&text, &[], Some(60), true, None, &config);
        assert!(result.violations.iter().all(|v| !v.contains("link")));
        assert!(result.warnings.iter().any(|w| w.contains("URL present")));
    }

    #[test]
    fn exact_repeat_is_a_near_duplicate_violation() {
        let config = sample_config();
        let text = "AIで副業を自動化したら3時間の作業が30分になった。マジでやばい。";
        let past = vec![text.to_string()];
        let result = check(text, &past, Some(60), false, None, &config);
        assert!(!result.is_safe);
        assert!(result.violations.iter().any(|v| v.contains("similarity")));
    }

    #[test]
    fn quarter_changed_repeat_passes_near_duplicate_check() {
        let config = sample_config();
        let original = "AIで副業を自動化したら3時間の作業が30分になった。マジでやばい。";
        let mut chars: Vec<char> = original.chars().collect();
        let quarter = chars.len() / 4;
        for c in chars.iter_mut().take(quarter) {
            *c = '*';
        }
        let changed: String = chars.into_iter().collect();
        let past = vec![original.to_string()];
        let result = check(&changed, &past, Some(60), false, None, &config);
        assert!(result.violations.iter().all(|v| !v.contains("similarity")));
    }

    #[test]
    fn posting_interval_too_short_is_a_violation() {
        let config = sample_config();
        let result = check(&long_enough_original(), &[], Some(10), false, None, &config);
        assert!(!result.is_safe);
        assert!(result
            .violations
            .iter()
            .any(|v| v.contains("minutes since")));
    }

    #[test]
    fn no_prior_post_does_not_trigger_interval_check() {
        let config = sample_config();
        let result = check(&long_enough_original(), &[], None, false, None, &config);
        assert!(result.violations.iter().all(|v| !v.contains("minutes since")));
    }

    #[test]
    fn quote_rt_same_source_today_is_a_violation() {
        let config = sample_config();
        let ctx = QuoteRtContext {
            source_url: "https://x.com/source/1".to_string(),
            same_source_used_today: true,
            consecutive_quote_streak: 1,
        };
        let text = "これは引用RTのコメント文です。十分な長さを満たす文章。".repeat(2);
        let result = check(&text, &[], Some(60), true, Some(&ctx), &config);
        assert!(!result.is_safe);
        assert!(result.violations.iter().any(|v| v.contains("already used")));
    }

    #[test]
    fn consecutive_quote_streak_is_a_warning() {
        let config = sample_config();
        let ctx = QuoteRtContext {
            source_url: "https://x.com/source/2".to_string(),
            same_source_used_today: false,
            consecutive_quote_streak: 2,
        };
        let text = "これは引用RTのコメント文です。十分な長さを満たす文章。".repeat(2);
        let result = check(&text, &[], Some(60), true, Some(&ctx), &config);
        assert!(result.is_safe);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("consecutive quote-RT")));
    }

    #[test]
    fn translation_only_pattern_is_a_violation() {
        let config = sample_config();
        let text = format!(
            "Translation: {}",
            "これは引用RTのコメント文です。十分な長さを満たす文章。".repeat(2)
        );
        let result = check(&text, &[], Some(60), true, None, &config);
        assert!(!result.is_safe);
        assert!(result
            .violations
            .iter()
            .any(|v| v.contains("translation-only")));
    }

    #[test]
    fn clean_original_passes() {
        let config = sample_config();
        let result = check(&long_enough_original(), &[], Some(60), false, None, &config);
        assert!(result.is_safe, "violations: {:?}", result.violations);
        assert!(result.warnings.is_empty());
    }
}
