//! Preference Scorer: blends engagement signal with operator-tunable
//! keyword weights, topic-cluster classification, and account overrides.

use crate::preferences::Preferences;

const KEYWORD_CONTRIBUTION_CAP: f64 = 2.0;
const PREFERRED_TOPIC_BONUS: f64 = 1.0;
const AVOIDED_TOPIC_PENALTY: f64 = 1.5;
const ACCOUNT_BOOST_MULTIPLIER: f64 = 1.5;
const FOCUS_BONUS: f64 = 0.5;
const BASE_SCORE: f64 = 1.0;
const MIN_CLUSTER_KEYWORD_MATCHES: usize = 2;
const SINGLE_KEYWORD_MIN_LEN: usize = 5;

/// Result of scoring one candidate's text/author against [`Preferences`].
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceScore {
    /// The final, clamped, rounded score.
    pub score: f64,
    /// Topic clusters classified as present in the text.
    pub matched_topics: Vec<String>,
    /// Preference keywords found in the text.
    pub matched_keywords: Vec<String>,
    /// Whether the author is in `account_overrides.blocked`.
    pub is_blocked: bool,
    /// Whether any focus keyword or focus account matched.
    pub is_focus_match: bool,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Does `topic`'s keyword cluster match `text_lower`?
///
/// A topic matches if at least [`MIN_CLUSTER_KEYWORD_MATCHES`] of its
/// keywords appear, or a single keyword of length >= [`SINGLE_KEYWORD_MIN_LEN`]
/// appears.
fn cluster_matches(text_lower: &str, keywords: &[String]) -> bool {
    let mut hits = 0usize;
    let mut long_hit = false;
    for kw in keywords {
        let kw_lower = kw.to_lowercase();
        if kw_lower.is_empty() {
            continue;
        }
        if text_lower.contains(&kw_lower) {
            hits += 1;
            if kw_lower.chars().count() >= SINGLE_KEYWORD_MIN_LEN {
                long_hit = true;
            }
        }
    }
    hits >= MIN_CLUSTER_KEYWORD_MATCHES || long_hit
}

/// Score `text` authored by `author` against the current [`Preferences`].
pub fn score_preference(text: &str, author: &str, preferences: &Preferences) -> PreferenceScore {
    let text_lower = text.to_lowercase();

    if preferences
        .account_overrides
        .blocked
        .iter()
        .any(|a| a.eq_ignore_ascii_case(author))
    {
        return PreferenceScore {
            score: 0.0,
            matched_topics: vec![],
            matched_keywords: vec![],
            is_blocked: true,
            is_focus_match: false,
        };
    }

    let mut score = BASE_SCORE;

    let mut matched_keywords = Vec::new();
    let mut keyword_sum = 0.0;
    for (kw, weight) in &preferences.keyword_weights {
        if kw.is_empty() {
            continue;
        }
        if text_lower.contains(&kw.to_lowercase()) {
            matched_keywords.push(kw.clone());
            keyword_sum += weight;
        }
    }
    score += keyword_sum.min(KEYWORD_CONTRIBUTION_CAP);

    let mut matched_topics = Vec::new();
    for (topic, keywords) in &preferences.topic_clusters {
        if cluster_matches(&text_lower, keywords) {
            matched_topics.push(topic.clone());
        }
    }

    for topic in &matched_topics {
        if preferences
            .topic_preferences
            .preferred
            .iter()
            .any(|t| t.eq_ignore_ascii_case(topic))
        {
            score += PREFERRED_TOPIC_BONUS;
        }
        if preferences
            .topic_preferences
            .avoid
            .iter()
            .any(|t| t.eq_ignore_ascii_case(topic))
        {
            score -= AVOIDED_TOPIC_PENALTY;
        }
    }

    if preferences
        .account_overrides
        .boosted
        .iter()
        .any(|a| a.eq_ignore_ascii_case(author))
    {
        score *= ACCOUNT_BOOST_MULTIPLIER;
    }

    let focus_keyword_hit = preferences
        .weekly_focus
        .focus_keywords
        .iter()
        .any(|kw| !kw.is_empty() && text_lower.contains(&kw.to_lowercase()));
    let focus_account_hit = preferences
        .weekly_focus
        .focus_accounts
        .iter()
        .any(|a| a.eq_ignore_ascii_case(author));

    if focus_keyword_hit {
        score += FOCUS_BONUS;
    }
    if focus_account_hit {
        score += FOCUS_BONUS;
    }

    score = score.max(0.0);

    PreferenceScore {
        score: round2(score),
        matched_topics,
        matched_keywords,
        is_blocked: false,
        is_focus_match: focus_keyword_hit || focus_account_hit,
    }
}

/// Ranking key used by upstream collectors: `(likes + 3*retweets) * max(score, 0.1)`.
pub fn blended_rank(likes: u64, retweets: u64, preference_score: f64) -> f64 {
    (likes as f64 + 3.0 * retweets as f64) * preference_score.max(0.1)
}
