//! Tweet Normalizer: maps two heterogeneous input shapes onto one
//! [`CandidateRecord`]-ready output — a manually pasted source URL, or a
//! best-effort field mapping across legacy/v2 search-API payload shapes.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;

use crate::error::NormalizeError;
use crate::queue::{CandidateRecord, CandidateStatus};

/// One of the two input shapes the Normalizer accepts.
pub enum CandidateSource {
    /// A manually pasted source-platform URL, with an optional operator memo.
    Url { url: String, memo: Option<String> },
    /// A raw search-API payload (legacy or v2 shape).
    Api(Value),
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^https?://(?:www\.|mobile\.)?(?:x\.com|twitter\.com|vxtwitter\.com|fxtwitter\.com)/([A-Za-z0-9_]+)/status(?:es)?/(\d+)",
        )
        .expect("tweet URL regex must compile")
    })
}

/// Is `url` a tweet URL the Normalizer can parse? A cheap pre-filter used by
/// collectors before spending a parse on something that's clearly not one.
pub fn is_tweet_url(url: &str) -> bool {
    url_re().is_match(url.trim())
}

/// Extract `(username, tweet_id)` from a supported tweet URL shape, ignoring
/// any query string or trailing path segments.
pub fn parse_tweet_url(url: &str) -> Result<(String, String), NormalizeError> {
    let trimmed = url.trim();
    url_re()
        .captures(trimmed)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .ok_or_else(|| NormalizeError::InvalidSource {
            url: trimmed.to_string(),
        })
}

/// Build a canonical `x.com` status URL from `(username, tweet_id)` — the
/// inverse of [`parse_tweet_url`], used by property 5's round-trip test.
pub fn build_url(username: &str, tweet_id: &str) -> String {
    format!("https://x.com/{username}/status/{tweet_id}")
}

fn str_field<'a>(payload: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| payload.get(k).and_then(Value::as_str))
}

fn num_field(payload: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|k| {
        payload.get(k).and_then(|v| {
            v.as_u64()
                .or_else(|| v.as_str().and_then(|s| s.parse::<u64>().ok()))
        })
    })
}

fn nested_str<'a>(payload: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut cur = payload;
    for key in path {
        cur = cur.get(key)?;
    }
    cur.as_str()
}

/// Best-effort platform-string timestamp parse; falls back to `now` if the
/// source didn't carry a `created_at` or it was in an unrecognized format.
fn parse_created_at(payload: &Value, now: DateTime<Utc>) -> DateTime<Utc> {
    payload
        .get("created_at")
        .and_then(Value::as_str)
        .and_then(|s| {
            DateTime::parse_from_str(s, "%a %b %d %H:%M:%S %z %Y")
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc)).ok())
        })
        .unwrap_or(now)
}

fn base_record(
    tweet_id: String,
    author_username: String,
    author_name: String,
    text: String,
    source_url: String,
    source: &str,
    now: DateTime<Utc>,
) -> CandidateRecord {
    CandidateRecord {
        tweet_id,
        author_username,
        author_name,
        text,
        lang: None,
        likes: 0,
        retweets: 0,
        replies: 0,
        quotes: 0,
        bookmarks: 0,
        source_url,
        source: source.to_string(),
        collected_at: now,
        status: CandidateStatus::Pending,
        added_at: now,
        skip_reason: None,
        feedback_note: None,
        preference_match_score: 0.0,
        matched_topics: Vec::new(),
        matched_keywords: Vec::new(),
        generated_text: None,
        template_id: None,
        post_type: Default::default(),
        score: None,
        posted_tweet_id: None,
        posted_at: None,
    }
}

/// Normalize a [`CandidateSource`] into a fresh, always-`pending` [`CandidateRecord`].
pub fn normalize(source: CandidateSource) -> Result<CandidateRecord, NormalizeError> {
    normalize_at(source, Utc::now())
}

/// [`normalize`] with an injected clock, for deterministic tests.
pub fn normalize_at(
    source: CandidateSource,
    now: DateTime<Utc>,
) -> Result<CandidateRecord, NormalizeError> {
    match source {
        CandidateSource::Url { url, memo } => {
            let (username, tweet_id) = parse_tweet_url(&url)?;
            let mut record = base_record(
                tweet_id,
                username,
                String::new(),
                String::new(),
                url,
                "manual",
                now,
            );
            record.feedback_note = memo;
            Ok(record)
        }
        CandidateSource::Api(payload) => {
            let tweet_id = str_field(&payload, &["id_str", "id"])
                .map(str::to_string)
                .or_else(|| payload.get("id").and_then(Value::as_u64).map(|n| n.to_string()))
                .ok_or_else(|| NormalizeError::MissingField {
                    field: "id".to_string(),
                })?;

            let text = str_field(&payload, &["full_text", "text"])
                .map(str::to_string)
                .ok_or_else(|| NormalizeError::MissingField {
                    field: "text".to_string(),
                })?;

            let author_username = nested_str(&payload, &["user", "screen_name"])
                .or_else(|| nested_str(&payload, &["user", "username"]))
                .or_else(|| nested_str(&payload, &["author", "username"]))
                .map(str::to_string)
                .unwrap_or_default();

            let author_name = nested_str(&payload, &["user", "name"])
                .or_else(|| nested_str(&payload, &["author", "name"]))
                .map(str::to_string)
                .unwrap_or_else(|| author_username.clone());

            let lang = str_field(&payload, &["lang"]).map(str::to_string);

            let likes = num_field(&payload, &["favorite_count"])
                .or_else(|| payload.pointer("/public_metrics/like_count").and_then(Value::as_u64))
                .unwrap_or(0);
            let retweets = num_field(&payload, &["retweet_count"])
                .or_else(|| payload.pointer("/public_metrics/retweet_count").and_then(Value::as_u64))
                .unwrap_or(0);
            let replies = payload
                .pointer("/public_metrics/reply_count")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            let quotes = payload
                .pointer("/public_metrics/quote_count")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            let bookmarks = payload
                .pointer("/public_metrics/bookmark_count")
                .and_then(Value::as_u64)
                .unwrap_or(0);

            let source_url = build_url(
                if author_username.is_empty() { "i" } else { &author_username },
                &tweet_id,
            );

            let collected_at = now;
            let mut record = base_record(
                tweet_id,
                author_username,
                author_name,
                text,
                source_url,
                "api",
                collected_at,
            );
            record.lang = lang;
            record.likes = likes;
            record.retweets = retweets;
            record.replies = replies;
            record.quotes = quotes;
            record.bookmarks = bookmarks;
            record.added_at = parse_created_at(&payload, now).max(now - chrono::Duration::days(3650)).min(now);
            record.collected_at = now;
            Ok(record)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn is_tweet_url_accepts_all_supported_domains() {
        for url in [
            "https://x.com/sama/status/12345",
            "https://twitter.com/sama/status/12345",
            "https://mobile.twitter.com/sama/status/12345",
            "https://vxtwitter.com/sama/status/12345",
            "https://fxtwitter.com/sama/status/12345",
        ] {
            assert!(is_tweet_url(url), "{url} should be recognized");
        }
    }

    #[test]
    fn is_tweet_url_rejects_unrelated_url() {
        assert!(!is_tweet_url("https://example.com/sama/status/12345"));
        assert!(!is_tweet_url("not a url"));
    }

    #[test]
    fn parse_tweet_url_extracts_username_and_id() {
        let (user, id) = parse_tweet_url("https://x.com/sama/status/12345").unwrap();
        assert_eq!(user, "sama");
        assert_eq!(id, "12345");
    }

    #[test]
    fn parse_tweet_url_strips_query_params() {
        let (user, id) =
            parse_tweet_url("https://x.com/sama/status/12345?s=20&t=abc").unwrap();
        assert_eq!(user, "sama");
        assert_eq!(id, "12345");
    }

    #[test]
    fn parse_tweet_url_rejects_invalid_url() {
        assert!(parse_tweet_url("https://example.com/not/a/tweet").is_err());
    }

    #[test]
    fn round_trip_build_then_parse() {
        for (user, id) in [("sama", "12345"), ("a_b_c", "98765432109")] {
            let url = build_url(user, id);
            let (parsed_user, parsed_id) = parse_tweet_url(&url).unwrap();
            assert_eq!(parsed_user, user);
            assert_eq!(parsed_id, id);
        }
    }

    #[test]
    fn normalize_url_source_produces_pending_record() {
        let record = normalize(CandidateSource::Url {
            url: "https://x.com/sama/status/12345".to_string(),
            memo: Some("interesting take".to_string()),
        })
        .unwrap();
        assert_eq!(record.tweet_id, "12345");
        assert_eq!(record.author_username, "sama");
        assert_eq!(record.source, "manual");
        assert_eq!(record.status, CandidateStatus::Pending);
        assert_eq!(record.feedback_note.as_deref(), Some("interesting take"));
    }

    #[test]
    fn normalize_invalid_url_fails() {
        let err = normalize(CandidateSource::Url {
            url: "not a url at all".to_string(),
            memo: None,
        })
        .unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidSource { .. }));
    }

    #[test]
    fn normalize_api_legacy_shape() {
        let payload = json!({
            "id_str": "555",
            "full_text": "hello world",
            "user": {"screen_name": "alice", "name": "Alice"},
            "favorite_count": 10,
            "retweet_count": 2,
            "lang": "en",
        });
        let record = normalize(CandidateSource::Api(payload)).unwrap();
        assert_eq!(record.tweet_id, "555");
        assert_eq!(record.author_username, "alice");
        assert_eq!(record.author_name, "Alice");
        assert_eq!(record.text, "hello world");
        assert_eq!(record.likes, 10);
        assert_eq!(record.retweets, 2);
        assert_eq!(record.lang.as_deref(), Some("en"));
        assert_eq!(record.source, "api");
    }

    #[test]
    fn normalize_api_v2_shape() {
        let payload = json!({
            "id": "777",
            "text": "v2 shape tweet",
            "author": {"username": "bob", "name": "Bob"},
            "public_metrics": {
                "like_count": 5,
                "retweet_count": 1,
                "reply_count": 2,
                "quote_count": 0,
                "bookmark_count": 3,
            },
        });
        let record = normalize(CandidateSource::Api(payload)).unwrap();
        assert_eq!(record.tweet_id, "777");
        assert_eq!(record.author_username, "bob");
        assert_eq!(record.likes, 5);
        assert_eq!(record.retweets, 1);
        assert_eq!(record.replies, 2);
        assert_eq!(record.bookmarks, 3);
    }

    #[test]
    fn normalize_api_missing_text_fails() {
        let payload = json!({"id": "1", "user": {"screen_name": "x"}});
        let err = normalize(CandidateSource::Api(payload)).unwrap_err();
        assert!(matches!(err, NormalizeError::MissingField { .. }));
    }

    #[test]
    fn normalize_always_carries_collected_at_and_pending_status() {
        let now = Utc::now();
        let record = normalize_at(
            CandidateSource::Url {
                url: "https://x.com/sama/status/1".to_string(),
                memo: None,
            },
            now,
        )
        .unwrap();
        assert_eq!(record.collected_at, now);
        assert_eq!(record.status, CandidateStatus::Pending);
    }
}
