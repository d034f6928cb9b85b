//! Append-only feedback log: one [`FeedbackEntry`] per curation decision,
//! plus aggregated counters used by the PDCA Updater.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::atomic_json;
use super::CandidateRecord;
use crate::error::QueueError;

/// One audited curation decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEntry {
    /// The candidate's tweet id.
    pub tweet_id: String,
    /// The candidate's source author.
    pub author_username: String,
    /// The decision made.
    pub decision: String,
    /// Skip reason, if the decision was a skip.
    pub skip_reason: Option<String>,
    /// Free-text operator note.
    pub feedback_note: Option<String>,
    /// The Preference Scorer's score at decision time.
    pub preference_match_score: f64,
    /// Topics matched at decision time.
    pub matched_topics: Vec<String>,
    /// Keywords matched at decision time.
    pub matched_keywords: Vec<String>,
    /// Like count at decision time.
    pub likes: u64,
    /// When the decision was recorded.
    pub decided_at: DateTime<Utc>,
}

/// Approval-rate counters bucketed by one dimension (source, keyword, or topic).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BucketCounts {
    /// Decisions counted toward this bucket.
    pub approved: u64,
    /// Decisions counted toward this bucket.
    pub skipped: u64,
}

impl BucketCounts {
    /// Total decisions in this bucket.
    pub fn total(&self) -> u64 {
        self.approved + self.skipped
    }

    /// Approval rate in `[0.0, 1.0]`; `0.0` for an empty bucket.
    pub fn approval_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.approved as f64 / total as f64
        }
    }
}

/// Aggregated counters persisted alongside the raw entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatedCounters {
    /// Counts by account username.
    pub by_source: HashMap<String, BucketCounts>,
    /// Counts by matched keyword.
    pub by_keyword: HashMap<String, BucketCounts>,
    /// Counts by matched topic.
    pub by_topic: HashMap<String, BucketCounts>,
    /// Skip-reason label to occurrence count.
    pub by_skip_reason: HashMap<String, u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FeedbackFile {
    entries: Vec<FeedbackEntry>,
    aggregates: AggregatedCounters,
}

/// The feedback log: append-only entries plus cached aggregates, all
/// persisted atomically to a single JSON file.
pub struct FeedbackLog {
    path: PathBuf,
}

impl FeedbackLog {
    /// Open a feedback log rooted at `path` (not read until first use).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load_file(&self) -> Result<FeedbackFile, QueueError> {
        atomic_json::load_or_default(&self.path)
    }

    fn save_file(&self, file: &FeedbackFile) -> Result<(), QueueError> {
        atomic_json::save(&self.path, file)
    }

    /// Append one entry derived from `record`'s curation state at `decision` time,
    /// updating aggregated counters in the same write (I4).
    pub fn record_decision(&self, record: &CandidateRecord, decision: &str) -> Result<(), QueueError> {
        self.record_decision_at(record, decision, Utc::now())
    }

    /// [`FeedbackLog::record_decision`] with an injected clock.
    pub fn record_decision_at(
        &self,
        record: &CandidateRecord,
        decision: &str,
        now: DateTime<Utc>,
    ) -> Result<(), QueueError> {
        let mut file = self.load_file()?;

        let entry = FeedbackEntry {
            tweet_id: record.tweet_id.clone(),
            author_username: record.author_username.clone(),
            decision: decision.to_string(),
            skip_reason: record.skip_reason.clone(),
            feedback_note: record.feedback_note.clone(),
            preference_match_score: record.preference_match_score,
            matched_topics: record.matched_topics.clone(),
            matched_keywords: record.matched_keywords.clone(),
            likes: record.likes,
            decided_at: now,
        };

        let is_approved = decision == "approved";
        let bump = |bucket: &mut BucketCounts| {
            if is_approved {
                bucket.approved += 1;
            } else {
                bucket.skipped += 1;
            }
        };

        bump(file.aggregates.by_source.entry(entry.author_username.clone()).or_default());
        for topic in &entry.matched_topics {
            bump(file.aggregates.by_topic.entry(topic.clone()).or_default());
        }
        for keyword in &entry.matched_keywords {
            bump(file.aggregates.by_keyword.entry(keyword.clone()).or_default());
        }
        if !is_approved {
            if let Some(reason) = &entry.skip_reason {
                *file.aggregates.by_skip_reason.entry(reason.clone()).or_default() += 1;
            }
        }

        file.entries.push(entry);
        self.save_file(&file)
    }

    /// All recorded entries, oldest first.
    pub fn load(&self) -> Result<Vec<FeedbackEntry>, QueueError> {
        Ok(self.load_file()?.entries)
    }

    /// The cached aggregated counters.
    pub fn aggregates(&self) -> Result<AggregatedCounters, QueueError> {
        Ok(self.load_file()?.aggregates)
    }

    /// Path to the underlying file, for the Sheets/dashboard export paths.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_record(topics: &[&str], keywords: &[&str]) -> CandidateRecord {
        CandidateRecord {
            tweet_id: "1".to_string(),
            author_username: "alice".to_string(),
            author_name: "Alice".to_string(),
            text: "hi".to_string(),
            lang: None,
            likes: 5,
            retweets: 0,
            replies: 0,
            quotes: 0,
            bookmarks: 0,
            source_url: "https://x.com/alice/status/1".to_string(),
            source: "manual".to_string(),
            collected_at: Utc::now(),
            status: super::super::CandidateStatus::Skipped,
            added_at: Utc::now(),
            skip_reason: Some("off_topic".to_string()),
            feedback_note: None,
            preference_match_score: 1.0,
            matched_topics: topics.iter().map(|s| s.to_string()).collect(),
            matched_keywords: keywords.iter().map(|s| s.to_string()).collect(),
            generated_text: None,
            template_id: None,
            post_type: crate::scoring::post_scorer::PostType::Original,
            score: None,
            posted_tweet_id: None,
            posted_at: None,
        }
    }

    #[test]
    fn aggregates_bucket_by_source_topic_keyword() {
        let dir = tempdir().unwrap();
        let log = FeedbackLog::new(dir.path().join("feedback.json"));
        let record = sample_record(&["ai"], &["rust"]);
        log.record_decision(&record, "skipped").unwrap();

        let aggregates = log.aggregates().unwrap();
        assert_eq!(aggregates.by_source["alice"].skipped, 1);
        assert_eq!(aggregates.by_topic["ai"].skipped, 1);
        assert_eq!(aggregates.by_keyword["rust"].skipped, 1);
        assert_eq!(aggregates.by_skip_reason["off_topic"], 1);
    }

    #[test]
    fn approval_rate_computed_correctly() {
        let mut bucket = BucketCounts::default();
        bucket.approved = 8;
        bucket.skipped = 2;
        assert!((bucket.approval_rate() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn entries_accumulate_in_order() {
        let dir = tempdir().unwrap();
        let log = FeedbackLog::new(dir.path().join("feedback.json"));
        log.record_decision(&sample_record(&[], &[]), "skipped").unwrap();
        log.record_decision(&sample_record(&[], &[]), "approved").unwrap();
        let entries = log.load().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].decision, "skipped");
        assert_eq!(entries[1].decision, "approved");
    }
}
