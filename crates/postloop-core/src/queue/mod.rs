//! The candidate queue state machine.
//!
//! Persistent ordered mapping (`tweet_id -> CandidateRecord`) split into two
//! physical JSON files: `pending` (not yet posted or skipped) and
//! `processed` (terminal `posted` records, retained for dedup and metrics).
//! All writes go through [`atomic_json`] so a reader never observes a
//! partially-written file.

pub mod atomic_json;
pub mod feedback;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::QueueError;
use crate::scoring::post_scorer::{PostType, ScoreResult};

pub use feedback::{FeedbackEntry, FeedbackLog};

/// Curation status of a [`CandidateRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    /// Freshly collected, awaiting curation.
    Pending,
    /// An operator or sync approved this candidate for generation/posting.
    Approved,
    /// An operator or sync skipped this candidate.
    Skipped,
    /// The candidate was published and moved to the processed archive.
    Posted,
}

impl std::fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Skipped => "skipped",
            Self::Posted => "posted",
        };
        write!(f, "{s}")
    }
}

/// One row of the queue: a candidate source post tracked end-to-end from
/// collection through curation, generation, and posting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Globally unique id on the source platform.
    pub tweet_id: String,
    /// Source author's handle.
    pub author_username: String,
    /// Source author's display name.
    pub author_name: String,
    /// Raw source text.
    pub text: String,
    /// BCP-47-ish language tag reported by the source, if any.
    pub lang: Option<String>,
    /// Like count at collection time.
    pub likes: u64,
    /// Retweet count at collection time.
    pub retweets: u64,
    /// Reply count at collection time.
    pub replies: u64,
    /// Quote count at collection time.
    pub quotes: u64,
    /// Bookmark count at collection time.
    pub bookmarks: u64,
    /// Canonical source-platform URL.
    pub source_url: String,
    /// Where this record came from (`manual`, `api`, ...).
    pub source: String,
    /// When this record was collected.
    pub collected_at: DateTime<Utc>,

    /// Curation status.
    pub status: CandidateStatus,
    /// When this record was added to the queue.
    pub added_at: DateTime<Utc>,
    /// Why the candidate was skipped, if it was.
    pub skip_reason: Option<String>,
    /// Free-text operator feedback.
    pub feedback_note: Option<String>,

    /// Preference Scorer output.
    pub preference_match_score: f64,
    /// Topic clusters matched by the scorer.
    pub matched_topics: Vec<String>,
    /// Keywords matched by the scorer.
    pub matched_keywords: Vec<String>,

    /// Text produced by the generation orchestrator, if any.
    pub generated_text: Option<String>,
    /// The template used to generate `generated_text`.
    pub template_id: Option<String>,
    /// Whether `generated_text` was produced as a quote-RT comment or
    /// standalone original; decides how `post`/`curate-post` publish it.
    #[serde(default)]
    pub post_type: PostType,
    /// The Post Scorer rubric for `generated_text`.
    pub score: Option<ScoreResult>,
    /// The id returned by the posting backend once published.
    pub posted_tweet_id: Option<String>,
    /// When the candidate was actually published.
    pub posted_at: Option<DateTime<Utc>>,
}

impl CandidateRecord {
    /// Whether this record satisfies invariant I5: eligible to be posted.
    pub fn is_postable(&self) -> bool {
        self.status == CandidateStatus::Approved
            && self
                .generated_text
                .as_ref()
                .is_some_and(|t| !t.is_empty())
    }
}

/// Aggregate counts returned by [`QueueStore::stats`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueStats {
    /// Candidates awaiting curation.
    pub pending: usize,
    /// Candidates approved but not yet posted.
    pub approved: usize,
    /// Candidates skipped.
    pub skipped: usize,
    /// Candidates posted, ever.
    pub posted_total: usize,
    /// Candidates posted so far today (local-day prefix of `posted_at`).
    pub posted_today: usize,
}

/// Persistent queue backed by two atomically-written JSON files.
pub struct QueueStore {
    pending_path: PathBuf,
    processed_path: PathBuf,
    feedback_log: FeedbackLog,
}

impl QueueStore {
    /// Open (without yet reading) a queue store rooted at `pending_path`
    /// and `processed_path`, with feedback appended to `feedback_path`.
    pub fn new(
        pending_path: impl Into<PathBuf>,
        processed_path: impl Into<PathBuf>,
        feedback_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            pending_path: pending_path.into(),
            processed_path: processed_path.into(),
            feedback_log: FeedbackLog::new(feedback_path),
        }
    }

    fn load_pending(&self) -> Result<HashMap<String, CandidateRecord>, QueueError> {
        atomic_json::load_or_default(&self.pending_path)
    }

    fn save_pending(&self, records: &HashMap<String, CandidateRecord>) -> Result<(), QueueError> {
        atomic_json::save(&self.pending_path, records)
    }

    fn load_processed(&self) -> Result<HashMap<String, CandidateRecord>, QueueError> {
        atomic_json::load_or_default(&self.processed_path)
    }

    fn save_processed(&self, records: &HashMap<String, CandidateRecord>) -> Result<(), QueueError> {
        atomic_json::save(&self.processed_path, records)
    }

    /// Insert a new candidate. Returns `Ok(false)` (not an error) if
    /// `tweet_id` already exists in pending or processed (I1).
    pub fn add(&self, record: CandidateRecord) -> Result<bool, QueueError> {
        let mut pending = self.load_pending()?;
        if pending.contains_key(&record.tweet_id) {
            return Ok(false);
        }
        let processed = self.load_processed()?;
        if processed.contains_key(&record.tweet_id) {
            return Ok(false);
        }
        pending.insert(record.tweet_id.clone(), record);
        self.save_pending(&pending)?;
        Ok(true)
    }

    fn require_pending<'a>(
        pending: &'a mut HashMap<String, CandidateRecord>,
        tweet_id: &str,
    ) -> Result<&'a mut CandidateRecord, QueueError> {
        pending.get_mut(tweet_id).ok_or_else(|| QueueError::NotFound {
            tweet_id: tweet_id.to_string(),
        })
    }

    /// Approve a pending or previously-skipped candidate (I3).
    pub fn approve(&self, tweet_id: &str) -> Result<(), QueueError> {
        let mut pending = self.load_pending()?;
        let record = Self::require_pending(&mut pending, tweet_id)?;
        if record.status == CandidateStatus::Posted {
            return Err(QueueError::InvalidTransition {
                tweet_id: tweet_id.to_string(),
                from: record.status.to_string(),
                to: CandidateStatus::Approved.to_string(),
            });
        }
        let was_approved_already = record.status == CandidateStatus::Approved;
        record.status = CandidateStatus::Approved;
        record.skip_reason = None;
        let snapshot = record.clone();
        self.save_pending(&pending)?;
        if !was_approved_already {
            self.feedback_log.record_decision(&snapshot, "approved")?;
        }
        Ok(())
    }

    /// Skip a pending or previously-approved candidate (I3).
    pub fn skip(
        &self,
        tweet_id: &str,
        reason: Option<String>,
        note: Option<String>,
    ) -> Result<(), QueueError> {
        let mut pending = self.load_pending()?;
        let record = Self::require_pending(&mut pending, tweet_id)?;
        if record.status == CandidateStatus::Posted {
            return Err(QueueError::InvalidTransition {
                tweet_id: tweet_id.to_string(),
                from: record.status.to_string(),
                to: CandidateStatus::Skipped.to_string(),
            });
        }
        record.status = CandidateStatus::Skipped;
        record.skip_reason = reason;
        record.feedback_note = note;
        let snapshot = record.clone();
        self.save_pending(&pending)?;
        self.feedback_log.record_decision(&snapshot, "skipped")?;
        Ok(())
    }

    /// Attach generated text, its post type, and its rubric score to a
    /// pending candidate.
    pub fn set_generated(
        &self,
        tweet_id: &str,
        text: String,
        template_id: String,
        post_type: PostType,
        score: ScoreResult,
    ) -> Result<(), QueueError> {
        let mut pending = self.load_pending()?;
        let record = Self::require_pending(&mut pending, tweet_id)?;
        record.generated_text = Some(text);
        record.template_id = Some(template_id);
        record.post_type = post_type;
        record.score = Some(score);
        self.save_pending(&pending)?;
        Ok(())
    }

    /// Mark a candidate posted, moving it from pending to processed (I2).
    pub fn mark_posted(&self, tweet_id: &str, posted_tweet_id: String) -> Result<(), QueueError> {
        self.mark_posted_at(tweet_id, posted_tweet_id, Utc::now())
    }

    /// [`QueueStore::mark_posted`] with an injected clock, for deterministic tests.
    pub fn mark_posted_at(
        &self,
        tweet_id: &str,
        posted_tweet_id: String,
        now: DateTime<Utc>,
    ) -> Result<(), QueueError> {
        let mut pending = self.load_pending()?;
        let mut record = pending
            .remove(tweet_id)
            .ok_or_else(|| QueueError::NotFound {
                tweet_id: tweet_id.to_string(),
            })?;
        if !record.is_postable() {
            pending.insert(tweet_id.to_string(), record);
            self.save_pending(&pending)?;
            return Err(QueueError::NotPostable {
                tweet_id: tweet_id.to_string(),
                reason: "status is not approved or generated_text is empty".to_string(),
            });
        }
        record.status = CandidateStatus::Posted;
        record.posted_tweet_id = Some(posted_tweet_id);
        record.posted_at = Some(now);

        self.save_pending(&pending)?;

        let mut processed = self.load_processed()?;
        processed.insert(record.tweet_id.clone(), record);
        self.save_processed(&processed)?;
        Ok(())
    }

    /// Aggregate counts by status.
    pub fn stats(&self) -> Result<QueueStats, QueueError> {
        self.stats_at(Utc::now())
    }

    /// [`QueueStore::stats`] with an injected clock.
    pub fn stats_at(&self, now: DateTime<Utc>) -> Result<QueueStats, QueueError> {
        let pending = self.load_pending()?;
        let processed = self.load_processed()?;
        let today = now.format("%Y-%m-%d").to_string();

        let mut stats = QueueStats {
            posted_total: processed.len(),
            ..Default::default()
        };
        for record in pending.values() {
            match record.status {
                CandidateStatus::Pending => stats.pending += 1,
                CandidateStatus::Approved => stats.approved += 1,
                CandidateStatus::Skipped => stats.skipped += 1,
                CandidateStatus::Posted => {}
            }
        }
        for record in processed.values() {
            if let Some(posted_at) = record.posted_at {
                if posted_at.format("%Y-%m-%d").to_string() == today {
                    stats.posted_today += 1;
                }
            }
        }
        Ok(stats)
    }

    /// All pending-file records regardless of curation status.
    pub fn list_pending(&self) -> Result<Vec<CandidateRecord>, QueueError> {
        Ok(self.load_pending()?.into_values().collect())
    }

    /// The `count` most-recently-posted processed records.
    pub fn recent_posted(&self, count: usize) -> Result<Vec<CandidateRecord>, QueueError> {
        let mut records: Vec<_> = self.load_processed()?.into_values().collect();
        records.sort_by_key(|r| std::cmp::Reverse(r.posted_at));
        records.truncate(count);
        Ok(records)
    }

    /// Remove processed records older than `days`.
    pub fn cleanup(&self, days: i64) -> Result<usize, QueueError> {
        self.cleanup_at(days, Utc::now())
    }

    /// [`QueueStore::cleanup`] with an injected clock.
    pub fn cleanup_at(&self, days: i64, now: DateTime<Utc>) -> Result<usize, QueueError> {
        let cutoff = now - chrono::Duration::days(days);
        let mut processed = self.load_processed()?;
        let before = processed.len();
        processed.retain(|_, r| r.posted_at.is_none_or(|p| p >= cutoff));
        let removed = before - processed.len();
        if removed > 0 {
            self.save_processed(&processed)?;
        }
        Ok(removed)
    }

    /// Path to the pending store file, for the Sheets Mirror and dashboard export.
    pub fn pending_path(&self) -> &Path {
        &self.pending_path
    }

    /// Access the feedback log shared by the Queue Store and PDCA Updater.
    pub fn feedback_log(&self) -> &FeedbackLog {
        &self.feedback_log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample(tweet_id: &str) -> CandidateRecord {
        CandidateRecord {
            tweet_id: tweet_id.to_string(),
            author_username: "alice".to_string(),
            author_name: "Alice".to_string(),
            text: "hello world".to_string(),
            lang: Some("en".to_string()),
            likes: 10,
            retweets: 2,
            replies: 1,
            quotes: 0,
            bookmarks: 0,
            source_url: format!("https://x.com/alice/status/{tweet_id}"),
            source: "manual".to_string(),
            collected_at: Utc::now(),
            status: CandidateStatus::Pending,
            added_at: Utc::now(),
            skip_reason: None,
            feedback_note: None,
            preference_match_score: 1.0,
            matched_topics: vec![],
            matched_keywords: vec![],
            generated_text: None,
            template_id: None,
            post_type: PostType::Original,
            score: None,
            posted_tweet_id: None,
            posted_at: None,
        }
    }

    fn store(dir: &tempfile::TempDir) -> QueueStore {
        QueueStore::new(
            dir.path().join("pending.json"),
            dir.path().join("processed.json"),
            dir.path().join("feedback.json"),
        )
    }

    #[test]
    fn add_rejects_duplicate() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        assert!(store.add(sample("1")).unwrap());
        assert!(!store.add(sample("1")).unwrap());
    }

    #[test]
    fn approve_then_skip_is_allowed() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        store.add(sample("1")).unwrap();
        store.approve("1").unwrap();
        store.skip("1", Some("off_topic".to_string()), None).unwrap();
        let pending = store.list_pending().unwrap();
        assert_eq!(pending[0].status, CandidateStatus::Skipped);
    }

    #[test]
    fn skip_then_approve_is_allowed() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        store.add(sample("1")).unwrap();
        store.skip("1", None, None).unwrap();
        store.approve("1").unwrap();
        let pending = store.list_pending().unwrap();
        assert_eq!(pending[0].status, CandidateStatus::Approved);
    }

    #[test]
    fn cannot_approve_posted_record() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        store.add(sample("1")).unwrap();
        store.approve("1").unwrap();
        store
            .set_generated(
                "1",
                "generated".to_string(),
                "tmpl".to_string(),
                PostType::Original,
                ScoreResult::default(),
            )
            .unwrap();
        store.mark_posted("1", "posted_1".to_string()).unwrap();
        assert!(store.approve("1").is_err());
    }

    #[test]
    fn mark_posted_requires_generated_text() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        store.add(sample("1")).unwrap();
        store.approve("1").unwrap();
        assert!(store.mark_posted("1", "x".to_string()).is_err());
    }

    #[test]
    fn mark_posted_moves_to_processed() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        store.add(sample("1")).unwrap();
        store.approve("1").unwrap();
        store
            .set_generated(
                "1",
                "generated".to_string(),
                "tmpl".to_string(),
                PostType::Original,
                ScoreResult::default(),
            )
            .unwrap();
        store.mark_posted("1", "posted_1".to_string()).unwrap();
        assert!(store.list_pending().unwrap().is_empty());
        let recent = store.recent_posted(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].posted_tweet_id.as_deref(), Some("posted_1"));
    }

    #[test]
    fn stats_counts_by_status() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        store.add(sample("1")).unwrap();
        store.add(sample("2")).unwrap();
        store.approve("1").unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.approved, 1);
    }

    #[test]
    fn feedback_log_records_each_curation_transition() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        store.add(sample("1")).unwrap();
        store.approve("1").unwrap();
        store.skip("1", Some("stale".to_string()), None).unwrap();
        let entries = store.feedback_log().load().unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn cleanup_removes_old_processed_records() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        store.add(sample("1")).unwrap();
        store.approve("1").unwrap();
        store
            .set_generated(
                "1",
                "g".to_string(),
                "t".to_string(),
                PostType::Original,
                ScoreResult::default(),
            )
            .unwrap();
        let old_time = Utc::now() - chrono::Duration::days(100);
        store
            .mark_posted_at("1", "p1".to_string(), old_time)
            .unwrap();
        let removed = store.cleanup(30).unwrap();
        assert_eq!(removed, 1);
        assert!(store.recent_posted(10).unwrap().is_empty());
    }
}
