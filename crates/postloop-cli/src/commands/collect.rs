//! `postloop collect` — pull fresh candidates from the search feed.
//!
//! Builds a [`SearchQuery`] from the weekly focus keywords and the
//! Preferences document's `threshold_overrides` (overridable by flags),
//! normalizes every payload, and adds the result to the Queue Store as
//! `pending` (or `approved` with `--auto-approve`).

use postloop_core::normalize::{self, CandidateSource};
use postloop_core::queue::CandidateStatus;
use postloop_core::search::SearchQuery;

use crate::commands::CollectArgs;
use crate::deps::RuntimeDeps;

pub async fn execute(config: &postloop_core::config::Config, args: CollectArgs) -> anyhow::Result<()> {
    let deps = RuntimeDeps::init(config)?;
    let preferences = deps.preferences.load()?;
    let thresholds = &preferences.threshold_overrides;

    let account = config
        .accounts
        .first()
        .ok_or_else(|| anyhow::anyhow!("no accounts configured"))?;
    let search = crate::deps::RuntimeDeps::search_client(config, account.id)?;

    let keywords = &preferences.weekly_focus.focus_keywords;
    let query_text = if keywords.is_empty() {
        "-is:retweet lang:en".to_string()
    } else {
        format!("({}) -is:retweet lang:en", keywords.join(" OR "))
    };

    let query = SearchQuery {
        query: query_text,
        max_tweets: args.max_tweets.unwrap_or(thresholds.max_tweets),
        min_likes: args.min_likes.unwrap_or(thresholds.min_likes),
    };

    let payloads = search.collect(&query).await?;
    tracing::info!(fetched = payloads.len(), "collect: fetched payloads");

    if args.dry_run {
        for payload in &payloads {
            println!("{payload}");
        }
        return Ok(());
    }

    let mut added = 0usize;
    let mut skipped = 0usize;
    for payload in payloads {
        let mut record = match normalize::normalize(CandidateSource::Api(payload)) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(%err, "collect: skipping unnormalizable payload");
                skipped += 1;
                continue;
            }
        };
        if args.auto_approve {
            record.status = CandidateStatus::Approved;
        }
        if deps.queue.add(record)? {
            added += 1;
        } else {
            skipped += 1;
        }
    }

    tracing::info!(added, skipped, "collect complete");
    Ok(())
}
