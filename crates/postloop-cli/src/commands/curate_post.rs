//! `postloop curate-post` — publish generated quote-RTs under today's cap.
//!
//! Mirrors [`crate::commands::post`] for `PostType::QuoteRt` candidates.
//! A "cannot quote this tweet" rejection falls back to a plain text+URL
//! post and retries once, per §4.11's posting failure semantics.

use chrono::{Timelike, Utc};
use postloop_core::error::PostingError;
use postloop_core::mix_planner;
use postloop_core::posting::{self, PostRequest};
use postloop_core::queue::CandidateStatus;
use postloop_core::safety::{self, QuoteRtContext};
use postloop_core::scoring::post_scorer::PostType;

use crate::commands::CuratePostArgs;
use crate::deps::RuntimeDeps;

const SLOT_TOLERANCE_MINUTES: i64 = 15;

pub async fn execute(
    config: &postloop_core::config::Config,
    args: CuratePostArgs,
) -> anyhow::Result<()> {
    let deps = RuntimeDeps::init(config)?;
    let account = config.account(args.account).map_err(|e| anyhow::anyhow!("{e}"))?;
    let now = Utc::now();
    let today = now.date_naive();

    let plan = mix_planner::build_plan(&config.mix_planner, account.start_date, today);
    if plan
        .slot_for_now(now.hour(), now.minute(), SLOT_TOLERANCE_MINUTES)
        .is_none()
    {
        tracing::info!(account = args.account, "no slot due right now, skipping curate-post");
        return Ok(());
    }

    let pending = deps.queue.list_pending()?;
    let Some(candidate) = pending.into_iter().find(|c| {
        c.status == CandidateStatus::Approved
            && c.post_type == PostType::QuoteRt
            && c.generated_text.is_some()
    }) else {
        tracing::info!(account = args.account, "no generated quote-RT ready to post");
        return Ok(());
    };

    let text = candidate.generated_text.clone().unwrap_or_default();
    let recent_posted = deps.queue.recent_posted(10)?;
    let past_posts: Vec<String> = recent_posted
        .iter()
        .filter_map(|r| r.generated_text.clone())
        .collect();
    let last_post_minutes_ago = recent_posted
        .first()
        .and_then(|r| r.posted_at)
        .map(|posted| (now - posted).num_minutes());
    let consecutive_quote_streak = recent_posted
        .iter()
        .take_while(|r| r.post_type == PostType::QuoteRt)
        .count() as u32;
    let quote_rt_context = QuoteRtContext {
        source_url: candidate.source_url.clone(),
        same_source_used_today: recent_posted
            .iter()
            .any(|r| r.author_username == candidate.author_username && r.post_type == PostType::QuoteRt),
        consecutive_quote_streak,
    };

    let safety_result = safety::check(
        &text,
        &past_posts,
        last_post_minutes_ago,
        true,
        Some(&quote_rt_context),
        &config.safety,
    );
    if !safety_result.is_safe {
        tracing::warn!(tweet_id = %candidate.tweet_id, violations = ?safety_result.violations, "curate-post blocked by safety gate");
        deps.notifier
            .send_text(format!(
                "curate-post: blocked {} by safety gate: {}",
                candidate.tweet_id,
                safety_result.violations.join("; ")
            ))
            .await;
        return Ok(());
    }

    let posting_client = RuntimeDeps::posting_client(config, args.account)?;
    let request = PostRequest {
        text,
        quote_tweet_id: Some(candidate.tweet_id.clone()),
        reply_to_tweet_id: None,
    };

    let result = match posting_client.publish(&request).await {
        Ok(result) => Ok(result),
        Err(PostingError::QuoteRejected { tweet_id, message }) => {
            tracing::warn!(%tweet_id, %message, "quote rejected, falling back to text+URL post");
            let fallback = posting::quote_fallback(&request, &candidate.source_url);
            posting_client.publish(&fallback).await
        }
        Err(err) => Err(err),
    };

    match result {
        Ok(result) => {
            deps.queue.mark_posted(&candidate.tweet_id, result.tweet_id.clone())?;
            tracing::info!(tweet_id = %candidate.tweet_id, posted_tweet_id = %result.tweet_id, "posted quote-RT");
        }
        Err(err) => {
            tracing::warn!(tweet_id = %candidate.tweet_id, %err, "curate-post failed");
            deps.notifier
                .send_text(format!("curate-post: failed for {}: {err}", candidate.tweet_id))
                .await;
            return Err(anyhow::anyhow!("curate-post failed: {err}"));
        }
    }

    Ok(())
}
