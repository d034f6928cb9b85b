//! `postloop post` — publish eligible scheduled original posts.
//!
//! A candidate is eligible when it is `approved`, carries `generated_text`
//! from [`crate::commands::generate`] as an `original`, and today's
//! `DailyPlan` has a slot due right now. Re-checks the Safety Gate
//! immediately before publishing, per invariant 3.

use chrono::{Timelike, Utc};
use postloop_core::mix_planner;
use postloop_core::posting::PostRequest;
use postloop_core::queue::CandidateStatus;
use postloop_core::safety;
use postloop_core::scoring::post_scorer::PostType;

use crate::commands::PostArgs;
use crate::deps::RuntimeDeps;

const SLOT_TOLERANCE_MINUTES: i64 = 15;

pub async fn execute(config: &postloop_core::config::Config, args: PostArgs) -> anyhow::Result<()> {
    let deps = RuntimeDeps::init(config)?;
    let account = config.account(args.account).map_err(|e| anyhow::anyhow!("{e}"))?;
    let now = Utc::now();
    let today = now.date_naive();

    let plan = mix_planner::build_plan(&config.mix_planner, account.start_date, today);
    if plan
        .slot_for_now(now.hour(), now.minute(), SLOT_TOLERANCE_MINUTES)
        .is_none()
    {
        tracing::info!(account = args.account, "no slot due right now, skipping post");
        return Ok(());
    }

    let pending = deps.queue.list_pending()?;
    let Some(candidate) = pending.into_iter().find(|c| {
        c.status == CandidateStatus::Approved
            && c.post_type == PostType::Original
            && c.generated_text.is_some()
    }) else {
        tracing::info!(account = args.account, "no generated original ready to post");
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

    let safety_result = safety::check(&text, &past_posts, last_post_minutes_ago, false, None, &config.safety);
    if !safety_result.is_safe {
        tracing::warn!(tweet_id = %candidate.tweet_id, violations = ?safety_result.violations, "post blocked by safety gate");
        deps.notifier
            .send_text(format!(
                "post: blocked {} by safety gate: {}",
                candidate.tweet_id,
                safety_result.violations.join("; ")
            ))
            .await;
        return Ok(());
    }

    let posting = RuntimeDeps::posting_client(config, args.account)?;
    let request = PostRequest {
        text,
        quote_tweet_id: None,
        reply_to_tweet_id: None,
    };
    match posting.publish(&request).await {
        Ok(result) => {
            deps.queue.mark_posted(&candidate.tweet_id, result.tweet_id.clone())?;
            tracing::info!(tweet_id = %candidate.tweet_id, posted_tweet_id = %result.tweet_id, "posted original");
        }
        Err(err) => {
            tracing::warn!(tweet_id = %candidate.tweet_id, %err, "posting failed");
            deps.notifier
                .send_text(format!("post: failed for {}: {err}", candidate.tweet_id))
                .await;
            return Err(anyhow::anyhow!("posting failed: {err}"));
        }
    }

    Ok(())
}
