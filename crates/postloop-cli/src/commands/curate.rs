//! `postloop curate` — generate quote-RT comments for approved candidates.
//!
//! Mirrors [`crate::commands::generate`] but targets the quote-RT slots of
//! today's `DailyPlan` and supplies a [`QuoteRtContext`] built from recently
//! posted records.

use chrono::Utc;
use postloop_core::mix_planner;
use postloop_core::orchestrator::GenerationContext;
use postloop_core::queue::CandidateStatus;
use postloop_core::safety::QuoteRtContext;
use postloop_core::scoring::post_scorer::PostType;

use crate::commands::CurateArgs;
use crate::deps::RuntimeDeps;

pub async fn execute(config: &postloop_core::config::Config, args: CurateArgs) -> anyhow::Result<()> {
    let deps = RuntimeDeps::init(config)?;
    let account = config.account(args.account).map_err(|e| anyhow::anyhow!("{e}"))?;
    let now = Utc::now();
    let today = now.date_naive();

    let plan = mix_planner::build_plan(&config.mix_planner, account.start_date, today);
    let quote_slots = plan.quote_rt_count();

    let pending = deps.queue.list_pending()?;
    let candidates: Vec<_> = pending
        .into_iter()
        .filter(|c| c.status == CandidateStatus::Approved && c.generated_text.is_none())
        .take(quote_slots)
        .collect();

    if candidates.is_empty() {
        tracing::info!(account = args.account, "no approved candidates to curate quote-RTs for");
        return Ok(());
    }

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

    let preferences = deps.preferences.load()?;

    if args.dry_run {
        tracing::info!(count = candidates.len(), "dry-run: would curate these quote-RTs");
        for c in &candidates {
            println!("{}  {}", c.tweet_id, c.text);
        }
        return Ok(());
    }

    let orchestrator = RuntimeDeps::orchestrator(config)?;
    let mut generated = 0usize;
    for candidate in &candidates {
        let same_source_used_today = recent_posted
            .iter()
            .any(|r| r.author_username == candidate.author_username && r.post_type == PostType::QuoteRt);
        let quote_rt_context = QuoteRtContext {
            source_url: candidate.source_url.clone(),
            same_source_used_today,
            consecutive_quote_streak,
        };
        let ctx = GenerationContext {
            candidate,
            persona: None,
            prompt_overrides: &preferences.prompt_overrides,
            safety_config: &config.safety,
            past_posts: &past_posts,
            last_post_minutes_ago,
            is_quote_rt: true,
            quote_rt_context: Some(&quote_rt_context),
            register: None,
        };
        match orchestrator.generate(args.account, &ctx, now).await {
            Ok(outcome) => {
                deps.queue.set_generated(
                    &candidate.tweet_id,
                    outcome.text,
                    outcome.template_id,
                    PostType::QuoteRt,
                    outcome.score,
                )?;
                generated += 1;
            }
            Err(err) => {
                tracing::warn!(tweet_id = %candidate.tweet_id, %err, "quote-RT generation failed");
                deps.notifier
                    .send_text(format!("curate: failed for {}: {err}", candidate.tweet_id))
                    .await;
            }
        }
    }

    tracing::info!(generated, "curate complete");
    Ok(())
}
