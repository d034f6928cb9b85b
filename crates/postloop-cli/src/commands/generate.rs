//! `postloop generate` — produce today's original posts.
//!
//! Picks approved, not-yet-generated candidates up to today's `DailyPlan`
//! original-slot count, runs each through the Generation Orchestrator with
//! `is_quote_rt = false`, and writes the result back onto the candidate.

use chrono::{Datelike, Timelike, Utc};
use postloop_core::mix_planner;
use postloop_core::orchestrator::{self, GenerationContext};
use postloop_core::queue::CandidateStatus;
use postloop_core::scoring::post_scorer::PostType;

use crate::commands::GenerateArgs;
use crate::deps::RuntimeDeps;

pub async fn execute(config: &postloop_core::config::Config, args: GenerateArgs) -> anyhow::Result<()> {
    let deps = RuntimeDeps::init(config)?;
    let account = config.account(args.account).map_err(|e| anyhow::anyhow!("{e}"))?;
    let now = Utc::now();
    let today = now.date_naive();

    let plan = mix_planner::build_plan(&config.mix_planner, account.start_date, today);
    let original_slots = plan.slots.len() - plan.quote_rt_count();

    let pending = deps.queue.list_pending()?;
    let candidates: Vec<_> = pending
        .into_iter()
        .filter(|c| c.status == CandidateStatus::Approved && c.generated_text.is_none())
        .take(original_slots)
        .collect();

    if candidates.is_empty() {
        tracing::info!(account = args.account, "no approved candidates to generate originals for");
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

    let preferences = deps.preferences.load()?;
    let register = orchestrator::register_for_hour(orchestrator::day_rotation(now.weekday()), now.hour());

    if args.dry_run {
        tracing::info!(count = candidates.len(), register, "dry-run: would generate these originals");
        for c in &candidates {
            println!("{}  {}", c.tweet_id, c.text);
        }
        return Ok(());
    }

    let orchestrator = RuntimeDeps::orchestrator(config)?;
    let mut generated = 0usize;
    for candidate in &candidates {
        let ctx = GenerationContext {
            candidate,
            persona: None,
            prompt_overrides: &preferences.prompt_overrides,
            safety_config: &config.safety,
            past_posts: &past_posts,
            last_post_minutes_ago,
            is_quote_rt: false,
            quote_rt_context: None,
            register: Some(register),
        };
        match orchestrator.generate(args.account, &ctx, now).await {
            Ok(outcome) => {
                deps.queue.set_generated(
                    &candidate.tweet_id,
                    outcome.text,
                    outcome.template_id,
                    PostType::Original,
                    outcome.score,
                )?;
                generated += 1;
            }
            Err(err) => {
                tracing::warn!(tweet_id = %candidate.tweet_id, %err, "original generation failed");
                deps.notifier
                    .send_text(format!("generate: failed for {}: {err}", candidate.tweet_id))
                    .await;
            }
        }
    }

    tracing::info!(generated, "generate complete");
    Ok(())
}
