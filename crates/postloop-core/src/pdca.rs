//! PDCA Updater: turns the Queue Store's aggregated feedback counters into
//! automatic adjustments to the Preferences document — promoting sources,
//! keywords, and topics the operator keeps approving, demoting the ones they
//! keep skipping.
//!
//! Named for the Plan-Do-Check-Act cycle it closes: curation decisions are
//! the "check", this module is the "act".

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::PdcaConfig;
use crate::preferences::Preferences;
use crate::queue::feedback::{AggregatedCounters, BucketCounts};

const PROMOTE_WEIGHT_STEP: f64 = 0.3;
const DEMOTE_WEIGHT_STEP: f64 = 0.2;
const MIN_KEYWORD_WEIGHT: f64 = 0.0;
const MAX_KEYWORD_WEIGHT: f64 = 3.0;
const DEFAULT_KEYWORD_WEIGHT: f64 = 1.0;
const TOP_SKIP_REASONS: usize = 5;

/// One bucket's promote/demote verdict, carried in [`PdcaAnalysis`] and used
/// to build the human-readable report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketVerdict {
    /// The bucket key (a source username, a keyword, or a topic name).
    pub key: String,
    /// Decisions counted toward this bucket.
    pub total: u64,
    /// `approved / total`.
    pub approval_rate: f64,
}

/// Machine-readable summary of one PDCA cycle, carried verbatim in the
/// dashboard snapshot's `pdca_insights` field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdcaAnalysis {
    /// Total decisions considered this cycle, across all buckets.
    pub total_decisions: u64,
    /// Overall approval rate across all decisions.
    pub approval_rate: f64,
    /// Sources promoted this cycle.
    pub source_promotions: Vec<BucketVerdict>,
    /// Sources demoted this cycle.
    pub source_demotions: Vec<BucketVerdict>,
    /// Keywords promoted this cycle.
    pub keyword_promotions: Vec<BucketVerdict>,
    /// Keywords demoted this cycle.
    pub keyword_demotions: Vec<BucketVerdict>,
    /// Topics promoted this cycle.
    pub topic_promotions: Vec<BucketVerdict>,
    /// Topics demoted this cycle.
    pub topic_demotions: Vec<BucketVerdict>,
    /// Skip-reason labels, most frequent first, capped at
    /// [`TOP_SKIP_REASONS`].
    pub top_skip_reasons: Vec<(String, u64)>,
}

/// Result of one [`run`] invocation.
pub struct PdcaOutcome {
    /// The machine-readable summary.
    pub analysis: PdcaAnalysis,
    /// A human-readable report suitable for the notifier.
    pub report: String,
    /// Whether [`Preferences`] was actually modified (always `false` in
    /// `dry_run` mode, or when the cycle was a no-op for lack of data).
    pub applied: bool,
}

fn bucket_verdicts(buckets: &HashMap<String, BucketCounts>, min_decisions: u32) -> Vec<BucketVerdict> {
    let mut verdicts: Vec<BucketVerdict> = buckets
        .iter()
        .filter(|(_, counts)| counts.total() >= min_decisions as u64)
        .map(|(key, counts)| BucketVerdict {
            key: key.clone(),
            total: counts.total(),
            approval_rate: counts.approval_rate(),
        })
        .collect();
    verdicts.sort_by(|a, b| a.key.cmp(&b.key));
    verdicts
}

fn clamp_weight(weight: f64) -> f64 {
    weight.clamp(MIN_KEYWORD_WEIGHT, MAX_KEYWORD_WEIGHT)
}

/// Move `weight` toward `target` by at most `step`, further bounded by
/// `max_change` (the tighter of the two always applies).
fn step_weight(weight: f64, target: f64, step: f64, max_change: f64) -> f64 {
    let bound = step.min(max_change);
    let delta = (target - weight).clamp(-bound, bound);
    clamp_weight(weight + delta)
}

fn promote_keyword(weight: f64, max_change: f64) -> f64 {
    step_weight(weight, MAX_KEYWORD_WEIGHT, PROMOTE_WEIGHT_STEP, max_change)
}

fn demote_keyword(weight: f64, max_change: f64) -> f64 {
    step_weight(weight, MIN_KEYWORD_WEIGHT, DEMOTE_WEIGHT_STEP, max_change)
}

fn top_skip_reasons(by_skip_reason: &HashMap<String, u64>) -> Vec<(String, u64)> {
    let mut reasons: Vec<(String, u64)> = by_skip_reason
        .iter()
        .map(|(reason, count)| (reason.clone(), *count))
        .collect();
    reasons.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    reasons.truncate(TOP_SKIP_REASONS);
    reasons
}

fn set_membership(preferred: &mut Vec<String>, avoid: &mut Vec<String>, key: &str, promote: bool) {
    if promote {
        avoid.retain(|t| t != key);
        if !preferred.iter().any(|t| t == key) {
            preferred.push(key.to_string());
        }
    } else {
        preferred.retain(|t| t != key);
        if !avoid.iter().any(|t| t == key) {
            avoid.push(key.to_string());
        }
    }
}

fn set_account_membership(boosted: &mut Vec<String>, blocked: &mut Vec<String>, key: &str, promote: bool) {
    if promote {
        blocked.retain(|a| a != key);
        if !boosted.iter().any(|a| a == key) {
            boosted.push(key.to_string());
        }
    } else {
        boosted.retain(|a| a != key);
        if !blocked.iter().any(|a| a == key) {
            blocked.push(key.to_string());
        }
    }
}

fn report_line(label: &str, verdicts: &[BucketVerdict], promote: bool) -> Option<String> {
    if verdicts.is_empty() {
        return None;
    }
    let action = if promote { "promoted" } else { "demoted" };
    let names = verdicts
        .iter()
        .map(|v| format!("{} ({:.0}%)", v.key, v.approval_rate * 100.0))
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!("{label} {action}: {names}"))
}

fn build_report(analysis: &PdcaAnalysis) -> String {
    let mut lines = vec![format!(
        "PDCA cycle: {} decisions, {:.0}% overall approval",
        analysis.total_decisions,
        analysis.approval_rate * 100.0
    )];
    for (label, promotions, demotions) in [
        ("sources", &analysis.source_promotions, &analysis.source_demotions),
        ("keywords", &analysis.keyword_promotions, &analysis.keyword_demotions),
        ("topics", &analysis.topic_promotions, &analysis.topic_demotions),
    ] {
        if let Some(line) = report_line(label, promotions, true) {
            lines.push(line);
        }
        if let Some(line) = report_line(label, demotions, false) {
            lines.push(line);
        }
    }
    if !analysis.top_skip_reasons.is_empty() {
        let reasons = analysis
            .top_skip_reasons
            .iter()
            .map(|(reason, count)| format!("{reason} ({count})"))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("top skip reasons: {reasons}"));
    }
    lines.join("\n")
}

/// Run one PDCA cycle against `counters`, optionally applying the result to
/// `preferences`. `dry_run = true` computes and reports without mutating
/// `preferences`.
pub fn run(
    config: &PdcaConfig,
    counters: &AggregatedCounters,
    preferences: &mut Preferences,
    dry_run: bool,
) -> PdcaOutcome {
    run_at(config, counters, preferences, dry_run, Utc::now())
}

/// [`run`] with an injected clock, for deterministic tests.
pub fn run_at(
    config: &PdcaConfig,
    counters: &AggregatedCounters,
    preferences: &mut Preferences,
    dry_run: bool,
    now: DateTime<Utc>,
) -> PdcaOutcome {
    // Every decision bumps exactly one `by_source` bucket (see
    // `FeedbackLog::record_decision_at`), so summing it gives the true total.
    let total_decisions: u64 = counters.by_source.values().map(BucketCounts::total).sum();
    let overall = counters.by_source.values().fold(BucketCounts::default(), |mut acc, b| {
        acc.approved += b.approved;
        acc.skipped += b.skipped;
        acc
    });

    if total_decisions < config.min_decisions_for_adjust as u64 {
        let analysis = PdcaAnalysis {
            total_decisions,
            approval_rate: overall.approval_rate(),
            top_skip_reasons: top_skip_reasons(&counters.by_skip_reason),
            ..Default::default()
        };
        return PdcaOutcome {
            report: format!(
                "PDCA cycle skipped: only {total_decisions} decisions (need {})",
                config.min_decisions_for_adjust
            ),
            analysis,
            applied: false,
        };
    }

    let source_buckets = bucket_verdicts(&counters.by_source, config.min_decisions_for_adjust);
    let keyword_buckets = bucket_verdicts(&counters.by_keyword, config.min_decisions_for_adjust);
    let topic_buckets = bucket_verdicts(&counters.by_topic, config.min_decisions_for_adjust);

    let mut analysis = PdcaAnalysis {
        total_decisions,
        approval_rate: overall.approval_rate(),
        top_skip_reasons: top_skip_reasons(&counters.by_skip_reason),
        ..Default::default()
    };

    for verdict in &source_buckets {
        if verdict.approval_rate >= config.promote_threshold {
            analysis.source_promotions.push(verdict.clone());
        } else if verdict.approval_rate <= config.demote_threshold {
            analysis.source_demotions.push(verdict.clone());
        }
    }
    for verdict in &keyword_buckets {
        if verdict.approval_rate >= config.promote_threshold {
            analysis.keyword_promotions.push(verdict.clone());
        } else if verdict.approval_rate <= config.demote_threshold {
            analysis.keyword_demotions.push(verdict.clone());
        }
    }
    for verdict in &topic_buckets {
        if verdict.approval_rate >= config.promote_threshold {
            analysis.topic_promotions.push(verdict.clone());
        } else if verdict.approval_rate <= config.demote_threshold {
            analysis.topic_demotions.push(verdict.clone());
        }
    }

    let applied = !dry_run
        && (!analysis.source_promotions.is_empty()
            || !analysis.source_demotions.is_empty()
            || !analysis.keyword_promotions.is_empty()
            || !analysis.keyword_demotions.is_empty()
            || !analysis.topic_promotions.is_empty()
            || !analysis.topic_demotions.is_empty());

    if applied {
        for verdict in &analysis.source_promotions {
            set_account_membership(
                &mut preferences.account_overrides.boosted,
                &mut preferences.account_overrides.blocked,
                &verdict.key,
                true,
            );
        }
        for verdict in &analysis.source_demotions {
            set_account_membership(
                &mut preferences.account_overrides.boosted,
                &mut preferences.account_overrides.blocked,
                &verdict.key,
                false,
            );
        }
        for verdict in &analysis.keyword_promotions {
            let weight = preferences
                .keyword_weights
                .get(&verdict.key)
                .copied()
                .unwrap_or(DEFAULT_KEYWORD_WEIGHT);
            preferences
                .keyword_weights
                .insert(verdict.key.clone(), promote_keyword(weight, config.max_weight_change));
        }
        for verdict in &analysis.keyword_demotions {
            let weight = preferences
                .keyword_weights
                .get(&verdict.key)
                .copied()
                .unwrap_or(DEFAULT_KEYWORD_WEIGHT);
            preferences
                .keyword_weights
                .insert(verdict.key.clone(), demote_keyword(weight, config.max_weight_change));
        }
        for verdict in &analysis.topic_promotions {
            set_membership(
                &mut preferences.topic_preferences.preferred,
                &mut preferences.topic_preferences.avoid,
                &verdict.key,
                true,
            );
        }
        for verdict in &analysis.topic_demotions {
            set_membership(
                &mut preferences.topic_preferences.preferred,
                &mut preferences.topic_preferences.avoid,
                &verdict.key,
                false,
            );
        }
        preferences.touch_at("auto_pdca", now);
    }

    let report = build_report(&analysis);
    PdcaOutcome {
        analysis,
        report,
        applied,
    }
}
