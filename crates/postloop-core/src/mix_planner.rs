//! Mix Planner: builds today's `DailyPlan`, a roster of posting slots with
//! a post type and jittered time for each, respecting the warm-up ramp,
//! interval spacing, and quote-RT ratio limits.

use chrono::NaiveDate;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{MixPlannerConfig, SlotConfig, WarmUpPhase};
use crate::scoring::post_scorer::PostType;

/// One entry in a [`DailyPlan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPlanSlot {
    /// Stable id for this slot within the plan (its roster index).
    pub slot_id: String,
    /// Scheduled hour of day, after jitter and interval enforcement.
    pub scheduled_hour: u32,
    /// Scheduled minute of hour, after jitter and interval enforcement.
    pub scheduled_minute: u32,
    /// Which kind of post this slot produces.
    pub post_type: PostType,
    /// Human-readable `HH:MM` rendering of the scheduled time.
    pub time_label: String,
}

/// Today's ordered posting schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPlan {
    /// The calendar date this plan covers.
    pub date: NaiveDate,
    /// Slots in ascending scheduled-time order.
    pub slots: Vec<DailyPlanSlot>,
}

impl DailyPlan {
    /// Number of slots whose `post_type` is [`PostType::QuoteRt`].
    pub fn quote_rt_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.post_type == PostType::QuoteRt)
            .count()
    }

    /// The slot whose scheduled minute-of-day is within `tolerance_minutes`
    /// of `now`'s minute-of-day, if any.
    pub fn slot_for_now(
        &self,
        now_hour: u32,
        now_minute: u32,
        tolerance_minutes: i64,
    ) -> Option<&DailyPlanSlot> {
        let now_total = now_hour as i64 * 60 + now_minute as i64;
        self.slots.iter().find(|slot| {
            let slot_total = slot.scheduled_hour as i64 * 60 + slot.scheduled_minute as i64;
            (slot_total - now_total).abs() <= tolerance_minutes
        })
    }
}

/// Which warm-up phase an account is in, given how many whole days have
/// elapsed since its `start_date`. `None` means no warm-up caps apply.
fn phase_for<'a>(
    config: &'a MixPlannerConfig,
    account_start_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<&'a WarmUpPhase> {
    let start = account_start_date?;
    let days = (today - start).num_days().max(0);
    let week = days / 7;
    Some(match week {
        0 => &config.warm_up.week_0,
        1 => &config.warm_up.week_1,
        2 => &config.warm_up.week_2,
        3 => &config.warm_up.week_3,
        _ => &config.warm_up.week_4_plus,
    })
}

/// Build today's plan using the thread-local RNG.
pub fn build_plan(
    config: &MixPlannerConfig,
    account_start_date: Option<NaiveDate>,
    today: NaiveDate,
) -> DailyPlan {
    build_plan_with_rng(config, account_start_date, today, &mut thread_rng())
}

/// Testable sibling of [`build_plan`] taking an injected RNG so the
/// slot sample, target count, and jitter draws are deterministic.
pub fn build_plan_with_rng(
    config: &MixPlannerConfig,
    account_start_date: Option<NaiveDate>,
    today: NaiveDate,
    rng: &mut impl Rng,
) -> DailyPlan {
    let phase = phase_for(config, account_start_date, today);
    let max_total = phase
        .map(|p| p.max_quote_rt + p.max_original)
        .unwrap_or(config.daily_max);
    let effective_max = config.daily_max.min(max_total).max(config.daily_min);

    let target = pick_target_count(config.daily_min, effective_max, rng);
    let chosen_slots = pick_slots(&config.slots, target, rng);

    let available_quotes = phase.map(|p| p.max_quote_rt).unwrap_or(target);
    let max_quote_rt = ((target as f64 * config.quote_rt_ratio_max).floor() as u32)
        .min(target)
        .min(available_quotes);

    let mut slots = assign_types(&chosen_slots, config, max_quote_rt, rng);
    apply_jitter(&mut slots, rng);
    enforce_min_interval(&mut slots, config.min_interval_minutes);

    let plan_slots = slots
        .into_iter()
        .enumerate()
        .map(|(i, s)| DailyPlanSlot {
            slot_id: format!("slot-{i}"),
            scheduled_hour: s.hour,
            scheduled_minute: s.minute,
            post_type: s.post_type,
            time_label: format!("{:02}:{:02}", s.hour, s.minute),
        })
        .collect();

    DailyPlan {
        date: today,
        slots: plan_slots,
    }
}

/// Pick `N` with quadratic weight favoring higher counts in `[min, max]`.
fn pick_target_count(min: u32, max: u32, rng: &mut impl Rng) -> u32 {
    if min >= max {
        return min;
    }
    let range: Vec<u32> = (min..=max).collect();
    let weights: Vec<f64> = range
        .iter()
        .map(|&n| {
            let offset = (n - min + 1) as f64;
            offset * offset
        })
        .collect();
    let dist = WeightedIndex::new(&weights).expect("non-empty positive weights");
    range[dist.sample(rng)]
}

struct WorkingSlot {
    hour: u32,
    minute: u32,
    post_type: PostType,
    jitter_minutes: i64,
}

/// Select `n` slots from `roster`, always keeping the earliest and latest
/// (by base time) and randomly sampling the rest, then sorted by time.
fn pick_slots(roster: &[SlotConfig], n: u32, rng: &mut impl Rng) -> Vec<SlotConfig> {
    let mut sorted: Vec<&SlotConfig> = roster.iter().collect();
    sorted.sort_by_key(|s| (s.base_hour, s.base_minute));

    let n = (n as usize).min(sorted.len()).max(1);
    if n >= sorted.len() {
        return sorted.into_iter().cloned().collect();
    }
    if n == 1 {
        return vec![sorted[0].clone()];
    }

    let first = sorted[0];
    let last = sorted[sorted.len() - 1];
    let mut middle: Vec<&SlotConfig> = sorted[1..sorted.len() - 1].to_vec();
    middle.shuffle(rng);
    let take = n - 2;
    let mut chosen: Vec<&SlotConfig> = vec![first];
    chosen.extend(middle.into_iter().take(take));
    chosen.push(last);
    chosen.sort_by_key(|s| (s.base_hour, s.base_minute));
    chosen.into_iter().cloned().collect()
}

/// Assign a `PostType` to each slot in time order, respecting each slot's
/// `type_pool`, `max_consecutive_quotes`, and the quote-RT budget.
fn assign_types(
    slots: &[SlotConfig],
    config: &MixPlannerConfig,
    max_quote_rt: u32,
    rng: &mut impl Rng,
) -> Vec<WorkingSlot> {
    let mut out = Vec::with_capacity(slots.len());
    let mut quotes_used = 0u32;
    let mut streak = 0u32;

    for slot in slots {
        let can_quote = slot.type_pool.contains(&PostType::QuoteRt)
            && quotes_used < max_quote_rt
            && streak < config.max_consecutive_quotes;
        let can_original = slot.type_pool.contains(&PostType::Original);

        let post_type = if can_quote && can_original {
            if rng.gen_bool(0.5) {
                PostType::QuoteRt
            } else {
                PostType::Original
            }
        } else if can_quote {
            PostType::QuoteRt
        } else if can_original {
            PostType::Original
        } else {
            // Pool named neither type explicitly; fall back to original.
            PostType::Original
        };

        if post_type == PostType::QuoteRt {
            quotes_used += 1;
            streak += 1;
        } else {
            streak = 0;
        }

        out.push(WorkingSlot {
            hour: slot.base_hour,
            minute: slot.base_minute,
            post_type,
            jitter_minutes: slot.jitter_minutes,
        });
    }
    out
}

/// Apply each slot's own `±jitter_minutes` to its scheduled time, clamped
/// to the `[6, 23]` hour band the posting platform allows.
fn apply_jitter(slots: &mut [WorkingSlot], rng: &mut impl Rng) {
    for slot in slots.iter_mut() {
        let jitter = slot.jitter_minutes;
        if jitter == 0 {
            continue;
        }
        let delta = rng.gen_range(-jitter..=jitter);
        let total = slot.hour as i64 * 60 + slot.minute as i64 + delta;
        let total = total.clamp(6 * 60, 23 * 60 + 59);
        slot.hour = (total / 60) as u32;
        slot.minute = (total % 60) as u32;
    }
}

/// Sweep left-to-right; if the gap to the previous slot is below
/// `min_interval_minutes`, push the current slot forward to exactly the
/// minimum gap.
fn enforce_min_interval(slots: &mut [WorkingSlot], min_interval_minutes: i64) {
    let mut prev_total: Option<i64> = None;
    for slot in slots.iter_mut() {
        let mut total = slot.hour as i64 * 60 + slot.minute as i64;
        if let Some(prev) = prev_total {
            if total - prev < min_interval_minutes {
                total = prev + min_interval_minutes;
            }
        }
        let total = total.min(23 * 60 + 59);
        slot.hour = (total / 60) as u32;
        slot.minute = (total % 60) as u32;
        prev_total = Some(total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WarmUpConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn minute_roster(minutes: &[u32]) -> Vec<SlotConfig> {
        minutes
            .iter()
            .map(|&m| SlotConfig {
                base_hour: (m / 60) as u32,
                base_minute: m % 60,
                jitter_minutes: 0,
                type_pool: vec![PostType::Original, PostType::QuoteRt],
            })
            .collect()
    }

    fn s2_config() -> MixPlannerConfig {
        MixPlannerConfig {
            daily_min: 10,
            daily_max: 10,
            quote_rt_ratio_max: 0.7,
            max_consecutive_quotes: 2,
            min_interval_minutes: 60,
            window_start_hour: 6,
            window_end_hour: 23,
            slots: minute_roster(&[
                420, 510, 615, 720, 855, 960, 1080, 1185, 1260, 1350,
            ]),
            warm_up: WarmUpConfig {
                week_0: WarmUpPhase {
                    max_quote_rt: 100,
                    max_original: 100,
                },
                week_1: WarmUpPhase {
                    max_quote_rt: 100,
                    max_original: 100,
                },
                week_2: WarmUpPhase {
                    max_quote_rt: 100,
                    max_original: 100,
                },
                week_3: WarmUpPhase {
                    max_quote_rt: 100,
                    max_original: 100,
                },
                week_4_plus: WarmUpPhase {
                    max_quote_rt: 100,
                    max_original: 100,
                },
            },
        }
    }

    #[test]
    fn min_interval_enforcement_keeps_or_widens_gaps() {
        let config = s2_config();
        let mut rng = StdRng::seed_from_u64(1);
        let plan = build_plan_with_rng(&config, None, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), &mut rng);

        assert_eq!(plan.slots.len(), 10);
        let totals: Vec<i64> = plan
            .slots
            .iter()
            .map(|s| s.scheduled_hour as i64 * 60 + s.scheduled_minute as i64)
            .collect();
        for pair in totals.windows(2) {
            assert!(pair[1] - pair[0] >= 60, "gap {:?} below min interval", pair);
        }
    }

    #[test]
    fn quote_rt_ratio_never_exceeds_config_max() {
        let config = s2_config();
        let mut rng = StdRng::seed_from_u64(7);
        let plan = build_plan_with_rng(&config, None, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), &mut rng);
        let ratio = plan.quote_rt_count() as f64 / plan.slots.len() as f64;
        assert!(ratio <= config.quote_rt_ratio_max + f64::EPSILON);
    }

    #[test]
    fn no_more_than_max_consecutive_quotes() {
        let config = s2_config();
        let mut rng = StdRng::seed_from_u64(42);
        let plan = build_plan_with_rng(&config, None, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), &mut rng);
        let mut streak = 0u32;
        for slot in &plan.slots {
            if slot.post_type == PostType::QuoteRt {
                streak += 1;
                assert!(streak <= config.max_consecutive_quotes);
            } else {
                streak = 0;
            }
        }
    }

    #[test]
    fn warm_up_week_0_caps_quote_rt_to_zero() {
        let mut config = s2_config();
        config.daily_min = 4;
        config.daily_max = 10;
        config.warm_up.week_0 = WarmUpPhase {
            max_quote_rt: 0,
            max_original: 3,
        };
        let today = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let start = today - chrono::Duration::days(1);
        let mut rng = StdRng::seed_from_u64(3);
        let plan = build_plan_with_rng(&config, Some(start), today, &mut rng);

        assert_eq!(plan.quote_rt_count(), 0);
        assert!(plan.slots.len() <= 3);
    }

    #[test]
    fn slot_for_now_matches_within_tolerance() {
        let plan = DailyPlan {
            date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            slots: vec![DailyPlanSlot {
                slot_id: "slot-0".to_string(),
                scheduled_hour: 12,
                scheduled_minute: 0,
                post_type: PostType::Original,
                time_label: "12:00".to_string(),
            }],
        };
        assert!(plan.slot_for_now(12, 10, 15).is_some());
        assert!(plan.slot_for_now(13, 0, 15).is_none());
    }

    #[test]
    fn pick_target_count_respects_bounds() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..50 {
            let n = pick_target_count(4, 10, &mut rng);
            assert!((4..=10).contains(&n));
        }
    }

    #[test]
    fn no_start_date_applies_no_warm_up_cap() {
        assert!(phase_for(&s2_config(), None, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()).is_none());
    }

    #[test]
    fn jitter_uses_each_slots_own_jitter_not_roster_position() {
        // Regression: `apply_jitter` used to zip the *chosen* subset against
        // `config.slots` (the full roster) by position, so a chosen slot
        // picked up whichever roster slot happened to share its index
        // rather than its own `jitter_minutes`. Build a working-slot list
        // out of roster order (as `pick_slots` can produce when N < roster
        // length) and confirm each only ever moves within its own bound.
        let mut rng = StdRng::seed_from_u64(11);
        let mut slots = vec![
            WorkingSlot {
                hour: 15,
                minute: 0,
                post_type: PostType::Original,
                jitter_minutes: 120,
            },
            WorkingSlot {
                hour: 10,
                minute: 0,
                post_type: PostType::Original,
                jitter_minutes: 0,
            },
        ];
        apply_jitter(&mut slots, &mut rng);

        // The zero-jitter slot must land exactly on its base time no matter
        // what jitter the other (unrelated) slot in the list carries.
        assert_eq!(slots[1].hour, 10);
        assert_eq!(slots[1].minute, 0);

        let moved_total = slots[0].hour as i64 * 60 + slots[0].minute as i64;
        assert!((moved_total - 15 * 60).abs() <= 120);
    }

    #[test]
    fn subset_selection_carries_correct_jitter_through_build_plan() {
        // An end-to-end version of the same regression at the `build_plan`
        // level: the roster has 5 slots, only one of which jitters at all,
        // and the plan samples a proper subset (N=3) so the chosen slots'
        // roster positions do not line up with their original indices.
        let mut config = s2_config();
        config.daily_min = 3;
        config.daily_max = 3;
        config.min_interval_minutes = 0;
        config.slots = vec![
            SlotConfig {
                base_hour: 7,
                base_minute: 0,
                jitter_minutes: 0,
                type_pool: vec![PostType::Original, PostType::QuoteRt],
            },
            SlotConfig {
                base_hour: 10,
                base_minute: 0,
                jitter_minutes: 0,
                type_pool: vec![PostType::Original, PostType::QuoteRt],
            },
            SlotConfig {
                base_hour: 13,
                base_minute: 0,
                jitter_minutes: 300,
                type_pool: vec![PostType::Original, PostType::QuoteRt],
            },
            SlotConfig {
                base_hour: 16,
                base_minute: 0,
                jitter_minutes: 0,
                type_pool: vec![PostType::Original, PostType::QuoteRt],
            },
            SlotConfig {
                base_hour: 20,
                base_minute: 0,
                jitter_minutes: 0,
                type_pool: vec![PostType::Original, PostType::QuoteRt],
            },
        ];

        for seed in 0..30 {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = build_plan_with_rng(
                &config,
                None,
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                &mut rng,
            );
            let fixed_bases = [7 * 60, 10 * 60, 16 * 60, 20 * 60];
            for slot in &plan.slots {
                let total = slot.scheduled_hour as i64 * 60 + slot.scheduled_minute as i64;
                // Every slot is either one of the four zero-jitter bases
                // (unmoved, since their jitter_minutes is 0) or within the
                // 13:00 slot's own ±300-minute jitter window. A slot landing
                // outside both means jitter leaked from the wrong roster
                // entry onto it.
                let is_fixed_base = fixed_bases.contains(&total);
                let is_within_jittered_window = (total - 13 * 60).abs() <= 300;
                assert!(
                    is_fixed_base || is_within_jittered_window,
                    "seed {seed}: {total} not explained by any slot's own jitter"
                );
            }
        }
    }
}
