//! Diverse slot selection
//!
//! A pure score-sorted top-N clusters every "best" slot on one day and time
//! of day. The selector keeps raw score dominant but nudges picks toward
//! distinct days and time bands, bounded by a per-day cap and a minimum gap
//! between same-day picks.

use std::collections::HashMap;

use chrono::NaiveDate;

use super::minutes_between;
use crate::types::{CandidateSlot, TimeBand};

/// Tuning for one selection run
#[derive(Debug, Clone)]
pub struct SelectionPolicy {
    /// Minimum minutes between two selected slots on the same day
    pub min_gap_mins: i64,
    /// Hard cap on selected slots per day (kept even in the relaxation pass)
    pub max_per_day: usize,
    /// Distinct days the selection should try to cover
    pub target_days: usize,
    /// Distinct time-of-day bands the selection should try to cover
    pub target_bands: usize,
    /// Added per already-selected slot on the candidate's day
    pub day_repeat_weight: f64,
    /// Added per already-selected slot in the candidate's band
    pub band_repeat_weight: f64,
    /// Extra penalty while coverage targets are unmet and the candidate
    /// would not contribute a new day or band
    pub coverage_penalty: f64,
    /// Whether to run the one-slot-per-new-day seeding pass first
    pub seed_days: bool,
}

impl SelectionPolicy {
    /// Policy for the multi-day featured search.
    pub fn featured() -> Self {
        Self {
            min_gap_mins: 60,
            max_per_day: 2,
            target_days: 4,
            target_bands: 3,
            day_repeat_weight: 4.0,
            band_repeat_weight: 2.0,
            coverage_penalty: 6.0,
            seed_days: true,
        }
    }

    /// Looser policy for the single-day preference search: the whole pool
    /// shares one date, so day spread is meaningless and the gap shrinks.
    pub fn single_day() -> Self {
        Self {
            min_gap_mins: 30,
            max_per_day: 3,
            target_days: 1,
            target_bands: 3,
            day_repeat_weight: 0.0,
            band_repeat_weight: 2.0,
            coverage_penalty: 6.0,
            seed_days: false,
        }
    }
}

/// Running state of one selection, threaded immutably through each pick so
/// individual steps stay testable.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    selected: Vec<CandidateSlot>,
    day_counts: HashMap<NaiveDate, usize>,
    band_counts: HashMap<TimeBand, usize>,
}

impl SelectionState {
    /// A new state with `slot` selected.
    pub fn with(&self, slot: CandidateSlot) -> Self {
        let mut next = self.clone();
        *next.day_counts.entry(slot.date).or_insert(0) += 1;
        *next.band_counts.entry(slot.band()).or_insert(0) += 1;
        next.selected.push(slot);
        next
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn into_selected(self) -> Vec<CandidateSlot> {
        self.selected
    }

    pub fn day_count(&self, date: NaiveDate) -> usize {
        self.day_counts.get(&date).copied().unwrap_or(0)
    }

    pub fn band_count(&self, band: TimeBand) -> usize {
        self.band_counts.get(&band).copied().unwrap_or(0)
    }

    pub fn distinct_days(&self) -> usize {
        self.day_counts.len()
    }

    pub fn distinct_bands(&self) -> usize {
        self.band_counts.len()
    }

    /// Whether `slot` keeps the required distance from every already-selected
    /// slot on the same day.
    pub fn gap_ok(&self, slot: &CandidateSlot, min_gap_mins: i64) -> bool {
        self.selected
            .iter()
            .filter(|s| s.date == slot.date)
            .all(|s| minutes_between(s.start_time, slot.start_time).abs() >= min_gap_mins)
    }
}

/// Raw score plus diversity penalties for `slot` under `state`.
///
/// Penalties are fractional nudges on top of a score measured in minutes of
/// driving; raw score stays dominant.
pub fn adjusted_score(state: &SelectionState, slot: &CandidateSlot, policy: &SelectionPolicy) -> f64 {
    let raw = slot.score.value().unwrap_or(f64::MAX);

    let mut adjusted = raw
        + policy.day_repeat_weight * state.day_count(slot.date) as f64
        + policy.band_repeat_weight * state.band_count(slot.band()) as f64;

    if state.distinct_days() < policy.target_days && state.day_count(slot.date) > 0 {
        adjusted += policy.coverage_penalty;
    }
    if state.distinct_bands() < policy.target_bands && state.band_count(slot.band()) > 0 {
        adjusted += policy.coverage_penalty;
    }

    adjusted
}

/// Select up to `count` slots from `scored` (sorted ascending by score).
pub fn select(scored: &[CandidateSlot], count: usize, policy: &SelectionPolicy) -> Vec<CandidateSlot> {
    let pool: Vec<&CandidateSlot> = scored.iter().filter(|s| s.score.is_scored()).collect();
    let mut used = vec![false; pool.len()];
    let mut state = SelectionState::default();

    // Seeding: one slot per still-unseen day, cheapest first
    if policy.seed_days {
        for (idx, slot) in pool.iter().enumerate() {
            if state.len() >= count || state.distinct_days() >= policy.target_days {
                break;
            }
            if state.day_count(slot.date) == 0 && state.gap_ok(slot, policy.min_gap_mins) {
                used[idx] = true;
                state = state.with((*slot).clone());
            }
        }
    }

    state = greedy_pass(&pool, &mut used, state, count, policy, policy.min_gap_mins);

    // Relaxation: drop the gap constraint if the strict pass came up short
    if state.len() < count {
        state = greedy_pass(&pool, &mut used, state, count, policy, 0);
    }

    state.into_selected()
}

/// Repeatedly pick the eligible candidate with the lowest adjusted score.
fn greedy_pass(
    pool: &[&CandidateSlot],
    used: &mut [bool],
    mut state: SelectionState,
    count: usize,
    policy: &SelectionPolicy,
    min_gap_mins: i64,
) -> SelectionState {
    while state.len() < count {
        let mut best: Option<(usize, f64)> = None;

        for (idx, slot) in pool.iter().enumerate() {
            if used[idx]
                || state.day_count(slot.date) >= policy.max_per_day
                || !state.gap_ok(slot, min_gap_mins)
            {
                continue;
            }
            let score = adjusted_score(&state, slot, policy);
            // Ties go to the earlier (lower raw score) candidate
            if best.map_or(true, |(_, s)| score < s) {
                best = Some((idx, score));
            }
        }

        let Some((idx, _)) = best else { break };
        used[idx] = true;
        state = state.with(pool[idx].clone());
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SlotScore;
    use chrono::{NaiveDate, NaiveTime};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn slot(day: u32, h: u32, m: u32, score: f64) -> CandidateSlot {
        let start = NaiveTime::from_hms_opt(h, m, 0).unwrap();
        CandidateSlot {
            date: date(day),
            start_time: start,
            end_time: start + chrono::Duration::minutes(30),
            duration_mins: 30,
            score: SlotScore::Scored(score),
        }
    }

    fn sorted(mut slots: Vec<CandidateSlot>) -> Vec<CandidateSlot> {
        slots.sort_by(|a, b| {
            a.score
                .value()
                .unwrap()
                .partial_cmp(&b.score.value().unwrap())
                .unwrap()
        });
        slots
    }

    #[test]
    fn test_returns_at_most_count() {
        let pool = sorted(vec![
            slot(10, 9, 0, 1.0),
            slot(11, 9, 0, 2.0),
            slot(12, 9, 0, 3.0),
        ]);
        let picked = select(&pool, 2, &SelectionPolicy::featured());
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn test_never_exceeds_max_per_day() {
        // Ten cheap slots all on one day; cap is two
        let pool = sorted((0..10).map(|i| slot(10, 9 + i, 0, i as f64)).collect());
        let picked = select(&pool, 5, &SelectionPolicy::featured());
        assert_eq!(picked.len(), 2);
        assert!(picked.iter().all(|s| s.date == date(10)));
    }

    #[test]
    fn test_min_gap_respected_on_same_day() {
        let policy = SelectionPolicy {
            max_per_day: 3,
            seed_days: false,
            ..SelectionPolicy::featured()
        };
        let pool = sorted(vec![
            slot(10, 9, 0, 1.0),
            slot(10, 9, 15, 1.5), // within 60 min of the first
            slot(10, 11, 0, 2.0),
        ]);
        let picked = select(&pool, 2, &policy);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0].start_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(picked[1].start_time, NaiveTime::from_hms_opt(11, 0, 0).unwrap());
    }

    #[test]
    fn test_relaxation_fills_shortfall_ignoring_gap() {
        let policy = SelectionPolicy {
            max_per_day: 3,
            seed_days: false,
            ..SelectionPolicy::featured()
        };
        // Only two candidates exist, 15 minutes apart
        let pool = sorted(vec![slot(10, 9, 0, 1.0), slot(10, 9, 15, 2.0)]);
        let picked = select(&pool, 2, &policy);
        assert_eq!(picked.len(), 2, "relaxation pass must fill the shortfall");
    }

    #[test]
    fn test_relaxation_still_honors_day_cap() {
        // Plenty of close candidates on one day, cap of two
        let pool = sorted((0..8).map(|i| slot(10, 9, 0, i as f64)).collect());
        let mut clock = pool.clone();
        for (i, s) in clock.iter_mut().enumerate() {
            s.start_time = NaiveTime::from_hms_opt(9, (i as u32 % 4) * 15, 0).unwrap();
        }
        let picked = select(&clock, 5, &SelectionPolicy::featured());
        assert!(picked.len() <= 2);
    }

    #[test]
    fn test_seeding_spreads_across_days() {
        // Day 10 has the three cheapest slots; seeding should still cover
        // days 11 and 12 before doubling up
        let pool = sorted(vec![
            slot(10, 9, 0, 1.0),
            slot(10, 11, 0, 1.1),
            slot(10, 14, 0, 1.2),
            slot(11, 9, 0, 8.0),
            slot(12, 9, 0, 9.0),
        ]);
        let picked = select(&pool, 3, &SelectionPolicy::featured());
        let days: std::collections::HashSet<NaiveDate> = picked.iter().map(|s| s.date).collect();
        assert_eq!(days.len(), 3);
    }

    #[test]
    fn test_band_penalty_spreads_times_of_day() {
        let policy = SelectionPolicy {
            seed_days: false,
            max_per_day: 3,
            min_gap_mins: 30,
            ..SelectionPolicy::featured()
        };
        // Two cheap morning slots and a slightly dearer afternoon slot
        let pool = sorted(vec![
            slot(10, 9, 0, 1.0),
            slot(10, 10, 0, 1.5),
            slot(10, 13, 0, 3.0),
        ]);
        let picked = select(&pool, 2, &policy);
        let bands: std::collections::HashSet<TimeBand> = picked.iter().map(|s| s.band()).collect();
        // 1.5 + band repeat 2.0 + unmet-coverage 6.0 > 3.0, so midday wins
        assert_eq!(bands.len(), 2);
    }

    #[test]
    fn test_raw_score_dominates_between_fresh_days() {
        let pool = sorted(vec![slot(10, 9, 0, 1.0), slot(11, 9, 0, 50.0)]);
        let picked = select(&pool, 1, &SelectionPolicy::featured());
        assert_eq!(picked[0].date, date(10));
    }

    #[test]
    fn test_unscored_candidates_ignored() {
        let mut unscored = slot(10, 9, 0, 0.0);
        unscored.score = SlotScore::Unscored;
        let picked = select(&[unscored], 3, &SelectionPolicy::featured());
        assert!(picked.is_empty());
    }

    #[test]
    fn test_empty_pool() {
        assert!(select(&[], 5, &SelectionPolicy::featured()).is_empty());
    }

    #[test]
    fn test_adjusted_score_steps_are_pure() {
        let policy = SelectionPolicy::featured();
        let state = SelectionState::default();
        let s = slot(10, 9, 0, 2.0);

        // Fresh state: no penalties at all
        assert_eq!(adjusted_score(&state, &s, &policy), 2.0);

        let state = state.with(s.clone());
        let same_day_band = slot(10, 10, 30, 2.0);
        // One day repeat (4.0), one band repeat (2.0), both coverage
        // targets unmet and uncontributed (2 × 6.0)
        assert_eq!(adjusted_score(&state, &same_day_band, &policy), 2.0 + 4.0 + 2.0 + 12.0);

        let other_day = slot(11, 13, 0, 2.0);
        assert_eq!(adjusted_score(&state, &other_day, &policy), 2.0);
    }
}
