//! Appointment slot-finding engine
//!
//! Drives generation, validation and diverse selection across a rolling
//! window of working days. Collaborators (working-hours rows, confirmed
//! appointments, drive times) arrive through the traits and the estimator;
//! the engine itself performs no writes.

pub mod generator;
pub mod selector;
pub mod validator;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Timelike};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::defaults::{
    EVALUATION_BUDGET, FEATURED_SLOT_COUNT, MIN_FEASIBLE_RESULTS, SEARCH_WINDOW_DAYS,
};
use crate::services::routing::DriveTimeEstimator;
use crate::types::{
    CandidateSlot, ExistingAppointment, FindSlotsResponse, Location, PreferredWindow, SlotScore,
    WorkingWindow,
};

use selector::SelectionPolicy;

/// Preference-search results are capped at this many slots
const PREFERRED_SLOT_COUNT: usize = 3;

/// Divisor converting minutes outside the preferred window into score penalty
const PREFERENCE_PENALTY_DIVISOR: f64 = 10.0;

/// Source of bookable working windows (operator-set or calendar-imported).
/// Implementations return only available windows, ordered by date then start.
#[async_trait]
pub trait WorkingHoursSource: Send + Sync {
    async fn list_windows(&self, from: NaiveDate, days_ahead: u64) -> Result<Vec<WorkingWindow>>;
}

/// Source of the day's confirmed appointments, ordered by start time.
/// Cancelled and completed appointments never reach the engine.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn list_confirmed(&self, date: NaiveDate) -> Result<Vec<ExistingAppointment>>;
}

/// Fatal failures of a slot search. Candidate-level rejections are not
/// errors; they are reasons on the individual `ValidationResult`.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("upstream store error: {0}")]
    Store(#[source] anyhow::Error),
    #[error("search cancelled")]
    Cancelled,
}

/// A candidate under validation
#[derive(Debug, Clone)]
pub struct CandidateInput {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_mins: i64,
    pub location: Location,
}

/// The slot-finding engine. One instance per process, shared across requests.
pub struct SlotFinder {
    hours: Arc<dyn WorkingHoursSource>,
    appointments: Arc<dyn AppointmentStore>,
    estimator: Arc<DriveTimeEstimator>,
    home_base: Location,
}

impl SlotFinder {
    pub fn new(
        hours: Arc<dyn WorkingHoursSource>,
        appointments: Arc<dyn AppointmentStore>,
        estimator: Arc<DriveTimeEstimator>,
        home_base: Location,
    ) -> Self {
        Self {
            hours,
            appointments,
            estimator,
            home_base,
        }
    }

    /// Main search: a diverse featured set plus every feasible slot found,
    /// across up to a week of working days.
    pub async fn find_best_slots(
        &self,
        location: Location,
        duration_mins: i64,
        from_date: Option<NaiveDate>,
        cancel: &CancellationToken,
    ) -> Result<FindSlotsResponse, SchedulerError> {
        let from = from_date.unwrap_or_else(|| chrono::Local::now().date_naive());
        let windows = self
            .hours
            .list_windows(from, SEARCH_WINDOW_DAYS)
            .await
            .map_err(SchedulerError::Store)?;

        let mut feasible: Vec<CandidateSlot> = Vec::new();
        let mut evaluated = 0usize;

        'days: for window in &windows {
            let existing = self
                .appointments
                .list_confirmed(window.date)
                .await
                .map_err(SchedulerError::Store)?;

            for mut candidate in generator::generate(window, duration_mins) {
                if cancel.is_cancelled() {
                    return Err(SchedulerError::Cancelled);
                }
                // The budget bounds external-call volume, but a sparse
                // calendar may keep searching until enough results exist
                if evaluated >= EVALUATION_BUDGET && feasible.len() >= MIN_FEASIBLE_RESULTS {
                    break 'days;
                }
                evaluated += 1;

                let input = CandidateInput {
                    date: candidate.date,
                    start_time: candidate.start_time,
                    duration_mins: candidate.duration_mins,
                    location,
                };
                let result =
                    validator::validate(&input, &existing, &self.estimator, self.home_base).await;

                match result.score {
                    Some(score) if result.valid => {
                        candidate.score = SlotScore::Scored(score);
                        feasible.push(candidate);
                    }
                    _ => {
                        debug!(
                            "Candidate {} {} rejected: {:?}",
                            candidate.date, candidate.start_time, result.reason
                        );
                    }
                }
            }
        }

        info!(
            "Slot search from {}: {} candidates evaluated, {} feasible",
            from,
            evaluated,
            feasible.len()
        );

        feasible.sort_by(|a, b| {
            score_of(a)
                .partial_cmp(&score_of(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let featured_slots =
            selector::select(&feasible, FEATURED_SLOT_COUNT, &SelectionPolicy::featured());

        let mut all_slots: BTreeMap<NaiveDate, Vec<CandidateSlot>> = BTreeMap::new();
        for slot in feasible {
            all_slots.entry(slot.date).or_default().push(slot);
        }
        for day in all_slots.values_mut() {
            day.sort_by_key(|s| s.start_time);
        }

        Ok(FindSlotsResponse {
            featured_slots,
            all_slots,
        })
    }

    /// Single-day search biased toward a preferred part of the day.
    pub async fn find_preferred_slots(
        &self,
        location: Location,
        duration_mins: i64,
        preferred_date: NaiveDate,
        preferred_window: PreferredWindow,
        cancel: &CancellationToken,
    ) -> Result<Vec<CandidateSlot>, SchedulerError> {
        let windows = self
            .hours
            .list_windows(preferred_date, 1)
            .await
            .map_err(SchedulerError::Store)?;
        let existing = self
            .appointments
            .list_confirmed(preferred_date)
            .await
            .map_err(SchedulerError::Store)?;

        let mut feasible: Vec<CandidateSlot> = Vec::new();

        for window in windows.iter().filter(|w| w.date == preferred_date) {
            for mut candidate in generator::generate(window, duration_mins) {
                if cancel.is_cancelled() {
                    return Err(SchedulerError::Cancelled);
                }

                let input = CandidateInput {
                    date: candidate.date,
                    start_time: candidate.start_time,
                    duration_mins: candidate.duration_mins,
                    location,
                };
                let result =
                    validator::validate(&input, &existing, &self.estimator, self.home_base).await;

                if let (true, Some(score)) = (result.valid, result.score) {
                    let penalty = preference_penalty(&candidate, preferred_window);
                    candidate.score = SlotScore::Scored(score + penalty);
                    feasible.push(candidate);
                }
            }
        }

        feasible.sort_by(|a, b| {
            score_of(a)
                .partial_cmp(&score_of(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(selector::select(
            &feasible,
            PREFERRED_SLOT_COUNT,
            &SelectionPolicy::single_day(),
        ))
    }
}

fn score_of(slot: &CandidateSlot) -> f64 {
    slot.score.value().unwrap_or(f64::MAX)
}

/// Minutes of the slot outside the preferred range, scaled down so the
/// preference bias nudges rather than overrides the detour cost.
fn preference_penalty(slot: &CandidateSlot, window: PreferredWindow) -> f64 {
    let (pref_start, pref_end) = window.range();
    let slot_start = minutes_of_day(slot.start_time);
    let slot_end = slot_start + slot.duration_mins;
    let overlap = (slot_end.min(minutes_of_day(pref_end)) - slot_start.max(minutes_of_day(pref_start))).max(0);
    let outside = slot.duration_mins - overlap;
    outside as f64 / PREFERENCE_PENALTY_DIVISOR
}

/// Minutes elapsed since midnight
pub(crate) fn minutes_of_day(time: NaiveTime) -> i64 {
    time.num_seconds_from_midnight() as i64 / 60
}

/// Add minutes to a time, clamped to the end of the day
pub(crate) fn add_minutes(time: NaiveTime, minutes: i64) -> NaiveTime {
    let total_secs = time.num_seconds_from_midnight() as i64 + minutes * 60;
    let clamped = total_secs.clamp(0, 24 * 60 * 60 - 1) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(clamped, 0)
        .unwrap_or_else(|| NaiveTime::from_hms_opt(23, 59, 59).expect("valid time"))
}

/// Signed minutes from `from` to `to`
pub(crate) fn minutes_between(from: NaiveTime, to: NaiveTime) -> i64 {
    (to - from).num_minutes()
}
