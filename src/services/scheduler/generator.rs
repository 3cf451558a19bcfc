//! Candidate slot generation
//!
//! Enumerates fixed-step start times inside one working window. Pure; the
//! validator decides later which candidates are actually bookable.

use super::{add_minutes, minutes_of_day};
use crate::defaults::SLOT_STEP_MINUTES;
use crate::types::{CandidateSlot, SlotScore, WorkingWindow};

/// Generate chronological candidates for `window`, one per 15-minute step,
/// keeping only those that finish by the window's end.
pub fn generate(window: &WorkingWindow, duration_mins: i64) -> Vec<CandidateSlot> {
    if !window.is_well_formed() || duration_mins <= 0 {
        return vec![];
    }

    let window_end = minutes_of_day(window.end_time);
    let mut slots = Vec::new();
    let mut start = window.start_time;

    while minutes_of_day(start) + duration_mins <= window_end {
        slots.push(CandidateSlot {
            date: window.date,
            start_time: start,
            end_time: add_minutes(start, duration_mins),
            duration_mins,
            score: SlotScore::Unscored,
        });
        start = add_minutes(start, SLOT_STEP_MINUTES);
    }

    slots
}
