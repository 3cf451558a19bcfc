//! Candidate slot types produced by the slot-finding engine

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Detour cost of a candidate, in minutes of added driving.
///
/// Explicit two-state score instead of an infinity sentinel: a freshly
/// generated candidate is `Unscored` and can never be accidentally compared
/// against a real score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotScore {
    Scored(f64),
    Unscored,
}

impl SlotScore {
    pub fn value(&self) -> Option<f64> {
        match self {
            SlotScore::Scored(v) => Some(*v),
            SlotScore::Unscored => None,
        }
    }

    pub fn is_scored(&self) -> bool {
        matches!(self, SlotScore::Scored(_))
    }
}

/// A bookable slot offered (or considered) for a new appointment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSlot {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_mins: i64,
    pub score: SlotScore,
}

impl CandidateSlot {
    /// Which part of the day this slot starts in.
    pub fn band(&self) -> TimeBand {
        TimeBand::of(self.start_time)
    }
}

/// Fixed time-of-day bands used by the diverse selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBand {
    Morning,
    Midday,
    LateDay,
}

impl TimeBand {
    /// Band boundaries are fixed: morning before 12:00, midday until 14:59,
    /// late day from 15:00.
    pub fn of(time: NaiveTime) -> TimeBand {
        let noon = NaiveTime::from_hms_opt(12, 0, 0).expect("valid static time");
        let three_pm = NaiveTime::from_hms_opt(15, 0, 0).expect("valid static time");
        if time < noon {
            TimeBand::Morning
        } else if time < three_pm {
            TimeBand::Midday
        } else {
            TimeBand::LateDay
        }
    }
}

/// Client-declared preferred part of day for the preference-biased search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferredWindow {
    Morning,
    Afternoon,
    Evening,
}

impl PreferredWindow {
    /// Minute-of-day range the client asked for.
    pub fn range(self) -> (NaiveTime, NaiveTime) {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).expect("valid static time");
        match self {
            PreferredWindow::Morning => (t(8, 0), t(12, 0)),
            PreferredWindow::Afternoon => (t(12, 0), t(17, 0)),
            PreferredWindow::Evening => (t(17, 0), t(20, 0)),
        }
    }
}

/// Why the validator rejected a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Collides with an existing appointment
    Overlap,
    /// Not enough time to drive in from the previous stop or out to the next
    DriveWindow,
    /// No routing provider could compute a required leg
    RouteUnavailable,
}

/// Outcome of validating one candidate against a day's appointments
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub valid: bool,
    pub score: Option<f64>,
    pub reason: Option<RejectReason>,
}

impl ValidationResult {
    pub fn ok(score: f64) -> Self {
        Self {
            valid: true,
            score: Some(score),
            reason: None,
        }
    }

    pub fn rejected(reason: RejectReason) -> Self {
        Self {
            valid: false,
            score: None,
            reason: Some(reason),
        }
    }
}
