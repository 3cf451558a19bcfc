use chrono::NaiveTime;

/// Candidate start times are generated on this grid
pub const SLOT_STEP_MINUTES: i64 = 15;

/// How many working days ahead a search may look
pub const SEARCH_WINDOW_DAYS: u64 = 7;

/// Global cap on candidates validated per search
pub const EVALUATION_BUDGET: usize = 120;

/// The budget may only cut a search short once this many feasible
/// candidates have been collected
pub const MIN_FEASIBLE_RESULTS: usize = 5;

/// Number of featured slots returned by the main search
pub const FEATURED_SLOT_COUNT: usize = 5;

/// Assumed day boundary when a candidate has no earlier appointment
pub fn default_day_start() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).expect("valid static default day start")
}

/// Assumed day boundary when a candidate has no later appointment
pub fn default_day_end() -> NaiveTime {
    NaiveTime::from_hms_opt(17, 0, 0).expect("valid static default day end")
}
