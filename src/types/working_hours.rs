//! Working hours types

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A single day's bookable interval.
///
/// Rows come either from operator-set hours or from the open-slots calendar
/// import; the engine treats both the same and only ever reads them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkingWindow {
    pub id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: bool,
}

impl WorkingWindow {
    /// A window with `end <= start` is malformed and yields no slots.
    pub fn is_well_formed(&self) -> bool {
        self.start_time < self.end_time
    }
}
