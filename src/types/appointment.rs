//! Appointment types

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Location;

/// Appointment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "appointment_status", rename_all = "snake_case")]
pub enum AppointmentStatus {
    Confirmed,
    Cancelled,
    Completed,
}

/// A booked appointment as the slot engine sees it.
///
/// The store only ever hands the engine confirmed appointments for a single
/// day, ordered by start time. The engine never mutates them; each validation
/// works against an immutable per-day snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExistingAppointment {
    pub id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub lat: f64,
    pub lng: f64,
}

impl ExistingAppointment {
    pub fn location(&self) -> Location {
        Location::new(self.lat, self.lng)
    }
}
