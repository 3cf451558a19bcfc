//! Appointment database queries

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::services::scheduler::AppointmentStore;
use crate::types::{AppointmentStatus, ExistingAppointment};

/// List a day's confirmed appointments, ordered by start time.
/// Cancelled and completed appointments are filtered out here so the slot
/// engine never has to reason about status.
pub async fn list_confirmed_appointments(
    pool: &PgPool,
    date: NaiveDate,
) -> Result<Vec<ExistingAppointment>> {
    let appointments = sqlx::query_as::<_, ExistingAppointment>(
        r#"
        SELECT id, date, start_time, end_time, lat, lng
        FROM appointments
        WHERE date = $1 AND status = $2
        ORDER BY start_time
        "#,
    )
    .bind(date)
    .bind(AppointmentStatus::Confirmed)
    .fetch_all(pool)
    .await?;

    Ok(appointments)
}

/// Postgres-backed appointment snapshot source for the slot engine
#[derive(Clone)]
pub struct PgAppointmentStore {
    pool: PgPool,
}

impl PgAppointmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AppointmentStore for PgAppointmentStore {
    async fn list_confirmed(&self, date: NaiveDate) -> Result<Vec<ExistingAppointment>> {
        list_confirmed_appointments(&self.pool, date).await
    }
}
