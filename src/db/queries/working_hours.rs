//! Working hours database queries

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::services::scheduler::WorkingHoursSource;
use crate::types::WorkingWindow;

/// List available working windows for a date range, ordered by date then start
pub async fn list_available_windows(
    pool: &PgPool,
    from: NaiveDate,
    until: NaiveDate,
) -> Result<Vec<WorkingWindow>> {
    let windows = sqlx::query_as::<_, WorkingWindow>(
        r#"
        SELECT id, date, start_time, end_time, is_available
        FROM working_hours
        WHERE date >= $1 AND date <= $2 AND is_available = TRUE
        ORDER BY date, start_time
        "#,
    )
    .bind(from)
    .bind(until)
    .fetch_all(pool)
    .await?;

    Ok(windows)
}

/// Postgres-backed working-hours source for the slot engine
#[derive(Clone)]
pub struct PgWorkingHoursSource {
    pool: PgPool,
}

impl PgWorkingHoursSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkingHoursSource for PgWorkingHoursSource {
    async fn list_windows(&self, from: NaiveDate, days_ahead: u64) -> Result<Vec<WorkingWindow>> {
        let until = from + chrono::Duration::days(days_ahead.max(1) as i64 - 1);
        list_available_windows(&self.pool, from, until).await
    }
}
