//! Candidate slot validation
//!
//! Checks one candidate against the day's confirmed appointments: no overlap,
//! enough drive time on both sides, and a detour-cost score for ranking.

use chrono::NaiveTime;
use tracing::debug;

use super::{minutes_between, CandidateInput};
use crate::defaults::{default_day_end, default_day_start};
use crate::services::routing::DriveTimeEstimator;
use crate::types::{ExistingAppointment, Location, RejectReason, ValidationResult};

/// Half-open interval overlap; touching endpoints do not collide.
fn overlaps(a_start: NaiveTime, a_end: NaiveTime, b_start: NaiveTime, b_end: NaiveTime) -> bool {
    a_start < b_end && a_end > b_start
}

/// Validate a candidate against the day's appointment snapshot.
///
/// Issues two drive-time lookups concurrently (three when the neighbors are
/// distinct points); routing failures reject the candidate rather than
/// surfacing as errors.
pub async fn validate(
    candidate: &CandidateInput,
    existing: &[ExistingAppointment],
    estimator: &DriveTimeEstimator,
    home_base: Location,
) -> ValidationResult {
    let start = candidate.start_time;
    let end = super::add_minutes(start, candidate.duration_mins);

    for appt in existing {
        if appt.date == candidate.date && overlaps(start, end, appt.start_time, appt.end_time) {
            return ValidationResult::rejected(RejectReason::Overlap);
        }
    }

    // The store orders by start time; re-sort locally so neighbor lookup
    // never depends on that.
    let mut sorted: Vec<&ExistingAppointment> =
        existing.iter().filter(|a| a.date == candidate.date).collect();
    sorted.sort_by_key(|a| a.start_time);

    let prev = sorted.iter().rev().find(|a| a.end_time <= start);
    let next = sorted.iter().find(|a| a.start_time >= end);

    // Absent neighbors anchor the candidate to home base at the day boundary
    let (prev_loc, prev_end) = match prev {
        Some(appt) => (appt.location(), appt.end_time),
        None => (home_base, default_day_start()),
    };
    let (next_loc, next_start) = match next {
        Some(appt) => (appt.location(), appt.start_time),
        None => (home_base, default_day_end()),
    };

    let (prev_drive, next_drive) = tokio::join!(
        estimator.drive_minutes(&prev_loc, &candidate.location),
        estimator.drive_minutes(&candidate.location, &next_loc),
    );

    let (prev_drive, next_drive) = match (prev_drive, next_drive) {
        (Ok(p), Ok(n)) => (p, n),
        (Err(err), _) | (_, Err(err)) => {
            debug!(
                "Candidate {} {} rejected, no route: {}",
                candidate.date, candidate.start_time, err
            );
            return ValidationResult::rejected(RejectReason::RouteUnavailable);
        }
    };

    let gap_before = minutes_between(prev_end, start);
    let gap_after = minutes_between(end, next_start);

    if prev_drive > gap_before || next_drive > gap_after {
        return ValidationResult::rejected(RejectReason::DriveWindow);
    }

    // Detour cost of inserting between the neighbors. When both neighbors
    // are the same point the direct leg is zero by definition.
    let base_drive = if prev_loc.same_point(&next_loc) {
        0
    } else {
        match estimator.drive_minutes(&prev_loc, &next_loc).await {
            Ok(mins) => mins,
            Err(err) => {
                debug!(
                    "Candidate {} {} rejected, no base route: {}",
                    candidate.date, candidate.start_time, err
                );
                return ValidationResult::rejected(RejectReason::RouteUnavailable);
            }
        }
    };

    ValidationResult::ok((prev_drive + next_drive - base_drive) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::routing::{MockRoutingProvider, RouteError, RoutingProvider};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Arc;
    use uuid::Uuid;

    /// Provider returning a fixed duration for every pair
    struct FixedProvider {
        seconds: f64,
    }

    #[async_trait]
    impl RoutingProvider for FixedProvider {
        async fn drive_seconds(&self, _: &Location, _: &Location) -> Result<f64, RouteError> {
            Ok(self.seconds)
        }

        fn id(&self) -> &'static str {
            "fixed"
        }
    }

    /// Provider that never finds a route
    struct DeadProvider;

    #[async_trait]
    impl RoutingProvider for DeadProvider {
        async fn drive_seconds(&self, _: &Location, _: &Location) -> Result<f64, RouteError> {
            Err(RouteError::Unavailable("nothing here".into()))
        }

        fn id(&self) -> &'static str {
            "dead"
        }
    }

    fn fixed_estimator(minutes: f64) -> DriveTimeEstimator {
        DriveTimeEstimator::new(vec![Arc::new(FixedProvider {
            seconds: minutes * 60.0,
        })])
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn home_base() -> Location {
        Location::new(55.7956, -3.7939)
    }

    fn appt(start: NaiveTime, end: NaiveTime, lat: f64, lng: f64) -> ExistingAppointment {
        ExistingAppointment {
            id: Uuid::new_v4(),
            date: date(),
            start_time: start,
            end_time: end,
            lat,
            lng,
        }
    }

    fn candidate(start: NaiveTime, duration_mins: i64) -> CandidateInput {
        CandidateInput {
            date: date(),
            start_time: start,
            duration_mins,
            location: Location::new(55.80, -3.80),
        }
    }

    #[tokio::test]
    async fn test_overlapping_candidate_rejected() {
        let existing = vec![appt(time(10, 0), time(10, 30), 55.81, -3.81)];
        let estimator = fixed_estimator(10.0);

        let result = validate(&candidate(time(10, 15), 30), &existing, &estimator, home_base()).await;

        assert!(!result.valid);
        assert_eq!(result.reason, Some(RejectReason::Overlap));
        assert_eq!(result.score, None);
    }

    #[tokio::test]
    async fn test_overlap_short_circuits_without_drive_lookups() {
        let existing = vec![appt(time(10, 0), time(10, 30), 55.81, -3.81)];
        // A dead provider would reject with route_unavailable if consulted
        let estimator = DriveTimeEstimator::new(vec![Arc::new(DeadProvider)]);

        let result = validate(&candidate(time(10, 15), 30), &existing, &estimator, home_base()).await;

        assert_eq!(result.reason, Some(RejectReason::Overlap));
    }

    #[tokio::test]
    async fn test_feasible_candidate_between_two_appointments() {
        let existing = vec![
            appt(time(10, 0), time(10, 30), 55.81, -3.81),
            appt(time(13, 0), time(13, 30), 55.82, -3.82),
        ];
        let estimator = fixed_estimator(10.0);

        let result = validate(&candidate(time(11, 0), 30), &existing, &estimator, home_base()).await;

        assert!(result.valid);
        // Detour: 10 (prev->cand) + 10 (cand->next) - 10 (prev->next)
        assert_eq!(result.score, Some(10.0));
    }

    #[tokio::test]
    async fn test_touching_endpoints_do_not_overlap() {
        let existing = vec![appt(time(10, 0), time(10, 30), 55.81, -3.81)];
        let estimator = fixed_estimator(0.0);

        // Starts exactly when the existing appointment ends
        let result = validate(&candidate(time(10, 30), 30), &existing, &estimator, home_base()).await;

        assert_ne!(result.reason, Some(RejectReason::Overlap));
        assert!(result.valid);
    }

    #[tokio::test]
    async fn test_insufficient_drive_gap_rejected() {
        let existing = vec![appt(time(10, 0), time(10, 30), 55.81, -3.81)];
        // Only 15 minutes between the previous end and the candidate start
        let estimator = fixed_estimator(20.0);

        let result = validate(&candidate(time(10, 45), 30), &existing, &estimator, home_base()).await;

        assert!(!result.valid);
        assert_eq!(result.reason, Some(RejectReason::DriveWindow));
    }

    #[tokio::test]
    async fn test_drive_exactly_filling_gap_is_allowed() {
        let existing = vec![
            appt(time(10, 0), time(10, 30), 55.81, -3.81),
            appt(time(13, 0), time(13, 30), 55.82, -3.82),
        ];
        // The 10:30->11:00 gap is exactly 30 minutes; a 30-minute leg fits
        let estimator = fixed_estimator(30.0);

        let result = validate(&candidate(time(11, 0), 30), &existing, &estimator, home_base()).await;

        assert!(result.valid, "a drive equal to the gap must pass: {:?}", result.reason);
    }

    #[tokio::test]
    async fn test_empty_day_anchors_to_home_base_boundaries() {
        let estimator = fixed_estimator(10.0);

        // No appointments: prev and next are both home base, so the direct
        // leg is zero without a lookup and the score is the full round trip.
        let result = validate(&candidate(time(11, 0), 30), &[], &estimator, home_base()).await;

        assert!(result.valid);
        assert_eq!(result.score, Some(20.0));
    }

    #[tokio::test]
    async fn test_empty_day_before_day_start_rejected() {
        let estimator = fixed_estimator(10.0);

        // 08:00 start is before the assumed 09:00 day start; the drive
        // window from home base is negative.
        let result = validate(&candidate(time(8, 0), 30), &[], &estimator, home_base()).await;

        assert!(!result.valid);
        assert_eq!(result.reason, Some(RejectReason::DriveWindow));
    }

    #[tokio::test]
    async fn test_route_failure_rejects_not_errors() {
        let estimator = DriveTimeEstimator::new(vec![Arc::new(DeadProvider)]);

        let result = validate(&candidate(time(11, 0), 30), &[], &estimator, home_base()).await;

        assert!(!result.valid);
        assert_eq!(result.reason, Some(RejectReason::RouteUnavailable));
    }

    #[tokio::test]
    async fn test_score_negative_when_insertion_shortens_leg() {
        // A provider may report the two legs through the candidate as faster
        // than the direct prev->next leg; the negative detour must survive.
        struct AsymmetricProvider;

        #[async_trait]
        impl RoutingProvider for AsymmetricProvider {
            async fn drive_seconds(&self, origin: &Location, destination: &Location)
                -> Result<f64, RouteError>
            {
                // prev->next is reported much slower than the legs through
                // the candidate (e.g. the direct road is closed)
                let far = (origin.lat - destination.lat).abs() > 0.03;
                Ok(if far { 2400.0 } else { 300.0 })
            }

            fn id(&self) -> &'static str {
                "asymmetric"
            }
        }

        let existing = vec![
            appt(time(9, 0), time(9, 30), 55.78, -3.80),
            appt(time(13, 0), time(13, 30), 55.82, -3.80),
        ];
        let estimator = DriveTimeEstimator::new(vec![Arc::new(AsymmetricProvider)]);

        let result = validate(&candidate(time(11, 0), 30), &existing, &estimator, home_base()).await;

        assert!(result.valid);
        // 5 + 5 - 40: inserting the stop shortens the day's driving
        assert_eq!(result.score, Some(-30.0));
    }

    #[tokio::test]
    async fn test_score_deterministic_on_warm_cache() {
        let existing = vec![
            appt(time(10, 0), time(10, 30), 55.81, -3.81),
            appt(time(13, 0), time(13, 30), 55.82, -3.82),
        ];
        let estimator = DriveTimeEstimator::new(vec![Arc::new(MockRoutingProvider::new())]);

        let first = validate(&candidate(time(11, 0), 30), &existing, &estimator, home_base()).await;
        let second = validate(&candidate(time(11, 0), 30), &existing, &estimator, home_base()).await;

        assert_eq!(first, second);
    }
}
