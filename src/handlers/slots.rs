//! Slot search handlers

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::services::scheduler::{SchedulerError, SlotFinder};
use crate::types::{
    ErrorResponse, FindSlotsRequest, FindSlotsResponse, Location, PreferredSlotsRequest,
    PreferredSlotsResponse, Request, SuccessResponse,
};

/// Bounds on requested service duration, matching the booking form
const MIN_DURATION_MINS: i64 = 30;
const MAX_DURATION_MINS: i64 = 180;

/// Helper macro for error responses
macro_rules! error_response {
    ($request_id:expr, $code:expr, $msg:expr) => {
        ErrorResponse::new($request_id, $code, $msg)
    };
}

fn duration_out_of_bounds(duration_mins: i64) -> bool {
    !(MIN_DURATION_MINS..=MAX_DURATION_MINS).contains(&duration_mins)
}

fn scheduler_error_response(request_id: Uuid, err: &SchedulerError) -> ErrorResponse {
    match err {
        SchedulerError::Store(source) => {
            error_response!(request_id, "STORE_ERROR", source.to_string())
        }
        SchedulerError::Cancelled => error_response!(request_id, "CANCELLED", "Search cancelled"),
    }
}

/// Handle slots.find requests
pub async fn handle_find(
    client: Client,
    mut subscriber: Subscriber,
    finder: Arc<SlotFinder>,
    shutdown: CancellationToken,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received slots.find message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("slots.find message without reply subject");
                continue;
            }
        };

        let request: Request<FindSlotsRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse slots.find request: {}", e);
                let response = error_response!(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
                continue;
            }
        };

        let req = request.payload;
        if duration_out_of_bounds(req.duration_mins) {
            let response = error_response!(
                request.id,
                "INVALID_REQUEST",
                format!(
                    "duration_mins must be between {} and {}",
                    MIN_DURATION_MINS, MAX_DURATION_MINS
                )
            );
            let _ = client
                .publish(reply, serde_json::to_vec(&response)?.into())
                .await;
            continue;
        }

        // Child of the worker shutdown token: a SIGINT mid-search aborts the
        // scan at the next candidate instead of finishing the full window.
        let cancel = shutdown.child_token();
        let result: Result<FindSlotsResponse, SchedulerError> = finder
            .find_best_slots(
                Location::new(req.lat, req.lng),
                req.duration_mins,
                req.from_date,
                &cancel,
            )
            .await;

        match result {
            Ok(payload) => {
                let response = SuccessResponse::new(request.id, payload);
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
            Err(e) => {
                error!("slots.find failed: {}", e);
                let response = scheduler_error_response(request.id, &e);
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
        }
    }

    Ok(())
}

/// Handle slots.preferred requests
pub async fn handle_preferred(
    client: Client,
    mut subscriber: Subscriber,
    finder: Arc<SlotFinder>,
    shutdown: CancellationToken,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received slots.preferred message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("slots.preferred message without reply subject");
                continue;
            }
        };

        let request: Request<PreferredSlotsRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse slots.preferred request: {}", e);
                let response = error_response!(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
                continue;
            }
        };

        let req = request.payload;
        if duration_out_of_bounds(req.duration_mins) {
            let response = error_response!(
                request.id,
                "INVALID_REQUEST",
                format!(
                    "duration_mins must be between {} and {}",
                    MIN_DURATION_MINS, MAX_DURATION_MINS
                )
            );
            let _ = client
                .publish(reply, serde_json::to_vec(&response)?.into())
                .await;
            continue;
        }

        let cancel = shutdown.child_token();
        let result = finder
            .find_preferred_slots(
                Location::new(req.lat, req.lng),
                req.duration_mins,
                req.preferred_date,
                req.preferred_window,
                &cancel,
            )
            .await;

        match result {
            Ok(slots) => {
                let response = SuccessResponse::new(request.id, PreferredSlotsResponse { slots });
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
            Err(e) => {
                error!("slots.preferred failed: {}", e);
                let response = scheduler_error_response(request.id, &e);
                let _ = client
                    .publish(reply, serde_json::to_vec(&response)?.into())
                    .await;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_bounds() {
        assert!(duration_out_of_bounds(15));
        assert!(!duration_out_of_bounds(30));
        assert!(!duration_out_of_bounds(180));
        assert!(duration_out_of_bounds(181));
        assert!(duration_out_of_bounds(0));
    }

    #[test]
    fn test_find_request_envelope_round_trips() {
        let request = Request::new(FindSlotsRequest {
            lat: 55.9533,
            lng: -3.1883,
            duration_mins: 60,
            from_date: None,
        });
        let bytes = serde_json::to_vec(&request).unwrap();
        let parsed: Request<FindSlotsRequest> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.id, request.id);
        assert_eq!(parsed.payload.duration_mins, 60);
    }

    #[test]
    fn test_scheduler_error_codes() {
        let store = SchedulerError::Store(anyhow::anyhow!("boom"));
        assert_eq!(scheduler_error_response(Uuid::nil(), &store).error.code, "STORE_ERROR");

        let cancelled = SchedulerError::Cancelled;
        assert_eq!(scheduler_error_response(Uuid::nil(), &cancelled).error.code, "CANCELLED");
    }
}
