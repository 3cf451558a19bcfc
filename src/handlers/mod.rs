//! NATS message handlers

pub mod ping;
pub mod slots;

use std::sync::Arc;

use anyhow::Result;
use async_nats::Client;
use sqlx::PgPool;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::Config;
use crate::db::queries::{PgAppointmentStore, PgWorkingHoursSource};
use crate::services::routing::{create_providers, DriveTimeEstimator};
use crate::services::scheduler::SlotFinder;

/// Subscribe to all subjects and run handlers until one fails
pub async fn start_handlers(client: Client, pool: PgPool, config: &Config) -> Result<()> {
    info!("Starting message handlers...");

    let providers = create_providers(config);
    info!("Routing providers configured: {}", providers.len());
    let estimator = Arc::new(DriveTimeEstimator::new(providers));

    let finder = Arc::new(SlotFinder::new(
        Arc::new(PgWorkingHoursSource::new(pool.clone())),
        Arc::new(PgAppointmentStore::new(pool)),
        estimator,
        config.home_base,
    ));

    // Worker-wide shutdown token; every in-flight search holds a child of
    // it, so SIGINT aborts searches instead of leaving them running.
    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received, cancelling in-flight searches");
                shutdown.cancel();
            }
        });
    }

    let ping_sub = client.subscribe("rounds.ping").await?;
    let slots_find_sub = client.subscribe("rounds.slots.find").await?;
    let slots_preferred_sub = client.subscribe("rounds.slots.preferred").await?;

    let ping_handle = tokio::spawn(ping::handle_ping(client.clone(), ping_sub));
    let slots_find_handle = tokio::spawn(slots::handle_find(
        client.clone(),
        slots_find_sub,
        finder.clone(),
        shutdown.clone(),
    ));
    let slots_preferred_handle = tokio::spawn(slots::handle_preferred(
        client.clone(),
        slots_preferred_sub,
        finder,
        shutdown.clone(),
    ));

    info!("All handlers started, waiting for messages...");

    // Wait for shutdown or for any handler to finish (which means an error
    // occurred)
    select! {
        _ = shutdown.cancelled() => {
            info!("Handlers stopping on shutdown");
        }
        result = ping_handle => {
            error!("Ping handler finished: {:?}", result);
        }
        result = slots_find_handle => {
            error!("Slots find handler finished: {:?}", result);
        }
        result = slots_preferred_handle => {
            error!("Slots preferred handler finished: {:?}", result);
        }
    }

    Ok(())
}
