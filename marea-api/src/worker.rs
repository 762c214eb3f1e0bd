use chrono::Utc;
use marea_dispatch::LiveRideDispatcher;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Background expiry sweeper. Handlers still sweep opportunistically; this
/// task bounds expiry latency by the interval instead of client poll cadence.
pub async fn start_expiry_worker(dispatcher: Arc<LiveRideDispatcher>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!("Expiry worker started, sweeping every {:?}", interval);

    loop {
        ticker.tick().await;
        match dispatcher.sweep_expired(Utc::now()).await {
            Ok(0) => {}
            Ok(expired) => info!(expired, "expiry sweep reclaimed stale offers"),
            Err(e) => error!("Expiry sweep failed: {}", e),
        }
    }
}
