use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};
use uuid::Uuid;

use crate::engine::queue::enqueue_dispatch;
use crate::models::order::OrderStatus;
use crate::state::AppState;

/// Periodically re-enqueues placed orders that still have no rider, so
/// fleets that were empty or fully contended at dispatch time get another
/// chance. Duplicate enqueues are harmless: the coordinator's idempotency
/// guard turns them into no-ops.
pub async fn run_redispatch_sweep(state: Arc<AppState>, sweep_interval: Duration) {
    if sweep_interval.is_zero() {
        info!("re-dispatch sweep disabled");
        return;
    }

    info!(interval_secs = sweep_interval.as_secs(), "re-dispatch sweep started");

    let mut ticker = interval(sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // First tick completes immediately; skip it so fresh orders get their
    // full first interval through the normal queue path.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let stale: Vec<Uuid> = state
            .orders
            .iter()
            .filter(|entry| {
                let order = entry.value();
                order.status == OrderStatus::Placed && order.assigned_rider.is_none()
            })
            .map(|entry| *entry.key())
            .collect();

        if stale.is_empty() {
            continue;
        }

        info!(count = stale.len(), "re-enqueueing unassigned orders");
        for order_id in stale {
            if let Err(err) = enqueue_dispatch(&state, order_id).await {
                error!(%order_id, error = %err, "failed to re-enqueue order");
                return;
            }
        }
    }
}
