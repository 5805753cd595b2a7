use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::coordinator;
use crate::models::result::DispatchReason;
use crate::state::AppState;

/// Consumes order ids from the dispatch queue and runs the coordinator for
/// each. Unassignable orders are not re-queued here; the periodic sweep
/// picks them up again.
pub async fn run_dispatch_worker(state: Arc<AppState>, mut dispatch_rx: mpsc::Receiver<Uuid>) {
    info!("dispatch worker started");

    while let Some(order_id) = dispatch_rx.recv().await {
        state.metrics.orders_in_queue.dec();

        let start = Instant::now();
        let result = coordinator::dispatch(&state, order_id).await;
        let elapsed = start.elapsed().as_secs_f64();

        let outcome = if result.success { "success" } else { "unassigned" };
        state
            .metrics
            .dispatch_latency_seconds
            .with_label_values(&[outcome])
            .observe(elapsed);

        match result.reason {
            DispatchReason::Assigned | DispatchReason::AlreadyAssigned => {}
            reason => {
                warn!(%order_id, ?reason, message = %result.message, "order not assigned");
            }
        }
    }

    warn!("dispatch worker stopped: queue channel closed");
}
