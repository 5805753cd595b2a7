use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::directory::ClaimOutcome;
use crate::geo::{rank_by_distance, GeoPoint};
use crate::models::order::OrderStatus;
use crate::models::result::{AssignmentResult, DispatchReason};
use crate::notify::PushPayload;
use crate::state::AppState;

/// Runs one dispatch attempt for an order: geocode, rank available riders
/// by distance, claim the nearest one atomically, record the assignment,
/// and notify the rider. Safe to re-invoke on the same order at any time;
/// the idempotency guard makes duplicate triggers harmless.
///
/// Every expected outcome comes back as an `AssignmentResult`; nothing in
/// here corrupts order or rider state on the failure paths.
pub async fn dispatch(state: &AppState, order_id: Uuid) -> AssignmentResult {
    let result = try_assign(state, order_id).await;

    state
        .metrics
        .dispatches_total
        .with_label_values(&[reason_label(result.reason)])
        .inc();
    state
        .metrics
        .riders_available
        .set(state.directory.available_count() as i64);

    // Subscribers may come and go; a send with no receivers is fine.
    let _ = state.dispatch_events_tx.send(result.clone());

    result
}

async fn try_assign(state: &AppState, order_id: Uuid) -> AssignmentResult {
    let Some(order) = state.orders.get(&order_id).map(|entry| entry.value().clone()) else {
        return AssignmentResult::unassigned(
            order_id,
            DispatchReason::OrderNotFound,
            format!("order {order_id} not found"),
        );
    };

    // Idempotency guard: a re-triggered dispatch of an assigned order is a
    // no-op, not an error.
    if let Some(rider_id) = order.assigned_rider {
        return AssignmentResult {
            success: false,
            order_id,
            assigned_rider_id: Some(rider_id),
            reason: DispatchReason::AlreadyAssigned,
            message: format!("order already assigned to rider {rider_id}"),
        };
    }

    if order.status == OrderStatus::Cancelled {
        return AssignmentResult::unassigned(
            order_id,
            DispatchReason::OrderCancelled,
            "order was cancelled before dispatch",
        );
    }

    let origin = match resolve_origin(state, order_id, &order.address.text, order.address.coordinates).await {
        Ok(point) => point,
        Err(message) => {
            return AssignmentResult::unassigned(order_id, DispatchReason::GeocodeFailure, message);
        }
    };

    let candidates: Vec<(Uuid, GeoPoint)> = state
        .directory
        .list_available()
        .into_iter()
        .map(|snapshot| (snapshot.id, snapshot.location))
        .collect();

    if candidates.is_empty() {
        return AssignmentResult::unassigned(
            order_id,
            DispatchReason::NoRidersAvailable,
            "no riders available; order left for re-dispatch",
        );
    }

    let ranked = rank_by_distance(&origin, candidates);

    // The customer may have cancelled while we were geocoding; nothing is
    // claimed yet, so aborting here needs no compensation.
    if order_cancelled(state, order_id) {
        return AssignmentResult::unassigned(
            order_id,
            DispatchReason::OrderCancelled,
            "order was cancelled during dispatch",
        );
    }

    claim_from_ranked(state, order_id, ranked).await
}

/// Walks the ranked candidate list and tries to claim each rider in turn.
/// The snapshot behind `ranked` may be stale: a candidate claimed by a
/// concurrent dispatch in the meantime answers `AlreadyTaken` and the loop
/// falls through to the next-nearest.
async fn claim_from_ranked(
    state: &AppState,
    order_id: Uuid,
    ranked: Vec<(Uuid, f64)>,
) -> AssignmentResult {
    for (rider_id, distance_km) in ranked {
        match state.directory.try_claim(rider_id, order_id) {
            ClaimOutcome::AlreadyTaken => {
                debug!(%order_id, %rider_id, "candidate contended, falling through");
                continue;
            }
            ClaimOutcome::Claimed => {
                if order_cancelled(state, order_id) {
                    state.directory.release(rider_id);
                    return AssignmentResult::unassigned(
                        order_id,
                        DispatchReason::OrderCancelled,
                        "order was cancelled during dispatch; claim released",
                    );
                }

                match commit_assignment(state, order_id, rider_id) {
                    Ok(()) => {}
                    Err(result) => {
                        state.directory.release(rider_id);
                        return result;
                    }
                }

                info!(%order_id, %rider_id, distance_km, "order assigned");
                notify_rider(state, order_id, rider_id).await;

                return AssignmentResult::assigned(order_id, rider_id, distance_km);
            }
        }
    }

    AssignmentResult::unassigned(
        order_id,
        DispatchReason::AllCandidatesContended,
        "every ranked rider was claimed first; order left for re-dispatch",
    )
}

async fn resolve_origin(
    state: &AppState,
    order_id: Uuid,
    address: &str,
    precomputed: Option<GeoPoint>,
) -> Result<GeoPoint, String> {
    if let Some(point) = precomputed {
        return Ok(point);
    }

    match timeout(state.timeouts.geocode, state.geocoder.resolve(address)).await {
        Ok(Ok(Some(point))) => Ok(point),
        Ok(Ok(None)) => Err(format!("address not geocodable: {address:?}")),
        Ok(Err(err)) => {
            warn!(%order_id, error = %err, "geocoder call failed");
            Err(format!("geocoder error: {err}"))
        }
        Err(_) => {
            warn!(%order_id, "geocoder call timed out");
            Err("geocoder timed out".to_string())
        }
    }
}

/// Writes the assignment onto the order under its entry lock. Fails if a
/// concurrent dispatch got there first, or if a cancel landed after the
/// pre-commit cancellation check; in both cases the caller must release
/// the rider it just claimed.
fn commit_assignment(
    state: &AppState,
    order_id: Uuid,
    rider_id: Uuid,
) -> Result<(), AssignmentResult> {
    let Some(mut order) = state.orders.get_mut(&order_id) else {
        return Err(AssignmentResult::unassigned(
            order_id,
            DispatchReason::OrderNotFound,
            "order disappeared during dispatch",
        ));
    };

    if let Some(existing) = order.assigned_rider {
        return Err(AssignmentResult {
            success: false,
            order_id,
            assigned_rider_id: Some(existing),
            reason: DispatchReason::AlreadyAssigned,
            message: format!("order was assigned to rider {existing} by a concurrent dispatch"),
        });
    }

    // The cancel handler mutates status under this same entry lock, so a
    // cancel that slipped in after the pre-commit check is visible here
    // and must win; committing would resurrect a cancelled order.
    if order.status == OrderStatus::Cancelled {
        return Err(AssignmentResult::unassigned(
            order_id,
            DispatchReason::OrderCancelled,
            "order was cancelled during dispatch; claim released",
        ));
    }

    order.assigned_rider = Some(rider_id);
    order.status = OrderStatus::Preparing;
    Ok(())
}

/// Best-effort push to the claimed rider. A failure here is logged and
/// surfaced through metrics only; the rider is booked either way and the
/// in-app view will show the assignment.
async fn notify_rider(state: &AppState, order_id: Uuid, rider_id: Uuid) {
    let Some(rider) = state.directory.get(&rider_id) else {
        return;
    };
    let Some(device_token) = rider.device_token else {
        debug!(%rider_id, "rider has no device token, skipping push");
        return;
    };

    let payload = PushPayload::new_assignment(order_id);
    match timeout(
        state.timeouts.notify,
        state.notifier.send_push(&device_token, &payload),
    )
    .await
    {
        Ok(Ok(())) => debug!(%rider_id, "assignment push delivered"),
        Ok(Err(err)) => warn!(%order_id, %rider_id, error = %err, "assignment push failed"),
        Err(_) => warn!(%order_id, %rider_id, "assignment push timed out"),
    }
}

fn order_cancelled(state: &AppState, order_id: Uuid) -> bool {
    state
        .orders
        .get(&order_id)
        .map(|entry| entry.value().status == OrderStatus::Cancelled)
        .unwrap_or(false)
}

fn reason_label(reason: DispatchReason) -> &'static str {
    match reason {
        DispatchReason::Assigned => "assigned",
        DispatchReason::NoRidersAvailable => "no_riders_available",
        DispatchReason::GeocodeFailure => "geocode_failure",
        DispatchReason::AllCandidatesContended => "all_candidates_contended",
        DispatchReason::OrderNotFound => "order_not_found",
        DispatchReason::AlreadyAssigned => "already_assigned",
        DispatchReason::OrderCancelled => "order_cancelled",
    }
}
