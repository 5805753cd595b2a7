use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::engine::coordinator;
use crate::engine::queue::enqueue_dispatch;
use crate::error::AppError;
use crate::models::order::{DeliveryAddress, LineItem, Order, OrderStatus};
use crate::models::result::AssignmentResult;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/dispatch", post(dispatch_order))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/orders/:id/status", patch(update_order_status))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub address: DeliveryAddress,
    #[serde(default)]
    pub items: Vec<LineItem>,
    pub total_amount: f64,
}

#[derive(Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    if payload.address.text.trim().is_empty() && payload.address.coordinates.is_none() {
        return Err(AppError::BadRequest(
            "delivery address must have text or coordinates".to_string(),
        ));
    }

    if !payload.total_amount.is_finite() || payload.total_amount < 0.0 {
        return Err(AppError::BadRequest(
            "total_amount must be a non-negative number".to_string(),
        ));
    }

    let order = Order::new(payload.address, payload.items, payload.total_amount);
    state.orders.insert(order.id, order.clone());
    enqueue_dispatch(&state, order.id).await?;

    Ok(Json(order))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", id)))?;

    Ok(Json(order.value().clone()))
}

/// Synchronous dispatch of one order. Business outcomes (no riders, geocode
/// miss, already assigned, ...) come back as a 200 with the structured
/// result; callers inspect `success` and `reason`.
async fn dispatch_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Json<AssignmentResult> {
    Json(coordinator::dispatch(&state, id).await)
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let released_rider;
    let updated = {
        let mut order = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("order {} not found", id)))?;

        match order.status {
            OrderStatus::Delivered => {
                return Err(AppError::Conflict(
                    "delivered orders cannot be cancelled".to_string(),
                ));
            }
            OrderStatus::Cancelled => return Ok(Json(order.clone())),
            _ => {}
        }

        order.status = OrderStatus::Cancelled;
        released_rider = order.assigned_rider.take();
        order.clone()
    };

    if let Some(rider_id) = released_rider {
        state.directory.release(rider_id);
        info!(order_id = %id, %rider_id, "order cancelled, rider released");
    } else {
        info!(order_id = %id, "order cancelled");
    }

    Ok(Json(updated))
}

/// Delivery-status updates from the rider app. Only the forward transitions
/// `preparing -> out_for_delivery -> delivered` are accepted; delivery
/// frees the rider for the next order.
async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Order>, AppError> {
    let rider_to_release;
    let updated = {
        let mut order = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("order {} not found", id)))?;

        match (order.status, payload.status) {
            (OrderStatus::Preparing, OrderStatus::OutForDelivery) => {
                order.status = OrderStatus::OutForDelivery;
                rider_to_release = None;
            }
            (OrderStatus::OutForDelivery, OrderStatus::Delivered) => {
                order.status = OrderStatus::Delivered;
                rider_to_release = order.assigned_rider;
            }
            (current, requested) => {
                return Err(AppError::Conflict(format!(
                    "cannot move order from {current:?} to {requested:?}"
                )));
            }
        }

        order.clone()
    };

    if let Some(rider_id) = rider_to_release {
        state.directory.release(rider_id);
        info!(order_id = %id, %rider_id, "order delivered, rider released");
    }

    Ok(Json(updated))
}
