use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal outcome of one dispatch attempt. These are business outcomes,
/// not errors: a dispatch that finds no riders completed normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchReason {
    Assigned,
    NoRidersAvailable,
    GeocodeFailure,
    AllCandidatesContended,
    OrderNotFound,
    AlreadyAssigned,
    OrderCancelled,
}

impl DispatchReason {
    /// Whether the caller should expect a later retry (by the sweep or a
    /// manual re-trigger) to change the outcome.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            DispatchReason::NoRidersAvailable
                | DispatchReason::GeocodeFailure
                | DispatchReason::AllCandidatesContended
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentResult {
    pub success: bool,
    pub order_id: Uuid,
    pub assigned_rider_id: Option<Uuid>,
    pub reason: DispatchReason,
    pub message: String,
}

impl AssignmentResult {
    pub fn assigned(order_id: Uuid, rider_id: Uuid, distance_km: f64) -> Self {
        Self {
            success: true,
            order_id,
            assigned_rider_id: Some(rider_id),
            reason: DispatchReason::Assigned,
            message: format!("assigned rider {rider_id} at {distance_km:.2} km"),
        }
    }

    pub fn unassigned(order_id: Uuid, reason: DispatchReason, message: impl Into<String>) -> Self {
        Self {
            success: false,
            order_id,
            assigned_rider_id: None,
            reason,
            message: message.into(),
        }
    }
}
