use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

/// Free-text delivery address, optionally carrying coordinates resolved at
/// checkout time. When `coordinates` is present the dispatcher skips the
/// geocoder entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub text: String,
    pub coordinates: Option<GeoPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Placed,
    Preparing,
    OutForDelivery,
    Delivered,
    Cancelled,
}

/// A customer purchase awaiting fulfillment. `assigned_rider` goes from
/// `None` to a rider id exactly once per successful dispatch; cancellation
/// and delivery are the only paths that release the rider again. Orders are
/// never deleted, only status-transitioned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub address: DeliveryAddress,
    pub items: Vec<LineItem>,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub assigned_rider: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new(address: DeliveryAddress, items: Vec<LineItem>, total_amount: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            address,
            items,
            total_amount,
            status: OrderStatus::Placed,
            assigned_rider: None,
            created_at: Utc::now(),
        }
    }
}
