use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

/// A delivery agent. `location` comes from the rider's own client and may be
/// stale or absent; a rider with no location is never eligible for dispatch.
///
/// The `(available, assigned_order)` pair is the claim state. It is mutated
/// only through `RiderDirectory::try_claim` and `RiderDirectory::release`,
/// which flip both fields in one critical section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rider {
    pub id: Uuid,
    pub name: String,
    pub location: Option<GeoPoint>,
    pub available: bool,
    pub assigned_order: Option<Uuid>,
    pub device_token: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Rider {
    pub fn new(name: String, location: Option<GeoPoint>, device_token: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            location,
            available: true,
            assigned_order: None,
            device_token,
            updated_at: Utc::now(),
        }
    }
}
