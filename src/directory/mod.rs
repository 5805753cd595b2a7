use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::geo::GeoPoint;
use crate::models::rider::Rider;

/// Outcome of an atomic claim attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed,
    AlreadyTaken,
}

/// Point-in-time view of one dispatchable rider. Staleness is expected;
/// the claim step re-validates before committing.
#[derive(Debug, Clone)]
pub struct RiderSnapshot {
    pub id: Uuid,
    pub location: GeoPoint,
}

/// Live rider registry. Rider clients write locations and availability;
/// the dispatch coordinator goes through `try_claim`/`release` only.
#[derive(Default)]
pub struct RiderDirectory {
    riders: DashMap<Uuid, Rider>,
}

impl RiderDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, rider: Rider) {
        self.riders.insert(rider.id, rider);
    }

    pub fn get(&self, rider_id: &Uuid) -> Option<Rider> {
        self.riders.get(rider_id).map(|entry| entry.value().clone())
    }

    pub fn list(&self) -> Vec<Rider> {
        self.riders.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.riders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.riders.is_empty()
    }

    pub fn available_count(&self) -> usize {
        self.riders
            .iter()
            .filter(|entry| entry.value().available)
            .count()
    }

    /// Snapshot of riders currently eligible for dispatch: available,
    /// unclaimed, and with a known location.
    pub fn list_available(&self) -> Vec<RiderSnapshot> {
        self.riders
            .iter()
            .filter_map(|entry| {
                let rider = entry.value();
                if !rider.available || rider.assigned_order.is_some() {
                    return None;
                }
                rider.location.map(|location| RiderSnapshot {
                    id: rider.id,
                    location,
                })
            })
            .collect()
    }

    /// Atomically claims a rider for an order. `get_mut` holds the map's
    /// entry lock for the whole check-then-set, so two concurrent claims on
    /// the same rider cannot both observe it available. At most one wins;
    /// the rest get `AlreadyTaken` with no side effects.
    pub fn try_claim(&self, rider_id: Uuid, order_id: Uuid) -> ClaimOutcome {
        let Some(mut rider) = self.riders.get_mut(&rider_id) else {
            return ClaimOutcome::AlreadyTaken;
        };

        if !rider.available || rider.assigned_order.is_some() {
            return ClaimOutcome::AlreadyTaken;
        }

        rider.available = false;
        rider.assigned_order = Some(order_id);
        rider.updated_at = Utc::now();
        ClaimOutcome::Claimed
    }

    /// Reverts a claim: the rider becomes available again with no assigned
    /// order. Used on cancellation before pickup and as compensation when
    /// dispatch must roll back. Idempotent.
    pub fn release(&self, rider_id: Uuid) {
        if let Some(mut rider) = self.riders.get_mut(&rider_id) {
            rider.available = true;
            rider.assigned_order = None;
            rider.updated_at = Utc::now();
        }
    }

    pub fn update_location(&self, rider_id: &Uuid, location: GeoPoint) -> Option<Rider> {
        let mut rider = self.riders.get_mut(rider_id)?;
        rider.location = Some(location);
        rider.updated_at = Utc::now();
        Some(rider.clone())
    }

    pub fn set_availability(&self, rider_id: &Uuid, available: bool) -> Option<Rider> {
        let mut rider = self.riders.get_mut(rider_id)?;
        rider.available = available;
        rider.updated_at = Utc::now();
        Some(rider.clone())
    }
}
