use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::directory::RiderDirectory;
use crate::geocode::Geocoder;
use crate::models::order::Order;
use crate::models::result::AssignmentResult;
use crate::notify::Notifier;
use crate::observability::metrics::Metrics;

/// Upper bounds on the dispatcher's external calls. A timed-out call is
/// treated the same as an explicit failure.
#[derive(Debug, Clone, Copy)]
pub struct DispatchTimeouts {
    pub geocode: Duration,
    pub notify: Duration,
}

impl Default for DispatchTimeouts {
    fn default() -> Self {
        Self {
            geocode: Duration::from_secs(3),
            notify: Duration::from_secs(2),
        }
    }
}

pub struct AppState {
    pub orders: DashMap<Uuid, Order>,
    pub directory: RiderDirectory,
    pub geocoder: Arc<dyn Geocoder>,
    pub notifier: Arc<dyn Notifier>,
    pub dispatch_tx: mpsc::Sender<Uuid>,
    pub dispatch_events_tx: broadcast::Sender<AssignmentResult>,
    pub timeouts: DispatchTimeouts,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        order_queue_size: usize,
        event_buffer_size: usize,
        geocoder: Arc<dyn Geocoder>,
        notifier: Arc<dyn Notifier>,
        timeouts: DispatchTimeouts,
    ) -> (Self, mpsc::Receiver<Uuid>) {
        let (dispatch_tx, dispatch_rx) = mpsc::channel(order_queue_size);
        let (dispatch_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        (
            Self {
                orders: DashMap::new(),
                directory: RiderDirectory::new(),
                geocoder,
                notifier,
                dispatch_tx,
                dispatch_events_tx,
                timeouts,
                metrics: Metrics::new(),
            },
            dispatch_rx,
        )
    }
}
