mod api;
mod config;
mod directory;
mod engine;
mod error;
mod geo;
mod geocode;
mod models;
mod notify;
mod observability;
mod state;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::error::AppError;
use crate::geocode::{Geocoder, HttpGeocoder, StaticGeocoder};
use crate::notify::{HttpPushNotifier, LogNotifier, Notifier};
use crate::state::DispatchTimeouts;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let timeouts = DispatchTimeouts {
        geocode: Duration::from_millis(config.geocode_timeout_ms),
        notify: Duration::from_millis(config.notify_timeout_ms),
    };

    let geocoder: Arc<dyn Geocoder> = match &config.geocoder_url {
        Some(url) => {
            tracing::info!(url = %url, "using http geocoder");
            Arc::new(
                HttpGeocoder::new(url, timeouts.geocode)
                    .map_err(|err| AppError::Internal(format!("geocoder setup failed: {err}")))?,
            )
        }
        None => {
            // Orders must then carry coordinates resolved at checkout.
            tracing::info!("no geocoder configured, relying on precomputed coordinates");
            Arc::new(StaticGeocoder::new())
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.push_gateway_url {
        Some(url) => {
            tracing::info!(url = %url, "using http push gateway");
            Arc::new(
                HttpPushNotifier::new(url, timeouts.notify)
                    .map_err(|err| AppError::Internal(format!("notifier setup failed: {err}")))?,
            )
        }
        None => Arc::new(LogNotifier),
    };

    let (app_state, dispatch_rx) = state::AppState::new(
        config.order_queue_size,
        config.event_buffer_size,
        geocoder,
        notifier,
        timeouts,
    );
    let shared_state = Arc::new(app_state);

    let app = api::rest::router(shared_state.clone());

    tokio::spawn(engine::worker::run_dispatch_worker(
        shared_state.clone(),
        dispatch_rx,
    ));
    tokio::spawn(engine::sweep::run_redispatch_sweep(
        shared_state.clone(),
        Duration::from_secs(config.sweep_interval_secs),
    ));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
