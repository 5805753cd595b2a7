use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("push request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("push gateway rejected the request: {0}")]
    Gateway(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

impl PushPayload {
    pub fn new_assignment(order_id: Uuid) -> Self {
        Self {
            title: "New delivery assigned".to_string(),
            body: "Open the app to see pickup details".to_string(),
            data: json!({ "order_id": order_id }),
        }
    }
}

/// Delivers an assignment event to a rider's device. Best-effort, at most
/// once: failures are surfaced to the caller for logging but never roll
/// back a claim.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_push(&self, device_token: &str, payload: &PushPayload) -> Result<(), NotifyError>;
}

/// Logs instead of pushing. Default when no gateway is configured, and the
/// stand-in for tests.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_push(&self, device_token: &str, payload: &PushPayload) -> Result<(), NotifyError> {
        info!(device_token, title = %payload.title, "push suppressed: no gateway configured");
        Ok(())
    }
}

/// Posts pushes to an FCM-style gateway: `POST {endpoint}/send` with
/// `{to, title, body, data}`.
pub struct HttpPushNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPushNotifier {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Notifier for HttpPushNotifier {
    async fn send_push(&self, device_token: &str, payload: &PushPayload) -> Result<(), NotifyError> {
        let url = format!("{}/send", self.endpoint);
        let response = self
            .client
            .post(url)
            .json(&json!({
                "to": device_token,
                "title": payload.title,
                "body": payload.body,
                "data": payload.data,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Gateway(format!(
                "push gateway returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}
