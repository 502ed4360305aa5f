//! Best-effort analytics emission.
//!
//! Events are sent at most once from a detached task. Failures are logged and dropped;
//! nothing is reported back to the caller.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sf_api_types::{EventPayload, EventType};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send(&self, event: &EventPayload) -> Result<()>;
}

/// Posts each event as JSON to the collection endpoint.
pub struct HttpEventSink {
    endpoint: String,
    http: reqwest::Client,
}

impl HttpEventSink {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build analytics http client")?;
        Ok(Self::with_client(endpoint, http))
    }

    pub fn with_client(endpoint: &str, http: reqwest::Client) -> Self {
        Self {
            endpoint: endpoint.to_owned(),
            http,
        }
    }
}

#[async_trait]
impl EventSink for HttpEventSink {
    async fn send(&self, event: &EventPayload) -> Result<()> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(event)
            .send()
            .await
            .context("analytics transport")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("analytics endpoint returned HTTP {status}: {text}");
        }

        Ok(())
    }
}

/// Fire-and-forget front of an [`EventSink`]. Events emitted outside a tokio runtime are
/// dropped with a warning.
#[derive(Clone)]
pub struct Emitter {
    sink: Arc<dyn EventSink>,
}

impl Emitter {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    pub fn emit(&self, user_id: Option<u64>, event_type: EventType, action: &str, info: Value) {
        let Some(user_id) = user_id.filter(|id| *id != 0) else {
            warn!(
                "missing user id, {} event '{}' not sent",
                event_type.as_str(),
                action
            );
            return;
        };

        let payload = EventPayload {
            user_id,
            event_type,
            action: action.to_owned(),
            info,
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                "no async runtime, {} event '{}' dropped",
                payload.event_type.as_str(),
                payload.action
            );
            return;
        };
        debug!("sending analytics event {:?}", payload);

        let sink = Arc::clone(&self.sink);
        runtime.spawn(async move {
            match sink.send(&payload).await {
                Ok(()) => debug!(
                    "analytics event {} '{}' sent",
                    payload.event_type.as_str(),
                    payload.action
                ),
                Err(err) => warn!(
                    "analytics event {} '{}' dropped: {err:#}",
                    payload.event_type.as_str(),
                    payload.action
                ),
            }
        });
    }
}
