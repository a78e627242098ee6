//! Privacy-safe usage telemetry — no SQL text, no user content.
//!
//! Events are queued in memory and flushed to POST /telemetry every 60
//! seconds or when 20 events accumulate, whichever comes first. Flush
//! failures are logged and silently dropped — telemetry never blocks or
//! fails a core flow.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::TelemetryConfig;

const FLUSH_INTERVAL_SECS: u64 = 60;
const FLUSH_BATCH_SIZE: usize = 20;

// ─── Event types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct TelemetryEvent {
    pub event: String,
    pub ts: String,
    /// Structured properties (entity ids, statuses, error codes).
    pub properties: Value,
    /// Originating collaborator tag, e.g. "ai_service" or "engine".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// Success/failure classification of the underlying operation.
    pub success: bool,
}

impl TelemetryEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            ts: Utc::now().to_rfc3339(),
            properties: Value::Null,
            service: None,
            success: true,
        }
    }

    pub fn with_properties(mut self, properties: Value) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn failure(mut self) -> Self {
        self.success = false;
        self
    }
}

// ─── Sender handle ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct TelemetrySender {
    tx: mpsc::Sender<TelemetryEvent>,
}

impl TelemetrySender {
    /// Queue an event for the next flush. Never blocks — drops silently if
    /// the queue is full or the flush task is gone.
    pub fn send(&self, event: TelemetryEvent) {
        let _ = self.tx.try_send(event);
    }

    /// A sender with no flush task behind it. Every event is dropped.
    /// Used in tests and when telemetry is disabled.
    pub fn disabled() -> Self {
        let (tx, _rx) = mpsc::channel(1);
        Self { tx }
    }
}

// ─── Background flush task ───────────────────────────────────────────────────

/// Spawns the background telemetry flush task and returns a `TelemetrySender`.
///
/// The task flushes on a 60s timer or when 20 events accumulate. When
/// telemetry is disabled in config no task is spawned at all.
pub fn spawn(config: Arc<TelemetryConfig>) -> TelemetrySender {
    if !config.enabled {
        return TelemetrySender::disabled();
    }

    let (tx, mut rx) = mpsc::channel::<TelemetryEvent>(200);
    let instance_id = Uuid::new_v4().to_string();
    let version = env!("CARGO_PKG_VERSION").to_string();

    tokio::spawn(async move {
        let mut buffer: Vec<TelemetryEvent> = Vec::new();
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(FLUSH_INTERVAL_SECS));
        interval.tick().await; // skip immediate tick

        loop {
            tokio::select! {
                // Accumulate incoming events
                Some(event) = rx.recv() => {
                    buffer.push(event);
                    if buffer.len() >= FLUSH_BATCH_SIZE {
                        flush(&config, &instance_id, &version, &mut buffer).await;
                    }
                }
                // Periodic flush
                _ = interval.tick() => {
                    if !buffer.is_empty() {
                        flush(&config, &instance_id, &version, &mut buffer).await;
                    }
                }
                // Channel closed (daemon shutting down)
                else => break,
            }
        }

        // Final flush on shutdown
        if !buffer.is_empty() {
            flush(&config, &instance_id, &version, &mut buffer).await;
        }
    });

    TelemetrySender { tx }
}

async fn flush(
    config: &TelemetryConfig,
    instance_id: &str,
    version: &str,
    buffer: &mut Vec<TelemetryEvent>,
) {
    let events = std::mem::take(buffer);
    let count = events.len();

    let payload = serde_json::json!({
        "instance_id": instance_id,
        "version": version,
        "events": events,
    });

    let url = format!("{}/telemetry", config.base_url.trim_end_matches('/'));
    let client = match reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            warn!("telemetry: failed to build HTTP client: {e:#}");
            return;
        }
    };

    match client.post(&url).json(&payload).send().await {
        Ok(resp) if resp.status().is_success() => {
            debug!("telemetry: flushed {count} events");
        }
        Ok(resp) => {
            warn!("telemetry: server returned {}", resp.status());
        }
        Err(e) => {
            warn!("telemetry: flush failed: {e:#}");
        }
    }
}
