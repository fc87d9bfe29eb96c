//! Producer-side client for the bus's `POST /events`.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use blogbus_events::Event;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("bus unreachable: {0}")]
    Transport(String),

    #[error("bus rejected event with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("unexpected bus response: {0}")]
    Response(String),
}

#[derive(Debug, Deserialize)]
struct Accepted {
    sequence: u64,
}

#[derive(Debug, Clone)]
pub struct EventApi {
    endpoint: String,
    client: reqwest::Client,
}

impl EventApi {
    pub fn new(bus_url: &str, timeout: Duration) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        Ok(Self {
            endpoint: format!("{}/events", bus_url.trim_end_matches('/')),
            client,
        })
    }

    /// Publish an event; returns the sequence number the bus assigned.
    pub async fn publish(&self, event: &Event) -> Result<u64, PublishError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&event.to_raw(None))
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let accepted: Accepted = response
            .json()
            .await
            .map_err(|e| PublishError::Response(e.to_string()))?;

        tracing::debug!(sequence = accepted.sequence, kind = %event.kind(), "event published");
        Ok(accepted.sequence)
    }
}
