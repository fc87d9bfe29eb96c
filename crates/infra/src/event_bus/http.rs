use std::time::Duration;

use async_trait::async_trait;

use blogbus_events::{Event, EventEnvelope};

use super::{DeliveryError, Subscriber};

/// Delivers events to a service's `POST {base_url}/events` endpoint.
#[derive(Debug, Clone)]
pub struct HttpSubscriber {
    name: String,
    endpoint: String,
    client: reqwest::Client,
}

impl HttpSubscriber {
    pub fn new(
        name: impl Into<String>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Config(e.to_string()))?;

        Ok(Self {
            name: name.into(),
            endpoint: format!("{}/events", base_url.trim_end_matches('/')),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Subscriber for HttpSubscriber {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, event: &EventEnvelope<Event>) -> Result<(), DeliveryError> {
        let body = event.payload().to_raw(Some(event.sequence_number()));

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout
                } else {
                    DeliveryError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}
