//! Publishes order events to NATS when a connection is configured.
//!
//! Delivery is best effort: a failed publish is logged and the request that
//! produced the event still succeeds.

use crate::domain::events::OrderEvent;

#[derive(Clone, Default)]
pub struct Publisher {
    nats: Option<async_nats::Client>,
}

impl Publisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    pub fn is_enabled(&self) -> bool { self.nats.is_some() }

    pub async fn publish(&self, events: Vec<OrderEvent>) {
        for event in events {
            let Some(client) = &self.nats else {
                tracing::debug!(subject = event.subject(), "event publishing disabled");
                continue;
            };
            let payload = match serde_json::to_vec(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(subject = event.subject(), error = %e, "failed to encode event");
                    continue;
                }
            };
            if let Err(e) = client.publish(event.subject().to_string(), payload.into()).await {
                tracing::warn!(subject = event.subject(), error = %e, "failed to publish event");
            }
        }
    }
}
