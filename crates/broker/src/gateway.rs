use std::sync::Arc;

use bytes::Bytes;
use fluxgate_core::{event_type_of, Envelope, EnvelopeError, IngestError};
use metrics::counter;
use thiserror::Error;
use tracing::debug;

use super::{BrokerError, EventPublisher};

/// Ingestion failure: client input problems are kept apart from broker
/// problems so the HTTP layer can map them to 400 vs 502.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Input(#[from] IngestError),

    #[error(transparent)]
    Codec(#[from] EnvelopeError),

    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// Front door for inbound events: extract the event type, wrap the raw
/// payload in a wire envelope, hand it to the publisher.
pub struct IngestGateway {
    publisher: Arc<dyn EventPublisher>,
}

impl IngestGateway {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }

    /// Queue one event. Returns the extracted event type on success; the
    /// payload bytes are forwarded untouched.
    pub async fn ingest(&self, payload: Bytes) -> Result<String, GatewayError> {
        let event_type = event_type_of(&payload)?;
        let envelope = Envelope::new(event_type.clone(), payload)?;

        self.publisher.publish(envelope.encode()).await?;

        counter!("fluxgate_events_queued_total").increment(1);
        debug!(event = %event_type, "event queued");
        Ok(event_type)
    }
}
