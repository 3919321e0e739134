//! Broker-facing surface: event publication and consumer offset control.
//!
//! Publication is fire-and-forget from the caller's point of view. An
//! accepted publish means the bytes reached the client's send queue;
//! delivery outcome arrives out-of-band and is logged, never awaited by
//! the HTTP caller.

use std::borrow::Cow;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

mod gateway;
mod kafka;
mod mem;
mod offsets;

pub use gateway::{GatewayError, IngestGateway};
pub use kafka::{KafkaOffsetStore, KafkaPublisher};
pub use mem::MemBroker;
pub use offsets::{
    ConsumerOffsets, OffsetController, OffsetEntry, TopicPartition,
};

#[derive(Debug, Error)]
pub enum BrokerError {
    /// The requested partition is not part of the consumer group's current
    /// assignment. Rejected before any offset is written.
    #[error("partition {topic}-{partition} is not assigned to this group")]
    InvalidPartitionAssignment { topic: String, partition: i32 },

    /// The client refused to enqueue the record (queue full, record too
    /// large). Synchronous failure, the record was never queued.
    #[error("broker enqueue failed: {details}")]
    Enqueue { details: Cow<'static, str> },

    /// Broker client failure outside the enqueue path (metadata fetch,
    /// offset read, commit).
    #[error("broker client error: {details}")]
    Client { details: Cow<'static, str> },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type BrokerResult<T> = std::result::Result<T, BrokerError>;

/// Hands encoded envelopes to the broker client queue.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, envelope: Bytes) -> BrokerResult<()>;
}

/// Reads and rewrites the committed offsets of one consumer group.
#[async_trait]
pub trait OffsetStore: Send + Sync {
    /// Committed offsets for every partition the group can own. Partitions
    /// with no committed offset yet are absent from the map.
    async fn committed(&self) -> BrokerResult<ConsumerOffsets>;

    /// The partitions the group may legally commit offsets for.
    ///
    /// This is the partition universe the group can own, not a live member
    /// assignment snapshot. The Kafka implementation answers from topic
    /// metadata, since an admin client that never joins the group cannot
    /// observe which member currently holds which partition.
    async fn assignment(&self) -> BrokerResult<Vec<TopicPartition>>;

    /// Overwrite committed offsets. Callers are expected to have validated
    /// the partitions against [`OffsetStore::assignment`] first.
    async fn commit(&self, offsets: &ConsumerOffsets) -> BrokerResult<()>;
}
