use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Mutex;

use super::{
    BrokerResult, ConsumerOffsets, EventPublisher, OffsetStore, TopicPartition,
};

/// In-memory broker double for tests. Records published envelopes and
/// serves a seeded partition assignment.
#[derive(Default)]
pub struct MemBroker {
    published: Mutex<Vec<Bytes>>,
    assignment: Vec<TopicPartition>,
    committed: Mutex<ConsumerOffsets>,
}

impl MemBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assignment(assignment: Vec<TopicPartition>) -> Self {
        Self {
            assignment,
            ..Self::default()
        }
    }

    pub fn published(&self) -> Vec<Bytes> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for MemBroker {
    async fn publish(&self, envelope: Bytes) -> BrokerResult<()> {
        self.published.lock().unwrap().push(envelope);
        Ok(())
    }
}

#[async_trait]
impl OffsetStore for MemBroker {
    async fn committed(&self) -> BrokerResult<ConsumerOffsets> {
        Ok(self.committed.lock().unwrap().clone())
    }

    async fn assignment(&self) -> BrokerResult<Vec<TopicPartition>> {
        Ok(self.assignment.clone())
    }

    async fn commit(&self, offsets: &ConsumerOffsets) -> BrokerResult<()> {
        let mut committed = self.committed.lock().unwrap();
        for (tp, entry) in offsets {
            committed.insert(tp.clone(), entry.clone());
        }
        Ok(())
    }
}
