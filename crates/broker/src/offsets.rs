//! Consumer offset mapping and the replay control surface.
//!
//! Offsets travel as a JSON object keyed by `"topic-partition"`:
//!
//! ```json
//! { "events-0": { "offset": 1200, "metadata": "replayed 2026-08-25" } }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{BrokerError, BrokerResult, OffsetStore};

/// One partition of one topic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TopicPartition {
    pub topic: String,
    pub partition: i32,
}

impl TopicPartition {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }
}

impl fmt::Display for TopicPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.topic, self.partition)
    }
}

impl FromStr for TopicPartition {
    type Err = String;

    /// Topic names may themselves contain `-`; the partition is everything
    /// after the last one.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (topic, partition) = s
            .rsplit_once('-')
            .ok_or_else(|| format!("expected topic-partition, got {s:?}"))?;
        if topic.is_empty() {
            return Err(format!("empty topic in {s:?}"));
        }
        let partition = partition
            .parse::<i32>()
            .map_err(|_| format!("bad partition number in {s:?}"))?;
        Ok(Self::new(topic, partition))
    }
}

// Serialized as the string key of the offsets mapping.
impl Serialize for TopicPartition {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TopicPartition {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Committed position for one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetEntry {
    pub offset: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl OffsetEntry {
    pub fn new(offset: i64) -> Self {
        Self {
            offset,
            metadata: None,
        }
    }
}

/// Ordered so the JSON rendering is stable across reads.
pub type ConsumerOffsets = BTreeMap<TopicPartition, OffsetEntry>;

/// Replay control surface over an [`OffsetStore`].
///
/// Writes are guarded: every requested partition must be inside the
/// group's assignment or the whole request is rejected untouched. Offsets
/// themselves are not checked for monotonicity, rewinding is the point.
pub struct OffsetController {
    store: Arc<dyn OffsetStore>,
}

impl OffsetController {
    pub fn new(store: Arc<dyn OffsetStore>) -> Self {
        Self { store }
    }

    pub async fn get_offsets(&self) -> BrokerResult<ConsumerOffsets> {
        self.store.committed().await
    }

    pub async fn set_offsets(
        &self,
        offsets: ConsumerOffsets,
    ) -> BrokerResult<()> {
        let assignment = self.store.assignment().await?;
        for tp in offsets.keys() {
            if !assignment.contains(tp) {
                return Err(BrokerError::InvalidPartitionAssignment {
                    topic: tp.topic.clone(),
                    partition: tp.partition,
                });
            }
        }

        self.store.commit(&offsets).await?;
        info!(partitions = offsets.len(), "consumer offsets rewritten");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemBroker;

    #[test]
    fn topic_partition_string_form() {
        let tp = TopicPartition::new("events", 3);
        assert_eq!(tp.to_string(), "events-3");
        assert_eq!("events-3".parse::<TopicPartition>().unwrap(), tp);
    }

    #[test]
    fn topic_names_may_contain_dashes() {
        let tp = "web-events-staging-12".parse::<TopicPartition>().unwrap();
        assert_eq!(tp.topic, "web-events-staging");
        assert_eq!(tp.partition, 12);
    }

    #[test]
    fn malformed_keys_are_rejected() {
        assert!("events".parse::<TopicPartition>().is_err());
        assert!("events-x".parse::<TopicPartition>().is_err());
        assert!("-3".parse::<TopicPartition>().is_err());
    }

    #[test]
    fn offsets_serialize_as_a_string_keyed_object() {
        let mut offsets = ConsumerOffsets::new();
        offsets.insert(
            TopicPartition::new("events", 0),
            OffsetEntry::new(1200),
        );
        offsets.insert(
            TopicPartition::new("events", 1),
            OffsetEntry {
                offset: 900,
                metadata: Some("replay".to_string()),
            },
        );

        let json = serde_json::to_value(&offsets).unwrap();
        assert_eq!(json["events-0"]["offset"], 1200);
        assert_eq!(json["events-1"]["metadata"], "replay");

        let back: ConsumerOffsets = serde_json::from_value(json).unwrap();
        assert_eq!(back, offsets);
    }

    #[tokio::test]
    async fn set_offsets_rewrites_assigned_partitions() {
        let broker = Arc::new(MemBroker::with_assignment(vec![
            TopicPartition::new("events", 0),
            TopicPartition::new("events", 1),
        ]));
        let controller = OffsetController::new(broker.clone());

        let mut offsets = ConsumerOffsets::new();
        offsets
            .insert(TopicPartition::new("events", 0), OffsetEntry::new(42));
        controller.set_offsets(offsets).await.unwrap();

        let committed = controller.get_offsets().await.unwrap();
        assert_eq!(
            committed[&TopicPartition::new("events", 0)].offset,
            42
        );
    }

    #[tokio::test]
    async fn unassigned_partition_rejects_the_whole_request() {
        let broker = Arc::new(MemBroker::with_assignment(vec![
            TopicPartition::new("events", 0),
        ]));
        let controller = OffsetController::new(broker.clone());

        let mut offsets = ConsumerOffsets::new();
        offsets
            .insert(TopicPartition::new("events", 0), OffsetEntry::new(10));
        offsets
            .insert(TopicPartition::new("events", 7), OffsetEntry::new(10));

        let err = controller.set_offsets(offsets).await.unwrap_err();
        assert!(matches!(
            err,
            BrokerError::InvalidPartitionAssignment { partition: 7, .. }
        ));

        // nothing written, not even the valid partition
        assert!(controller.get_offsets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rewind_is_allowed() {
        let broker = Arc::new(MemBroker::with_assignment(vec![
            TopicPartition::new("events", 0),
        ]));
        let controller = OffsetController::new(broker.clone());

        let mut forward = ConsumerOffsets::new();
        forward
            .insert(TopicPartition::new("events", 0), OffsetEntry::new(500));
        controller.set_offsets(forward).await.unwrap();

        let mut rewind = ConsumerOffsets::new();
        rewind
            .insert(TopicPartition::new("events", 0), OffsetEntry::new(100));
        controller.set_offsets(rewind).await.unwrap();

        let committed = controller.get_offsets().await.unwrap();
        assert_eq!(
            committed[&TopicPartition::new("events", 0)].offset,
            100
        );
    }
}
