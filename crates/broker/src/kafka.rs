//! rdkafka-backed publisher and offset store.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use fluxgate_config::KafkaCfg;
use metrics::counter;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, CommitMode, Consumer};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::{Offset, TopicPartitionList};
use tracing::{info, instrument, trace, warn};

use super::{
    BrokerError, BrokerResult, ConsumerOffsets, EventPublisher, OffsetEntry,
    OffsetStore, TopicPartition,
};

const BROKER_TIMEOUT: Duration = Duration::from_secs(10);

/// Publishes envelopes to the event topic.
///
/// `publish` only reports synchronous enqueue failures; a spawned task
/// awaits each delivery future and logs the outcome.
pub struct KafkaPublisher {
    producer: FutureProducer,
    topic: String,
}

impl KafkaPublisher {
    #[instrument(skip_all)]
    pub fn new(cfg: &KafkaCfg) -> anyhow::Result<Self> {
        let mut client = ClientConfig::new();
        client
            .set("bootstrap.servers", cfg.servers.clone())
            .set("client.id", "fluxgate-publisher")
            .set("message.timeout.ms", "60000")
            .set("socket.keepalive.enable", "true")
            .set("compression.type", "lz4")
            .set("linger.ms", "5")
            .set("delivery.timeout.ms", "120000")
            .set("request.timeout.ms", "30000")
            .set("retry.backoff.ms", "100")
            .set("enable.idempotence", "true")
            .set("acks", "all")
            .set("max.in.flight.requests.per.connection", "5");

        // apply user overrides, if any
        for (k, v) in &cfg.client_conf {
            client.set(k, v);
        }

        let producer: FutureProducer =
            client.create().with_context(|| "creating kafka producer")?;

        info!(brokers = %cfg.servers, topic = %cfg.topic, "kafka producer connected");
        Ok(Self {
            producer,
            topic: cfg.topic.clone(),
        })
    }
}

#[async_trait]
impl EventPublisher for KafkaPublisher {
    async fn publish(&self, envelope: Bytes) -> BrokerResult<()> {
        let record =
            FutureRecord::<(), [u8]>::to(&self.topic).payload(&envelope[..]);

        let delivery = self.producer.send_result(record).map_err(|(e, _)| {
            BrokerError::Enqueue {
                details: format!("kafka enqueue: {e}").into(),
            }
        })?;

        let topic = self.topic.clone();
        tokio::spawn(async move {
            match delivery.await {
                Ok(Ok((partition, offset))) => {
                    trace!(%topic, partition, offset, "delivery confirmed");
                }
                Ok(Err((e, _msg))) => {
                    counter!("fluxgate_delivery_failures_total").increment(1);
                    warn!(%topic, error = %e, "delivery failed");
                }
                Err(_) => {
                    counter!("fluxgate_delivery_failures_total").increment(1);
                    warn!(%topic, "delivery future cancelled");
                }
            }
        });

        Ok(())
    }
}

fn client_err(e: rdkafka::error::KafkaError) -> BrokerError {
    BrokerError::Client {
        details: e.to_string().into(),
    }
}

/// Offset store over the group coordinator.
///
/// The consumer never subscribes; it exists to read and rewrite the
/// group's committed offsets. The assignment it reports is therefore the
/// topic's partition list from broker metadata, not a live snapshot of
/// which group member holds which partition. librdkafka calls are
/// blocking, so every operation runs under `spawn_blocking`.
pub struct KafkaOffsetStore {
    consumer: Arc<BaseConsumer>,
    topic: String,
}

impl KafkaOffsetStore {
    #[instrument(skip_all)]
    pub fn new(cfg: &KafkaCfg) -> anyhow::Result<Self> {
        let consumer: BaseConsumer = ClientConfig::new()
            .set("bootstrap.servers", cfg.servers.clone())
            .set("group.id", cfg.group_id.clone())
            .set("client.id", "fluxgate-offsets")
            .set("enable.auto.commit", "false")
            .create()
            .with_context(|| "creating kafka consumer")?;

        info!(group = %cfg.group_id, topic = %cfg.topic, "offset store connected");
        Ok(Self {
            consumer: Arc::new(consumer),
            topic: cfg.topic.clone(),
        })
    }

    fn partitions_blocking(
        consumer: &BaseConsumer,
        topic: &str,
    ) -> BrokerResult<Vec<TopicPartition>> {
        let metadata = consumer
            .fetch_metadata(Some(topic), BROKER_TIMEOUT)
            .map_err(client_err)?;
        let Some(meta_topic) =
            metadata.topics().iter().find(|t| t.name() == topic)
        else {
            return Ok(Vec::new());
        };
        Ok(meta_topic
            .partitions()
            .iter()
            .map(|p| TopicPartition::new(topic, p.id()))
            .collect())
    }
}

#[async_trait]
impl OffsetStore for KafkaOffsetStore {
    async fn committed(&self) -> BrokerResult<ConsumerOffsets> {
        let consumer = Arc::clone(&self.consumer);
        let topic = self.topic.clone();

        tokio::task::spawn_blocking(move || {
            let partitions = Self::partitions_blocking(&consumer, &topic)?;
            let mut query = TopicPartitionList::new();
            for tp in &partitions {
                query.add_partition(&tp.topic, tp.partition);
            }

            let committed = consumer
                .committed_offsets(query, BROKER_TIMEOUT)
                .map_err(client_err)?;

            let mut offsets = ConsumerOffsets::new();
            for elem in committed.elements() {
                // partitions the group never committed come back Invalid
                if let Offset::Offset(offset) = elem.offset() {
                    let metadata = match elem.metadata() {
                        "" => None,
                        m => Some(m.to_string()),
                    };
                    offsets.insert(
                        TopicPartition::new(elem.topic(), elem.partition()),
                        OffsetEntry { offset, metadata },
                    );
                }
            }
            Ok(offsets)
        })
        .await
        .map_err(|e| BrokerError::Client {
            details: format!("spawn_blocking panic: {e}").into(),
        })?
    }

    async fn assignment(&self) -> BrokerResult<Vec<TopicPartition>> {
        let consumer = Arc::clone(&self.consumer);
        let topic = self.topic.clone();

        tokio::task::spawn_blocking(move || {
            Self::partitions_blocking(&consumer, &topic)
        })
        .await
        .map_err(|e| BrokerError::Client {
            details: format!("spawn_blocking panic: {e}").into(),
        })?
    }

    async fn commit(&self, offsets: &ConsumerOffsets) -> BrokerResult<()> {
        let consumer = Arc::clone(&self.consumer);
        let offsets = offsets.clone();

        tokio::task::spawn_blocking(move || {
            let mut tpl = TopicPartitionList::new();
            for (tp, entry) in &offsets {
                tpl.add_partition_offset(
                    &tp.topic,
                    tp.partition,
                    Offset::Offset(entry.offset),
                )
                .map_err(client_err)?;
                if let Some(meta) = &entry.metadata {
                    if let Some(mut elem) =
                        tpl.find_partition(&tp.topic, tp.partition)
                    {
                        elem.set_metadata(meta.clone());
                    }
                }
            }

            consumer.commit(&tpl, CommitMode::Sync).map_err(client_err)
        })
        .await
        .map_err(|e| BrokerError::Client {
            details: format!("spawn_blocking panic: {e}").into(),
        })?
    }
}
