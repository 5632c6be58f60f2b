//! Kafka publisher for verification photos

use async_trait::async_trait;
use keygate_core::{KeygateError, PhotoPublisher, Result};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use std::time::Duration;

/// How long a send may wait for queue space
const ENQUEUE_TIMEOUT: Duration = Duration::from_secs(5);

/// Publishes photo messages to a Kafka topic
#[derive(Clone)]
pub struct KafkaPublisher {
    producer: FutureProducer,
}

impl KafkaPublisher {
    /// Create a producer for the given bootstrap servers
    pub fn new(brokers: &str) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()
            .map_err(|e| KeygateError::PublishError(format!("Kafka producer setup failed: {e}")))?;

        Ok(Self { producer })
    }
}

#[async_trait]
impl PhotoPublisher for KafkaPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> Result<()> {
        let record = FutureRecord::to(topic).key(key).payload(&payload);

        self.producer
            .send(record, ENQUEUE_TIMEOUT)
            .await
            .map_err(|(e, _)| KeygateError::PublishError(format!("Kafka send failed: {e}")))?;

        Ok(())
    }

    fn name(&self) -> &str {
        "kafka"
    }
}
