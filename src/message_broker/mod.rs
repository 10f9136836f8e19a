// region:    --- Imports
use crate::market::events::AdMarketEvent;
use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use std::sync::Arc;
use tracing::{debug, error, info};

// endregion: --- Imports

/// 광고 시장 이벤트 토픽
pub const AD_MARKET_TOPIC: &str = "ad-market-events";

// region:    --- Event Publisher
/// 이벤트 발행 트레이트
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &AdMarketEvent) -> Result<(), String>;
}

/// 브로커가 설정되지 않은 경우 사용 (로그만 남김)
pub struct NoopPublisher;

#[async_trait]
impl EventPublisher for NoopPublisher {
    async fn publish(&self, event: &AdMarketEvent) -> Result<(), String> {
        debug!(
            "{:<12} --> 이벤트 발행 생략: {}",
            "Publisher",
            event.event_type()
        );
        Ok(())
    }
}
// endregion: --- Event Publisher

// region:    --- Kafka Producer
#[derive(Clone)]
pub struct KafkaProducer {
    producer: Arc<FutureProducer>,
}

/// KafkaProducer 구현
impl KafkaProducer {
    pub fn new(brokers: &str) -> Result<Self, KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(KafkaProducer {
            producer: Arc::new(producer),
        })
    }

    /// 메시지 전송
    pub async fn send_message(&self, topic: &str, key: &str, value: &str) -> Result<(), String> {
        info!(
            "{:<12} --> Kafka 메시지 전송: topic={}, key={}",
            "Producer", topic, key
        );
        let record = FutureRecord::to(topic).key(key).payload(value);

        self.producer
            .send(record, std::time::Duration::from_secs(0))
            .await
            .map_err(|(e, _)| format!("Error sending message: {:?}", e))?;

        Ok(())
    }
}

#[async_trait]
impl EventPublisher for KafkaProducer {
    async fn publish(&self, event: &AdMarketEvent) -> Result<(), String> {
        let payload = serde_json::to_string(event).map_err(|e| e.to_string())?;
        self.send_message(AD_MARKET_TOPIC, &event.key(), &payload)
            .await
    }
}
// endregion: --- Kafka Producer

// region:    --- Kafka Manager
pub struct KafkaManager {
    producer: Arc<KafkaProducer>,
    brokers: String,
}

/// KafkaManager 구현
impl KafkaManager {
    pub fn new(brokers: &str) -> Result<Self, KafkaError> {
        let producer = Arc::new(KafkaProducer::new(brokers)?);
        Ok(KafkaManager {
            producer,
            brokers: brokers.to_string(),
        })
    }

    /// 프로듀서 반환
    pub fn get_producer(&self) -> Arc<KafkaProducer> {
        Arc::clone(&self.producer)
    }

    /// 토픽 생성
    pub async fn create_topic(
        &self,
        topic_name: &str,
        num_partitions: i32,
        replication_factor: i32,
    ) -> Result<(), String> {
        info!("{:<12} --> Kafka 토픽 생성 시작: {}", "Manager", topic_name);

        let admin_client: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .create()
            .map_err(|e| format!("AdminClient 생성 실패: {:?}", e))?;

        let new_topic = NewTopic::new(
            topic_name,
            num_partitions,
            TopicReplication::Fixed(replication_factor),
        );

        match admin_client
            .create_topics(&[new_topic], &AdminOptions::new())
            .await
        {
            Ok(_) => {
                info!("{:<12} --> Kafka 토픽 생성 성공: {}", "Manager", topic_name);
                Ok(())
            }
            Err(e) => {
                error!("{:<12} --> Kafka 토픽 생성 실패: {:?}", "Manager", e);
                Err(format!("토픽 생성 실패: {:?}", e))
            }
        }
    }
}
// endregion: --- Kafka Manager
