use async_trait::async_trait;
use tracing::info;

use crate::error::{TranscodeError, TranscodeResult};
use crate::infrastructure::queue::rabbitmq::RabbitMqService;
use crate::modules::transcode::events::TranscodeOutcome;

/// Downstream consumer of job results. Called exactly once per job.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, outcome: &TranscodeOutcome) -> TranscodeResult<()>;
}

/// Publishes outcomes as JSON to a durable RabbitMQ queue.
pub struct RabbitMqNotifier {
    rabbitmq: RabbitMqService,
    queue: String,
}

impl RabbitMqNotifier {
    pub fn new(rabbitmq: RabbitMqService, queue: impl Into<String>) -> Self {
        Self {
            rabbitmq,
            queue: queue.into(),
        }
    }
}

#[async_trait]
impl NotificationSink for RabbitMqNotifier {
    async fn notify(&self, outcome: &TranscodeOutcome) -> TranscodeResult<()> {
        let payload = serde_json::to_vec(outcome)
            .map_err(|e| TranscodeError::Notification(e.to_string()))?;

        self.rabbitmq
            .publish(&self.queue, &payload)
            .await
            .map_err(|e| TranscodeError::Notification(e.to_string()))?;

        info!(
            queue = %self.queue,
            key = %outcome.key(),
            success = outcome.is_success(),
            "📨 Published transcoding result"
        );
        Ok(())
    }
}
