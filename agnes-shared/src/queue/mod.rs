/// Message queue client
///
/// [`MessageQueue`] is bound to a single queue. Message bodies are JSON.
/// [`SqsQueue`] talks to Amazon SQS (or anything speaking its API, such as
/// ElasticMQ) and handles the FIFO-only send parameters.
///
/// # Example
///
/// ```no_run
/// use agnes_shared::aws::AwsConfig;
/// use agnes_shared::queue::{MessageQueue, SqsQueue};
///
/// # async fn example() -> Result<(), agnes_shared::queue::QueueError> {
/// let queue = SqsQueue::connect(&AwsConfig::default(), "https://sqs.us-east-1.amazonaws.com/1/users.fifo").await;
/// let body = serde_json::json!({"username": "jdoe", "email": "jdoe@example.com", "password": "pw"});
/// let id = queue.send(&body, Some("users"), None).await?;
/// # Ok(())
/// # }
/// ```

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

pub mod sqs;

pub use sqs::SqsQueue;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue backend error: {0}")]
    Backend(String),

    #[error("Message body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A received message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub message_id: String,

    /// Handle passed back to [`MessageQueue::delete`]
    pub receipt_handle: String,

    pub body: String,
}

#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Sends `message` as JSON and returns the assigned message id.
    ///
    /// `group_id` and `dedup_id` only apply to FIFO queues and are ignored
    /// otherwise.
    async fn send(
        &self,
        message: &Value,
        group_id: Option<&str>,
        dedup_id: Option<&str>,
    ) -> Result<String, QueueError>;

    /// Waits up to `wait` for at most `max_messages` messages.
    async fn receive(
        &self,
        max_messages: i32,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError>;

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError>;
}
