//! Amazon SQS queue

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::Message;
use aws_sdk_sqs::Client;
use serde_json::Value;
use tracing::{debug, error, warn};

use super::{MessageQueue, QueueError, QueueMessage};
use crate::aws::{load_sdk_config, AwsConfig};

/// Group used for FIFO sends that do not name one
pub const DEFAULT_GROUP_ID: &str = "default";

/// SQS caps a single receive at ten messages and twenty seconds of waiting.
const MAX_BATCH: i32 = 10;
const MAX_WAIT_SECS: u64 = 20;

#[derive(Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

pub fn is_fifo(queue_url: &str) -> bool {
    queue_url.ends_with(".fifo")
}

/// `(MessageGroupId, MessageDeduplicationId)` for a send to `queue_url`
fn fifo_params(
    queue_url: &str,
    group_id: Option<&str>,
    dedup_id: Option<&str>,
) -> (Option<String>, Option<String>) {
    if !is_fifo(queue_url) {
        return (None, None);
    }
    (
        Some(group_id.unwrap_or(DEFAULT_GROUP_ID).to_string()),
        dedup_id.map(str::to_string),
    )
}

fn backend_error<E: std::error::Error>(action: &'static str, err: E) -> QueueError {
    let message = DisplayErrorContext(&err).to_string();
    error!(action, error = %message, "SQS request failed");
    QueueError::Backend(message)
}

/// Drops messages SQS returned without an id, body or receipt handle.
fn convert(message: &Message) -> Option<QueueMessage> {
    match (message.message_id(), message.receipt_handle()) {
        (Some(id), Some(handle)) => Some(QueueMessage {
            message_id: id.to_string(),
            receipt_handle: handle.to_string(),
            body: message.body().unwrap_or_default().to_string(),
        }),
        _ => {
            warn!("Skipping SQS message without id or receipt handle");
            None
        }
    }
}

impl SqsQueue {
    pub fn new(client: Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    pub async fn connect(aws: &AwsConfig, queue_url: impl Into<String>) -> Self {
        let sdk = load_sdk_config(aws).await;
        Self::new(Client::new(&sdk), queue_url)
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn send(
        &self,
        message: &Value,
        group_id: Option<&str>,
        dedup_id: Option<&str>,
    ) -> Result<String, QueueError> {
        let (group, dedup) = fifo_params(&self.queue_url, group_id, dedup_id);

        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(serde_json::to_string(message)?)
            .set_message_group_id(group)
            .set_message_deduplication_id(dedup)
            .send()
            .await
            .map_err(|e| backend_error("send", e))?;

        let id = output.message_id().unwrap_or_default().to_string();
        debug!(queue = %self.queue_url, message_id = %id, "Message sent");
        Ok(id)
    }

    async fn receive(
        &self,
        max_messages: i32,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let wait_secs = wait.as_secs().min(MAX_WAIT_SECS) as i32;

        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages.clamp(1, MAX_BATCH))
            .wait_time_seconds(wait_secs)
            .send()
            .await
            .map_err(|e| backend_error("receive", e))?;

        let messages: Vec<QueueMessage> = output.messages().iter().filter_map(convert).collect();
        debug!(queue = %self.queue_url, count = messages.len(), "Messages received");
        Ok(messages)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| backend_error("delete", e))?;
        Ok(())
    }
}
