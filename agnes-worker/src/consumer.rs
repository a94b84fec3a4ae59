/// Queue consumer
///
/// Polls the user queue, feeds each batch through [`handle_event`], and
/// deletes every message that succeeded. Failed messages stay on the queue
/// and come back after their visibility timeout.
///
/// When a state store is configured, a [`Checkpoint`] describing the last
/// non-empty batch is written under [`CHECKPOINT_KEY`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use agnes_shared::aws::AwsConfig;
/// use agnes_shared::models::User;
/// use agnes_shared::queue::SqsQueue;
/// use agnes_shared::services::EntityService;
/// use agnes_shared::store::MemoryStore;
/// use agnes_worker::consumer::{Consumer, ConsumerConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let queue = SqsQueue::connect(&AwsConfig::default(), "https://sqs.us-east-1.amazonaws.com/1/users").await;
/// let users = EntityService::<User>::new(Arc::new(MemoryStore::<User>::new()));
/// let consumer = Consumer::new(Arc::new(queue), users, ConsumerConfig::default());
///
/// let token = consumer.shutdown_token();
/// tokio::spawn(async move {
///     let _ = tokio::signal::ctrl_c().await;
///     token.cancel();
/// });
/// consumer.run().await?;
/// # Ok(())
/// # }
/// ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use agnes_shared::models::User;
use agnes_shared::queue::{MessageQueue, QueueError, QueueMessage};
use agnes_shared::services::EntityService;
use agnes_shared::state::{StateStore, StateStoreExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::handler::{handle_event, SqsEvent, SqsRecord};

pub const CHECKPOINT_KEY: &str = "worker:last_batch";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Messages per receive call (SQS allows 1 to 10)
    pub max_messages: i32,

    /// Long-poll wait per receive call
    pub wait_secs: u64,

    /// Pause after an empty receive
    pub idle_backoff_ms: u64,

    /// Pause after a failed receive
    pub error_backoff_secs: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            max_messages: 10,
            wait_secs: 20,
            idle_backoff_ms: 1000,
            error_backoff_secs: 5,
        }
    }
}

/// Outcome of one batch, also stored as the checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub received: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub finished_at: DateTime<Utc>,
}

pub struct Consumer {
    queue: Arc<dyn MessageQueue>,
    users: EntityService<User>,
    state: Option<Arc<dyn StateStore>>,
    config: ConsumerConfig,
    shutdown_token: CancellationToken,
}

fn to_event(messages: &[QueueMessage]) -> SqsEvent {
    SqsEvent {
        records: messages
            .iter()
            .map(|message| SqsRecord {
                message_id: message.message_id.clone(),
                body: message.body.clone(),
            })
            .collect(),
    }
}

impl Consumer {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        users: EntityService<User>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            queue,
            users,
            state: None,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn with_state(mut self, state: Arc<dyn StateStore>) -> Self {
        self.state = Some(state);
        self
    }

    /// Cancelling this token stops [`Consumer::run`] between batches. A
    /// batch that has been received is always handled, deleted and
    /// checkpointed first.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Receives and handles one batch. Returns `None` when the queue was empty.
    pub async fn poll_once(&self) -> Result<Option<Checkpoint>, QueueError> {
        let messages = self.receive().await?;
        Ok(self.process(&messages).await)
    }

    async fn receive(&self) -> Result<Vec<QueueMessage>, QueueError> {
        self.queue
            .receive(
                self.config.max_messages,
                Duration::from_secs(self.config.wait_secs),
            )
            .await
    }

    async fn process(&self, messages: &[QueueMessage]) -> Option<Checkpoint> {
        if messages.is_empty() {
            return None;
        }

        let response = handle_event(&self.users, to_event(messages)).await;
        let failed: HashSet<&str> = response.failed_ids().collect();

        let mut succeeded = 0;
        for message in messages {
            if failed.contains(message.message_id.as_str()) {
                continue;
            }
            match self.queue.delete(&message.receipt_handle).await {
                Ok(()) => succeeded += 1,
                Err(e) => tracing::error!(
                    message_id = %message.message_id,
                    error = %e,
                    "Failed to delete processed message"
                ),
            }
        }

        let checkpoint = Checkpoint {
            received: messages.len(),
            succeeded,
            failed: failed.len(),
            finished_at: Utc::now(),
        };

        if let Some(state) = &self.state {
            if let Err(e) = state.set_as(CHECKPOINT_KEY, &checkpoint).await {
                tracing::warn!(error = %e, "Failed to record checkpoint");
            }
        }

        Some(checkpoint)
    }

    /// Sleeps for `duration` unless shutdown comes first.
    async fn pause(&self, duration: Duration) {
        tokio::select! {
            _ = self.shutdown_token.cancelled() => {}
            _ = sleep(duration) => {}
        }
    }

    /// Polls until the shutdown token is cancelled.
    pub async fn run(&self) -> anyhow::Result<()> {
        tracing::info!(
            max_messages = self.config.max_messages,
            wait_secs = self.config.wait_secs,
            "Queue consumer starting"
        );

        loop {
            let received = tokio::select! {
                biased;
                _ = self.shutdown_token.cancelled() => break,
                received = self.receive() => received,
            };

            match received {
                Ok(messages) => match self.process(&messages).await {
                    Some(checkpoint) => {
                        tracing::debug!(
                            received = checkpoint.received,
                            failed = checkpoint.failed,
                            "Batch complete"
                        );
                    }
                    None => self.pause(Duration::from_millis(self.config.idle_backoff_ms)).await,
                },
                Err(e) => {
                    tracing::error!(error = %e, "Failed to receive messages");
                    self.pause(Duration::from_secs(self.config.error_backoff_secs)).await;
                }
            }
        }

        tracing::info!("Queue consumer shut down");
        Ok(())
    }
}
