//! SQS batch handler
//!
//! Takes an SQS event (`{"Records": [...]}`), saves each record body as a
//! new user, and reports the records that failed so only those are
//! redelivered:
//!
//! ```json
//! {"StatusCode": 200, "batchItemFailures": [{"itemIdentifier": "<messageId>"}]}
//! ```

use agnes_shared::models::{CreateUser, User};
use agnes_shared::services::{EntityService, ServiceError};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqsEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<SqsRecord>,
}

/// The parts of an SQS record the handler reads; other fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqsRecord {
    #[serde(rename = "messageId")]
    pub message_id: String,

    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItemFailure {
    #[serde(rename = "itemIdentifier")]
    pub item_identifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerResponse {
    #[serde(rename = "StatusCode")]
    pub status_code: u16,

    #[serde(rename = "batchItemFailures")]
    pub batch_item_failures: Vec<BatchItemFailure>,
}

impl HandlerResponse {
    pub fn failed_ids(&self) -> impl Iterator<Item = &str> {
        self.batch_item_failures
            .iter()
            .map(|failure| failure.item_identifier.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Malformed message body: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Saves one record body as a user.
pub async fn process_record(
    users: &EntityService<User>,
    record: &SqsRecord,
) -> Result<User, RecordError> {
    let payload: CreateUser = serde_json::from_str(&record.body)?;
    Ok(users.save(payload).await?)
}

/// Processes records in order. A failing record never stops the batch.
pub async fn handle_event(users: &EntityService<User>, event: SqsEvent) -> HandlerResponse {
    let mut failures = Vec::new();

    for record in &event.records {
        match process_record(users, record).await {
            Ok(user) => {
                info!(message_id = %record.message_id, user_id = user.id, "Record processed");
            }
            Err(e) => {
                warn!(message_id = %record.message_id, error = %e, "Record failed");
                failures.push(BatchItemFailure {
                    item_identifier: record.message_id.clone(),
                });
            }
        }
    }

    info!(
        records = event.records.len(),
        failed = failures.len(),
        "Batch handled"
    );

    HandlerResponse {
        status_code: 200,
        batch_item_failures: failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agnes_shared::query::ListParams;
    use agnes_shared::store::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    fn record(id: &str, body: serde_json::Value) -> SqsRecord {
        SqsRecord {
            message_id: id.to_string(),
            body: body.to_string(),
        }
    }

    fn users() -> EntityService<User> {
        EntityService::new(Arc::new(MemoryStore::<User>::new()))
    }

    #[test]
    fn test_event_shape() {
        let event: SqsEvent = serde_json::from_value(json!({
            "Records": [{
                "messageId": "m-1",
                "receiptHandle": "ignored",
                "body": "{}",
                "eventSource": "aws:sqs"
            }]
        }))
        .unwrap();
        assert_eq!(event.records[0].message_id, "m-1");

        let response = HandlerResponse {
            status_code: 200,
            batch_item_failures: vec![BatchItemFailure {
                item_identifier: "m-1".to_string(),
            }],
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"StatusCode": 200, "batchItemFailures": [{"itemIdentifier": "m-1"}]})
        );
    }

    #[tokio::test]
    async fn test_handle_event_saves_users() {
        let users = users();
        let event = SqsEvent {
            records: vec![
                record("a", json!({"username": "alice", "email": "alice@example.com", "password": "pw"})),
                record("b", json!({"username": "bobby", "email": "bob@example.com", "password": "pw"})),
            ],
        };

        let response = handle_event(&users, event).await;
        assert_eq!(response.status_code, 200);
        assert!(response.batch_item_failures.is_empty());

        let page = users.list(&ListParams::default()).await.unwrap();
        assert_eq!(page.meta.total, 2);
        assert!(page.items[0].password.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_failures_are_reported_per_record() {
        let users = users();
        let event = SqsEvent {
            records: vec![
                record("ok", json!({"username": "alice", "email": "alice@example.com", "password": "pw"})),
                SqsRecord {
                    message_id: "garbled".to_string(),
                    body: "{not json".to_string(),
                },
                record("invalid", json!({"username": "al", "email": "nope", "password": "pw"})),
                record("duplicate", json!({"username": "alice2", "email": "alice@example.com", "password": "pw"})),
            ],
        };

        let response = handle_event(&users, event).await;
        let failed: Vec<&str> = response.failed_ids().collect();
        assert_eq!(failed, vec!["garbled", "invalid", "duplicate"]);
        assert_eq!(
            users.list(&ListParams::default()).await.unwrap().meta.total,
            1
        );
    }

    #[tokio::test]
    async fn test_empty_event() {
        let response = handle_event(&users(), SqsEvent { records: Vec::new() }).await;
        assert_eq!(response.status_code, 200);
        assert!(response.batch_item_failures.is_empty());
    }
}
