//! DynamoDB state backend
//!
//! One item per key. The partition key attribute is `Key`; the value lives
//! in `Attr_Data` as JSON text so any document shape round-trips unchanged.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client;
use serde_json::Value;
use tracing::{debug, error};

use super::{StateError, StateStore};

const KEY_ATTR: &str = "Key";
const DATA_ATTR: &str = "Attr_Data";

#[derive(Clone)]
pub struct DynamoStateStore {
    client: Client,
    table: String,
}

impl DynamoStateStore {
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    pub fn from_sdk_config(sdk: &SdkConfig, table: impl Into<String>) -> Self {
        Self::new(Client::new(sdk), table)
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

fn key_attr(key: &str) -> AttributeValue {
    AttributeValue::S(key.to_string())
}

fn encode(value: &Value) -> Result<AttributeValue, StateError> {
    Ok(AttributeValue::S(serde_json::to_string(value)?))
}

fn decode(attr: &AttributeValue) -> Result<Value, StateError> {
    let text = attr
        .as_s()
        .map_err(|_| StateError::Backend(format!("{} is not a string attribute", DATA_ATTR)))?;
    Ok(serde_json::from_str(text)?)
}

/// Decodes `Attr_Data` from an item or attribute map, if present.
fn data_of(attributes: Option<&HashMap<String, AttributeValue>>) -> Result<Option<Value>, StateError> {
    attributes
        .and_then(|attrs| attrs.get(DATA_ATTR))
        .map(decode)
        .transpose()
}

fn backend_error<E>(action: &'static str, key: &str, err: E) -> StateError
where
    E: std::error::Error,
{
    let message = DisplayErrorContext(&err).to_string();
    error!(action, key, error = %message, "DynamoDB state request failed");
    StateError::Backend(message)
}

#[async_trait]
impl StateStore for DynamoStateStore {
    async fn set(&self, key: &str, value: &Value) -> Result<Value, StateError> {
        let output = self
            .client
            .update_item()
            .table_name(&self.table)
            .key(KEY_ATTR, key_attr(key))
            .update_expression(format!("SET {} = :val", DATA_ATTR))
            .expression_attribute_values(":val", encode(value)?)
            .return_values(ReturnValue::UpdatedNew)
            .send()
            .await
            .map_err(|e| backend_error("set", key, e))?;

        debug!(table = %self.table, key, "State stored");
        Ok(data_of(output.attributes())?.unwrap_or_else(|| value.clone()))
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StateError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key(KEY_ATTR, key_attr(key))
            .send()
            .await
            .map_err(|e| backend_error("get", key, e))?;

        data_of(output.item())
    }

    async fn remove(&self, key: &str) -> Result<Option<Value>, StateError> {
        let output = self
            .client
            .delete_item()
            .table_name(&self.table)
            .key(KEY_ATTR, key_attr(key))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(|e| backend_error("remove", key, e))?;

        debug!(table = %self.table, key, "State removed");
        data_of(output.attributes())
    }
}
