//! AWS SDK configuration shared by the queue and state clients

use aws_config::{BehaviorVersion, Region, SdkConfig};
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_REGION: &str = "us-east-1";

/// Region and optional endpoint override (LocalStack, ElasticMQ)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AwsConfig {
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default)]
    pub endpoint_url: Option<String>,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint_url: None,
        }
    }
}

/// Loads credentials from the default provider chain for `config.region`.
pub async fn load_sdk_config(config: &AwsConfig) -> SdkConfig {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
    if let Some(endpoint) = &config.endpoint_url {
        debug!(endpoint = %endpoint, "Using custom AWS endpoint");
        loader = loader.endpoint_url(endpoint);
    }
    loader.load().await
}
