//! Dispatcher configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Topic the production area changes are published to
pub const DEFAULT_TOPIC: &str = "ProductionAreaChanged";

/// Topic capacity in megabytes
pub const DEFAULT_TOPIC_SIZE_MB: u32 = 1024;

/// Backoff step between retries
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(10);

/// Cap on the backoff multiplier
pub const DEFAULT_MAX_BACKOFF_MULTIPLIER: u32 = 60;

/// Runtime dispatcher configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Broker connection string
    pub connection_string: String,

    /// Destination topic
    pub topic: String,

    /// Topic capacity used when provisioning
    pub topic_size_mb: u32,

    /// Retry backoff policy
    pub retry: RetryConfig,
}

impl DispatcherConfig {
    /// Configuration with default topic and retry policy
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            topic: DEFAULT_TOPIC.to_string(),
            topic_size_mb: DEFAULT_TOPIC_SIZE_MB,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Linear backoff configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Delay added per consecutive failure
    #[serde(with = "millis")]
    pub base_delay: Duration,

    /// Failure count beyond which the delay stops growing
    pub max_multiplier: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_RETRY_BASE_DELAY,
            max_multiplier: DEFAULT_MAX_BACKOFF_MULTIPLIER,
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
