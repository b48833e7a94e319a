//! ServiceConfig - Config Loader output
//!
//! File-level configuration: broker connection and dispatcher tuning.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    DispatcherConfig, RetryConfig, DEFAULT_MAX_BACKOFF_MULTIPLIER, DEFAULT_RETRY_BASE_DELAY,
    DEFAULT_TOPIC, DEFAULT_TOPIC_SIZE_MB,
};

/// Complete service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Broker connection section
    pub service_bus: ServiceBusConfig,

    /// Dispatcher tuning
    #[serde(default)]
    pub dispatcher: DispatcherSettings,
}

/// Broker connection section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceBusConfig {
    /// Connection string handed to the topic connector
    pub connection_string: String,
}

/// Dispatcher tuning section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherSettings {
    #[serde(default = "default_topic")]
    pub topic: String,

    #[serde(default = "default_topic_size_mb")]
    pub topic_size_mb: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default = "default_max_backoff_multiplier")]
    pub max_backoff_multiplier: u32,
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

fn default_topic_size_mb() -> u32 {
    DEFAULT_TOPIC_SIZE_MB
}

fn default_retry_base_delay_ms() -> u64 {
    DEFAULT_RETRY_BASE_DELAY.as_millis() as u64
}

fn default_max_backoff_multiplier() -> u32 {
    DEFAULT_MAX_BACKOFF_MULTIPLIER
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            topic_size_mb: default_topic_size_mb(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            max_backoff_multiplier: default_max_backoff_multiplier(),
        }
    }
}

impl From<&ServiceConfig> for DispatcherConfig {
    fn from(config: &ServiceConfig) -> Self {
        let settings = &config.dispatcher;
        DispatcherConfig {
            connection_string: config.service_bus.connection_string.clone(),
            topic: settings.topic.clone(),
            topic_size_mb: settings.topic_size_mb,
            retry: RetryConfig {
                base_delay: Duration::from_millis(settings.retry_base_delay_ms),
                max_multiplier: settings.max_backoff_multiplier,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default_when_section_missing() {
        let config: ServiceConfig =
            serde_json::from_str(r#"{"service_bus":{"connection_string":"sb://x"}}"#).unwrap();
        assert_eq!(config.dispatcher, DispatcherSettings::default());
    }

    #[test]
    fn test_into_dispatcher_config() {
        let config = ServiceConfig {
            service_bus: ServiceBusConfig {
                connection_string: "sb://x".into(),
            },
            dispatcher: DispatcherSettings {
                retry_base_delay_ms: 5,
                max_backoff_multiplier: 2,
                ..Default::default()
            },
        };
        let runtime = DispatcherConfig::from(&config);
        assert_eq!(runtime.connection_string, "sb://x");
        assert_eq!(runtime.topic, DEFAULT_TOPIC);
        assert_eq!(runtime.retry.base_delay, Duration::from_millis(5));
        assert_eq!(runtime.retry.max_multiplier, 2);
    }
}
