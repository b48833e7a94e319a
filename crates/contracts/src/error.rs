//! Layered error definitions
//!
//! Categorized by source: config / transport / admin

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Transport Errors =====
    /// Sending a message to the topic failed
    #[error("send to topic '{topic}' failed: {message}")]
    TransportSend { topic: String, message: String },

    /// Broker host could not be reached
    #[error("communication error with '{host}': {message}")]
    Connectivity { host: String, message: String },

    /// Closing the topic client failed
    #[error("close of topic client '{topic}' failed: {message}")]
    TransportClose { topic: String, message: String },

    // ===== Admin Errors =====
    /// Topic already exists (create raced with another caller)
    #[error("topic '{name}' already exists")]
    TopicAlreadyExists { name: String },

    /// Topic administration error
    #[error("topic admin error: {message}")]
    TopicAdmin { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create transport send error
    pub fn transport_send(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransportSend {
            topic: topic.into(),
            message: message.into(),
        }
    }

    /// Create connectivity error
    pub fn connectivity(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connectivity {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Create transport close error
    pub fn transport_close(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransportClose {
            topic: topic.into(),
            message: message.into(),
        }
    }

    /// Create topic-already-exists error
    pub fn topic_already_exists(name: impl Into<String>) -> Self {
        Self::TopicAlreadyExists { name: name.into() }
    }

    /// Create topic admin error
    pub fn topic_admin(message: impl Into<String>) -> Self {
        Self::TopicAdmin {
            message: message.into(),
        }
    }

    /// Whether this failure points at the network path to the broker.
    ///
    /// Only used for diagnostics; retry policy treats all transport errors alike.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. } | Self::Io(_))
    }

    /// Whether a create-topic call lost a race against another creator
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::TopicAlreadyExists { .. })
    }
}
