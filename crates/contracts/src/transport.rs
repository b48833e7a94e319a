//! Transport traits - broker capabilities consumed by the dispatcher
//!
//! The broker protocol stays behind these traits.

use crate::{ContractError, OutboundMessage};

/// Client bound to a single topic
///
/// Opened at the start of a dispatch loop and closed when the loop goes idle.
#[trait_variant::make(TopicClient: Send)]
pub trait LocalTopicClient {
    /// Publish one message
    ///
    /// # Errors
    /// Any error is treated as retryable by the dispatcher
    async fn send(&mut self, message: &OutboundMessage) -> Result<(), ContractError>;

    /// Release the underlying connection
    async fn close(&mut self) -> Result<(), ContractError>;
}

/// Factory for topic clients
pub trait TopicConnector: Send + Sync + 'static {
    type Client: TopicClient + Send + 'static;

    /// Build a client from a connection string and topic name
    fn connect(&self, connection_string: &str, topic: &str)
        -> Result<Self::Client, ContractError>;
}

/// Topic administration
#[trait_variant::make(TopicAdmin: Send)]
pub trait LocalTopicAdmin {
    /// Names of existing topics
    async fn list_topics(&self) -> Result<Vec<String>, ContractError>;

    /// Create a topic with the given size limit
    ///
    /// # Errors
    /// `ContractError::TopicAlreadyExists` when another caller created it first
    async fn create_topic(&self, name: &str, size_mb: u32) -> Result<(), ContractError>;
}
