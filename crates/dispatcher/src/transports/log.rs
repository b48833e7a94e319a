//! LogTransport - logs message summaries via tracing

use contracts::{ContractError, OutboundMessage, TopicAdmin, TopicClient, TopicConnector};
use tracing::{info, instrument};

/// Transport that logs messages instead of publishing them
#[derive(Debug, Clone)]
pub struct LogTransport {
    name: String,
}

impl LogTransport {
    /// Create a new LogTransport with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Client of a LogTransport
#[derive(Debug)]
pub struct LogTopicClient {
    name: String,
    topic: String,
}

impl LogTopicClient {
    fn log_message_summary(&self, message: &OutboundMessage) {
        info!(
            transport = %self.name,
            topic = %self.topic,
            message_id = %message.id,
            label = %message.label,
            bytes = message.len(),
            enqueued_at = %message.enqueued_at,
            "OutboundMessage published"
        );
    }
}

impl TopicClient for LogTopicClient {
    #[instrument(
        name = "log_transport_send",
        skip(self, message),
        fields(transport = %self.name, message_id = %message.id)
    )]
    async fn send(&mut self, message: &OutboundMessage) -> Result<(), ContractError> {
        self.log_message_summary(message);
        Ok(())
    }

    #[instrument(name = "log_transport_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(transport = %self.name, topic = %self.topic, "LogTransport client closed");
        Ok(())
    }
}

impl TopicConnector for LogTransport {
    type Client = LogTopicClient;

    fn connect(
        &self,
        _connection_string: &str,
        topic: &str,
    ) -> Result<Self::Client, ContractError> {
        Ok(LogTopicClient {
            name: self.name.clone(),
            topic: topic.to_string(),
        })
    }
}

impl TopicAdmin for LogTransport {
    async fn list_topics(&self) -> Result<Vec<String>, ContractError> {
        Ok(Vec::new())
    }

    async fn create_topic(&self, name: &str, size_mb: u32) -> Result<(), ContractError> {
        info!(transport = %self.name, topic = name, size_mb, "LogTransport topic created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_transport_send() {
        let transport = LogTransport::new("test_log");
        let mut client = transport.connect("", "ProductionAreaChanged").unwrap();

        let result = client.send(&OutboundMessage::new("store", "{}")).await;
        assert!(result.is_ok());
        assert!(client.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_log_transport_admin_accepts_create() {
        let transport = LogTransport::new("my_logger");
        assert!(transport.list_topics().await.unwrap().is_empty());
        assert!(transport.create_topic("t", 1).await.is_ok());
    }
}
