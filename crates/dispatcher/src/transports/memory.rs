//! InMemoryBroker - in-process topic broker
//!
//! Implements both topic administration and topic clients. Failures can be
//! scripted so delivery behaviour is observable without a real broker.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use contracts::{ContractError, OutboundMessage, TopicAdmin, TopicClient, TopicConnector};

/// Kind of scripted send failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Generic transport error
    Transport,
    /// Host unreachable
    Connectivity,
}

/// Message accepted by the broker
#[derive(Debug, Clone)]
pub struct Delivery {
    pub topic: String,
    pub message: OutboundMessage,
    pub delivered_at: DateTime<Utc>,
}

/// One call to `send`, successful or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendAttempt {
    pub message_id: Uuid,
    pub label: String,
    pub succeeded: bool,
}

#[derive(Debug, Default)]
struct BrokerState {
    topics: BTreeMap<String, u32>,
    deliveries: Vec<Delivery>,
    attempts: Vec<SendAttempt>,
    send_failures: VecDeque<FailureKind>,
    connect_failures: usize,
    fail_next_close: bool,
    race_next_create: bool,
    admin_denied: Option<String>,
    create_requests: usize,
    send_delay: Duration,
    open_clients: usize,
    max_open_clients: usize,
    clients_opened: usize,
    clients_closed: usize,
    in_flight: usize,
    max_in_flight: usize,
}

impl BrokerState {
    fn find_topic(&self, name: &str) -> Option<(&String, &u32)> {
        self.topics.iter().find(|(t, _)| t.eq_ignore_ascii_case(name))
    }
}

/// In-process broker shared by all its clones
#[derive(Debug, Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Broker with one pre-existing topic
    pub fn with_topic(name: impl Into<String>, size_mb: u32) -> Self {
        let broker = Self::new();
        broker.lock().topics.insert(name.into(), size_mb);
        broker
    }

    /// Fail the next `count` sends with the given kind
    pub fn fail_next_sends(&self, count: usize, kind: FailureKind) {
        self.lock()
            .send_failures
            .extend(std::iter::repeat(kind).take(count));
    }

    /// Fail the next `count` connects
    pub fn fail_next_connects(&self, count: usize) {
        self.lock().connect_failures += count;
    }

    /// Fail the next client close
    pub fn fail_next_close(&self) {
        self.lock().fail_next_close = true;
    }

    /// Next create call finds the topic created by someone else
    pub fn race_next_create(&self) {
        self.lock().race_next_create = true;
    }

    /// Reject all admin calls
    pub fn deny_admin(&self, reason: impl Into<String>) {
        self.lock().admin_denied = Some(reason.into());
    }

    /// Delay applied to every send before it is acknowledged
    pub fn set_send_delay(&self, delay: Duration) {
        self.lock().send_delay = delay;
    }

    /// Topic names
    pub fn topics(&self) -> Vec<String> {
        self.lock().topics.keys().cloned().collect()
    }

    /// Size of a topic, case-insensitive lookup
    pub fn topic_size_mb(&self, name: &str) -> Option<u32> {
        self.lock().find_topic(name).map(|(_, size)| *size)
    }

    pub fn create_requests(&self) -> usize {
        self.lock().create_requests
    }

    /// Accepted messages, in acknowledgement order
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.lock().deliveries.clone()
    }

    /// Every send call, in call order
    pub fn attempts(&self) -> Vec<SendAttempt> {
        self.lock().attempts.clone()
    }

    /// Highest number of simultaneously open clients
    pub fn max_open_clients(&self) -> usize {
        self.lock().max_open_clients
    }

    /// Highest number of simultaneously pending sends
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    pub fn clients_opened(&self) -> usize {
        self.lock().clients_opened
    }

    pub fn clients_closed(&self) -> usize {
        self.lock().clients_closed
    }

    fn begin_send(&self) -> Duration {
        let mut state = self.lock();
        state.in_flight += 1;
        state.max_in_flight = state.max_in_flight.max(state.in_flight);
        state.send_delay
    }

    fn finish_send(&self, topic: &str, message: &OutboundMessage) -> Result<(), ContractError> {
        let mut state = self.lock();
        state.in_flight -= 1;

        let result = match state.send_failures.pop_front() {
            Some(FailureKind::Transport) => {
                Err(ContractError::transport_send(topic, "scripted transport failure"))
            }
            Some(FailureKind::Connectivity) => Err(ContractError::connectivity(
                "in-memory",
                "scripted host unreachable",
            )),
            None => match state.find_topic(topic) {
                Some((name, _)) => {
                    let delivery = Delivery {
                        topic: name.clone(),
                        message: message.clone(),
                        delivered_at: Utc::now(),
                    };
                    state.deliveries.push(delivery);
                    Ok(())
                }
                None => Err(ContractError::transport_send(topic, "topic not found")),
            },
        };

        state.attempts.push(SendAttempt {
            message_id: message.id,
            label: message.label.clone(),
            succeeded: result.is_ok(),
        });
        result
    }

    fn close_client(&self, topic: &str) -> Result<(), ContractError> {
        let mut state = self.lock();
        state.open_clients = state.open_clients.saturating_sub(1);
        state.clients_closed += 1;
        if std::mem::take(&mut state.fail_next_close) {
            return Err(ContractError::transport_close(topic, "scripted close failure"));
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Client bound to one topic of an `InMemoryBroker`
#[derive(Debug)]
pub struct InMemoryTopicClient {
    broker: InMemoryBroker,
    topic: String,
    open: bool,
}

impl TopicClient for InMemoryTopicClient {
    async fn send(&mut self, message: &OutboundMessage) -> Result<(), ContractError> {
        if !self.open {
            return Err(ContractError::transport_send(&self.topic, "client closed"));
        }

        let delay = self.broker.begin_send();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.broker.finish_send(&self.topic, message)
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.broker.close_client(&self.topic)
    }
}

impl TopicConnector for InMemoryBroker {
    type Client = InMemoryTopicClient;

    fn connect(
        &self,
        connection_string: &str,
        topic: &str,
    ) -> Result<Self::Client, ContractError> {
        let mut state = self.lock();
        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(ContractError::connectivity(
                connection_string,
                "scripted connect failure",
            ));
        }
        if connection_string.trim().is_empty() {
            return Err(ContractError::connectivity(
                connection_string,
                "empty connection string",
            ));
        }

        state.open_clients += 1;
        state.max_open_clients = state.max_open_clients.max(state.open_clients);
        state.clients_opened += 1;
        debug!(topic, "In-memory client opened");

        Ok(InMemoryTopicClient {
            broker: self.clone(),
            topic: topic.to_string(),
            open: true,
        })
    }
}

impl TopicAdmin for InMemoryBroker {
    async fn list_topics(&self) -> Result<Vec<String>, ContractError> {
        let state = self.lock();
        if let Some(reason) = &state.admin_denied {
            return Err(ContractError::topic_admin(reason.clone()));
        }
        Ok(state.topics.keys().cloned().collect())
    }

    async fn create_topic(&self, name: &str, size_mb: u32) -> Result<(), ContractError> {
        let mut state = self.lock();
        state.create_requests += 1;
        if let Some(reason) = &state.admin_denied {
            return Err(ContractError::topic_admin(reason.clone()));
        }

        if std::mem::take(&mut state.race_next_create) {
            state.topics.insert(name.to_string(), size_mb);
            return Err(ContractError::topic_already_exists(name));
        }
        if state.find_topic(name).is_some() {
            return Err(ContractError::topic_already_exists(name));
        }

        state.topics.insert(name.to_string(), size_mb);
        Ok(())
    }
}
