//! # Dispatcher
//!
//! Change-event dispatch module.
//!
//! Responsibilities:
//! - Encode entity changes into outbound messages
//! - Buffer them in an ordered pending queue
//! - Drain the queue to a topic, one loop at a time, retrying with backoff
//! - Provision the destination topic on startup

pub mod backoff;
pub mod codec;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod provisioner;
pub mod queue;
pub mod run_state;
pub mod transports;

pub use backoff::Backoff;
pub use contracts::{ChangeRecord, DispatcherConfig, OutboundMessage};
pub use dispatcher::ChangeDispatcher;
pub use error::DispatcherError;
pub use metrics::{DispatcherMetrics, MetricsSnapshot};
pub use provisioner::{ensure_topic_exists, ProvisionOutcome};
pub use queue::PendingQueue;
pub use run_state::{RunGuard, RunState};
pub use transports::{FailureKind, InMemoryBroker, LogTransport};
