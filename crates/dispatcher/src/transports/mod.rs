//! Transport implementations
//!
//! Contains InMemoryBroker and LogTransport.

mod log;
mod memory;

pub use self::log::{LogTopicClient, LogTransport};
pub use self::memory::{Delivery, FailureKind, InMemoryBroker, InMemoryTopicClient, SendAttempt};
