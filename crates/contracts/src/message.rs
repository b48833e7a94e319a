//! OutboundMessage - transport-level notification
//!
//! Created once at enqueue time and re-sent as-is on retry.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message ready to be published on a topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Unique message id, never reused
    pub id: Uuid,

    /// Routing label (owning store id for production areas)
    pub label: String,

    /// Serialized payload (UTF-8 JSON)
    pub payload: Bytes,

    /// Enqueue timestamp
    pub enqueued_at: DateTime<Utc>,
}

impl OutboundMessage {
    /// Create a message with a fresh id
    pub fn new(label: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            payload: payload.into(),
            enqueued_at: Utc::now(),
        }
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
