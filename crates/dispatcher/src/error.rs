//! Dispatcher error types

use thiserror::Error;

use contracts::ContractError;

/// Dispatcher-specific errors
///
/// Delivery failures never show up here; they are absorbed by the dispatch loop.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Change record could not be serialized
    #[error("failed to encode change for label '{label}': {source}")]
    Encode {
        label: String,
        #[source]
        source: serde_json::Error,
    },

    /// Topic provisioning failed
    #[error("failed to provision topic '{topic}': {source}")]
    Provisioning {
        topic: String,
        #[source]
        source: ContractError,
    },

    /// Constructed outside of a tokio runtime
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    /// Trigger called after shutdown
    #[error("dispatcher is shut down")]
    ShutDown,
}

impl DispatcherError {
    /// Create an encode error
    pub fn encode(label: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Encode {
            label: label.into(),
            source,
        }
    }

    /// Create a provisioning error
    pub fn provisioning(topic: impl Into<String>, source: ContractError) -> Self {
        Self::Provisioning {
            topic: topic.into(),
            source,
        }
    }
}
