//! Topic provisioning - create the destination topic if absent

use tracing::{debug, info, instrument};

use contracts::{ContractError, TopicAdmin};

/// What `ensure_topic_exists` found or did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// Topic was already listed
    AlreadyPresent,
    /// This call created it
    Created,
    /// Another caller created it between list and create
    CreatedConcurrently,
}

impl ProvisionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyPresent => "already_present",
            Self::Created => "created",
            Self::CreatedConcurrently => "created_concurrently",
        }
    }
}

/// Make sure `name` exists on the broker
///
/// Matching is case-insensitive. An "already exists" failure from the create
/// call counts as success, so concurrent callers never error.
#[instrument(name = "ensure_topic_exists", skip(admin))]
pub async fn ensure_topic_exists<A: TopicAdmin>(
    admin: &A,
    name: &str,
    size_mb: u32,
) -> Result<ProvisionOutcome, ContractError> {
    let topics = admin.list_topics().await?;
    if topics.iter().any(|t| t.eq_ignore_ascii_case(name)) {
        debug!(topic = name, "Topic already present");
        return Ok(ProvisionOutcome::AlreadyPresent);
    }

    match admin.create_topic(name, size_mb).await {
        Ok(()) => {
            info!(topic = name, size_mb, "Topic created");
            Ok(ProvisionOutcome::Created)
        }
        Err(e) if e.is_already_exists() => {
            debug!(topic = name, "Topic created concurrently by another caller");
            Ok(ProvisionOutcome::CreatedConcurrently)
        }
        Err(e) => Err(e),
    }
}
