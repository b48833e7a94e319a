//! ChangeRecord - input of the dispatch trigger
//!
//! A plain tagged record: entity snapshot plus the tracking state reported by
//! whatever change-observation mechanism the host service uses.

use serde::{Deserialize, Serialize};

/// Tracking state of an entity at the end of a unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    Added,
    Modified,
    Deleted,
    Unchanged,
    Detached,
}

impl EntityState {
    /// Mutation kind carried by this state, `None` when nothing changed
    pub fn mutation_kind(self) -> Option<MutationKind> {
        match self {
            Self::Added => Some(MutationKind::Created),
            Self::Modified => Some(MutationKind::Updated),
            Self::Deleted => Some(MutationKind::Deleted),
            Self::Unchanged | Self::Detached => None,
        }
    }
}

/// Kind of mutation announced to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Created,
    Updated,
    Deleted,
}

/// Entity that can be announced on a topic.
///
/// The routing label must be derived from the entity's identifying attribute
/// only, so consumers can partition or filter on it.
pub trait RoutedEntity: Serialize {
    /// Field name the entity is serialized under in the message payload
    const PAYLOAD_FIELD: &'static str;

    /// Stable routing label (e.g. owning store id)
    fn routing_label(&self) -> String;
}

/// Entity snapshot with its tracking state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord<E> {
    /// Entity snapshot at commit time
    pub entity: E,

    /// Tracking state
    pub state: EntityState,
}

impl<E> ChangeRecord<E> {
    pub fn new(entity: E, state: EntityState) -> Self {
        Self { entity, state }
    }

    pub fn created(entity: E) -> Self {
        Self::new(entity, EntityState::Added)
    }

    pub fn updated(entity: E) -> Self {
        Self::new(entity, EntityState::Modified)
    }

    pub fn deleted(entity: E) -> Self {
        Self::new(entity, EntityState::Deleted)
    }

    /// Mutation kind, `None` for unchanged/detached records
    pub fn mutation_kind(&self) -> Option<MutationKind> {
        self.state.mutation_kind()
    }
}
