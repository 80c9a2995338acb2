//! Error taxonomy shared by every UpNext service.

use serde::{Deserialize, Serialize};

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by roadmap, timeline and notification operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Malformed input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing task, milestone, notification or owning aggregate.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity kind ("task", "milestone", ...)
        kind: &'static str,
        /// Requested identifier
        id: String,
    },

    /// The task was already completed; completing it again is rejected.
    #[error("task {task_id} is already completed")]
    AlreadyCompleted {
        /// The completed task
        task_id: String,
    },

    /// A status change that the state machine does not allow.
    #[error("illegal transition for {entity}: {from} -> {to}")]
    IllegalTransition {
        /// Entity identifier
        entity: String,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// A concurrent writer saved the aggregate first.
    #[error("version conflict on {entity}: expected {expected}, found {found}")]
    VersionConflict {
        /// Aggregate identifier
        entity: String,
        /// Version the caller read
        expected: u64,
        /// Version currently stored
        found: u64,
    },

    /// A prerequisite milestone is not completed yet.
    #[error("milestone {milestone} has unmet prerequisites: {unmet:?}")]
    DependencyUnmet {
        /// Milestone that was asked to start
        milestone: String,
        /// Prerequisites that are not completed
        unmet: Vec<String>,
    },

    /// Delivery through a channel adapter failed.
    #[error(transparent)]
    ChannelDelivery(#[from] ChannelDeliveryError),

    /// The content generation collaborator returned unusable output.
    #[error("external content error: {0}")]
    ExternalContent(String),

    /// No catalog entry for the requested role and level.
    #[error("no catalog entry for role '{role}' at level '{level}'")]
    CatalogNotFound {
        /// Requested target role
        role: String,
        /// Requested level
        level: String,
    },

    /// Persistence failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Shorthand for a [`Error::NotFound`].
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Whether the caller can recover by re-fetching and retrying.
    pub fn is_state_conflict(&self) -> bool {
        matches!(
            self,
            Self::AlreadyCompleted { .. }
                | Self::IllegalTransition { .. }
                | Self::VersionConflict { .. }
        )
    }
}

/// How a channel failure should be treated by later sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryFailureKind {
    /// Retry on the next sweep
    Transient,
    /// Retrying cannot succeed (invalid destination, rejected credentials)
    Permanent,
    /// The adapter did not answer in time
    Timeout,
}

/// A failed channel adapter call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind:?} delivery failure: {message}")]
pub struct ChannelDeliveryError {
    /// Failure classification
    pub kind: DeliveryFailureKind,
    /// Adapter supplied message
    pub message: String,
}

impl ChannelDeliveryError {
    /// A failure worth retrying.
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: DeliveryFailureKind::Transient,
            message: message.into(),
        }
    }

    /// A failure that will not go away by itself.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: DeliveryFailureKind::Permanent,
            message: message.into(),
        }
    }

    /// The adapter call exceeded its time budget.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: DeliveryFailureKind::Timeout,
            message: message.into(),
        }
    }

    /// Whether later sweeps should try again.
    pub fn is_retryable(&self) -> bool {
        self.kind != DeliveryFailureKind::Permanent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_conflict_family() {
        assert!(Error::AlreadyCompleted { task_id: "t".into() }.is_state_conflict());
        assert!(Error::VersionConflict {
            entity: "roadmap".into(),
            expected: 1,
            found: 2
        }
        .is_state_conflict());
        assert!(!Error::not_found("task", "x").is_state_conflict());
        assert!(!Error::Validation("bad".into()).is_state_conflict());
    }

    #[test]
    fn test_delivery_error_retryability() {
        assert!(ChannelDeliveryError::transient("smtp busy").is_retryable());
        assert!(ChannelDeliveryError::timeout("slow").is_retryable());
        assert!(!ChannelDeliveryError::permanent("bad address").is_retryable());
    }
}
