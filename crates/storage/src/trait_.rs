//! Storage trait abstraction.

use async_trait::async_trait;
use upnext_core::{
    Channel, ChannelState, Notification, NotificationId, NotificationType, ResourceRef, Roadmap,
    Time, Timeline, UserId, UserProfile,
};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Another writer saved the aggregate after it was read
    #[error("Version conflict on {entity}: expected {expected}, found {found}")]
    VersionConflict {
        /// Aggregate key
        entity: String,
        /// Version carried by the caller
        expected: u64,
        /// Version currently stored
        found: u64,
    },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl From<StorageError> for upnext_core::Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => upnext_core::Error::NotFound {
                kind: "record",
                id: what,
            },
            StorageError::VersionConflict {
                entity,
                expected,
                found,
            } => upnext_core::Error::VersionConflict {
                entity,
                expected,
                found,
            },
            other => upnext_core::Error::Storage(other.to_string()),
        }
    }
}

/// Atomic partial update of one notification.
#[derive(Debug, Clone)]
pub enum NotificationUpdate {
    /// Replace the delivery state of a single channel, leaving the others untouched.
    Channel {
        /// Channel to update
        channel: Channel,
        /// New state
        state: ChannelState,
    },
    /// Mark the in-app copy as read.
    MarkRead {
        /// When it was read
        at: Time,
    },
    /// Drop the navigation link (the target was deleted).
    ClearLinkedResource,
}

impl NotificationUpdate {
    /// Apply the update in place.
    pub fn apply(self, notification: &mut Notification) {
        match self {
            NotificationUpdate::Channel { channel, state } => {
                notification.channels.insert(channel, state);
            }
            NotificationUpdate::MarkRead { at } => {
                if !notification.in_app.read {
                    notification.in_app.read = true;
                    notification.in_app.read_at = Some(at);
                }
            }
            NotificationUpdate::ClearLinkedResource => {
                notification.linked_resource = None;
            }
        }
    }
}

/// Filter for querying notifications.
#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    /// Only this recipient
    pub user_id: Option<UserId>,
    /// Only notifications scheduled at or before this instant
    pub due_at: Option<Time>,
    /// Only unread in-app notifications
    pub unread_only: bool,
    /// Only this type
    pub notification_type: Option<NotificationType>,
    /// Only notifications linking to this resource
    pub linked_resource: Option<ResourceRef>,
    /// Maximum results to return
    pub limit: Option<usize>,
}

impl NotificationFilter {
    /// Whether `n` passes the filter (limit excluded).
    pub fn matches(&self, n: &Notification) -> bool {
        if let Some(user) = &self.user_id {
            if &n.user_id != user {
                return false;
            }
        }
        if let Some(due) = self.due_at {
            if !n.is_due(due) {
                return false;
            }
        }
        if self.unread_only && n.in_app.read {
            return false;
        }
        if let Some(kind) = self.notification_type {
            if n.notification_type != kind {
                return false;
            }
        }
        if let Some(link) = &self.linked_resource {
            if n.linked_resource.as_ref() != Some(link) {
                return false;
            }
        }
        true
    }

    /// Sort by schedule (oldest first) and apply the limit.
    pub fn finish(&self, mut items: Vec<Notification>) -> Vec<Notification> {
        items.sort_by(|a, b| {
            a.scheduled_for
                .cmp(&b.scheduled_for)
                .then_with(|| a.id.cmp(&b.id))
        });
        if let Some(limit) = self.limit {
            items.truncate(limit);
        }
        items
    }
}

/// Storage abstraction for UpNext data.
///
/// Roadmaps and timelines are keyed by their owning learner and saved with an
/// optimistic version check: the caller's `version` must equal the stored one
/// (0 for a new aggregate); the stored version is then bumped and returned.
#[async_trait]
pub trait Storage: Send + Sync {
    // === Users ===

    /// Create or replace a learner profile.
    async fn save_user(&self, profile: &UserProfile) -> Result<()>;

    /// Load a learner profile.
    async fn load_user(&self, id: &UserId) -> Result<Option<UserProfile>>;

    // === Roadmaps ===

    /// Load a learner's roadmap.
    async fn load_roadmap(&self, user: &UserId) -> Result<Option<Roadmap>>;

    /// Save a roadmap, returning the new version.
    async fn save_roadmap(&self, roadmap: &Roadmap) -> Result<u64>;

    // === Timelines ===

    /// Load a learner's active timeline.
    async fn load_timeline(&self, user: &UserId) -> Result<Option<Timeline>>;

    /// Save a timeline, returning the new version.
    async fn save_timeline(&self, timeline: &Timeline) -> Result<u64>;

    // === Notifications ===

    /// Persist a new notification.
    async fn insert_notification(&self, notification: &Notification) -> Result<()>;

    /// Load a notification by id.
    async fn load_notification(&self, id: NotificationId) -> Result<Option<Notification>>;

    /// List notifications matching the filter, oldest schedule first.
    async fn list_notifications(&self, filter: &NotificationFilter) -> Result<Vec<Notification>>;

    /// Atomically apply a partial update and return the stored result.
    async fn update_notification(
        &self,
        id: NotificationId,
        update: NotificationUpdate,
    ) -> Result<Notification>;
}

/// Check an optimistic version and return the next one.
pub(crate) fn next_version(entity: &str, stored: u64, expected: u64) -> Result<u64> {
    if stored != expected {
        return Err(StorageError::VersionConflict {
            entity: entity.to_string(),
            expected,
            found: stored,
        });
    }
    Ok(stored + 1)
}
