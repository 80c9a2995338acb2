//! In-memory storage backend.
//!
//! Used by tests and by embedders that bring their own persistence.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use upnext_core::{Notification, NotificationId, Roadmap, Timeline, UserId, UserProfile};

use super::trait_::{next_version, NotificationFilter, NotificationUpdate};
use super::{Result, Storage, StorageError};

#[derive(Default)]
struct State {
    users: HashMap<UserId, UserProfile>,
    roadmaps: HashMap<UserId, Roadmap>,
    timelines: HashMap<UserId, Timeline>,
    notifications: HashMap<NotificationId, Notification>,
}

/// Storage kept entirely in process memory.
#[derive(Default)]
pub struct MemoryStorage {
    state: RwLock<State>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn save_user(&self, profile: &UserProfile) -> Result<()> {
        self.state
            .write()
            .await
            .users
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn load_user(&self, id: &UserId) -> Result<Option<UserProfile>> {
        Ok(self.state.read().await.users.get(id).cloned())
    }

    async fn load_roadmap(&self, user: &UserId) -> Result<Option<Roadmap>> {
        Ok(self.state.read().await.roadmaps.get(user).cloned())
    }

    async fn save_roadmap(&self, roadmap: &Roadmap) -> Result<u64> {
        let mut state = self.state.write().await;
        let stored = state
            .roadmaps
            .get(&roadmap.user_id)
            .map(|r| r.version)
            .unwrap_or(0);
        let version = next_version(&format!("roadmap:{}", roadmap.user_id), stored, roadmap.version)?;

        let mut saved = roadmap.clone();
        saved.version = version;
        state.roadmaps.insert(saved.user_id.clone(), saved);
        Ok(version)
    }

    async fn load_timeline(&self, user: &UserId) -> Result<Option<Timeline>> {
        Ok(self.state.read().await.timelines.get(user).cloned())
    }

    async fn save_timeline(&self, timeline: &Timeline) -> Result<u64> {
        let mut state = self.state.write().await;
        let stored = state
            .timelines
            .get(&timeline.user_id)
            .map(|t| t.version)
            .unwrap_or(0);
        let version =
            next_version(&format!("timeline:{}", timeline.user_id), stored, timeline.version)?;

        let mut saved = timeline.clone();
        saved.version = version;
        state.timelines.insert(saved.user_id.clone(), saved);
        Ok(version)
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        self.state
            .write()
            .await
            .notifications
            .insert(notification.id, notification.clone());
        Ok(())
    }

    async fn load_notification(&self, id: NotificationId) -> Result<Option<Notification>> {
        Ok(self.state.read().await.notifications.get(&id).cloned())
    }

    async fn list_notifications(&self, filter: &NotificationFilter) -> Result<Vec<Notification>> {
        let state = self.state.read().await;
        let items = state
            .notifications
            .values()
            .filter(|n| filter.matches(n))
            .cloned()
            .collect();
        Ok(filter.finish(items))
    }

    async fn update_notification(
        &self,
        id: NotificationId,
        update: NotificationUpdate,
    ) -> Result<Notification> {
        let mut state = self.state.write().await;
        let notification = state
            .notifications
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound(format!("notification {id}")))?;
        update.apply(notification);
        Ok(notification.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upnext_core::{Channel, ChannelState, NotificationSpec, NotificationType};

    fn roadmap(user: &str) -> Roadmap {
        Roadmap::new(UserId::from(user), "Software Engineer", "beginner", vec![])
    }

    #[tokio::test]
    async fn test_roadmap_versioning() {
        let storage = MemoryStorage::new();
        let mut r = roadmap("u1");

        let v1 = storage.save_roadmap(&r).await.unwrap();
        assert_eq!(v1, 1);

        // Stale writer still holding version 0.
        let err = storage.save_roadmap(&r).await.unwrap_err();
        assert!(matches!(err, StorageError::VersionConflict { expected: 0, found: 1, .. }));

        r.version = v1;
        assert_eq!(storage.save_roadmap(&r).await.unwrap(), 2);
        assert_eq!(storage.load_roadmap(&UserId::from("u1")).await.unwrap().unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_channel_update_leaves_other_channels() {
        let storage = MemoryStorage::new();
        let spec = NotificationSpec::new(UserId::from("u1"), NotificationType::Reminder, "t", "m");
        let n = Notification::from_spec(spec, chrono::Utc::now()).unwrap();
        storage.insert_notification(&n).await.unwrap();

        let updated = storage
            .update_notification(
                n.id,
                NotificationUpdate::Channel {
                    channel: Channel::Email,
                    state: ChannelState {
                        attempted: true,
                        sent: true,
                        ..Default::default()
                    },
                },
            )
            .await
            .unwrap();

        assert!(updated.channels[&Channel::Email].sent);
        assert!(!updated.channels[&Channel::Push].attempted);
    }

    #[tokio::test]
    async fn test_update_missing_notification() {
        let storage = MemoryStorage::new();
        let err = storage
            .update_notification(NotificationId::new(), NotificationUpdate::ClearLinkedResource)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
