//! Storage-backed timeline service.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use upnext_core::{
    CareerGoal, Error, Milestone, MilestoneId, MilestonePatch, MilestoneSpec, ResourceKind,
    ResourceRef, Result, Timeline, UserId,
};
use upnext_storage::{NotificationFilter, NotificationUpdate, Storage, UserLocks};

use crate::blocker::{BlockerAnalysis, BlockerDetector};
use crate::estimator::CompletionEstimator;
use crate::tracker;

/// Runs milestone operations against a learner's active timeline.
pub struct TimelineService {
    storage: Arc<dyn Storage>,
    locks: UserLocks,
}

impl TimelineService {
    /// Create a service.
    pub fn new(storage: Arc<dyn Storage>, locks: UserLocks) -> Self {
        Self { storage, locks }
    }

    /// Create an empty timeline for `user`, replacing any existing one.
    pub async fn create_timeline(&self, user: &UserId, goal: CareerGoal) -> Result<Timeline> {
        let _guard = self.locks.lock(user).await;
        let mut timeline = Timeline::new(user.clone(), goal);
        if let Some(existing) = self.storage.load_timeline(user).await? {
            timeline.version = existing.version;
        }
        timeline.version = self.storage.save_timeline(&timeline).await?;
        info!(user_id = %user, "Created timeline");
        Ok(timeline)
    }

    /// Load the learner's timeline.
    pub async fn timeline(&self, user: &UserId) -> Result<Timeline> {
        self.storage
            .load_timeline(user)
            .await?
            .ok_or_else(|| Error::not_found("timeline", user))
    }

    /// Add a milestone.
    pub async fn add_milestone(&self, user: &UserId, spec: MilestoneSpec) -> Result<Milestone> {
        let milestone = self
            .mutate(user, |timeline| tracker::add_milestone(timeline, spec, Utc::now()))
            .await?;
        info!(user_id = %user, milestone_id = %milestone.id, title = %milestone.title, "Added milestone");
        Ok(milestone)
    }

    /// Partially update a milestone.
    pub async fn update_milestone(
        &self,
        user: &UserId,
        id: MilestoneId,
        patch: MilestonePatch,
    ) -> Result<Milestone> {
        let milestone = self
            .mutate(user, |timeline| {
                tracker::update_milestone(timeline, id, &patch, Utc::now())
            })
            .await?;
        info!(user_id = %user, milestone_id = %id, status = milestone.status.as_str(), "Updated milestone");
        Ok(milestone)
    }

    /// Delete a milestone, its sibling dependency entries and any
    /// notification links pointing at it.
    pub async fn delete_milestone(&self, user: &UserId, id: MilestoneId) -> Result<()> {
        self.mutate(user, |timeline| tracker::delete_milestone(timeline, id, Utc::now()))
            .await?;

        let link = ResourceRef::new(ResourceKind::Milestone, id);
        let linked = self
            .storage
            .list_notifications(&NotificationFilter {
                user_id: Some(user.clone()),
                linked_resource: Some(link),
                ..Default::default()
            })
            .await?;
        for notification in &linked {
            self.storage
                .update_notification(notification.id, NotificationUpdate::ClearLinkedResource)
                .await?;
        }

        info!(user_id = %user, milestone_id = %id, unlinked = linked.len(), "Deleted milestone");
        Ok(())
    }

    /// Analyze prerequisite blockers.
    pub async fn blockers(&self, user: &UserId) -> Result<BlockerAnalysis> {
        let timeline = self.timeline(user).await?;
        Ok(BlockerDetector.analyze(&timeline))
    }

    /// Load, mutate and save the timeline under the learner's lock.
    ///
    /// The estimated completion date is refreshed on every save.
    async fn mutate<T>(
        &self,
        user: &UserId,
        op: impl FnOnce(&mut Timeline) -> Result<T>,
    ) -> Result<T> {
        let _guard = self.locks.lock(user).await;

        let mut timeline = self.timeline(user).await?;
        let out = op(&mut timeline)?;

        let study_hours = self
            .storage
            .load_user(user)
            .await?
            .map(|u| u.preferences.study_hours_per_week)
            .unwrap_or(10);
        timeline.estimated_completion =
            CompletionEstimator::new(study_hours).estimate_timeline(&timeline, Utc::now());

        timeline.version = self.storage.save_timeline(&timeline).await?;
        debug!(user_id = %user, version = timeline.version, progress = timeline.overall_progress, "Saved timeline");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upnext_core::{
        MilestoneStatus, MilestoneType, Notification, NotificationSpec, NotificationType,
    };
    use upnext_storage::MemoryStorage;

    fn spec(title: &str, hours: f32) -> MilestoneSpec {
        MilestoneSpec {
            title: title.into(),
            milestone_type: Some(MilestoneType::Certificate),
            estimated_hours: Some(hours),
            ..Default::default()
        }
    }

    async fn setup() -> (Arc<MemoryStorage>, TimelineService, UserId) {
        let storage = Arc::new(MemoryStorage::new());
        let service = TimelineService::new(storage.clone(), UserLocks::new());
        let user = UserId::from("u1");
        service
            .create_timeline(&user, CareerGoal {
                target_role: "Data Scientist".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        (storage, service, user)
    }

    #[tokio::test]
    async fn test_progress_and_estimate_are_saved() {
        let (_storage, service, user) = setup().await;
        let a = service.add_milestone(&user, spec("AWS cert", 20.0)).await.unwrap();
        service.add_milestone(&user, spec("GCP cert", 20.0)).await.unwrap();

        service
            .update_milestone(&user, a.id, MilestonePatch {
                status: Some(MilestoneStatus::Completed),
                ..Default::default()
            })
            .await
            .unwrap();

        let timeline = service.timeline(&user).await.unwrap();
        assert_eq!(timeline.overall_progress, 50);
        assert!(timeline.estimated_completion.is_some());
        assert_eq!(timeline.version, 4);
    }

    #[tokio::test]
    async fn test_huge_estimate_saves_without_completion_date() {
        let (storage, service, user) = setup().await;
        let m = service.add_milestone(&user, spec("Lifelong", 1.0e9)).await.unwrap();

        let stored = storage.load_timeline(&user).await.unwrap().unwrap();
        assert_eq!(stored.milestones[0].id, m.id);
        assert!(stored.estimated_completion.is_none());
    }

    #[tokio::test]
    async fn test_failed_update_is_not_saved() {
        let (_storage, service, user) = setup().await;
        let a = service.add_milestone(&user, spec("A", 1.0)).await.unwrap();
        let mut b = spec("B", 1.0);
        b.dependencies = vec![upnext_core::Dependency {
            milestone_id: a.id,
            relation: upnext_core::DependencyKind::Prerequisite,
        }];
        let b = service.add_milestone(&user, b).await.unwrap();
        let before = service.timeline(&user).await.unwrap();

        let err = service
            .update_milestone(&user, b.id, MilestonePatch {
                status: Some(MilestoneStatus::InProgress),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DependencyUnmet { .. }));
        assert_eq!(service.timeline(&user).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_delete_unlinks_notifications() {
        let (storage, service, user) = setup().await;
        let a = service.add_milestone(&user, spec("A", 1.0)).await.unwrap();

        let mut n = NotificationSpec::new(user.clone(), NotificationType::Deadline, "Due", "Soon");
        n.linked_resource = Some(ResourceRef::new(ResourceKind::Milestone, a.id));
        let n = Notification::from_spec(n, Utc::now()).unwrap();
        storage.insert_notification(&n).await.unwrap();

        service.delete_milestone(&user, a.id).await.unwrap();

        let stored = storage.load_notification(n.id).await.unwrap().unwrap();
        assert!(stored.linked_resource.is_none());
        assert!(service.timeline(&user).await.unwrap().milestones.is_empty());
    }

    #[tokio::test]
    async fn test_missing_timeline() {
        let storage = Arc::new(MemoryStorage::new());
        let service = TimelineService::new(storage, UserLocks::new());
        let err = service
            .add_milestone(&UserId::from("ghost"), spec("A", 1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "timeline", .. }));
    }
}
