//! Notification scheduling and per-channel delivery.
//!
//! Delivery is idempotent no matter how many callers race on the same
//! notification: a channel is claimed in an in-process set before its adapter
//! runs, the stored state is re-read after claiming, and the outcome is
//! written back as an atomic per-channel update before the claim is released.
//! A channel marked sent is never handed to an adapter again.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::Duration;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use upnext_core::{
    Channel, ChannelDeliveryError, ChannelState, DeliveryFailureKind, Error, Notification,
    NotificationId, NotificationMetadata, NotificationPreferences, NotificationSpec,
    NotificationType, ResourceKind, ResourceRef, Result, RoadmapEvent, Time, UserId,
};
use upnext_storage::{NotificationFilter, NotificationUpdate, Storage};

use crate::channel::{dispatch, ChannelAdapters, DeliveryResult};
use crate::config::SchedulerConfig;

/// Window in which an identical derived reminder is not enqueued again.
const DUPLICATE_WINDOW_HOURS: i64 = 24;

/// What one `deliver` call did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeliveryReport {
    /// Notification delivered
    pub notification_id: Option<NotificationId>,
    /// Channels delivered by this call
    pub sent: Vec<Channel>,
    /// Channels that failed, with the failure
    pub failed: Vec<(Channel, ChannelDeliveryError)>,
    /// Targeted channels the learner has not enabled
    pub skipped: Vec<Channel>,
    /// The notification could not be delivered at all (recipient missing)
    pub abandoned: bool,
}

impl DeliveryReport {
    /// Number of adapter calls made.
    pub fn attempts(&self) -> usize {
        self.sent.len() + self.failed.len()
    }
}

/// Totals of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    /// Due notifications looked at
    pub processed: usize,
    /// Channels delivered
    pub sent: usize,
    /// Channel failures recorded
    pub failed: usize,
    /// Notifications whose delivery errored before reaching an adapter
    pub errors: usize,
}

/// Creates notifications and delivers them through channel adapters.
pub struct NotificationScheduler {
    storage: Arc<dyn Storage>,
    adapters: Arc<dyn ChannelAdapters>,
    config: SchedulerConfig,
    in_flight: Arc<Mutex<HashSet<(NotificationId, Channel)>>>,
}

/// Channels claimed by one `deliver` call; released on drop.
struct Claims {
    set: Arc<Mutex<HashSet<(NotificationId, Channel)>>>,
    id: NotificationId,
    channels: Vec<Channel>,
}

impl Claims {
    fn acquire(
        set: &Arc<Mutex<HashSet<(NotificationId, Channel)>>>,
        id: NotificationId,
        wanted: &[Channel],
    ) -> Self {
        let mut guard = set.lock().unwrap_or_else(|e| e.into_inner());
        let channels = wanted
            .iter()
            .copied()
            .filter(|c| guard.insert((id, *c)))
            .collect();
        Self {
            set: set.clone(),
            id,
            channels,
        }
    }

    fn release(&mut self, channel: Channel) {
        self.channels.retain(|c| *c != channel);
        let mut guard = self.set.lock().unwrap_or_else(|e| e.into_inner());
        guard.remove(&(self.id, channel));
    }
}

impl Drop for Claims {
    fn drop(&mut self) {
        let mut guard = self.set.lock().unwrap_or_else(|e| e.into_inner());
        for channel in &self.channels {
            guard.remove(&(self.id, *channel));
        }
    }
}

impl NotificationScheduler {
    /// Create a scheduler.
    pub fn new(
        storage: Arc<dyn Storage>,
        adapters: Arc<dyn ChannelAdapters>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            storage,
            adapters,
            config,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Persist a notification and deliver it right away when it is already due.
    ///
    /// Delivery problems are recorded on the notification, never returned.
    pub async fn create_notification(&self, spec: NotificationSpec) -> Result<Notification> {
        let now = chrono::Utc::now();
        let notification = Notification::from_spec(spec, now)?;
        self.storage.insert_notification(&notification).await?;
        debug!(notification_id = %notification.id, user_id = %notification.user_id, "Created notification");

        if !notification.is_due(now) {
            return Ok(notification);
        }

        if let Err(e) = self.deliver(notification.id).await {
            warn!(notification_id = %notification.id, error = %e, "Immediate delivery failed");
        }
        Ok(self
            .storage
            .load_notification(notification.id)
            .await?
            .unwrap_or(notification))
    }

    /// Deliver every due notification that still has a deliverable channel.
    pub async fn sweep(&self, now: Time) -> Result<SweepReport> {
        let due = self
            .storage
            .list_notifications(&NotificationFilter {
                due_at: Some(now),
                ..Default::default()
            })
            .await?;

        let mut prefs: HashMap<UserId, Option<NotificationPreferences>> = HashMap::new();
        let mut pending = Vec::new();
        for n in &due {
            if !n.channels.values().any(ChannelState::is_deliverable) {
                continue;
            }
            if !prefs.contains_key(&n.user_id) {
                let user = self.storage.load_user(&n.user_id).await?;
                prefs.insert(n.user_id.clone(), user.map(|u| u.effective_preferences()));
            }
            // Unknown recipients go through `deliver` so the abandonment is logged.
            let open = match prefs.get(&n.user_id) {
                Some(Some(p)) => !n.deliverable_channels(p).is_empty(),
                _ => true,
            };
            if open {
                pending.push(n.id);
            }
        }

        let results = join_all(pending.iter().map(|id| self.deliver(*id))).await;

        let mut report = SweepReport {
            processed: pending.len(),
            ..Default::default()
        };
        for (id, result) in pending.iter().zip(results) {
            match result {
                Ok(delivery) => {
                    report.sent += delivery.sent.len();
                    report.failed += delivery.failed.len();
                }
                Err(e) => {
                    warn!(notification_id = %id, error = %e, "Delivery errored");
                    report.errors += 1;
                }
            }
        }

        info!(
            processed = report.processed,
            sent = report.sent,
            failed = report.failed,
            errors = report.errors,
            "Sweep finished"
        );
        Ok(report)
    }

    /// Deliver one notification on every channel that is targeted, enabled
    /// for the recipient, and neither sent nor given up.
    pub async fn deliver(&self, id: NotificationId) -> Result<DeliveryReport> {
        let notification = self
            .storage
            .load_notification(id)
            .await?
            .ok_or_else(|| Error::not_found("notification", id))?;

        let mut report = DeliveryReport {
            notification_id: Some(id),
            ..Default::default()
        };

        let Some(user) = self.storage.load_user(&notification.user_id).await? else {
            error!(notification_id = %id, user_id = %notification.user_id, "Recipient not found, abandoning delivery");
            report.abandoned = true;
            return Ok(report);
        };

        let prefs = user.effective_preferences();
        report.skipped = notification
            .channels
            .keys()
            .copied()
            .filter(|c| !prefs.allows(*c))
            .collect();
        for channel in &report.skipped {
            debug!(notification_id = %id, %channel, "Channel not enabled for recipient");
        }

        let wanted = notification.deliverable_channels(&prefs);
        if wanted.is_empty() {
            return Ok(report);
        }

        let mut claims = Claims::acquire(&self.in_flight, id, &wanted);
        if claims.channels.is_empty() {
            debug!(notification_id = %id, "All channels already in flight");
            return Ok(report);
        }

        // Another caller may have finished a channel between our read and the claim.
        let current = self
            .storage
            .load_notification(id)
            .await?
            .ok_or_else(|| Error::not_found("notification", id))?;
        for channel in claims.channels.clone() {
            let still_open = current
                .channels
                .get(&channel)
                .is_some_and(ChannelState::is_deliverable);
            if !still_open {
                claims.release(channel);
            }
        }

        let channels = claims.channels.clone();
        let timeout = self.config.channel_timeout();
        let outcomes = join_all(channels.iter().map(|channel| {
            let adapters = self.adapters.as_ref();
            let user = &user;
            let current = &current;
            async move {
                match tokio::time::timeout(timeout, dispatch(adapters, *channel, user, current)).await {
                    Ok(result) => result,
                    Err(_) => Err(ChannelDeliveryError::timeout(format!(
                        "{channel} adapter did not answer within {}ms",
                        timeout.as_millis()
                    ))),
                }
            }
        }))
        .await;

        // Every outcome is written even if an earlier write failed, so a
        // delivered channel is not sent again because of its neighbour.
        let now = chrono::Utc::now();
        let mut write_error = None;
        for (channel, outcome) in channels.into_iter().zip(outcomes) {
            let previous = current.channels.get(&channel).cloned().unwrap_or_default();
            let state = self.next_state(&previous, &outcome, now);
            let gave_up = state.gave_up;

            let written = self
                .storage
                .update_notification(id, NotificationUpdate::Channel { channel, state })
                .await;
            claims.release(channel);
            if let Err(e) = written {
                error!(notification_id = %id, %channel, error = %e, "Failed to record delivery outcome");
                write_error.get_or_insert(e);
            }

            match outcome {
                Ok(()) => {
                    debug!(notification_id = %id, %channel, "Delivered");
                    report.sent.push(channel);
                }
                Err(e) => {
                    warn!(notification_id = %id, %channel, error = %e, gave_up, "Delivery failed");
                    report.failed.push((channel, e));
                }
            }
        }

        match write_error {
            Some(e) => Err(e.into()),
            None => Ok(report),
        }
    }

    /// Fold one adapter outcome into a channel's state.
    fn next_state(&self, previous: &ChannelState, outcome: &DeliveryResult, now: Time) -> ChannelState {
        let mut state = previous.clone();
        state.attempted = true;
        match outcome {
            Ok(()) => {
                state.sent = true;
                state.sent_at = Some(now);
                state.error = None;
            }
            Err(e) => {
                state.error = Some(e.message.clone());
                state.failures += 1;
                state.gave_up = match e.kind {
                    DeliveryFailureKind::Permanent => {
                        state.failures >= self.config.permanent_failure_limit
                    }
                    DeliveryFailureKind::Transient | DeliveryFailureKind::Timeout => self
                        .config
                        .max_transient_attempts
                        .is_some_and(|max| state.failures >= max),
                };
            }
        }
        state
    }

    /// A learner's notifications, oldest schedule first.
    pub async fn list(&self, user: &UserId, filter: NotificationFilter) -> Result<Vec<Notification>> {
        let filter = NotificationFilter {
            user_id: Some(user.clone()),
            ..filter
        };
        Ok(self.storage.list_notifications(&filter).await?)
    }

    /// Number of unread in-app notifications.
    pub async fn unread_count(&self, user: &UserId) -> Result<usize> {
        let unread = self
            .list(user, NotificationFilter {
                unread_only: true,
                ..Default::default()
            })
            .await?;
        Ok(unread.len())
    }

    /// Mark one of the learner's notifications as read.
    pub async fn mark_read(&self, user: &UserId, id: NotificationId) -> Result<Notification> {
        match self.storage.load_notification(id).await? {
            Some(n) if &n.user_id == user => {}
            _ => return Err(Error::not_found("notification", id)),
        }
        let updated = self
            .storage
            .update_notification(id, NotificationUpdate::MarkRead { at: chrono::Utc::now() })
            .await?;
        Ok(updated)
    }

    /// Mark all of the learner's notifications as read.
    pub async fn mark_all_read(&self, user: &UserId) -> Result<usize> {
        let unread = self
            .list(user, NotificationFilter {
                unread_only: true,
                ..Default::default()
            })
            .await?;
        let now = chrono::Utc::now();
        for n in &unread {
            self.storage
                .update_notification(n.id, NotificationUpdate::MarkRead { at: now })
                .await?;
        }
        Ok(unread.len())
    }

    /// Seed a reminder for the task the learner should pick up next.
    pub async fn on_task_completed(&self, event: &RoadmapEvent) -> Result<Option<Notification>> {
        let RoadmapEvent::TaskCompleted {
            user_id,
            title,
            next_task,
            ..
        } = event;
        let Some(next) = next_task else {
            debug!(user_id = %user_id, "Roadmap finished, no follow-up reminder");
            return Ok(None);
        };

        let mut spec = NotificationSpec::new(
            user_id.clone(),
            NotificationType::Reminder,
            format!("Time to work on: {}", next.title),
            format!("Great job completing \"{}\"! Next up: {}.", title, next.title),
        );
        spec.linked_resource = Some(ResourceRef::new(ResourceKind::Task, next.id));
        spec.metadata = NotificationMetadata {
            agent_generated: true,
            agent_type: Some("roadmap".into()),
        };
        self.create_notification(spec).await.map(Some)
    }

    /// Create notifications for derived reminder candidates.
    ///
    /// A candidate is skipped when the learner already received one with the
    /// same title and link in the last day.
    pub async fn enqueue_candidates(&self, candidates: Vec<NotificationSpec>) -> Result<Vec<Notification>> {
        let since = chrono::Utc::now() - Duration::hours(DUPLICATE_WINDOW_HOURS);
        let mut created = Vec::new();

        for spec in candidates {
            let existing = self
                .storage
                .list_notifications(&NotificationFilter {
                    user_id: Some(spec.user_id.clone()),
                    linked_resource: spec.linked_resource.clone(),
                    ..Default::default()
                })
                .await?;
            let duplicate = existing
                .iter()
                .any(|n| n.title == spec.title && n.created_at >= since);
            if duplicate {
                debug!(user_id = %spec.user_id, title = %spec.title, "Skipping duplicate reminder");
                continue;
            }
            created.push(self.create_notification(spec).await?);
        }

        info!(created = created.len(), "Enqueued reminders");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use upnext_core::{NextTask, TaskId, UserProfile};
    use upnext_core::{Roadmap, Timeline};
    use upnext_storage::{MemoryStorage, StorageError};

    /// Memory storage whose first channel write fails.
    struct FlakyWrites {
        inner: MemoryStorage,
        failed_once: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl Storage for FlakyWrites {
        async fn save_user(&self, profile: &UserProfile) -> upnext_storage::Result<()> {
            self.inner.save_user(profile).await
        }

        async fn load_user(&self, id: &UserId) -> upnext_storage::Result<Option<UserProfile>> {
            self.inner.load_user(id).await
        }

        async fn load_roadmap(&self, user: &UserId) -> upnext_storage::Result<Option<Roadmap>> {
            self.inner.load_roadmap(user).await
        }

        async fn save_roadmap(&self, roadmap: &Roadmap) -> upnext_storage::Result<u64> {
            self.inner.save_roadmap(roadmap).await
        }

        async fn load_timeline(&self, user: &UserId) -> upnext_storage::Result<Option<Timeline>> {
            self.inner.load_timeline(user).await
        }

        async fn save_timeline(&self, timeline: &Timeline) -> upnext_storage::Result<u64> {
            self.inner.save_timeline(timeline).await
        }

        async fn insert_notification(&self, notification: &Notification) -> upnext_storage::Result<()> {
            self.inner.insert_notification(notification).await
        }

        async fn load_notification(&self, id: NotificationId) -> upnext_storage::Result<Option<Notification>> {
            self.inner.load_notification(id).await
        }

        async fn list_notifications(
            &self,
            filter: &NotificationFilter,
        ) -> upnext_storage::Result<Vec<Notification>> {
            self.inner.list_notifications(filter).await
        }

        async fn update_notification(
            &self,
            id: NotificationId,
            update: NotificationUpdate,
        ) -> upnext_storage::Result<Notification> {
            if matches!(update, NotificationUpdate::Channel { .. })
                && !self.failed_once.swap(true, Ordering::SeqCst)
            {
                return Err(StorageError::Other("disk full".into()));
            }
            self.inner.update_notification(id, update).await
        }
    }

    /// Adapters failing with a fixed outcome per channel.
    #[derive(Default)]
    struct Scripted {
        email_fails: Option<ChannelDeliveryError>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChannelAdapters for Scripted {
        async fn send_email(&self, _to: &str, _subject: &str, _body: &str) -> DeliveryResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.email_fails {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }

        async fn send_sms(&self, _to: &str, _message: &str) -> DeliveryResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn send_push(
            &self,
            _user_id: &UserId,
            _title: &str,
            _body: &str,
            _data: &serde_json::Value,
        ) -> DeliveryResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn setup(adapters: Arc<Scripted>, config: SchedulerConfig) -> (Arc<MemoryStorage>, NotificationScheduler) {
        let storage = Arc::new(MemoryStorage::new());
        let mut user = UserProfile::new(UserId::from("u1"), "Ana");
        user.email = Some("ana@example.com".into());
        storage.save_user(&user).await.unwrap();
        let scheduler = NotificationScheduler::new(storage.clone(), adapters, config);
        (storage, scheduler)
    }

    fn spec() -> NotificationSpec {
        NotificationSpec::new(UserId::from("u1"), NotificationType::Reminder, "Study", "SQL today")
    }

    #[tokio::test]
    async fn test_create_due_delivers_enabled_channels() {
        let adapters = Arc::new(Scripted::default());
        let (_storage, scheduler) = setup(adapters.clone(), SchedulerConfig::default()).await;

        let n = scheduler.create_notification(spec()).await.unwrap();

        assert!(n.channels[&Channel::Email].sent);
        assert!(n.channels[&Channel::Push].sent);
        // SMS is off by default and never attempted.
        assert!(!n.channels[&Channel::Sms].attempted);
        assert_eq!(adapters.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_write_still_records_other_channels() {
        let storage = Arc::new(FlakyWrites {
            inner: MemoryStorage::new(),
            failed_once: Default::default(),
        });
        let mut user = UserProfile::new(UserId::from("u1"), "Ana");
        user.email = Some("ana@example.com".into());
        storage.save_user(&user).await.unwrap();

        let adapters = Arc::new(Scripted::default());
        let scheduler = NotificationScheduler::new(storage.clone(), adapters.clone(), SchedulerConfig::default());

        let mut s = spec();
        s.scheduled_for = Some(chrono::Utc::now() + Duration::hours(1));
        let n = scheduler.create_notification(s).await.unwrap();

        let err = scheduler.deliver(n.id).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(adapters.calls.load(Ordering::SeqCst), 2);

        let stored = storage.load_notification(n.id).await.unwrap().unwrap();
        let recorded: Vec<_> = stored.channels.values().filter(|c| c.attempted).collect();
        assert_eq!(recorded.len(), 1);
        assert!(recorded[0].sent);

        // Only the channel whose outcome was lost is attempted again.
        let report = scheduler.deliver(n.id).await.unwrap();
        assert_eq!(report.attempts(), 1);
        assert_eq!(adapters.calls.load(Ordering::SeqCst), 3);

        let stored = storage.load_notification(n.id).await.unwrap().unwrap();
        assert!(stored.channels[&Channel::Email].sent);
        assert!(stored.channels[&Channel::Push].sent);
    }

    #[tokio::test]
    async fn test_future_notification_waits_for_sweep() {
        let adapters = Arc::new(Scripted::default());
        let (_storage, scheduler) = setup(adapters.clone(), SchedulerConfig::default()).await;

        let mut s = spec();
        s.scheduled_for = Some(chrono::Utc::now() + Duration::hours(1));
        let n = scheduler.create_notification(s).await.unwrap();
        assert!(!n.channels[&Channel::Email].attempted);

        let report = scheduler.sweep(chrono::Utc::now()).await.unwrap();
        assert_eq!(report.processed, 0);

        let report = scheduler.sweep(chrono::Utc::now() + Duration::hours(2)).await.unwrap();
        assert_eq!(report.sent, 2);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_on_next_sweep() {
        let adapters = Arc::new(Scripted {
            email_fails: Some(ChannelDeliveryError::transient("smtp busy")),
            ..Default::default()
        });
        let (storage, scheduler) = setup(adapters.clone(), SchedulerConfig::default()).await;

        let n = scheduler.create_notification(spec()).await.unwrap();
        assert_eq!(n.channels[&Channel::Email].error.as_deref(), Some("smtp busy"));
        assert!(!n.channels[&Channel::Email].sent);
        assert!(n.channels[&Channel::Push].sent);

        let report = scheduler.sweep(chrono::Utc::now()).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.sent, 0);

        let stored = storage.load_notification(n.id).await.unwrap().unwrap();
        assert_eq!(stored.channels[&Channel::Email].failures, 2);
        assert!(!stored.channels[&Channel::Email].gave_up);
    }

    #[tokio::test]
    async fn test_permanent_failure_gives_up_that_channel_only() {
        let adapters = Arc::new(Scripted {
            email_fails: Some(ChannelDeliveryError::permanent("mailbox does not exist")),
            ..Default::default()
        });
        let (_storage, scheduler) = setup(adapters.clone(), SchedulerConfig::default()).await;

        let n = scheduler.create_notification(spec()).await.unwrap();
        assert!(n.channels[&Channel::Email].gave_up);
        assert!(n.channels[&Channel::Push].sent);

        let calls = adapters.calls.load(Ordering::SeqCst);
        let report = scheduler.sweep(chrono::Utc::now()).await.unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(adapters.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn test_transient_ceiling() {
        let adapters = Arc::new(Scripted {
            email_fails: Some(ChannelDeliveryError::timeout("slow")),
            ..Default::default()
        });
        let config = SchedulerConfig {
            max_transient_attempts: Some(2),
            ..Default::default()
        };
        let (storage, scheduler) = setup(adapters, config).await;

        let n = scheduler.create_notification(spec()).await.unwrap();
        scheduler.sweep(chrono::Utc::now()).await.unwrap();

        let stored = storage.load_notification(n.id).await.unwrap().unwrap();
        assert!(stored.channels[&Channel::Email].gave_up);
        assert_eq!(stored.channels[&Channel::Email].failures, 2);
    }

    #[tokio::test]
    async fn test_missing_recipient_is_abandoned() {
        let adapters = Arc::new(Scripted::default());
        let (_storage, scheduler) = setup(adapters.clone(), SchedulerConfig::default()).await;

        let mut s = spec();
        s.user_id = UserId::from("ghost");
        let n = scheduler.create_notification(s).await.unwrap();

        let report = scheduler.deliver(n.id).await.unwrap();
        assert!(report.abandoned);
        assert_eq!(adapters.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_inbox_operations() {
        let adapters = Arc::new(Scripted::default());
        let (_storage, scheduler) = setup(adapters, SchedulerConfig::default()).await;
        let user = UserId::from("u1");

        let a = scheduler.create_notification(spec()).await.unwrap();
        scheduler.create_notification(spec()).await.unwrap();
        assert_eq!(scheduler.unread_count(&user).await.unwrap(), 2);

        let read = scheduler.mark_read(&user, a.id).await.unwrap();
        assert!(read.in_app.read);
        assert_eq!(scheduler.unread_count(&user).await.unwrap(), 1);

        assert!(matches!(
            scheduler.mark_read(&UserId::from("other"), a.id).await,
            Err(Error::NotFound { .. })
        ));

        assert_eq!(scheduler.mark_all_read(&user).await.unwrap(), 1);
        assert_eq!(scheduler.unread_count(&user).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_task_completed_seeds_reminder() {
        let adapters = Arc::new(Scripted::default());
        let (_storage, scheduler) = setup(adapters, SchedulerConfig::default()).await;

        let next = NextTask {
            id: TaskId::new(),
            title: "SQL Basics".into(),
        };
        let event = RoadmapEvent::TaskCompleted {
            user_id: UserId::from("u1"),
            task_id: TaskId::new(),
            title: "Python Basics".into(),
            mastery_score: 4,
            next_task: Some(next.clone()),
            completion_percentage: 17,
            timestamp: chrono::Utc::now(),
        };

        let n = scheduler.on_task_completed(&event).await.unwrap().unwrap();
        assert_eq!(n.title, "Time to work on: SQL Basics");
        assert_eq!(
            n.linked_resource,
            Some(ResourceRef::new(ResourceKind::Task, next.id))
        );
    }

    #[tokio::test]
    async fn test_enqueue_skips_recent_duplicates() {
        let adapters = Arc::new(Scripted::default());
        let (_storage, scheduler) = setup(adapters, SchedulerConfig::default()).await;

        let mut s = spec();
        s.linked_resource = Some(ResourceRef::new(ResourceKind::Course, "c1"));
        let first = scheduler.enqueue_candidates(vec![s.clone()]).await.unwrap();
        let second = scheduler.enqueue_candidates(vec![s]).await.unwrap();
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }
}
