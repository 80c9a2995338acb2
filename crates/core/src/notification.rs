//! Notification model - reminders delivered over independent channels.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::id::{NotificationId, UserId};
use crate::resource::ResourceRef;
use crate::user::NotificationPreferences;
use crate::Time;

/// A notification and its per-channel delivery bookkeeping.
///
/// Notifications are kept after delivery as an audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique identifier
    pub id: NotificationId,

    /// Recipient
    pub user_id: UserId,

    /// Notification type
    pub notification_type: NotificationType,

    /// Priority
    pub priority: NotificationPriority,

    /// Title / subject
    pub title: String,

    /// Body
    pub message: String,

    /// Not delivered before this instant
    pub scheduled_for: Time,

    /// Delivery state of every targeted channel
    pub channels: BTreeMap<Channel, ChannelState>,

    /// In-app read marker
    pub in_app: InAppState,

    /// Navigation target
    pub linked_resource: Option<ResourceRef>,

    /// Call to action
    pub action: Option<NotificationAction>,

    /// Provenance
    pub metadata: NotificationMetadata,

    /// When created
    pub created_at: Time,
}

/// Notification type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// Nudge to keep studying
    Reminder,
    /// Something was accomplished
    Achievement,
    /// A date is close
    Deadline,
    /// Suggested next step
    Recommendation,
    /// Mentor activity
    Mentor,
    /// Milestone progress
    Milestone,
    /// Service announcement
    System,
}

/// Notification priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    /// Informational
    Low,
    /// Normal
    #[default]
    Medium,
    /// Needs attention soon
    High,
    /// Needs attention now
    Urgent,
}

/// An outbound delivery medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Email to the learner's address
    Email,
    /// Text message to the learner's phone
    Sms,
    /// Mobile push notification
    Push,
}

impl Channel {
    /// Every outbound channel.
    pub const ALL: [Channel; 3] = [Channel::Email, Channel::Sms, Channel::Push];

    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::Push => "push",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Channel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "email" => Ok(Channel::Email),
            "sms" => Ok(Channel::Sms),
            "push" => Ok(Channel::Push),
            other => Err(Error::Validation(format!("unknown channel '{other}'"))),
        }
    }
}

/// Delivery state of one channel on one notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelState {
    /// The adapter has been invoked at least once
    pub attempted: bool,
    /// Delivered; the adapter must never be invoked again
    pub sent: bool,
    /// When delivered
    pub sent_at: Option<Time>,
    /// Last failure message
    pub error: Option<String>,
    /// Failed attempts so far
    pub failures: u32,
    /// Retries stopped after a permanent failure or the attempt ceiling
    pub gave_up: bool,
}

impl ChannelState {
    /// Whether a future sweep may still invoke the adapter.
    pub fn is_deliverable(&self) -> bool {
        !self.sent && !self.gave_up
    }
}

/// In-app inbox state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InAppState {
    /// Seen by the learner
    pub read: bool,
    /// When marked read
    pub read_at: Option<Time>,
}

/// Call to action attached to a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAction {
    /// Button text
    pub text: String,
    /// Target URL
    pub url: Option<String>,
}

/// Where a notification came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationMetadata {
    /// Derived automatically rather than requested by the learner
    pub agent_generated: bool,
    /// Which derivation produced it ("reminder", "roadmap", ...)
    pub agent_type: Option<String>,
}

/// Input for creating a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSpec {
    /// Recipient
    pub user_id: UserId,
    /// Kind of notification
    pub notification_type: NotificationType,
    /// Defaults to medium
    #[serde(default)]
    pub priority: NotificationPriority,
    /// Short headline
    pub title: String,
    /// Body text
    pub message: String,
    /// Defaults to creation time
    pub scheduled_for: Option<Time>,
    /// Restrict delivery to these channels; all channels when absent
    pub channels: Option<Vec<Channel>>,
    /// Entity the notification points at
    pub linked_resource: Option<ResourceRef>,
    /// Optional call to action
    pub action: Option<NotificationAction>,
    /// Origin of the notification
    #[serde(default)]
    pub metadata: NotificationMetadata,
}

impl NotificationSpec {
    /// Minimal spec with medium priority, due immediately, on every channel.
    pub fn new(
        user_id: UserId,
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            notification_type,
            priority: NotificationPriority::Medium,
            title: title.into(),
            message: message.into(),
            scheduled_for: None,
            channels: None,
            linked_resource: None,
            action: None,
            metadata: NotificationMetadata::default(),
        }
    }

    /// Check required fields.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("notification title is required".into()));
        }
        if self.message.trim().is_empty() {
            return Err(Error::Validation("notification message is required".into()));
        }
        if matches!(&self.channels, Some(channels) if channels.is_empty()) {
            return Err(Error::Validation("at least one channel must be targeted".into()));
        }
        Ok(())
    }
}

impl Notification {
    /// Materialise a validated spec. `scheduled_for` defaults to `now`.
    pub fn from_spec(spec: NotificationSpec, now: Time) -> Result<Self> {
        spec.validate()?;
        let targeted: Vec<Channel> = spec.channels.unwrap_or_else(|| Channel::ALL.to_vec());
        let channels = targeted
            .into_iter()
            .map(|c| (c, ChannelState::default()))
            .collect();

        Ok(Self {
            id: NotificationId::new(),
            user_id: spec.user_id,
            notification_type: spec.notification_type,
            priority: spec.priority,
            title: spec.title,
            message: spec.message,
            scheduled_for: spec.scheduled_for.unwrap_or(now),
            channels,
            in_app: InAppState::default(),
            linked_resource: spec.linked_resource,
            action: spec.action,
            metadata: spec.metadata,
            created_at: now,
        })
    }

    /// Due for delivery at `now`.
    pub fn is_due(&self, now: Time) -> bool {
        self.scheduled_for <= now
    }

    /// Channels that are targeted, enabled for the recipient and still deliverable.
    pub fn deliverable_channels(&self, prefs: &NotificationPreferences) -> Vec<Channel> {
        self.channels
            .iter()
            .filter(|(channel, state)| prefs.allows(**channel) && state.is_deliverable())
            .map(|(channel, _)| *channel)
            .collect()
    }
}
