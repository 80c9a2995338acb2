//! UpNext core data models.
//!
//! This crate defines the data structures shared by the roadmap engine,
//! the timeline tracker and the notification scheduler.

#![warn(missing_docs)]

// Core identities
mod id;
mod error;
mod resource;

// Roadmap
mod task;
mod roadmap;
mod event;

// Timeline and notifications
mod timeline;
mod notification;
mod user;

// Re-exports
pub use id::*;
pub use error::{ChannelDeliveryError, DeliveryFailureKind, Error, Result};
pub use resource::{ResourceKind, ResourceRef};

// Roadmap
pub use task::{Task, TaskKind, TaskSource, TaskStatus};
pub use roadmap::{percentage, Roadmap};
pub use event::{NextTask, RoadmapEvent};

// Timeline
pub use timeline::{
    CareerGoal, Dependency, DependencyKind, Milestone, MilestonePatch, MilestonePriority,
    MilestoneSpec, MilestoneStatus, MilestoneType, Timeline,
};

// Notifications
pub use notification::{
    Channel, ChannelState, InAppState, Notification, NotificationAction, NotificationMetadata,
    NotificationPriority, NotificationSpec, NotificationType,
};
pub use user::{NotificationPreferences, UserProfile};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
