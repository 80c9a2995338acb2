//! Notification scheduling and multi-channel delivery for UpNext.
//!
//! Notifications are persisted first and delivered per channel afterwards.
//! Every channel is tracked on its own: a failed SMS never blocks the email,
//! and a delivered channel is never sent twice.

#![warn(missing_docs)]

pub mod channel;
pub mod config;
pub mod reminder;
pub mod runner;
pub mod scheduler;
pub mod webhook;

pub use channel::{dispatch, ChannelAdapters, DeliveryResult, LoggingAdapters};
pub use config::SchedulerConfig;
pub use reminder::{
    generate_reminder_candidates, CourseSnapshot, ProjectMilestone, ProjectSnapshot,
    ReminderContext,
};
pub use runner::{spawn_event_listener, SweepRunner};
pub use scheduler::{DeliveryReport, NotificationScheduler, SweepReport};
pub use webhook::{WebhookAdapters, WebhookConfig};
