//! Scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for delivery, retries and reminder derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between periodic sweeps
    pub sweep_interval_secs: u64,
    /// Upper bound for a single adapter call
    pub channel_timeout_ms: u64,
    /// Permanent failures after which a channel is given up
    pub permanent_failure_limit: u32,
    /// Optional ceiling on transient failures; unlimited when absent
    pub max_transient_attempts: Option<u32>,
    /// Days without activity before an in-progress course is nudged
    pub stale_activity_days: i64,
    /// Milestones due within this many days get a deadline reminder
    pub due_window_days: i64,
    /// Deadline reminders at or below this many days are high priority
    pub urgent_window_days: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 300,
            channel_timeout_ms: 10_000,
            permanent_failure_limit: 1,
            max_transient_attempts: None,
            stale_activity_days: 3,
            due_window_days: 7,
            urgent_window_days: 2,
        }
    }
}

impl SchedulerConfig {
    /// Sweep period.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    /// Per-call adapter timeout.
    pub fn channel_timeout(&self) -> Duration {
        Duration::from_millis(self.channel_timeout_ms)
    }
}
