//! Roadmap model - the ordered task sequence toward a target role.

use serde::{Deserialize, Serialize};
use crate::id::{TaskId, UserId};
use crate::task::{Task, TaskStatus};
use crate::Time;

/// An ordered sequence of tasks owned by one learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roadmap {
    /// Owning learner
    pub user_id: UserId,

    /// Role the learner is working toward
    pub target_role: String,

    /// Starting level used to pick the catalog entry
    pub level: String,

    /// Tasks in sequence order
    pub tasks: Vec<Task>,

    /// Completed / total * 100, rounded. Doubles as the job readiness score.
    pub completion_percentage: u8,

    /// Optimistic concurrency version, bumped on every save
    pub version: u64,

    /// When created
    pub created_at: Time,

    /// Last updated
    pub updated_at: Time,
}

impl Roadmap {
    /// Build a roadmap from tasks already in sequence order.
    pub fn new(
        user_id: UserId,
        target_role: impl Into<String>,
        level: impl Into<String>,
        tasks: Vec<Task>,
    ) -> Self {
        let now = chrono::Utc::now();
        let mut roadmap = Self {
            user_id,
            target_role: target_role.into(),
            level: level.into(),
            tasks,
            completion_percentage: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        roadmap.renumber();
        roadmap.completion_percentage = roadmap.compute_completion();
        roadmap
    }

    /// Index of a task in sequence order.
    pub fn position_of(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// Look up a task.
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// The learner's current focus, if any.
    pub fn in_progress(&self) -> Option<&Task> {
        self.tasks.iter().find(|t| t.status == TaskStatus::InProgress)
    }

    /// Number of completed tasks.
    pub fn completed_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count()
    }

    /// `round(completed / total * 100)`, 0 for an empty roadmap.
    pub fn compute_completion(&self) -> u8 {
        percentage(self.completed_count(), self.tasks.len())
    }

    /// Refresh the stored completion percentage.
    pub fn recompute_completion(&mut self) {
        self.completion_percentage = self.compute_completion();
    }

    /// Reassign `sequence_position` from vector order.
    pub fn renumber(&mut self) {
        for (i, task) in self.tasks.iter_mut().enumerate() {
            task.sequence_position = i as u32;
        }
    }

    /// Single-focus invariant: exactly one task is in progress while any
    /// mandatory task is pending, none otherwise.
    pub fn is_consistent(&self) -> bool {
        let pending = self.tasks.iter().filter(|t| t.is_pending()).count();
        let active = self
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::InProgress)
            .count();
        if pending > 0 {
            active == 1
        } else {
            active == 0
        }
    }
}

/// Integer percentage used by roadmaps and timelines.
pub fn percentage(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((done as f64 / total as f64) * 100.0).round() as u8
}
