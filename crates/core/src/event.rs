//! Domain events exchanged between services.

use crate::id::{TaskId, UserId};
use crate::Time;
use serde::{Deserialize, Serialize};

/// Something observable that happened to a roadmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoadmapEvent {
    /// A task was completed and the roadmap adapted.
    TaskCompleted {
        /// Owning learner
        user_id: UserId,
        /// The completed task
        task_id: TaskId,
        /// Title of the completed task
        title: String,
        /// Reported mastery
        mastery_score: u8,
        /// The task now in progress, if any
        next_task: Option<NextTask>,
        /// Completion percentage after adaptation
        completion_percentage: u8,
        /// When it happened
        timestamp: Time,
    },
}

/// The task the learner should pick up next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextTask {
    /// Task id
    pub id: TaskId,
    /// Task title
    pub title: String,
}

impl RoadmapEvent {
    /// Learner the event belongs to.
    pub fn user_id(&self) -> &UserId {
        match self {
            RoadmapEvent::TaskCompleted { user_id, .. } => user_id,
        }
    }
}
