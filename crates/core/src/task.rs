//! Task model - a single learnable unit of a roadmap.

use serde::{Deserialize, Serialize};
use crate::id::TaskId;
use crate::Time;

/// A roadmap task with a mastery-driven completion outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,

    /// Task title (the skill to learn)
    pub title: String,

    /// Detailed description
    pub description: String,

    /// Skill category, used to place advanced follow-ups
    pub category: String,

    /// Current status
    pub status: TaskStatus,

    /// Self-reported understanding (1-5), set on completion
    pub mastery_score: Option<u8>,

    /// Where the task came from
    pub source: TaskSource,

    /// Why the task exists
    pub kind: TaskKind,

    /// Human readable estimate ("2 weeks")
    pub estimated_duration: String,

    /// Learning resources
    pub resources: Vec<String>,

    /// Position in the roadmap's total order
    pub sequence_position: u32,

    /// Learner notes captured on completion
    pub notes: Option<String>,

    /// When the task was completed
    pub completed_at: Option<Time>,

    /// Creation timestamp
    pub created_at: Time,
}

/// Task status.
///
/// Transitions only move forward: `NotStarted -> InProgress -> Completed`,
/// with `Optional -> Completed` for stretch tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Queued, not yet started
    NotStarted,
    /// The learner's current focus
    InProgress,
    /// Done
    Completed,
    /// Stretch goal, never promoted automatically
    Optional,
}

impl TaskStatus {
    /// Whether `self -> next` is a legal forward transition.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::NotStarted, TaskStatus::InProgress)
                | (TaskStatus::NotStarted, TaskStatus::Completed)
                | (TaskStatus::InProgress, TaskStatus::Completed)
                | (TaskStatus::Optional, TaskStatus::Completed)
        )
    }

    /// Stable snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Optional => "optional",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Origin of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSource {
    /// Generated from the role/level catalog
    Catalog,
    /// Inserted by the adaptation algorithm
    AiSuggested,
}

/// Why a task exists in the roadmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Regular catalog skill
    Learning,
    /// Extra practice after low mastery
    Reinforcement,
    /// Stretch topic after high mastery
    Advanced,
}

impl Task {
    /// Create a catalog task. Position is assigned by the owning roadmap.
    pub fn from_catalog(
        title: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        estimated_duration: impl Into<String>,
        resources: Vec<String>,
    ) -> Self {
        Self {
            id: TaskId::new(),
            title: title.into(),
            description: description.into(),
            category: category.into(),
            status: TaskStatus::NotStarted,
            mastery_score: None,
            source: TaskSource::Catalog,
            kind: TaskKind::Learning,
            estimated_duration: estimated_duration.into(),
            resources,
            sequence_position: 0,
            notes: None,
            completed_at: None,
            created_at: chrono::Utc::now(),
        }
    }

    /// Follow-up practice task for a poorly understood skill.
    pub fn reinforcement_for(completed: &Task) -> Self {
        Self {
            id: TaskId::new(),
            title: format!("Practice: {}", completed.title),
            description: format!("Additional practice project to reinforce {}", completed.title),
            category: completed.category.clone(),
            status: TaskStatus::NotStarted,
            mastery_score: None,
            source: TaskSource::AiSuggested,
            kind: TaskKind::Reinforcement,
            estimated_duration: "1 week".to_string(),
            resources: vec![
                format!("{} Practice Problems", completed.title),
                "Mini Project Ideas".to_string(),
            ],
            sequence_position: 0,
            notes: None,
            completed_at: None,
            created_at: chrono::Utc::now(),
        }
    }

    /// Optional stretch task for a well understood skill.
    pub fn advanced_for(completed: &Task) -> Self {
        Self {
            id: TaskId::new(),
            title: format!("Advanced: {}", completed.title),
            description: format!("Take your {} skills to the next level", completed.title),
            category: completed.category.clone(),
            status: TaskStatus::Optional,
            mastery_score: None,
            source: TaskSource::AiSuggested,
            kind: TaskKind::Advanced,
            estimated_duration: "2 weeks".to_string(),
            resources: vec![
                "Advanced tutorials".to_string(),
                "Expert-level projects".to_string(),
            ],
            sequence_position: 0,
            notes: None,
            completed_at: None,
            created_at: chrono::Utc::now(),
        }
    }

    /// Whether the task is on the learner's mandatory path and not done yet.
    pub fn is_pending(&self) -> bool {
        matches!(self.status, TaskStatus::NotStarted | TaskStatus::InProgress)
    }
}
