//! Timeline model - dated, dependency-aware milestones.

use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::id::{MilestoneId, TimelineId, UserId};
use crate::resource::ResourceRef;
use crate::roadmap::percentage;
use crate::Time;

/// A learner's timeline of milestones toward a career goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Unique identifier
    pub id: TimelineId,

    /// Owning learner
    pub user_id: UserId,

    /// What the learner is aiming for
    pub career_goal: CareerGoal,

    /// Milestones in insertion order
    pub milestones: Vec<Milestone>,

    /// round(completed / total * 100), 0 when empty
    pub overall_progress: u8,

    /// Projected completion date
    pub estimated_completion: Option<Time>,

    /// Only one timeline per learner is active
    pub is_active: bool,

    /// Optimistic concurrency version, bumped on every save
    pub version: u64,

    /// When created
    pub created_at: Time,

    /// Last updated
    pub updated_at: Time,
}

/// Career goal the timeline leads to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CareerGoal {
    /// Target role
    pub target_role: String,
    /// Target company, if any
    pub target_company: Option<String>,
    /// Free-form timeframe ("6 months")
    pub timeframe: Option<String>,
}

/// A dated unit of a timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    /// Unique identifier
    pub id: MilestoneId,

    /// Title
    pub title: String,

    /// Kind of milestone
    pub milestone_type: MilestoneType,

    /// Description
    pub description: String,

    /// Current status
    pub status: MilestoneStatus,

    /// Priority
    pub priority: MilestonePriority,

    /// Planned start
    pub start_date: Option<Time>,

    /// Due date
    pub target_date: Option<Time>,

    /// Stamped when the milestone is completed
    pub completed_date: Option<Time>,

    /// Planned effort
    pub estimated_hours: Option<f32>,

    /// Recorded effort
    pub actual_hours: Option<f32>,

    /// 0-100
    pub completion_percentage: u8,

    /// Weak references to sibling milestones
    pub dependencies: Vec<Dependency>,

    /// Courses, projects or certificates backing this milestone
    pub linked_resources: Vec<ResourceRef>,

    /// Suggested by the content generator
    pub ai_suggested: bool,
}

/// Milestone kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneType {
    /// A course or tutorial
    Course,
    /// A hands-on project
    Project,
    /// A certification exam
    Certificate,
    /// A mentoring session
    Mentor,
    /// Anything else
    Custom,
}

impl std::str::FromStr for MilestoneType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "course" => Ok(Self::Course),
            "project" => Ok(Self::Project),
            "certificate" => Ok(Self::Certificate),
            "mentor" => Ok(Self::Mentor),
            "custom" => Ok(Self::Custom),
            other => Err(Error::Validation(format!("unknown milestone type '{other}'"))),
        }
    }
}

/// Milestone status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    /// Not begun
    NotStarted,
    /// Being worked on
    InProgress,
    /// Done
    Completed,
    /// Waiting on something outside the timeline
    Blocked,
}

impl MilestoneStatus {
    /// Stable snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            MilestoneStatus::NotStarted => "not_started",
            MilestoneStatus::InProgress => "in_progress",
            MilestoneStatus::Completed => "completed",
            MilestoneStatus::Blocked => "blocked",
        }
    }
}

impl std::str::FromStr for MilestoneStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "blocked" => Ok(Self::Blocked),
            other => Err(Error::Validation(format!("unknown milestone status '{other}'"))),
        }
    }
}

/// Milestone priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestonePriority {
    /// Nice to have
    Low,
    /// Normal
    #[default]
    Medium,
    /// Important
    High,
    /// Gates the goal
    Critical,
}

/// Edge from a milestone to a sibling it depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    /// Referenced sibling
    pub milestone_id: MilestoneId,
    /// How strongly the sibling gates this milestone
    pub relation: DependencyKind,
}

/// Dependency relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// Must be completed before this milestone can start
    Prerequisite,
    /// Informational link
    Related,
}

/// Input for creating a milestone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MilestoneSpec {
    /// Required, non-empty
    pub title: String,
    /// Required
    pub milestone_type: Option<MilestoneType>,
    /// Longer explanation
    #[serde(default)]
    pub description: String,
    /// Defaults to medium
    #[serde(default)]
    pub priority: MilestonePriority,
    /// Planned start
    pub start_date: Option<Time>,
    /// Planned end
    pub target_date: Option<Time>,
    /// Expected effort; must be finite and non-negative
    pub estimated_hours: Option<f32>,
    /// Siblings this milestone depends on
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    /// Courses, projects or other entities backing the milestone
    #[serde(default)]
    pub linked_resources: Vec<ResourceRef>,
    /// Suggested by the content generator
    #[serde(default)]
    pub ai_suggested: bool,
}

/// Partial update for a milestone. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MilestonePatch {
    /// New title, non-empty
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New status; `completed` stamps the completion date
    pub status: Option<MilestoneStatus>,
    /// New priority
    pub priority: Option<MilestonePriority>,
    /// New planned start
    pub start_date: Option<Time>,
    /// New planned end
    pub target_date: Option<Time>,
    /// New effort estimate
    pub estimated_hours: Option<f32>,
    /// Hours spent so far
    pub actual_hours: Option<f32>,
    /// Manual progress, 0 to 100
    pub completion_percentage: Option<u8>,
    /// Replacement dependency list
    pub dependencies: Option<Vec<Dependency>>,
}

impl MilestoneSpec {
    /// Check required fields and value ranges.
    pub fn validate(&self) -> Result<MilestoneType> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("milestone title is required".into()));
        }
        let milestone_type = self
            .milestone_type
            .ok_or_else(|| Error::Validation("milestone type is required".into()))?;
        validate_hours("estimated_hours", self.estimated_hours)?;
        Ok(milestone_type)
    }
}

impl MilestonePatch {
    /// Check value ranges of the present fields.
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(Error::Validation("milestone title cannot be empty".into()));
            }
        }
        if let Some(pct) = self.completion_percentage {
            if pct > 100 {
                return Err(Error::Validation(format!(
                    "completion percentage {pct} is out of range 0-100"
                )));
            }
        }
        validate_hours("estimated_hours", self.estimated_hours)?;
        validate_hours("actual_hours", self.actual_hours)?;
        Ok(())
    }

    /// Whether applying the patch can change aggregate progress.
    pub fn touches_status(&self) -> bool {
        self.status.is_some()
    }

    /// Merge every present non-status field into `milestone`, field by field.
    ///
    /// Status changes carry side effects and are applied by the tracker.
    pub fn apply_fields(&self, milestone: &mut Milestone) {
        if let Some(title) = &self.title {
            milestone.title = title.clone();
        }
        if let Some(description) = &self.description {
            milestone.description = description.clone();
        }
        if let Some(priority) = self.priority {
            milestone.priority = priority;
        }
        if let Some(start) = self.start_date {
            milestone.start_date = Some(start);
        }
        if let Some(target) = self.target_date {
            milestone.target_date = Some(target);
        }
        if let Some(hours) = self.estimated_hours {
            milestone.estimated_hours = Some(hours);
        }
        if let Some(hours) = self.actual_hours {
            milestone.actual_hours = Some(hours);
        }
        if let Some(pct) = self.completion_percentage {
            milestone.completion_percentage = pct;
        }
        if let Some(deps) = &self.dependencies {
            milestone.dependencies = deps.clone();
        }
    }
}

fn validate_hours(field: &str, hours: Option<f32>) -> Result<()> {
    match hours {
        Some(h) if !h.is_finite() || h < 0.0 => {
            Err(Error::Validation(format!("{field} must be a non-negative number")))
        }
        _ => Ok(()),
    }
}

impl Milestone {
    /// Build a fresh `not_started` milestone from a validated spec.
    pub fn from_spec(spec: MilestoneSpec, milestone_type: MilestoneType) -> Self {
        Self {
            id: MilestoneId::new(),
            title: spec.title,
            milestone_type,
            description: spec.description,
            status: MilestoneStatus::NotStarted,
            priority: spec.priority,
            start_date: spec.start_date,
            target_date: spec.target_date,
            completed_date: None,
            estimated_hours: spec.estimated_hours,
            actual_hours: None,
            completion_percentage: 0,
            dependencies: spec.dependencies,
            linked_resources: spec.linked_resources,
            ai_suggested: spec.ai_suggested,
        }
    }

    /// Ids of prerequisite siblings.
    pub fn prerequisites(&self) -> impl Iterator<Item = MilestoneId> + '_ {
        self.dependencies
            .iter()
            .filter(|d| d.relation == DependencyKind::Prerequisite)
            .map(|d| d.milestone_id)
    }
}

impl Timeline {
    /// Create an empty, active timeline.
    pub fn new(user_id: UserId, career_goal: CareerGoal) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: TimelineId::new(),
            user_id,
            career_goal,
            milestones: Vec::new(),
            overall_progress: 0,
            estimated_completion: None,
            is_active: true,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Resolve a milestone reference.
    pub fn milestone(&self, id: MilestoneId) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == id)
    }

    /// Resolve a milestone reference mutably.
    pub fn milestone_mut(&mut self, id: MilestoneId) -> Option<&mut Milestone> {
        self.milestones.iter_mut().find(|m| m.id == id)
    }

    /// `round(completed / total * 100)`, 0 for an empty set.
    pub fn compute_progress(&self) -> u8 {
        let completed = self
            .milestones
            .iter()
            .filter(|m| m.status == MilestoneStatus::Completed)
            .count();
        percentage(completed, self.milestones.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_requires_title_and_type() {
        let spec = MilestoneSpec {
            title: "  ".into(),
            milestone_type: Some(MilestoneType::Course),
            ..Default::default()
        };
        assert!(matches!(spec.validate(), Err(Error::Validation(_))));

        let spec = MilestoneSpec {
            title: "Finish SQL course".into(),
            ..Default::default()
        };
        assert!(matches!(spec.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_patch_applies_only_present_fields() {
        let spec = MilestoneSpec {
            title: "Portfolio".into(),
            milestone_type: Some(MilestoneType::Project),
            description: "Build it".into(),
            estimated_hours: Some(20.0),
            ..Default::default()
        };
        let mut milestone = Milestone::from_spec(spec, MilestoneType::Project);

        let patch = MilestonePatch {
            actual_hours: Some(4.5),
            ..Default::default()
        };
        patch.apply_fields(&mut milestone);

        assert_eq!(milestone.actual_hours, Some(4.5));
        assert_eq!(milestone.title, "Portfolio");
        assert_eq!(milestone.description, "Build it");
        assert_eq!(milestone.estimated_hours, Some(20.0));
    }

    #[test]
    fn test_patch_rejects_out_of_range_percentage() {
        let patch = MilestonePatch {
            completion_percentage: Some(101),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn test_parse_type_and_status() {
        assert_eq!("Course".parse::<MilestoneType>().unwrap(), MilestoneType::Course);
        assert!("podcast".parse::<MilestoneType>().is_err());
        assert_eq!(
            "in-progress".parse::<MilestoneStatus>().unwrap(),
            MilestoneStatus::InProgress
        );
    }
}
