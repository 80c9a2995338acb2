//! Weak references to entities owned elsewhere.

use serde::{Deserialize, Serialize};

/// Kind of entity a [`ResourceRef`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Roadmap task
    Task,
    /// Timeline milestone
    Milestone,
    /// External course
    Course,
    /// External project
    Project,
    /// Certificate
    Certificate,
    /// Mentor
    Mentor,
}

impl ResourceKind {
    /// Stable snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Task => "task",
            ResourceKind::Milestone => "milestone",
            ResourceKind::Course => "course",
            ResourceKind::Project => "project",
            ResourceKind::Certificate => "certificate",
            ResourceKind::Mentor => "mentor",
        }
    }
}

/// A `(kind, id)` pair used for navigation only.
///
/// Never dereferenced for ownership; the referenced entity may disappear and
/// its owner is responsible for clearing references to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    /// What the id refers to
    pub kind: ResourceKind,
    /// Identifier in the owning store
    pub id: String,
}

impl ResourceRef {
    /// Build a reference.
    pub fn new(kind: ResourceKind, id: impl ToString) -> Self {
        Self {
            kind,
            id: id.to_string(),
        }
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}
