//! Blocker detection and resolution.
//!
//! This module inspects a timeline's prerequisite graph:
//! - Milestones waiting on prerequisites that are not completed
//! - Circular prerequisite chains
//! - Resolution suggestions and statistics

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use upnext_core::{Milestone, MilestoneId, MilestoneStatus, Timeline};

use crate::tracker::unmet_prerequisites;

/// Why a milestone cannot move forward.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockerReason {
    /// Waiting on prerequisites
    UnmetPrerequisites {
        /// Prerequisites that are not completed
        waiting_on: Vec<MilestoneId>,
    },
    /// Part of a prerequisite cycle; it can never start
    Cycle {
        /// The cycle, starting at this milestone's entry point
        chain: Vec<MilestoneId>,
    },
    /// Marked blocked without any prerequisite explaining it
    Manual,
}

/// A milestone that is blocked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Blocker {
    /// Blocked milestone
    pub milestone_id: MilestoneId,
    /// Its title
    pub title: String,
    /// Why
    pub reason: BlockerReason,
}

/// Blocker resolution suggestion.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionSuggestion {
    /// The type of resolution
    pub action: ResolutionAction,
    /// Description of the suggested action
    pub description: String,
    /// Priority of this resolution (lower = higher priority)
    pub priority: u32,
}

/// Actions that can resolve a blocker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResolutionAction {
    /// Complete the prerequisite
    CompleteMilestone,
    /// Modify dependencies
    ModifyDependencies,
    /// Manual intervention required
    ManualReview,
}

impl ResolutionAction {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionAction::CompleteMilestone => "CompleteMilestone",
            ResolutionAction::ModifyDependencies => "ModifyDependencies",
            ResolutionAction::ManualReview => "ManualReview",
        }
    }
}

/// Blocker statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BlockerStats {
    /// Total blockers detected
    pub total_blockers: usize,
    /// Milestones waiting on prerequisites
    pub waiting: usize,
    /// Circular dependency count
    pub circular_dependencies: usize,
}

/// Result of blocker analysis.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BlockerAnalysis {
    /// All detected blockers
    pub blockers: Vec<Blocker>,
    /// Suggested resolutions
    pub suggestions: Vec<ResolutionSuggestion>,
    /// Blocker statistics
    pub stats: BlockerStats,
    /// Circular dependency chains
    pub circular_chains: Vec<Vec<MilestoneId>>,
}

/// Detects blockers in a timeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockerDetector;

impl BlockerDetector {
    /// Detect all current blockers with full analysis.
    pub fn analyze(&self, timeline: &Timeline) -> BlockerAnalysis {
        let by_id: HashMap<MilestoneId, &Milestone> =
            timeline.milestones.iter().map(|m| (m.id, m)).collect();

        let mut blockers = self.detect_prerequisite_blockers(timeline);
        let circular_chains = self.detect_circular_dependencies(timeline, &by_id);
        for chain in &circular_chains {
            for id in chain {
                if let Some(m) = by_id.get(id) {
                    blockers.push(Blocker {
                        milestone_id: *id,
                        title: m.title.clone(),
                        reason: BlockerReason::Cycle {
                            chain: chain.clone(),
                        },
                    });
                }
            }
        }

        let suggestions = self.generate_suggestions(&by_id, &blockers);
        let stats = BlockerStats {
            total_blockers: blockers.len(),
            waiting: blockers
                .iter()
                .filter(|b| matches!(b.reason, BlockerReason::UnmetPrerequisites { .. }))
                .count(),
            circular_dependencies: circular_chains.len(),
        };

        BlockerAnalysis {
            blockers,
            suggestions,
            stats,
            circular_chains,
        }
    }

    /// Milestones that are not completed and still wait on prerequisites.
    fn detect_prerequisite_blockers(&self, timeline: &Timeline) -> Vec<Blocker> {
        timeline
            .milestones
            .iter()
            .filter(|m| m.status != MilestoneStatus::Completed)
            .filter_map(|m| {
                let waiting_on = unmet_prerequisites(timeline, m);
                let reason = if !waiting_on.is_empty() {
                    BlockerReason::UnmetPrerequisites { waiting_on }
                } else if m.status == MilestoneStatus::Blocked {
                    BlockerReason::Manual
                } else {
                    return None;
                };
                Some(Blocker {
                    milestone_id: m.id,
                    title: m.title.clone(),
                    reason,
                })
            })
            .collect()
    }

    /// Detect circular prerequisite chains.
    fn detect_circular_dependencies(
        &self,
        timeline: &Timeline,
        by_id: &HashMap<MilestoneId, &Milestone>,
    ) -> Vec<Vec<MilestoneId>> {
        let mut cycles = Vec::new();
        let mut visited: HashSet<MilestoneId> = HashSet::new();
        let mut stack: HashSet<MilestoneId> = HashSet::new();

        // Insertion order keeps the output stable.
        for m in &timeline.milestones {
            if !visited.contains(&m.id) {
                if let Some(cycle) = find_cycle(m.id, by_id, &mut visited, &mut stack, &mut Vec::new()) {
                    cycles.push(cycle);
                }
            }
        }
        cycles
    }

    /// Generate resolution suggestions for blockers.
    fn generate_suggestions(
        &self,
        by_id: &HashMap<MilestoneId, &Milestone>,
        blockers: &[Blocker],
    ) -> Vec<ResolutionSuggestion> {
        let mut suggestions = Vec::new();

        for blocker in blockers {
            match &blocker.reason {
                BlockerReason::UnmetPrerequisites { waiting_on } => {
                    for dep in waiting_on {
                        let title = by_id.get(dep).map_or("unknown", |m| m.title.as_str());
                        suggestions.push(ResolutionSuggestion {
                            action: ResolutionAction::CompleteMilestone,
                            description: format!(
                                "Complete '{}' to unblock '{}'",
                                title, blocker.title
                            ),
                            priority: 1,
                        });
                    }
                }
                BlockerReason::Cycle { .. } => suggestions.push(ResolutionSuggestion {
                    action: ResolutionAction::ModifyDependencies,
                    description: format!(
                        "'{}' is part of a prerequisite cycle; remove one of its prerequisites",
                        blocker.title
                    ),
                    priority: 2,
                }),
                BlockerReason::Manual => suggestions.push(ResolutionSuggestion {
                    action: ResolutionAction::ManualReview,
                    description: format!(
                        "'{}' is blocked but has no prerequisites - manual review required",
                        blocker.title
                    ),
                    priority: 3,
                }),
            }
        }

        suggestions.sort_by_key(|s| s.priority);
        suggestions
    }
}

/// Depth-first search for a cycle reachable from `node`.
fn find_cycle(
    node: MilestoneId,
    by_id: &HashMap<MilestoneId, &Milestone>,
    visited: &mut HashSet<MilestoneId>,
    stack: &mut HashSet<MilestoneId>,
    path: &mut Vec<MilestoneId>,
) -> Option<Vec<MilestoneId>> {
    visited.insert(node);
    stack.insert(node);
    path.push(node);

    if let Some(m) = by_id.get(&node) {
        for dep in m.prerequisites() {
            if !visited.contains(&dep) {
                if let Some(cycle) = find_cycle(dep, by_id, visited, stack, path) {
                    return Some(cycle);
                }
            } else if stack.contains(&dep) {
                if let Some(start) = path.iter().position(|id| *id == dep) {
                    return Some(path[start..].to_vec());
                }
            }
        }
    }

    path.pop();
    stack.remove(&node);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use upnext_core::{CareerGoal, Dependency, DependencyKind, MilestoneSpec, MilestoneType, UserId};

    fn add(t: &mut Timeline, title: &str) -> MilestoneId {
        let spec = MilestoneSpec {
            title: title.into(),
            milestone_type: Some(MilestoneType::Project),
            ..Default::default()
        };
        let m = Milestone::from_spec(spec, MilestoneType::Project);
        let id = m.id;
        t.milestones.push(m);
        id
    }

    fn depend(t: &mut Timeline, on: MilestoneId, from: MilestoneId) {
        t.milestone_mut(from).unwrap().dependencies.push(Dependency {
            milestone_id: on,
            relation: DependencyKind::Prerequisite,
        });
    }

    #[test]
    fn test_empty_timeline() {
        let t = Timeline::new(UserId::from("u1"), CareerGoal::default());
        let analysis = BlockerDetector.analyze(&t);
        assert!(analysis.blockers.is_empty());
        assert!(analysis.suggestions.is_empty());
        assert_eq!(analysis.stats.total_blockers, 0);
    }

    #[test]
    fn test_waiting_on_prerequisite() {
        let mut t = Timeline::new(UserId::from("u1"), CareerGoal::default());
        let a = add(&mut t, "SQL course");
        let b = add(&mut t, "Analytics project");
        depend(&mut t, a, b);

        let analysis = BlockerDetector.analyze(&t);
        assert_eq!(analysis.blockers.len(), 1);
        assert_eq!(analysis.blockers[0].milestone_id, b);
        assert_eq!(
            analysis.blockers[0].reason,
            BlockerReason::UnmetPrerequisites { waiting_on: vec![a] }
        );
        assert_eq!(analysis.suggestions[0].action, ResolutionAction::CompleteMilestone);

        t.milestone_mut(a).unwrap().status = MilestoneStatus::Completed;
        assert!(BlockerDetector.analyze(&t).blockers.is_empty());
    }

    #[test]
    fn test_cycle_detection() {
        let mut t = Timeline::new(UserId::from("u1"), CareerGoal::default());
        let a = add(&mut t, "A");
        let b = add(&mut t, "B");
        let c = add(&mut t, "C");
        depend(&mut t, b, a);
        depend(&mut t, c, b);
        depend(&mut t, a, c);

        let analysis = BlockerDetector.analyze(&t);
        assert_eq!(analysis.circular_chains.len(), 1);
        assert_eq!(analysis.circular_chains[0].len(), 3);
        assert_eq!(analysis.stats.circular_dependencies, 1);
        assert!(analysis
            .suggestions
            .iter()
            .any(|s| s.action == ResolutionAction::ModifyDependencies));
    }

    #[test]
    fn test_manual_block() {
        let mut t = Timeline::new(UserId::from("u1"), CareerGoal::default());
        let a = add(&mut t, "Find a mentor");
        t.milestone_mut(a).unwrap().status = MilestoneStatus::Blocked;

        let analysis = BlockerDetector.analyze(&t);
        assert_eq!(analysis.blockers[0].reason, BlockerReason::Manual);
        assert_eq!(analysis.suggestions[0].action.as_str(), "ManualReview");
    }
}
