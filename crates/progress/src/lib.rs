//! Timeline progress tracking
//!
//! Milestone transitions, aggregate progress, blocker detection and
//! completion estimates.

#![warn(missing_docs)]

pub mod tracker;
pub mod blocker;
pub mod estimator;
pub mod service;

pub use tracker::{
    add_milestone, delete_milestone, recalc_overall_progress, unmet_prerequisites,
    update_milestone,
};
pub use blocker::{
    Blocker, BlockerAnalysis, BlockerDetector, BlockerReason, BlockerStats, ResolutionAction,
    ResolutionSuggestion,
};
pub use estimator::{duration_weeks, CompletionEstimator, DEFAULT_MILESTONE_HOURS};
pub use service::TimelineService;
