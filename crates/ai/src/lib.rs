//! Generated-content workflows for UpNext.
//!
//! The content generation collaborator is treated as untrusted: raw output
//! is validated into typed values, and anything unusable degrades to
//! defaults. The [`Navigator`] runs the workflows that consume it.

#![warn(missing_docs)]

pub mod generator;
pub mod validation;
pub mod navigator;

pub use generator::{
    extract_json, ContentGenerator, GeneratorConfig, HttpContentGenerator, PromptKind,
    StaticContentGenerator,
};
pub use validation::{
    parse_milestone_suggestions, parse_motivation, parse_progress_evaluation,
    parse_recommendations, MilestoneSuggestion, MilestoneSuggestions, Motivation, PriorityAction,
    ProgressEvaluation, Recommendations, SuggestedCourse, SuggestedProject, TimelineAdherence,
    DEFAULT_MOTIVATION,
};
pub use navigator::{AgentOutcome, AgentTask, Navigator};
