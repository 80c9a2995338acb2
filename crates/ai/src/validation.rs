//! Shape checks for generated content.
//!
//! Every parser here is total: malformed input degrades to an empty or
//! default value and a warning, never an error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use upnext_core::{MilestonePriority, MilestoneType};

use crate::generator::PromptKind;

/// Used when no usable motivational message was generated.
pub const DEFAULT_MOTIVATION: &str = "Keep up the great work on your learning journey!";

/// One suggested milestone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MilestoneSuggestion {
    /// Milestone title
    pub title: String,
    /// Milestone kind, `custom` when unrecognised
    pub milestone_type: MilestoneType,
    /// Longer explanation
    pub description: String,
    /// Priority, medium when unrecognised
    pub priority: MilestonePriority,
    /// Expected effort in hours
    pub estimated_hours: Option<f32>,
    /// Titles of earlier suggestions this one builds on
    pub depends_on: Vec<String>,
}

/// Suggested milestones, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MilestoneSuggestions {
    /// Valid suggestions; malformed entries are dropped
    pub milestones: Vec<MilestoneSuggestion>,
}

/// How the learner tracks against the plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineAdherence {
    /// Progressing as planned
    OnTrack,
    /// Falling behind the plan
    Behind,
    /// Ahead of the plan
    Ahead,
    /// Not assessed
    #[default]
    Unknown,
}

/// Assessment of the learner's progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProgressEvaluation {
    /// 0 to 100
    #[serde(skip_deserializing)]
    pub overall_score: u8,
    /// What the learner does well
    pub strengths: Vec<String>,
    /// Where the learner should focus
    pub areas_for_improvement: Vec<String>,
    /// Free-form advice
    pub recommendations: Vec<String>,
    /// How the learner tracks against the plan
    #[serde(skip_deserializing)]
    pub timeline_adherence: TimelineAdherence,
    /// Skill name to mastery percentage
    #[serde(skip_deserializing)]
    pub skills_mastery: BTreeMap<String, u8>,
}

/// A prioritized action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PriorityAction {
    /// What to do
    pub action: String,
    /// Why it matters
    pub reason: String,
    /// Expected effect
    pub estimated_impact: Option<String>,
}

/// A suggested course.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SuggestedCourse {
    /// Course name
    pub title: String,
    /// Where it is offered
    pub platform: Option<String>,
    /// Link to the course
    pub url: Option<String>,
    /// Why it is suggested
    pub reason: Option<String>,
}

/// A suggested project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SuggestedProject {
    /// Project name
    pub title: String,
    /// Project category
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Skills it exercises
    pub skills: Vec<String>,
    /// Why it is suggested
    pub reason: Option<String>,
}

/// Recommended next steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Recommendations {
    /// Actions, most important first
    pub priority_actions: Vec<PriorityAction>,
    /// Courses worth taking
    pub suggested_courses: Vec<SuggestedCourse>,
    /// Projects worth building
    pub suggested_projects: Vec<SuggestedProject>,
}

/// A motivational message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Motivation {
    /// Message shown to the learner
    pub message: String,
}

impl Default for Motivation {
    fn default() -> Self {
        Self {
            message: DEFAULT_MOTIVATION.to_string(),
        }
    }
}

fn malformed(kind: PromptKind, reason: &str) {
    warn!(kind = kind.as_str(), reason, "Malformed generated content, using defaults");
}

/// Read an array either directly or from one of `keys` on an object.
fn array_at<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => keys.iter().find_map(|k| map.get(*k)?.as_array()),
        _ => None,
    }
}

fn str_at<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| value.get(*k)?.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Items of an array that deserialize into `T`; the rest are dropped.
fn items<T: serde::de::DeserializeOwned>(kind: PromptKind, values: Option<&Vec<Value>>) -> Vec<T> {
    let Some(values) = values else {
        return Vec::new();
    };
    let parsed: Vec<T> = values
        .iter()
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect();
    if parsed.len() < values.len() {
        malformed(kind, "dropped unreadable items");
    }
    parsed
}

/// Suggested milestones. Items without a title are dropped; unknown types
/// become `custom` and unknown priorities `medium`.
pub fn parse_milestone_suggestions(value: &Value) -> MilestoneSuggestions {
    let kind = PromptKind::GenerateTimeline;
    let Some(raw) = array_at(value, &["milestones"]) else {
        malformed(kind, "expected an array of milestones");
        return MilestoneSuggestions::default();
    };

    let mut milestones = Vec::with_capacity(raw.len());
    for item in raw {
        let Some(title) = str_at(item, &["title"]) else {
            malformed(kind, "milestone without title");
            continue;
        };
        let milestone_type = str_at(item, &["type", "milestoneType"])
            .and_then(|s| s.parse().ok())
            .unwrap_or(MilestoneType::Custom);
        let priority = str_at(item, &["priority"])
            .and_then(|s| serde_json::from_value(Value::String(s.to_lowercase())).ok())
            .unwrap_or_default();
        let estimated_hours = ["estimatedHours", "estimated_hours"]
            .iter()
            .find_map(|k| item.get(*k)?.as_f64())
            .filter(|h| h.is_finite() && *h >= 0.0)
            .map(|h| h as f32);
        let depends_on = item
            .get("dependencies")
            .and_then(Value::as_array)
            .map(|deps| {
                deps.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        milestones.push(MilestoneSuggestion {
            title: title.to_string(),
            milestone_type,
            description: str_at(item, &["description"]).unwrap_or_default().to_string(),
            priority,
            estimated_hours,
            depends_on,
        });
    }
    MilestoneSuggestions { milestones }
}

/// Progress evaluation. The score is clamped to 0..=100.
pub fn parse_progress_evaluation(value: &Value) -> ProgressEvaluation {
    let kind = PromptKind::EvaluateProgress;
    if !value.is_object() {
        malformed(kind, "expected an object");
        return ProgressEvaluation::default();
    }

    let mut evaluation: ProgressEvaluation = match serde_json::from_value(value.clone()) {
        Ok(e) => e,
        Err(e) => {
            malformed(kind, &e.to_string());
            ProgressEvaluation::default()
        }
    };
    evaluation.overall_score = value
        .get("overallScore")
        .and_then(Value::as_f64)
        .map(|s| s.clamp(0.0, 100.0).round() as u8)
        .unwrap_or(0);
    evaluation.timeline_adherence = match str_at(value, &["timelineAdherence"])
        .map(|s| s.to_lowercase().replace([' ', '-'], "_"))
        .as_deref()
    {
        Some("on_track") => TimelineAdherence::OnTrack,
        Some("behind") => TimelineAdherence::Behind,
        Some("ahead") => TimelineAdherence::Ahead,
        _ => TimelineAdherence::Unknown,
    };
    if let Some(map) = value.get("skillsMastery").and_then(Value::as_object) {
        evaluation.skills_mastery = map
            .iter()
            .filter_map(|(skill, pct)| {
                let pct = pct.as_f64()?.clamp(0.0, 100.0).round() as u8;
                Some((skill.clone(), pct))
            })
            .collect();
    }
    evaluation
}

/// Recommended next steps.
pub fn parse_recommendations(value: &Value) -> Recommendations {
    let kind = PromptKind::RecommendNextSteps;
    if !value.is_object() {
        malformed(kind, "expected an object");
        return Recommendations::default();
    }

    Recommendations {
        priority_actions: items::<PriorityAction>(kind, array_at(value, &["priorityActions"]))
            .into_iter()
            .filter(|a| !a.action.trim().is_empty())
            .collect(),
        suggested_courses: items::<SuggestedCourse>(kind, array_at(value, &["suggestedCourses"]))
            .into_iter()
            .filter(|c| !c.title.trim().is_empty())
            .collect(),
        suggested_projects: items::<SuggestedProject>(kind, array_at(value, &["suggestedProjects"]))
            .into_iter()
            .filter(|p| !p.title.trim().is_empty())
            .collect(),
    }
}

/// Motivational message, accepted as a bare string or `{message}`.
pub fn parse_motivation(value: &Value) -> Motivation {
    let message = match value {
        Value::String(s) => Some(s.trim()).filter(|s| !s.is_empty()),
        _ => str_at(value, &["message"]),
    };
    match message {
        Some(m) => Motivation {
            message: m.to_string(),
        },
        None => {
            malformed(PromptKind::MotivationalMessage, "no message");
            Motivation::default()
        }
    }
}
