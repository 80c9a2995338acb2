//! The career navigator service.
//!
//! One object, built once with its collaborators, runs every generated-content
//! workflow. Generation failures never abort a workflow: they are logged and
//! replaced by defaults, so the timeline and notifications stay consistent.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use upnext_core::{
    CareerGoal, Dependency, DependencyKind, Error, MilestoneId, MilestoneSpec, Notification,
    Result, Time, Timeline, UserId,
};
use upnext_notify::{
    generate_reminder_candidates, CourseSnapshot, NotificationScheduler, ProjectSnapshot,
    ReminderContext,
};
use upnext_progress::{TimelineService, DEFAULT_MILESTONE_HOURS};
use upnext_storage::Storage;

use crate::generator::{ContentGenerator, PromptKind};
use crate::validation::{
    parse_milestone_suggestions, parse_motivation, parse_progress_evaluation,
    parse_recommendations, MilestoneSuggestion, Motivation, ProgressEvaluation, Recommendations,
};

const DEFAULT_STUDY_HOURS: u32 = 10;

/// Work the navigator can run for a learner.
#[derive(Debug, Clone)]
pub enum AgentTask {
    /// Ask for milestone suggestions and add them to the timeline
    GenerateTimeline {
        /// Goal used when the learner has no timeline yet
        goal: CareerGoal,
    },
    /// Score the learner's progress
    EvaluateProgress,
    /// Suggest what to do next
    RecommendNextSteps,
    /// Derive reminders and enqueue them
    ScheduleReminders {
        /// Courses in progress
        courses: Vec<CourseSnapshot>,
        /// Projects in progress
        projects: Vec<ProjectSnapshot>,
    },
}

/// What a task produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentOutcome {
    /// Milestones were added
    TimelineGenerated {
        /// Timeline after the additions
        timeline: Timeline,
        /// New milestones, in suggestion order
        added: Vec<MilestoneId>,
    },
    /// Progress was evaluated
    ProgressEvaluated {
        /// The evaluation
        evaluation: ProgressEvaluation,
    },
    /// Next steps were recommended
    NextSteps {
        /// The recommendations
        recommendations: Recommendations,
    },
    /// Reminders were enqueued
    RemindersScheduled {
        /// Notifications created
        created: Vec<Notification>,
    },
}

/// Runs generated-content workflows against a learner's data.
pub struct Navigator {
    storage: Arc<dyn Storage>,
    generator: Arc<dyn ContentGenerator>,
    timelines: Arc<TimelineService>,
    scheduler: Arc<NotificationScheduler>,
}

impl Navigator {
    /// Create a navigator.
    pub fn new(
        storage: Arc<dyn Storage>,
        generator: Arc<dyn ContentGenerator>,
        timelines: Arc<TimelineService>,
        scheduler: Arc<NotificationScheduler>,
    ) -> Self {
        Self {
            storage,
            generator,
            timelines,
            scheduler,
        }
    }

    /// Run one task.
    pub async fn run(&self, user: &UserId, task: AgentTask) -> Result<AgentOutcome> {
        info!(user_id = %user, task = task_name(&task), "Running navigator task");
        match task {
            AgentTask::GenerateTimeline { goal } => self.generate_timeline(user, goal).await,
            AgentTask::EvaluateProgress => Ok(AgentOutcome::ProgressEvaluated {
                evaluation: self.evaluate_progress(user).await?,
            }),
            AgentTask::RecommendNextSteps => Ok(AgentOutcome::NextSteps {
                recommendations: self.recommend_next_steps(user).await?,
            }),
            AgentTask::ScheduleReminders { courses, projects } => {
                let created = self.schedule_reminders(user, courses, projects).await?;
                Ok(AgentOutcome::RemindersScheduled { created })
            }
        }
    }

    /// Score the learner's progress.
    pub async fn evaluate_progress(&self, user: &UserId) -> Result<ProgressEvaluation> {
        let context = self.learner_context(user).await?;
        let value = self.generate(PromptKind::EvaluateProgress, &context).await;
        Ok(parse_progress_evaluation(&value))
    }

    /// Suggest what to do next.
    pub async fn recommend_next_steps(&self, user: &UserId) -> Result<Recommendations> {
        let context = self.learner_context(user).await?;
        let value = self.generate(PromptKind::RecommendNextSteps, &context).await;
        Ok(parse_recommendations(&value))
    }

    /// A short encouraging message.
    pub async fn motivation(&self, user: &UserId) -> Result<Motivation> {
        let context = self.learner_context(user).await?;
        let value = self.generate(PromptKind::MotivationalMessage, &context).await;
        Ok(parse_motivation(&value))
    }

    async fn generate_timeline(&self, user: &UserId, goal: CareerGoal) -> Result<AgentOutcome> {
        let hours = self.study_hours(user).await?;
        let mut context = self.learner_context(user).await?;
        context["careerGoal"] = json!(goal);

        let value = self.generate(PromptKind::GenerateTimeline, &context).await;
        let suggestions = parse_milestone_suggestions(&value);

        // Suggestions are appended; an existing plan is never discarded.
        if let Err(Error::NotFound { .. }) = self.timelines.timeline(user).await {
            self.timelines.create_timeline(user, goal).await?;
        }

        let now = Utc::now();
        let mut by_title: HashMap<String, MilestoneId> = HashMap::new();
        let mut added = Vec::new();
        for (index, suggestion) in suggestions.milestones.into_iter().enumerate() {
            let title = suggestion.title.clone();
            let spec = suggestion_spec(suggestion, index, hours, now, &by_title);
            match self.timelines.add_milestone(user, spec).await {
                Ok(milestone) => {
                    by_title.insert(title, milestone.id);
                    added.push(milestone.id);
                }
                Err(e @ Error::Validation(_)) => {
                    warn!(user_id = %user, title = %title, error = %e, "Skipping suggested milestone");
                }
                Err(e) => return Err(e),
            }
        }

        info!(user_id = %user, added = added.len(), "Generated timeline milestones");
        Ok(AgentOutcome::TimelineGenerated {
            timeline: self.timelines.timeline(user).await?,
            added,
        })
    }

    async fn schedule_reminders(
        &self,
        user: &UserId,
        courses: Vec<CourseSnapshot>,
        projects: Vec<ProjectSnapshot>,
    ) -> Result<Vec<Notification>> {
        let context = ReminderContext {
            timeline: self.storage.load_timeline(user).await?,
            courses,
            projects,
            ..ReminderContext::new(user.clone())
        };
        let candidates =
            generate_reminder_candidates(&context, self.scheduler.config(), Utc::now());
        self.scheduler.enqueue_candidates(candidates).await
    }

    /// Ask the collaborator; failures become `null`, which parsers default.
    async fn generate(&self, kind: PromptKind, context: &Value) -> Value {
        match self.generator.generate(kind, context).await {
            Ok(value) => value,
            Err(e) => {
                warn!(kind = kind.as_str(), error = %e, "Content generation failed, using defaults");
                Value::Null
            }
        }
    }

    async fn study_hours(&self, user: &UserId) -> Result<u32> {
        Ok(self
            .storage
            .load_user(user)
            .await?
            .map(|u| u.preferences.study_hours_per_week)
            .filter(|h| *h > 0)
            .unwrap_or(DEFAULT_STUDY_HOURS))
    }

    /// What the collaborator gets to see about the learner.
    async fn learner_context(&self, user: &UserId) -> Result<Value> {
        let profile = self.storage.load_user(user).await?;
        let roadmap = self.storage.load_roadmap(user).await?;
        let timeline = self.storage.load_timeline(user).await?;

        Ok(json!({
            "userId": user,
            "name": profile.as_ref().map(|p| p.name.clone()),
            "studyHoursPerWeek": profile
                .as_ref()
                .map(|p| p.preferences.study_hours_per_week)
                .unwrap_or(DEFAULT_STUDY_HOURS),
            "roadmap": roadmap.map(|r| json!({
                "targetRole": r.target_role,
                "level": r.level,
                "readinessScore": r.completion_percentage,
                "tasks": r.tasks.iter().map(|t| json!({
                    "title": t.title,
                    "category": t.category,
                    "status": t.status,
                    "masteryScore": t.mastery_score,
                })).collect::<Vec<_>>(),
            })),
            "timeline": timeline.map(|t| json!({
                "careerGoal": t.career_goal,
                "overallProgress": t.overall_progress,
                "milestones": t.milestones.iter().map(|m| json!({
                    "title": m.title,
                    "type": m.milestone_type,
                    "status": m.status,
                    "targetDate": m.target_date,
                })).collect::<Vec<_>>(),
            })),
        }))
    }
}

fn task_name(task: &AgentTask) -> &'static str {
    match task {
        AgentTask::GenerateTimeline { .. } => "generate_timeline",
        AgentTask::EvaluateProgress => "evaluate_progress",
        AgentTask::RecommendNextSteps => "recommend_next_steps",
        AgentTask::ScheduleReminders { .. } => "schedule_reminders",
    }
}

/// Turn a suggestion into a dated milestone spec.
///
/// Suggestions are staggered two study-weeks apart, scaled by weekly hours;
/// each lasts as many whole weeks as its estimate needs. Dependencies name
/// earlier suggestions by title; unknown names are dropped.
fn suggestion_spec(
    suggestion: MilestoneSuggestion,
    index: usize,
    hours_per_week: u32,
    now: Time,
    by_title: &HashMap<String, MilestoneId>,
) -> MilestoneSpec {
    let hours_per_week = hours_per_week.max(1) as f32;
    let offset_weeks = ((index as f32 * 2.0) / (hours_per_week / 5.0)).floor() as i64;
    let start = shift_weeks(now, offset_weeks).unwrap_or(now);
    let estimated = suggestion.estimated_hours.unwrap_or(DEFAULT_MILESTONE_HOURS);
    let length_weeks = (estimated / hours_per_week).ceil().max(1.0) as i64;

    let dependencies = suggestion
        .depends_on
        .iter()
        .filter_map(|title| by_title.get(title))
        .map(|id| Dependency {
            milestone_id: *id,
            relation: DependencyKind::Prerequisite,
        })
        .collect();

    MilestoneSpec {
        title: suggestion.title,
        milestone_type: Some(suggestion.milestone_type),
        description: suggestion.description,
        priority: suggestion.priority,
        start_date: Some(start),
        target_date: shift_weeks(start, length_weeks),
        estimated_hours: Some(estimated),
        dependencies,
        linked_resources: Vec::new(),
        ai_suggested: true,
    }
}

/// `None` when the result is not a representable date.
fn shift_weeks(from: Time, weeks: i64) -> Option<Time> {
    from.checked_add_signed(Duration::try_weeks(weeks)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::StaticContentGenerator;
    use upnext_core::{MilestoneStatus, MilestoneType, UserProfile};
    use upnext_notify::{LoggingAdapters, SchedulerConfig};
    use upnext_storage::{MemoryStorage, UserLocks};

    async fn navigator(generator: StaticContentGenerator) -> (Arc<MemoryStorage>, Navigator) {
        let storage = Arc::new(MemoryStorage::new());
        let mut user = UserProfile::new(UserId::from("u1"), "Aisha");
        user.email = Some("aisha@example.com".into());
        storage.save_user(&user).await.unwrap();

        let timelines = Arc::new(TimelineService::new(storage.clone(), UserLocks::default()));
        let scheduler = Arc::new(NotificationScheduler::new(
            storage.clone(),
            Arc::new(LoggingAdapters),
            SchedulerConfig::default(),
        ));
        let navigator = Navigator::new(storage.clone(), Arc::new(generator), timelines, scheduler);
        (storage, navigator)
    }

    fn goal() -> CareerGoal {
        CareerGoal {
            target_role: "Data Scientist".into(),
            target_company: None,
            timeframe: Some("6 months".into()),
        }
    }

    #[tokio::test]
    async fn test_generate_timeline_adds_suggestions() {
        let generator = StaticContentGenerator::new().with(
            PromptKind::GenerateTimeline,
            json!([
                { "title": "Python for Data", "type": "course", "estimatedHours": 25 },
                { "title": "", "type": "course" },
                { "title": "Kaggle project", "type": "project", "dependencies": ["Python for Data", "Unknown"] }
            ]),
        );
        let (_storage, navigator) = navigator(generator).await;
        let user = UserId::from("u1");

        let outcome = navigator
            .run(&user, AgentTask::GenerateTimeline { goal: goal() })
            .await
            .unwrap();
        let AgentOutcome::TimelineGenerated { timeline, added } = outcome else {
            panic!("unexpected outcome");
        };

        assert_eq!(added.len(), 2);
        assert_eq!(timeline.milestones.len(), 2);
        assert!(timeline.milestones.iter().all(|m| m.ai_suggested));
        assert!(timeline.milestones.iter().all(|m| m.status == MilestoneStatus::NotStarted));
        assert_eq!(timeline.milestones[1].milestone_type, MilestoneType::Project);
        assert_eq!(timeline.milestones[1].dependencies.len(), 1);
        assert_eq!(timeline.milestones[1].dependencies[0].milestone_id, added[0]);
        assert_eq!(timeline.career_goal.target_role, "Data Scientist");
    }

    #[tokio::test]
    async fn test_oversized_estimate_is_kept_without_dates() {
        let generator = StaticContentGenerator::new().with(
            PromptKind::GenerateTimeline,
            json!([{ "title": "Become an expert", "type": "course", "estimatedHours": 1.0e12 }]),
        );
        let (_storage, navigator) = navigator(generator).await;

        let outcome = navigator
            .run(&UserId::from("u1"), AgentTask::GenerateTimeline { goal: goal() })
            .await
            .unwrap();
        let AgentOutcome::TimelineGenerated { timeline, added } = outcome else {
            panic!("unexpected outcome");
        };
        assert_eq!(added.len(), 1);
        assert!(timeline.milestones[0].target_date.is_none());
        assert!(timeline.estimated_completion.is_none());
    }

    #[tokio::test]
    async fn test_generator_outage_keeps_timeline_consistent() {
        let (_storage, navigator) = navigator(StaticContentGenerator::new()).await;
        let user = UserId::from("u1");

        let outcome = navigator
            .run(&user, AgentTask::GenerateTimeline { goal: goal() })
            .await
            .unwrap();
        let AgentOutcome::TimelineGenerated { timeline, added } = outcome else {
            panic!("unexpected outcome");
        };
        assert!(added.is_empty());
        assert_eq!(timeline.overall_progress, 0);

        let evaluation = navigator.evaluate_progress(&user).await.unwrap();
        assert_eq!(evaluation, ProgressEvaluation::default());
        assert_eq!(
            navigator.motivation(&user).await.unwrap(),
            Motivation::default()
        );
    }

    #[tokio::test]
    async fn test_recommendations_are_validated() {
        let generator = StaticContentGenerator::new().with(
            PromptKind::RecommendNextSteps,
            json!({ "priorityActions": [{ "action": "Learn pandas", "reason": "core tool" }] }),
        );
        let (_storage, navigator) = navigator(generator).await;

        let outcome = navigator
            .run(&UserId::from("u1"), AgentTask::RecommendNextSteps)
            .await
            .unwrap();
        let AgentOutcome::NextSteps { recommendations } = outcome else {
            panic!("unexpected outcome");
        };
        assert_eq!(recommendations.priority_actions[0].action, "Learn pandas");
        assert!(recommendations.suggested_courses.is_empty());
    }

    #[tokio::test]
    async fn test_schedule_reminders_enqueues_once() {
        let (storage, navigator) = navigator(StaticContentGenerator::new()).await;
        let user = UserId::from("u1");
        let courses = vec![CourseSnapshot {
            id: "c1".into(),
            title: "Statistics".into(),
            last_activity: Some(Utc::now() - Duration::days(5)),
            url: None,
        }];

        let task = AgentTask::ScheduleReminders {
            courses: courses.clone(),
            projects: Vec::new(),
        };
        let AgentOutcome::RemindersScheduled { created } = navigator.run(&user, task).await.unwrap() else {
            panic!("unexpected outcome");
        };
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].title, "Continue Learning: Statistics");

        let again = AgentTask::ScheduleReminders {
            courses,
            projects: Vec::new(),
        };
        let AgentOutcome::RemindersScheduled { created } = navigator.run(&user, again).await.unwrap() else {
            panic!("unexpected outcome");
        };
        assert!(created.is_empty());

        let stored = storage
            .list_notifications(&Default::default())
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[test]
    fn test_suggestion_dates() {
        let now = Utc::now();
        let suggestion = MilestoneSuggestion {
            title: "SQL".into(),
            milestone_type: MilestoneType::Course,
            description: String::new(),
            priority: Default::default(),
            estimated_hours: Some(25.0),
            depends_on: Vec::new(),
        };
        let spec = suggestion_spec(suggestion, 2, 10, now, &HashMap::new());
        // index 2 at 10 h/week starts two weeks out and lasts three weeks.
        assert_eq!(spec.start_date, Some(now + Duration::weeks(2)));
        assert_eq!(spec.target_date, Some(now + Duration::weeks(5)));
        assert!(spec.ai_suggested);
    }
}
