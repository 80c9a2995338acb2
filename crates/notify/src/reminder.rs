//! Reminder derivation.
//!
//! Turns snapshots of a learner's milestones, courses and projects into
//! notification candidates. Pure: nothing is persisted or sent here.

use serde::{Deserialize, Serialize};
use upnext_core::{
    MilestoneStatus, NotificationAction, NotificationMetadata, NotificationPriority,
    NotificationSpec, NotificationType, ResourceKind, ResourceRef, Time, Timeline, UserId,
};

use crate::config::SchedulerConfig;

/// An in-progress course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSnapshot {
    /// Course id in the owning store
    pub id: String,
    /// Title
    pub title: String,
    /// Last recorded activity, if any
    pub last_activity: Option<Time>,
    /// Where to resume
    pub url: Option<String>,
}

/// An in-progress project and its sub-milestones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    /// Project id in the owning store
    pub id: String,
    /// Title
    pub title: String,
    /// Sub-milestones in order
    pub milestones: Vec<ProjectMilestone>,
}

/// A project sub-milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMilestone {
    /// Title
    pub title: String,
    /// Done or not
    pub done: bool,
}

/// Everything reminder derivation looks at.
#[derive(Debug, Clone)]
pub struct ReminderContext {
    /// Learner
    pub user_id: UserId,
    /// Active timeline
    pub timeline: Option<Timeline>,
    /// In-progress courses
    pub courses: Vec<CourseSnapshot>,
    /// In-progress projects
    pub projects: Vec<ProjectSnapshot>,
}

impl ReminderContext {
    /// Empty context for `user_id`.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            timeline: None,
            courses: Vec::new(),
            projects: Vec::new(),
        }
    }
}

const AGENT_TYPE: &str = "reminder";

/// Derive reminder candidates, due immediately.
pub fn generate_reminder_candidates(
    context: &ReminderContext,
    config: &SchedulerConfig,
    now: Time,
) -> Vec<NotificationSpec> {
    let mut out = Vec::new();

    if let Some(timeline) = &context.timeline {
        for m in &timeline.milestones {
            if !matches!(m.status, MilestoneStatus::NotStarted | MilestoneStatus::InProgress) {
                continue;
            }
            let Some(target) = m.target_date else { continue };
            let days = days_until(now, target);
            if days <= 0 || days > config.due_window_days {
                continue;
            }

            let priority = if days <= config.urgent_window_days {
                NotificationPriority::High
            } else {
                NotificationPriority::Medium
            };
            let mut spec = candidate(
                context,
                NotificationType::Deadline,
                format!("Milestone Due Soon: {}", m.title),
                format!(
                    "Your milestone \"{}\" is due in {} {}. You have {} hours estimated.",
                    m.title,
                    days,
                    if days == 1 { "day" } else { "days" },
                    m.estimated_hours.unwrap_or(0.0)
                ),
                ResourceRef::new(ResourceKind::Milestone, m.id),
                now,
            );
            spec.priority = priority;
            out.push(spec);
        }
    }

    for course in &context.courses {
        let idle = course.last_activity.map(|at| days_since(now, at));
        if matches!(idle, Some(days) if days < config.stale_activity_days) {
            continue;
        }
        let message = match idle {
            Some(days) => format!(
                "It's been {} days since you worked on \"{}\". Keep your momentum going!",
                days, course.title
            ),
            None => format!(
                "You haven't started \"{}\" yet. Keep your momentum going!",
                course.title
            ),
        };
        let mut spec = candidate(
            context,
            NotificationType::Reminder,
            format!("Continue Learning: {}", course.title),
            message,
            ResourceRef::new(ResourceKind::Course, &course.id),
            now,
        );
        spec.action = Some(NotificationAction {
            text: "Resume Course".into(),
            url: course.url.clone(),
        });
        out.push(spec);
    }

    for project in &context.projects {
        let pending: Vec<&ProjectMilestone> =
            project.milestones.iter().filter(|m| !m.done).collect();
        let Some(next) = pending.first() else { continue };
        out.push(candidate(
            context,
            NotificationType::Reminder,
            format!("Project Update: {}", project.title),
            format!(
                "You have {} milestone(s) pending in \"{}\". Next up: {}",
                pending.len(),
                project.title,
                next.title
            ),
            ResourceRef::new(ResourceKind::Project, &project.id),
            now,
        ));
    }

    out
}

fn candidate(
    context: &ReminderContext,
    kind: NotificationType,
    title: String,
    message: String,
    link: ResourceRef,
    now: Time,
) -> NotificationSpec {
    let mut spec = NotificationSpec::new(context.user_id.clone(), kind, title, message);
    spec.scheduled_for = Some(now);
    spec.linked_resource = Some(link);
    spec.metadata = NotificationMetadata {
        agent_generated: true,
        agent_type: Some(AGENT_TYPE.to_string()),
    };
    spec
}

/// Whole days until `target`, rounded up.
fn days_until(now: Time, target: Time) -> i64 {
    let secs = (target - now).num_seconds();
    secs.div_euclid(86_400) + i64::from(secs.rem_euclid(86_400) != 0)
}

/// Whole days since `past`, rounded down.
fn days_since(now: Time, past: Time) -> i64 {
    (now - past).num_seconds().div_euclid(86_400)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use upnext_core::{CareerGoal, Milestone, MilestoneSpec, MilestoneType};

    fn timeline_with(due_in: &[(Duration, MilestoneStatus)], now: Time) -> Timeline {
        let mut t = Timeline::new(UserId::from("u1"), CareerGoal::default());
        for (i, (offset, status)) in due_in.iter().enumerate() {
            let spec = MilestoneSpec {
                title: format!("M{i}"),
                milestone_type: Some(MilestoneType::Course),
                target_date: Some(now + *offset),
                estimated_hours: Some(6.0),
                ..Default::default()
            };
            let mut m = Milestone::from_spec(spec, MilestoneType::Course);
            m.status = *status;
            t.milestones.push(m);
        }
        t
    }

    fn context(now: Time) -> ReminderContext {
        ReminderContext {
            user_id: UserId::from("u1"),
            timeline: Some(timeline_with(
                &[
                    (Duration::hours(30), MilestoneStatus::NotStarted),
                    (Duration::days(5), MilestoneStatus::InProgress),
                    (Duration::days(10), MilestoneStatus::NotStarted),
                    (Duration::days(1), MilestoneStatus::Completed),
                    (Duration::hours(-3), MilestoneStatus::InProgress),
                ],
                now,
            )),
            ..ReminderContext::new(UserId::from("u1"))
        }
    }

    #[test]
    fn test_deadline_window_and_priority() {
        let now = chrono::Utc::now();
        let specs = generate_reminder_candidates(&context(now), &SchedulerConfig::default(), now);

        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].title, "Milestone Due Soon: M0");
        assert_eq!(specs[0].priority, NotificationPriority::High);
        assert!(specs[0].message.contains("due in 2 days"));
        assert_eq!(specs[1].priority, NotificationPriority::Medium);
        assert!(specs.iter().all(|s| s.notification_type == NotificationType::Deadline));
        assert!(specs.iter().all(|s| s.metadata.agent_generated));
        assert_eq!(
            specs[1].linked_resource.as_ref().map(|r| r.kind),
            Some(ResourceKind::Milestone)
        );
    }

    #[test]
    fn test_stale_courses() {
        let now = chrono::Utc::now();
        let ctx = ReminderContext {
            user_id: UserId::from("u1"),
            courses: vec![
                CourseSnapshot {
                    id: "c1".into(),
                    title: "SQL".into(),
                    last_activity: Some(now - Duration::days(4)),
                    url: Some("https://example.com/sql".into()),
                },
                CourseSnapshot {
                    id: "c2".into(),
                    title: "Stats".into(),
                    last_activity: Some(now - Duration::days(1)),
                    url: None,
                },
                CourseSnapshot {
                    id: "c3".into(),
                    title: "Rust".into(),
                    last_activity: None,
                    url: None,
                },
            ],
            ..ReminderContext::new(UserId::from("u1"))
        };

        let specs = generate_reminder_candidates(&ctx, &SchedulerConfig::default(), now);
        let titles: Vec<&str> = specs.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Continue Learning: SQL", "Continue Learning: Rust"]);
        assert!(specs[0].message.contains("4 days"));
        assert_eq!(specs[0].action.as_ref().unwrap().text, "Resume Course");
    }

    #[test]
    fn test_projects_with_pending_milestones() {
        let now = chrono::Utc::now();
        let ctx = ReminderContext {
            user_id: UserId::from("u1"),
            projects: vec![
                ProjectSnapshot {
                    id: "p1".into(),
                    title: "Portfolio".into(),
                    milestones: vec![
                        ProjectMilestone { title: "Design".into(), done: true },
                        ProjectMilestone { title: "Deploy".into(), done: false },
                    ],
                },
                ProjectSnapshot {
                    id: "p2".into(),
                    title: "Done".into(),
                    milestones: vec![ProjectMilestone { title: "All".into(), done: true }],
                },
            ],
            ..ReminderContext::new(UserId::from("u1"))
        };

        let specs = generate_reminder_candidates(&ctx, &SchedulerConfig::default(), now);
        assert_eq!(specs.len(), 1);
        assert!(specs[0].message.ends_with("Next up: Deploy"));
    }

    #[test]
    fn test_day_rounding() {
        let now = chrono::Utc::now();
        assert_eq!(days_until(now, now + Duration::hours(1)), 1);
        assert_eq!(days_until(now, now + Duration::days(2)), 2);
        assert_eq!(days_until(now, now - Duration::hours(1)), 0);
        assert_eq!(days_since(now, now - Duration::hours(71)), 2);
    }
}
