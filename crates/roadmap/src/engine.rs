//! Roadmap generation and mastery-driven adaptation.
//!
//! Both operations are pure: they never touch storage and never mutate their
//! input. A failed completion therefore leaves the caller's roadmap exactly
//! as it was.

use upnext_core::{
    Error, NextTask, Result, Roadmap, RoadmapEvent, Task, TaskId, TaskStatus, Time, UserId,
};

use crate::catalog::{category_for, Catalog};

/// Lowest mastery score that still counts as understood.
pub const REINFORCE_AT_OR_BELOW: u8 = 2;

/// Mastery score from which an advanced stretch task is offered.
pub const ADVANCE_AT_OR_ABOVE: u8 = 4;

/// Outcome of completing a task.
#[derive(Debug, Clone)]
pub struct Completion {
    /// The adapted roadmap
    pub roadmap: Roadmap,
    /// Event describing the completion
    pub event: RoadmapEvent,
    /// Tasks inserted by adaptation
    pub inserted: Vec<TaskId>,
}

/// Build a learner's first roadmap from the catalog.
///
/// Tasks keep catalog order; the first one is put in progress.
pub fn generate_initial_roadmap(
    catalog: &Catalog,
    user_id: UserId,
    target_role: &str,
    level: &str,
) -> Result<Roadmap> {
    let items = catalog.lookup(target_role, level)?;

    let mut tasks: Vec<Task> = items
        .iter()
        .map(|item| {
            Task::from_catalog(
                &item.skill,
                format!(
                    "Master {} to advance your career as a {}",
                    item.skill, target_role
                ),
                category_for(&item.skill),
                &item.duration,
                item.resources.clone(),
            )
        })
        .collect();

    if let Some(first) = tasks.first_mut() {
        first.status = TaskStatus::InProgress;
    }

    Ok(Roadmap::new(user_id, target_role, level.to_lowercase(), tasks))
}

/// Complete `task_id` with a self-reported mastery score and adapt the roadmap.
///
/// - mastery <= 2 inserts a reinforcement task right after the completed one
/// - mastery >= 4 adds an optional advanced task after the rightmost task of
///   the same category
///
/// The learner's focus then moves to the next task that was waiting before
/// the completion; a freshly inserted reinforcement task only becomes the
/// focus when nothing else is left.
pub fn complete_task(
    roadmap: &Roadmap,
    task_id: TaskId,
    mastery_score: u8,
    notes: Option<String>,
    now: Time,
) -> Result<Completion> {
    if !(1..=5).contains(&mastery_score) {
        return Err(Error::Validation(format!(
            "mastery score must be between 1 and 5, got {mastery_score}"
        )));
    }

    let index = roadmap
        .position_of(task_id)
        .ok_or_else(|| Error::not_found("task", task_id))?;

    let current = roadmap.tasks[index].status;
    if current == TaskStatus::Completed {
        return Err(Error::AlreadyCompleted {
            task_id: task_id.to_string(),
        });
    }
    if !current.can_transition_to(TaskStatus::Completed) {
        return Err(Error::IllegalTransition {
            entity: format!("task {task_id}"),
            from: current.to_string(),
            to: TaskStatus::Completed.to_string(),
        });
    }

    let mut next = roadmap.clone();

    // Next focus as seen before adaptation inserts anything.
    let waiting = next
        .tasks
        .iter()
        .find(|t| t.id != task_id && t.status == TaskStatus::NotStarted)
        .map(|t| t.id);

    let completed = {
        let task = &mut next.tasks[index];
        task.status = TaskStatus::Completed;
        task.mastery_score = Some(mastery_score);
        task.notes = notes;
        task.completed_at = Some(now);
        task.clone()
    };

    let mut inserted = Vec::new();

    if mastery_score <= REINFORCE_AT_OR_BELOW {
        let reinforcement = Task::reinforcement_for(&completed);
        inserted.push(reinforcement.id);
        next.tasks.insert(index + 1, reinforcement);
    }

    if mastery_score >= ADVANCE_AT_OR_ABOVE {
        let last_same_category = next
            .tasks
            .iter()
            .rposition(|t| t.category == completed.category)
            .unwrap_or(index);
        let advanced = Task::advanced_for(&completed);
        inserted.push(advanced.id);
        next.tasks.insert(last_same_category + 1, advanced);
    }

    if next.in_progress().is_none() {
        let promote = waiting.or_else(|| {
            next.tasks
                .iter()
                .find(|t| t.status == TaskStatus::NotStarted)
                .map(|t| t.id)
        });
        if let Some(id) = promote {
            if let Some(task) = next.tasks.iter_mut().find(|t| t.id == id) {
                task.status = TaskStatus::InProgress;
            }
        }
    }

    next.renumber();
    next.recompute_completion();
    next.updated_at = now;

    let event = RoadmapEvent::TaskCompleted {
        user_id: next.user_id.clone(),
        task_id,
        title: completed.title.clone(),
        mastery_score,
        next_task: next.in_progress().map(|t| NextTask {
            id: t.id,
            title: t.title.clone(),
        }),
        completion_percentage: next.completion_percentage,
        timestamp: now,
    };

    Ok(Completion {
        roadmap: next,
        event,
        inserted,
    })
}
