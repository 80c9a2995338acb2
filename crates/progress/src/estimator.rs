//! Completion time estimation.

use chrono::Duration;
use upnext_core::{MilestoneStatus, Roadmap, Time, Timeline};

/// Hours assumed for a milestone without an estimate.
pub const DEFAULT_MILESTONE_HOURS: f32 = 10.0;

/// Completion time estimator.
///
/// Projects remaining effort onto the learner's weekly study hours.
#[derive(Debug, Clone, Copy)]
pub struct CompletionEstimator {
    study_hours_per_week: u32,
}

impl CompletionEstimator {
    /// Estimator for a learner studying `study_hours_per_week` hours.
    pub fn new(study_hours_per_week: u32) -> Self {
        Self {
            study_hours_per_week,
        }
    }

    /// Remaining effort in hours for the unfinished milestones.
    pub fn remaining_hours(&self, timeline: &Timeline) -> f32 {
        timeline
            .milestones
            .iter()
            .filter(|m| m.status != MilestoneStatus::Completed)
            .map(|m| {
                let planned = m.estimated_hours.unwrap_or(DEFAULT_MILESTONE_HOURS);
                (planned - m.actual_hours.unwrap_or(0.0)).max(0.0)
            })
            .sum()
    }

    /// Estimate timeline completion.
    ///
    /// `None` when the learner has no study time scheduled.
    pub fn estimate_timeline(&self, timeline: &Timeline, now: Time) -> Option<Time> {
        self.project(self.remaining_hours(timeline) as f64 / self.weekly()?, now)
    }

    /// Estimate roadmap completion from the task durations ("2 weeks").
    ///
    /// Tasks with an open-ended duration are ignored.
    pub fn estimate_roadmap(&self, roadmap: &Roadmap, now: Time) -> Option<Time> {
        let weeks: f32 = roadmap
            .tasks
            .iter()
            .filter(|t| t.is_pending())
            .filter_map(|t| duration_weeks(&t.estimated_duration))
            .sum();
        self.project(weeks as f64, now)
    }

    fn weekly(&self) -> Option<f64> {
        (self.study_hours_per_week > 0).then_some(self.study_hours_per_week as f64)
    }

    /// `None` when the projection falls outside the representable date range.
    fn project(&self, weeks: f64, now: Time) -> Option<Time> {
        let minutes = (weeks * 7.0 * 24.0 * 60.0).round() as i64;
        now.checked_add_signed(Duration::try_minutes(minutes)?)
    }
}

impl Default for CompletionEstimator {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Parse "1 week", "3 weeks", "5 days" into weeks.
pub fn duration_weeks(duration: &str) -> Option<f32> {
    let mut parts = duration.split_whitespace();
    let amount: f32 = parts.next()?.parse().ok()?;
    let unit = parts.next()?.to_lowercase();
    if unit.starts_with("week") {
        Some(amount)
    } else if unit.starts_with("day") {
        Some(amount / 7.0)
    } else if unit.starts_with("month") {
        Some(amount * 52.0 / 12.0)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upnext_core::{CareerGoal, Milestone, MilestoneSpec, MilestoneType, Task, UserId};

    fn milestone(hours: f32) -> Milestone {
        let spec = MilestoneSpec {
            title: "M".into(),
            milestone_type: Some(MilestoneType::Course),
            estimated_hours: Some(hours),
            ..Default::default()
        };
        Milestone::from_spec(spec, MilestoneType::Course)
    }

    #[test]
    fn test_duration_parsing() {
        assert_eq!(duration_weeks("2 weeks"), Some(2.0));
        assert_eq!(duration_weeks("1 week"), Some(1.0));
        assert_eq!(duration_weeks("14 days"), Some(2.0));
        assert_eq!(duration_weeks("Ongoing"), None);
    }

    #[test]
    fn test_timeline_estimate() {
        let mut t = Timeline::new(UserId::from("u1"), CareerGoal::default());
        t.milestones.push(milestone(15.0));
        t.milestones.push(milestone(5.0));
        let mut done = milestone(100.0);
        done.status = MilestoneStatus::Completed;
        t.milestones.push(done);

        let now = chrono::Utc::now();
        let estimator = CompletionEstimator::new(10);
        assert_eq!(estimator.remaining_hours(&t), 20.0);
        assert_eq!(estimator.estimate_timeline(&t, now), Some(now + Duration::days(14)));

        assert_eq!(CompletionEstimator::new(0).estimate_timeline(&t, now), None);
    }

    #[test]
    fn test_out_of_range_estimate_is_none() {
        let mut t = Timeline::new(UserId::from("u1"), CareerGoal::default());
        t.milestones.push(milestone(1.0e9));

        let now = chrono::Utc::now();
        assert_eq!(CompletionEstimator::new(10).estimate_timeline(&t, now), None);
        assert_eq!(CompletionEstimator::new(1).estimate_timeline(&t, now), None);
    }

    #[test]
    fn test_roadmap_estimate_skips_completed() {
        let mut tasks = vec![
            Task::from_catalog("A", "", "X", "2 weeks", vec![]),
            Task::from_catalog("B", "", "X", "1 week", vec![]),
            Task::from_catalog("C", "", "X", "Ongoing", vec![]),
        ];
        tasks[0].status = upnext_core::TaskStatus::Completed;
        let roadmap = Roadmap::new(UserId::from("u1"), "r", "beginner", tasks);

        let now = chrono::Utc::now();
        assert_eq!(
            CompletionEstimator::default().estimate_roadmap(&roadmap, now),
            Some(now + Duration::weeks(1))
        );
    }
}
