//! Milestone lifecycle and aggregate progress.
//!
//! Every operation validates before it mutates, so a failed call leaves the
//! timeline untouched. Overall progress is recomputed after every mutation
//! that can change it.

use std::collections::HashSet;

use upnext_core::{
    Dependency, Error, Milestone, MilestoneId, MilestonePatch, MilestoneSpec, MilestoneStatus,
    Result, Time, Timeline,
};

/// Add a `not_started` milestone built from `spec`.
pub fn add_milestone(timeline: &mut Timeline, spec: MilestoneSpec, now: Time) -> Result<Milestone> {
    let milestone_type = spec.validate()?;
    check_dependencies(timeline, None, &spec.dependencies)?;

    let milestone = Milestone::from_spec(spec, milestone_type);
    timeline.milestones.push(milestone.clone());
    recalc_overall_progress(timeline);
    timeline.updated_at = now;
    Ok(milestone)
}

/// Apply the fields present in `patch`.
///
/// Moving into `in_progress` requires every prerequisite to be completed.
/// Setting `completed` stamps `completed_date` and forces 100%.
pub fn update_milestone(
    timeline: &mut Timeline,
    id: MilestoneId,
    patch: &MilestonePatch,
    now: Time,
) -> Result<Milestone> {
    patch.validate()?;

    let current = timeline
        .milestone(id)
        .ok_or_else(|| Error::not_found("milestone", id))?;
    if let Some(deps) = &patch.dependencies {
        check_dependencies(timeline, Some(id), deps)?;
    }

    let mut updated = current.clone();
    patch.apply_fields(&mut updated);

    if let Some(status) = patch.status {
        if status == MilestoneStatus::InProgress && current.status != MilestoneStatus::InProgress {
            let unmet = unmet_prerequisites(timeline, &updated);
            if !unmet.is_empty() {
                return Err(Error::DependencyUnmet {
                    milestone: id.to_string(),
                    unmet: unmet.iter().map(ToString::to_string).collect(),
                });
            }
        }

        updated.status = status;
        if status == MilestoneStatus::Completed {
            updated.completed_date = Some(now);
            updated.completion_percentage = 100;
        }
    }

    if let Some(slot) = timeline.milestone_mut(id) {
        *slot = updated.clone();
    }
    if patch.touches_status() {
        recalc_overall_progress(timeline);
    }
    timeline.updated_at = now;
    Ok(updated)
}

/// Remove a milestone and every dependency entry that points at it.
pub fn delete_milestone(timeline: &mut Timeline, id: MilestoneId, now: Time) -> Result<Milestone> {
    let index = timeline
        .milestones
        .iter()
        .position(|m| m.id == id)
        .ok_or_else(|| Error::not_found("milestone", id))?;

    let removed = timeline.milestones.remove(index);
    for sibling in &mut timeline.milestones {
        sibling.dependencies.retain(|d| d.milestone_id != id);
    }

    recalc_overall_progress(timeline);
    timeline.updated_at = now;
    Ok(removed)
}

/// Refresh and return `round(completed / total * 100)`; 0 when empty.
pub fn recalc_overall_progress(timeline: &mut Timeline) -> u8 {
    timeline.overall_progress = timeline.compute_progress();
    timeline.overall_progress
}

/// Prerequisites of `milestone` that are not completed.
pub fn unmet_prerequisites(timeline: &Timeline, milestone: &Milestone) -> Vec<MilestoneId> {
    milestone
        .prerequisites()
        .filter(|dep| {
            timeline
                .milestone(*dep)
                .map_or(true, |m| m.status != MilestoneStatus::Completed)
        })
        .collect()
}

/// Dependencies must reference existing siblings, once each, never the milestone itself.
fn check_dependencies(
    timeline: &Timeline,
    owner: Option<MilestoneId>,
    deps: &[Dependency],
) -> Result<()> {
    let mut seen = HashSet::new();
    for dep in deps {
        if Some(dep.milestone_id) == owner {
            return Err(Error::Validation("a milestone cannot depend on itself".into()));
        }
        if timeline.milestone(dep.milestone_id).is_none() {
            return Err(Error::Validation(format!(
                "dependency references unknown milestone {}",
                dep.milestone_id
            )));
        }
        if !seen.insert(dep.milestone_id) {
            return Err(Error::Validation(format!(
                "duplicate dependency on milestone {}",
                dep.milestone_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use upnext_core::{CareerGoal, DependencyKind, MilestoneType, UserId};

    fn timeline() -> Timeline {
        Timeline::new(UserId::from("u1"), CareerGoal::default())
    }

    fn spec(title: &str) -> MilestoneSpec {
        MilestoneSpec {
            title: title.into(),
            milestone_type: Some(MilestoneType::Course),
            ..Default::default()
        }
    }

    fn status(s: MilestoneStatus) -> MilestonePatch {
        MilestonePatch {
            status: Some(s),
            ..Default::default()
        }
    }

    fn prerequisite(id: MilestoneId) -> Dependency {
        Dependency {
            milestone_id: id,
            relation: DependencyKind::Prerequisite,
        }
    }

    #[test]
    fn test_empty_timeline_progress_is_zero() {
        let mut t = timeline();
        assert_eq!(recalc_overall_progress(&mut t), 0);
    }

    #[test]
    fn test_three_of_four_is_75() {
        let mut t = timeline();
        let now = chrono::Utc::now();
        let ids: Vec<_> = (0..4)
            .map(|i| add_milestone(&mut t, spec(&format!("M{i}")), now).unwrap().id)
            .collect();
        for id in &ids[..3] {
            update_milestone(&mut t, *id, &status(MilestoneStatus::Completed), now).unwrap();
        }
        assert_eq!(recalc_overall_progress(&mut t), 75);
        assert_eq!(t.overall_progress, 75);
    }

    #[test]
    fn test_add_validates_required_fields() {
        let mut t = timeline();
        let bad = MilestoneSpec {
            title: "No type".into(),
            ..Default::default()
        };
        assert!(matches!(
            add_milestone(&mut t, bad, chrono::Utc::now()),
            Err(Error::Validation(_))
        ));
        assert!(t.milestones.is_empty());

        let m = add_milestone(&mut t, spec("Rust book"), chrono::Utc::now()).unwrap();
        assert_eq!(m.status, MilestoneStatus::NotStarted);
    }

    #[test]
    fn test_add_rejects_unknown_dependency() {
        let mut t = timeline();
        let mut s = spec("B");
        s.dependencies = vec![prerequisite(MilestoneId::new())];
        assert!(matches!(
            add_milestone(&mut t, s, chrono::Utc::now()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_completing_stamps_date_and_percentage() {
        let mut t = timeline();
        let now = chrono::Utc::now();
        let m = add_milestone(&mut t, spec("A"), now).unwrap();
        let patch = MilestonePatch {
            completion_percentage: Some(40),
            ..Default::default()
        };
        update_milestone(&mut t, m.id, &patch, now).unwrap();

        let done = update_milestone(&mut t, m.id, &status(MilestoneStatus::Completed), now).unwrap();
        assert_eq!(done.completion_percentage, 100);
        assert_eq!(done.completed_date, Some(now));
        assert_eq!(t.overall_progress, 100);
    }

    #[test]
    fn test_prerequisite_gates_in_progress() {
        let mut t = timeline();
        let now = chrono::Utc::now();
        let a = add_milestone(&mut t, spec("A"), now).unwrap();
        let mut s = spec("B");
        s.dependencies = vec![prerequisite(a.id)];
        let b = add_milestone(&mut t, s, now).unwrap();

        let err = update_milestone(&mut t, b.id, &status(MilestoneStatus::InProgress), now)
            .unwrap_err();
        assert!(matches!(err, Error::DependencyUnmet { ref unmet, .. } if unmet == &vec![a.id.to_string()]));
        assert_eq!(t.milestone(b.id).unwrap().status, MilestoneStatus::NotStarted);

        update_milestone(&mut t, a.id, &status(MilestoneStatus::Completed), now).unwrap();
        let started = update_milestone(&mut t, b.id, &status(MilestoneStatus::InProgress), now).unwrap();
        assert_eq!(started.status, MilestoneStatus::InProgress);
    }

    #[test]
    fn test_related_dependency_does_not_gate() {
        let mut t = timeline();
        let now = chrono::Utc::now();
        let a = add_milestone(&mut t, spec("A"), now).unwrap();
        let mut s = spec("B");
        s.dependencies = vec![Dependency {
            milestone_id: a.id,
            relation: DependencyKind::Related,
        }];
        let b = add_milestone(&mut t, s, now).unwrap();
        assert!(update_milestone(&mut t, b.id, &status(MilestoneStatus::InProgress), now).is_ok());
    }

    #[test]
    fn test_update_missing_milestone() {
        let mut t = timeline();
        let err = update_milestone(&mut t, MilestoneId::new(), &status(MilestoneStatus::Blocked), chrono::Utc::now())
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "milestone", .. }));
    }

    #[test]
    fn test_self_dependency_rejected() {
        let mut t = timeline();
        let now = chrono::Utc::now();
        let a = add_milestone(&mut t, spec("A"), now).unwrap();
        let patch = MilestonePatch {
            dependencies: Some(vec![prerequisite(a.id)]),
            ..Default::default()
        };
        assert!(matches!(
            update_milestone(&mut t, a.id, &patch, now),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_delete_strips_dangling_dependencies() {
        let mut t = timeline();
        let now = chrono::Utc::now();
        let a = add_milestone(&mut t, spec("A"), now).unwrap();
        let mut s = spec("B");
        s.dependencies = vec![prerequisite(a.id)];
        let b = add_milestone(&mut t, s, now).unwrap();
        update_milestone(&mut t, a.id, &status(MilestoneStatus::Completed), now).unwrap();
        assert_eq!(t.overall_progress, 50);

        delete_milestone(&mut t, a.id, now).unwrap();
        assert!(t.milestone(b.id).unwrap().dependencies.is_empty());
        assert_eq!(t.overall_progress, 0);
        assert!(matches!(
            delete_milestone(&mut t, a.id, now),
            Err(Error::NotFound { .. })
        ));
    }
}
