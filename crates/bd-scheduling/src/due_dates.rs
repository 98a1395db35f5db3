//! Cascading phase scheduler
//!
//! Seeds from the work package anchor date and walks phases in position
//! order, deriving each estimated window from the previous phase's end.
//! Actual dates are status-transition facts and are never touched here.

use bd_core::config::NullAnchorPolicy;
use bd_core::{CrmError, CrmResult};
use bd_models::{Phase, PhaseNode, PhaseStatus, WorkPackageTree};
use chrono::NaiveDate;

use crate::calendar::add_business_days;
use crate::duration::DurationNormalizationService;

/// Deterministic single-pass scheduler over a work package's phases
pub struct PhaseDueDateService;

impl PhaseDueDateService {
    /// Recompute every phase's `total_estimated_hours` from its items.
    pub fn recompute_phase_totals(tree: &mut WorkPackageTree) {
        for node in &mut tree.phases {
            let effort = DurationNormalizationService::phase_total_hours(&node.items);
            node.phase.total_estimated_hours = effort.total_hours;
        }
    }

    /// Run the cascade from an explicit anchor.
    ///
    /// Invariant: phase i starts where phase i-1 ends (phase 1 starts at the
    /// anchor); a phase with zero or undefined effort schedules as
    /// zero-duration, start == end. Effort large enough to push a window past
    /// the representable date range is a state error, never a panic.
    pub fn cascade(anchor: NaiveDate, phases: &mut [PhaseNode]) -> CrmResult<()> {
        phases.sort_by_key(|node| node.phase.position);

        let mut cursor = anchor;
        for node in phases.iter_mut() {
            let duration_days = DurationNormalizationService::business_days_for_hours(
                node.phase.total_estimated_hours,
            );
            node.phase.estimated_start_date = Some(cursor);
            let end = add_business_days(cursor, duration_days).ok_or_else(|| {
                CrmError::state(format!(
                    "phase '{}' needs {} business days; the schedule exceeds the supported date range",
                    node.phase.name, duration_days
                ))
            })?;
            node.phase.estimated_end_date = Some(end);
            cursor = end;
        }
        Ok(())
    }

    /// Clear every estimated date; the package is unscheduled.
    pub fn clear_estimates(phases: &mut [PhaseNode]) {
        for node in phases.iter_mut() {
            node.phase.estimated_start_date = None;
            node.phase.estimated_end_date = None;
        }
    }

    /// Recompute the whole schedule for a tree.
    ///
    /// With no anchor the configured policy decides: `Unscheduled` clears all
    /// estimated dates, `Strict` refuses the recompute.
    pub fn reschedule(tree: &mut WorkPackageTree, policy: NullAnchorPolicy) -> CrmResult<()> {
        match tree.work_package.effective_start_date {
            Some(anchor) => Self::cascade(anchor, &mut tree.phases),
            None => match policy {
                NullAnchorPolicy::Unscheduled => {
                    Self::clear_estimates(&mut tree.phases);
                    Ok(())
                }
                NullAnchorPolicy::Strict => Err(CrmError::state(
                    "cannot compute schedule: effective start date is unset",
                )),
            },
        }
    }

    /// Apply a phase status transition, stamping actual dates.
    ///
    /// `actual_start_date` is stamped once, on the first transition into
    /// `in_progress`; `actual_end_date` once, on the first transition into
    /// `completed`. Neither is ever overwritten.
    pub fn transition_status(phase: &mut Phase, next: PhaseStatus, today: NaiveDate) {
        match next {
            PhaseStatus::InProgress => {
                if phase.actual_start_date.is_none() {
                    phase.actual_start_date = Some(today);
                }
            }
            PhaseStatus::Completed => {
                if phase.actual_end_date.is_none() {
                    phase.actual_end_date = Some(today);
                }
            }
            PhaseStatus::NotStarted => {}
        }
        phase.status = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bd_models::{UnitOfMeasure, WorkItem, WorkPackage};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn item(quantity: i64, unit: UnitOfMeasure, hours_each: f64) -> WorkItem {
        WorkItem {
            deliverable_type: "design".into(),
            deliverable_label: "Asset".into(),
            quantity,
            unit_of_measure: unit,
            estimated_hours_each: hours_each,
            ..Default::default()
        }
    }

    fn phase_with_items(name: &str, position: i32, items: Vec<WorkItem>) -> PhaseNode {
        let mut node = PhaseNode::new(Phase::new(name, position));
        node.items = items;
        node
    }

    fn tree_with(anchor: Option<NaiveDate>, phases: Vec<PhaseNode>) -> WorkPackageTree {
        let mut wp = WorkPackage::new("Engagement", 1);
        wp.effective_start_date = anchor;
        let mut tree = WorkPackageTree::new(wp);
        tree.phases = phases;
        tree
    }

    #[test]
    fn test_two_phase_cascade_from_monday_anchor() {
        // Anchor Mon 2024-01-01; Discovery = 8h -> 1 day; Build = 40h -> 5 days
        let mut tree = tree_with(
            Some(d(2024, 1, 1)),
            vec![
                phase_with_items("Discovery", 1, vec![item(1, UnitOfMeasure::Day, 8.0)]),
                phase_with_items("Build", 2, vec![item(1, UnitOfMeasure::Week, 0.0)]),
            ],
        );

        PhaseDueDateService::recompute_phase_totals(&mut tree);
        PhaseDueDateService::reschedule(&mut tree, NullAnchorPolicy::Unscheduled).unwrap();

        let discovery = &tree.phases[0].phase;
        assert_eq!(discovery.total_estimated_hours, 8.0);
        assert_eq!(discovery.estimated_start_date, Some(d(2024, 1, 1)));
        assert_eq!(discovery.estimated_end_date, Some(d(2024, 1, 2)));

        // Weekend of Jan 6-7 skipped
        let build = &tree.phases[1].phase;
        assert_eq!(build.total_estimated_hours, 40.0);
        assert_eq!(build.estimated_start_date, Some(d(2024, 1, 2)));
        assert_eq!(build.estimated_end_date, Some(d(2024, 1, 9)));
    }

    #[test]
    fn test_cascade_walks_positions_not_insertion_order() {
        let mut phases = vec![
            phase_with_items("Second", 2, vec![]),
            phase_with_items("First", 1, vec![]),
        ];
        phases[0].phase.total_estimated_hours = 8.0;
        phases[1].phase.total_estimated_hours = 8.0;

        PhaseDueDateService::cascade(d(2024, 1, 1), &mut phases).unwrap();

        assert_eq!(phases[0].phase.name, "First");
        assert_eq!(phases[1].phase.estimated_start_date, Some(d(2024, 1, 2)));
    }

    #[test]
    fn test_zero_effort_phase_is_zero_duration() {
        let mut phases = vec![
            phase_with_items("Empty", 1, vec![]),
            phase_with_items("Real", 2, vec![]),
        ];
        phases[1].phase.total_estimated_hours = 16.0;

        PhaseDueDateService::cascade(d(2024, 1, 1), &mut phases).unwrap();

        assert_eq!(phases[0].phase.estimated_start_date, Some(d(2024, 1, 1)));
        assert_eq!(phases[0].phase.estimated_end_date, Some(d(2024, 1, 1)));
        assert_eq!(phases[1].phase.estimated_start_date, Some(d(2024, 1, 1)));
        assert_eq!(phases[1].phase.estimated_end_date, Some(d(2024, 1, 3)));
    }

    #[test]
    fn test_null_anchor_unscheduled_clears_estimates() {
        let mut phases = vec![phase_with_items("Discovery", 1, vec![])];
        phases[0].phase.estimated_start_date = Some(d(2024, 1, 1));
        phases[0].phase.estimated_end_date = Some(d(2024, 1, 2));
        let mut tree = tree_with(None, phases);

        PhaseDueDateService::reschedule(&mut tree, NullAnchorPolicy::Unscheduled).unwrap();

        assert_eq!(tree.phases[0].phase.estimated_start_date, None);
        assert_eq!(tree.phases[0].phase.estimated_end_date, None);
    }

    #[test]
    fn test_null_anchor_strict_is_state_error() {
        let mut tree = tree_with(None, vec![phase_with_items("Discovery", 1, vec![])]);
        let err = PhaseDueDateService::reschedule(&mut tree, NullAnchorPolicy::Strict)
            .unwrap_err();
        assert_eq!(err.error_code(), "invalid_state");
    }

    #[test]
    fn test_anchor_change_shifts_by_calendar_delta() {
        let build = || {
            let mut phases = vec![
                phase_with_items("Discovery", 1, vec![]),
                phase_with_items("Build", 2, vec![]),
            ];
            phases[0].phase.total_estimated_hours = 8.0;
            phases[1].phase.total_estimated_hours = 40.0;
            phases
        };

        let mut before = build();
        PhaseDueDateService::cascade(d(2024, 1, 1), &mut before).unwrap();
        let mut after = build();
        // 2024-01-15 is also a Monday: same weekday alignment, pure shift
        PhaseDueDateService::cascade(d(2024, 1, 15), &mut after).unwrap();

        let delta = chrono::Duration::days(14);
        for (b, a) in before.iter().zip(after.iter()) {
            assert_eq!(
                a.phase.estimated_start_date.unwrap(),
                b.phase.estimated_start_date.unwrap() + delta
            );
            assert_eq!(
                a.phase.estimated_end_date.unwrap(),
                b.phase.estimated_end_date.unwrap() + delta
            );
        }
    }

    #[test]
    fn test_absurd_effort_is_state_error_not_panic() {
        // 100M week-units normalize to 500M business days, far past the
        // calendar's representable range
        let mut tree = tree_with(
            Some(d(2024, 1, 1)),
            vec![phase_with_items(
                "Build",
                1,
                vec![item(100_000_000, UnitOfMeasure::Week, 0.0)],
            )],
        );

        PhaseDueDateService::recompute_phase_totals(&mut tree);
        let err = PhaseDueDateService::reschedule(&mut tree, NullAnchorPolicy::Unscheduled)
            .unwrap_err();
        assert_eq!(err.error_code(), "invalid_state");
        assert!(err.to_string().contains("Build"));
    }

    #[test]
    fn test_actual_dates_stamped_once() {
        let mut phase = Phase::new("Build", 1);

        PhaseDueDateService::transition_status(&mut phase, PhaseStatus::InProgress, d(2024, 2, 1));
        assert_eq!(phase.actual_start_date, Some(d(2024, 2, 1)));

        // Re-entering in_progress later must not move the fact
        PhaseDueDateService::transition_status(&mut phase, PhaseStatus::InProgress, d(2024, 3, 1));
        assert_eq!(phase.actual_start_date, Some(d(2024, 2, 1)));

        PhaseDueDateService::transition_status(&mut phase, PhaseStatus::Completed, d(2024, 3, 5));
        assert_eq!(phase.actual_end_date, Some(d(2024, 3, 5)));
        PhaseDueDateService::transition_status(&mut phase, PhaseStatus::Completed, d(2024, 4, 1));
        assert_eq!(phase.actual_end_date, Some(d(2024, 3, 5)));
    }

    #[test]
    fn test_straight_to_completed_stamps_only_end() {
        // Completing a phase that never entered in_progress records the end
        // date; the start date stays an unknown fact
        let mut phase = Phase::new("Build", 1);

        PhaseDueDateService::transition_status(&mut phase, PhaseStatus::Completed, d(2024, 3, 5));

        assert_eq!(phase.status, PhaseStatus::Completed);
        assert_eq!(phase.actual_end_date, Some(d(2024, 3, 5)));
        assert_eq!(phase.actual_start_date, None);
    }

    #[test]
    fn test_cascade_preserves_actual_dates() {
        let mut phases = vec![phase_with_items("Build", 1, vec![])];
        phases[0].phase.total_estimated_hours = 16.0;
        phases[0].phase.actual_start_date = Some(d(2023, 12, 1));

        PhaseDueDateService::cascade(d(2024, 1, 1), &mut phases).unwrap();

        assert_eq!(phases[0].phase.actual_start_date, Some(d(2023, 12, 1)));
    }
}
