//! Duration normalization
//!
//! Converts heterogeneous effort inputs (quantity x unit-of-measure x hours)
//! into canonical hours and business-day durations.

use bd_models::{UnitOfMeasure, WorkItem};

const HOURS_PER_DAY: f64 = 8.0;
const HOURS_PER_WEEK: f64 = 40.0;

/// Data-quality finding raised while normalizing; never fatal.
#[derive(Debug, Clone, PartialEq)]
pub struct DataQualityWarning {
    pub deliverable_label: String,
    pub message: String,
}

/// Normalized effort for one phase
#[derive(Debug, Clone, Default)]
pub struct PhaseEffort {
    pub total_hours: f64,
    pub warnings: Vec<DataQualityWarning>,
}

/// Converts effort inputs into canonical hours and business-day durations
pub struct DurationNormalizationService;

impl DurationNormalizationService {
    /// Normalize a single item's effort into hours.
    ///
    /// Policy: `day` = 8h x quantity (the fallback for absent or
    /// unrecognized units), `hour` = estimated_hours_each x quantity,
    /// `week` = 40h x quantity. A non-positive quantity contributes zero and
    /// yields a warning instead of rejecting the row.
    pub fn normalize_item_hours(item: &WorkItem) -> (f64, Option<DataQualityWarning>) {
        if item.quantity <= 0 {
            return (
                0.0,
                Some(DataQualityWarning {
                    deliverable_label: item.deliverable_label.clone(),
                    message: format!("non-positive quantity {} contributes no effort", item.quantity),
                }),
            );
        }

        let quantity = item.quantity as f64;
        let hours = match item.unit_of_measure {
            UnitOfMeasure::Day => HOURS_PER_DAY * quantity,
            UnitOfMeasure::Hour => item.estimated_hours_each * quantity,
            UnitOfMeasure::Week => HOURS_PER_WEEK * quantity,
        };
        (hours, None)
    }

    /// Sum normalized hours across a phase's items.
    pub fn phase_total_hours(items: &[WorkItem]) -> PhaseEffort {
        let mut effort = PhaseEffort::default();
        for item in items {
            let (hours, warning) = Self::normalize_item_hours(item);
            effort.total_hours += hours;
            if let Some(warning) = warning {
                tracing::warn!(
                    deliverable = %warning.deliverable_label,
                    "{}",
                    warning.message
                );
                effort.warnings.push(warning);
            }
        }
        effort
    }

    /// Business-day duration for a total: ceil(hours / 8).
    pub fn business_days_for_hours(total_hours: f64) -> i64 {
        if total_hours <= 0.0 {
            return 0;
        }
        (total_hours / HOURS_PER_DAY).ceil() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bd_models::ItemStatus;

    fn item(quantity: i64, unit: UnitOfMeasure, hours_each: f64) -> WorkItem {
        WorkItem {
            deliverable_type: "design".into(),
            deliverable_label: "Asset".into(),
            quantity,
            unit_of_measure: unit,
            estimated_hours_each: hours_each,
            status: ItemStatus::NotStarted,
            ..Default::default()
        }
    }

    #[test]
    fn test_week_unit_quantity_two_is_eighty_hours() {
        let (hours, warning) = DurationNormalizationService::normalize_item_hours(&item(
            2,
            UnitOfMeasure::Week,
            0.0,
        ));
        assert_eq!(hours, 80.0);
        assert!(warning.is_none());
    }

    #[test]
    fn test_hour_unit_multiplies_each_by_quantity() {
        let (hours, _) = DurationNormalizationService::normalize_item_hours(&item(
            5,
            UnitOfMeasure::Hour,
            3.0,
        ));
        assert_eq!(hours, 15.0);
    }

    #[test]
    fn test_day_unit_ignores_hours_each() {
        let (hours, _) = DurationNormalizationService::normalize_item_hours(&item(
            3,
            UnitOfMeasure::Day,
            99.0,
        ));
        assert_eq!(hours, 24.0);
    }

    #[test]
    fn test_non_positive_quantity_contributes_zero_with_warning() {
        let (hours, warning) = DurationNormalizationService::normalize_item_hours(&item(
            0,
            UnitOfMeasure::Day,
            8.0,
        ));
        assert_eq!(hours, 0.0);
        assert!(warning.is_some());

        let effort = DurationNormalizationService::phase_total_hours(&[
            item(-2, UnitOfMeasure::Week, 0.0),
            item(1, UnitOfMeasure::Day, 8.0),
        ]);
        assert_eq!(effort.total_hours, 8.0);
        assert_eq!(effort.warnings.len(), 1);
    }

    #[test]
    fn test_business_days_round_up() {
        assert_eq!(DurationNormalizationService::business_days_for_hours(8.0), 1);
        assert_eq!(DurationNormalizationService::business_days_for_hours(9.0), 2);
        assert_eq!(DurationNormalizationService::business_days_for_hours(40.0), 5);
        assert_eq!(DurationNormalizationService::business_days_for_hours(0.0), 0);
    }
}
