//! Status enums and units of measure
//!
//! Phase and item lifecycles are separate: phases move through a coarse
//! three-state flow, items (and their collateral) share the six-state review
//! flow.

use serde::{Deserialize, Serialize};

/// Phase lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl PhaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseStatus::NotStarted => "not_started",
            PhaseStatus::InProgress => "in_progress",
            PhaseStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for PhaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "not_started" => Ok(PhaseStatus::NotStarted),
            "in_progress" => Ok(PhaseStatus::InProgress),
            "completed" => Ok(PhaseStatus::Completed),
            other => Err(format!("unknown phase status: {}", other)),
        }
    }
}

impl std::fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review lifecycle status, shared by items and their collateral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    #[default]
    NotStarted,
    InProgress,
    InReview,
    ChangesNeeded,
    ChangesInProgress,
    Approved,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::NotStarted => "NOT_STARTED",
            ItemStatus::InProgress => "IN_PROGRESS",
            ItemStatus::InReview => "IN_REVIEW",
            ItemStatus::ChangesNeeded => "CHANGES_NEEDED",
            ItemStatus::ChangesInProgress => "CHANGES_IN_PROGRESS",
            ItemStatus::Approved => "APPROVED",
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, ItemStatus::Approved)
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = String;

    /// Lenient parse: CSV exports arrive with assorted casings and a legacy
    /// `todo` spelling for the initial state.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TODO" | "NOT_STARTED" => Ok(ItemStatus::NotStarted),
            "IN_PROGRESS" => Ok(ItemStatus::InProgress),
            "IN_REVIEW" => Ok(ItemStatus::InReview),
            "CHANGES_NEEDED" => Ok(ItemStatus::ChangesNeeded),
            "CHANGES_IN_PROGRESS" => Ok(ItemStatus::ChangesInProgress),
            "APPROVED" => Ok(ItemStatus::Approved),
            other => Err(format!("unknown item status: {}", other)),
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit of measure for deliverable effort estimates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitOfMeasure {
    #[default]
    Day,
    Hour,
    Week,
}

impl UnitOfMeasure {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitOfMeasure::Day => "day",
            UnitOfMeasure::Hour => "hour",
            UnitOfMeasure::Week => "week",
        }
    }

    /// Parse a unit, falling back to `day` for absent or unrecognized input.
    pub fn parse_or_default(s: Option<&str>) -> Self {
        match s.map(|u| u.trim().to_ascii_lowercase()).as_deref() {
            Some("hour") | Some("hours") => UnitOfMeasure::Hour,
            Some("week") | Some("weeks") => UnitOfMeasure::Week,
            Some("day") | Some("days") => UnitOfMeasure::Day,
            _ => UnitOfMeasure::Day,
        }
    }
}

impl std::fmt::Display for UnitOfMeasure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
