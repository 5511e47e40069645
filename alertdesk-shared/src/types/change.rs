//! Change records (deployments, config pushes, maintenance) and their relation
//! to an alert's active window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Change lifecycle status as recorded by the change feed.
///
/// Only `Scheduled`, `InProgress` and `Completed` are eligible for RCA and related
/// change lookups; anything else is kept verbatim so records still round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChangeStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Failed,
    Other(String),
}

impl ChangeStatus {
    /// Statuses considered when overlaying changes on an alert.
    pub const ELIGIBLE: [ChangeStatus; 3] = [
        ChangeStatus::Scheduled,
        ChangeStatus::InProgress,
        ChangeStatus::Completed,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for ChangeStatus {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "scheduled" => Self::Scheduled,
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            "failed" => Self::Failed,
            _ => Self::Other(value),
        }
    }
}

impl From<ChangeStatus> for String {
    fn from(value: ChangeStatus) -> Self {
        value.as_str().to_string()
    }
}

/// Whether a change started before the alert was first seen or while it was active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapType {
    BeforeAlert,
    DuringAlert,
}

impl OverlapType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BeforeAlert => "before_alert",
            Self::DuringAlert => "during_alert",
        }
    }
}

/// Whether a change hits the alert's own entity or one of its topology neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeScope {
    Direct,
    Neighbor,
}

impl ChangeScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Neighbor => "neighbor",
        }
    }
}

/// A change record affecting one or more topology entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub id: Uuid,
    pub change_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub change_type: String,
    pub status: ChangeStatus,
    #[serde(default)]
    pub implemented_by: String,
    #[serde(default)]
    pub affected_entities: Vec<String>,
    pub start_time: DateTime<Utc>,
    /// Open-ended when absent.
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

impl Change {
    /// Classify this change against an alert first seen at `alert_start`.
    pub fn overlap_with(&self, alert_start: DateTime<Utc>) -> OverlapType {
        if self.start_time < alert_start {
            OverlapType::BeforeAlert
        } else {
            OverlapType::DuringAlert
        }
    }

    /// True when the change's window intersects `[window_start, window_end]`:
    /// it started no later than the window end and is either open-ended or
    /// ended no earlier than the window start.
    pub fn overlaps_window(&self, window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> bool {
        self.start_time <= window_end && self.end_time.map_or(true, |end| end >= window_start)
    }

    pub fn affects(&self, entity: &str) -> bool {
        self.affected_entities.iter().any(|e| e == entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn change(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Change {
        Change {
            id: Uuid::new_v4(),
            change_id: "CHG-1".to_string(),
            name: "deploy".to_string(),
            change_type: "deployment".to_string(),
            status: ChangeStatus::Completed,
            implemented_by: "ops".to_string(),
            affected_entities: vec!["db-1".to_string()],
            start_time: start,
            end_time: end,
        }
    }

    #[test]
    fn overlap_classification() {
        let alert_start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let before = change(alert_start - Duration::minutes(5), None);
        let during = change(alert_start, None);
        assert_eq!(before.overlap_with(alert_start), OverlapType::BeforeAlert);
        assert_eq!(during.overlap_with(alert_start), OverlapType::DuringAlert);
    }

    #[test]
    fn window_overlap_respects_open_ended_changes() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let t1 = t0 + Duration::hours(1);
        assert!(change(t0 - Duration::hours(3), None).overlaps_window(t0, t1));
        assert!(!change(t0 - Duration::hours(3), Some(t0 - Duration::hours(2)))
            .overlaps_window(t0, t1));
        assert!(!change(t1 + Duration::minutes(1), None).overlaps_window(t0, t1));
    }

    #[test]
    fn unknown_status_round_trips() {
        let status: ChangeStatus = serde_json::from_str("\"rolled_back\"").unwrap();
        assert_eq!(status, ChangeStatus::Other("rolled_back".to_string()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"rolled_back\"");
        let status: ChangeStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(status, ChangeStatus::InProgress);
    }
}
