//! Alert records and their grouping state.
//!
//! An alert is either standalone, a child absorbed into a group incident
//! (`grouped = true`, `group_incident_id` set), or itself a group incident
//! (`parent = true`, `group_alerts` populated). Group incidents are synthesized by
//! the grouping engine and closed, never deleted, once every child is closed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Opaque alert identifier (the document key in the alert store).
pub type AlertId = Uuid;

/// Author recorded on worklog entries written by the services themselves.
pub const SYSTEM_AUTHOR: &str = "System";

/// Alert lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertStatus {
    Open,
    Closed,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert severity, totally ordered with `Critical` highest.
///
/// Absent or unrecognised severities are modelled as `None`; since
/// `Option<Severity>` orders `None` below every `Some`, the highest severity of a
/// set of alerts is simply the maximum of their optional severities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warn,
    Error,
    Critical,
}

impl Severity {
    /// Numeric rank: `INFO(1) < WARN(2) < ERROR(3) < CRITICAL(4)`.
    pub fn rank(self) -> u8 {
        match self {
            Self::Info => 1,
            Self::Warn => 2,
            Self::Error => 3,
            Self::Critical => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    /// Case-insensitive parse. Unknown text yields `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "INFO" => Some(Self::Info),
            "WARN" | "WARNING" => Some(Self::Warn),
            "ERROR" => Some(Self::Error),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }

    /// The higher of two optional severities, unknown sorting lowest.
    pub fn highest(a: Option<Self>, b: Option<Self>) -> Option<Self> {
        a.max(b)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts any string (or null) for a severity field, mapping unknown values to `None`.
fn lenient_severity<'de, D>(deserializer: D) -> Result<Option<Severity>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Severity::parse))
}

/// Append-only, timestamped comment on an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkLog {
    pub id: Uuid,
    pub author: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl WorkLog {
    pub fn new(author: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            author: author.into(),
            comment: comment.into(),
            created_at: Utc::now(),
        }
    }

    /// A worklog entry authored by the system rather than an operator.
    pub fn system(comment: impl Into<String>) -> Self {
        Self::new(SYSTEM_AUTHOR, comment)
    }
}

/// Why a group incident was formed: rule name, matched scope tags and score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingReason {
    /// Correlation mode that produced the grouping, e.g. `SIMILARITY`.
    pub kind: String,
    pub description: String,
    /// Human-readable lines such as `Same service: pay-api`.
    pub reasons: Vec<String>,
    pub score: f64,
}

/// An observed fault condition against a topology entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    /// Display identifier shown to operators (`GRP-…` for group incidents).
    #[serde(default)]
    pub alert_id: String,
    /// Topology node name this alert is attached to.
    pub entity: String,
    /// Host-equivalent attachment, matched alongside `entity` by topology lookups.
    #[serde(default)]
    pub host: Option<String>,
    pub status: AlertStatus,
    #[serde(default, deserialize_with = "lenient_severity")]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub acked: bool,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    #[serde(default)]
    pub clear_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub service_name: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub priority: Option<String>,
    /// Open key-value bag; rule scope tags that are not named fields live here.
    #[serde(default)]
    pub additional_details: Map<String, Value>,
    #[serde(default)]
    pub grouped: bool,
    #[serde(default)]
    pub parent: bool,
    /// Child alert ids, populated only on group incidents.
    #[serde(default)]
    pub group_alerts: Vec<AlertId>,
    /// Display id of the owning group incident, populated only on children.
    #[serde(default)]
    pub group_incident_id: Option<String>,
    #[serde(default)]
    pub grouping_reason: Option<GroupingReason>,
    #[serde(default)]
    pub worklogs: Vec<WorkLog>,
}

impl Alert {
    /// Create a new open, standalone alert first seen at `first_seen`.
    pub fn new(
        entity: impl Into<String>,
        summary: impl Into<String>,
        severity: Option<Severity>,
        first_seen: DateTime<Utc>,
    ) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            alert_id: format!("ALR-{}", &id.simple().to_string()[..8]),
            entity: entity.into(),
            host: None,
            status: AlertStatus::Open,
            severity,
            acked: false,
            first_seen,
            last_seen: first_seen,
            clear_time: None,
            summary: summary.into(),
            notes: String::new(),
            service_name: String::new(),
            source: String::new(),
            priority: None,
            additional_details: Map::new(),
            grouped: false,
            parent: false,
            group_alerts: Vec::new(),
            group_incident_id: None,
            grouping_reason: None,
            worklogs: Vec::new(),
        }
    }

    pub fn with_service(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.additional_details.insert(key.into(), value.into());
        self
    }

    /// Display id, falling back to the store id when none was assigned.
    pub fn display_id(&self) -> String {
        if self.alert_id.is_empty() {
            self.id.to_string()
        } else {
            self.alert_id.clone()
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == AlertStatus::Open
    }

    /// True for a child absorbed into a group incident.
    pub fn is_child(&self) -> bool {
        self.grouped && !self.parent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering_puts_unknown_lowest() {
        assert!(Severity::Critical > Severity::Error);
        assert!(Severity::Error > Severity::Warn);
        assert!(Severity::Warn > Severity::Info);
        assert!(Some(Severity::Info) > None);
        assert_eq!(
            Severity::highest(None, Some(Severity::Warn)),
            Some(Severity::Warn)
        );
        assert_eq!(Severity::Critical.rank(), 4);
    }

    #[test]
    fn unknown_severity_deserializes_as_none() {
        let json = serde_json::json!({
            "id": Uuid::new_v4(),
            "entity": "host-1",
            "status": "OPEN",
            "severity": "sev-banana",
            "first_seen": "2024-01-01T00:00:00Z",
            "last_seen": "2024-01-01T00:00:00Z"
        });
        let alert: Alert = serde_json::from_value(json).unwrap();
        assert_eq!(alert.severity, None);
        assert!(!alert.grouped);
        assert!(alert.group_alerts.is_empty());
    }

    #[test]
    fn severity_parse_is_case_insensitive() {
        assert_eq!(Severity::parse("critical"), Some(Severity::Critical));
        assert_eq!(Severity::parse(" Warning "), Some(Severity::Warn));
        assert_eq!(Severity::parse(""), None);
    }
}
