//! Logical alert fields.
//!
//! Rules name fields loosely (`service`, `alertsummary`, `datacenter`, …). This
//! module is the single mapping from those names to alert accessors: a name is
//! either one of the known aliases of a named field, or a key into
//! `additional_details`. Scope enforcement and similarity scoring both resolve
//! through here.

use serde_json::Value;
use std::fmt;

use crate::types::alert::Alert;

/// Named alert fields addressable by rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertField {
    Summary,
    ServiceName,
    Entity,
    Source,
    Severity,
    Notes,
}

impl AlertField {
    pub const ALL: [AlertField; 6] = [
        AlertField::Summary,
        AlertField::ServiceName,
        AlertField::Entity,
        AlertField::Source,
        AlertField::Severity,
        AlertField::Notes,
    ];

    /// Resolve a rule field name, case-insensitively. `None` means "not a named field".
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "summary" | "alertsummary" => Some(Self::Summary),
            "servicename" | "service" => Some(Self::ServiceName),
            "entity" => Some(Self::Entity),
            "source" | "alertsource" => Some(Self::Source),
            "severity" => Some(Self::Severity),
            "notes" | "alertnotes" => Some(Self::Notes),
            _ => None,
        }
    }

    /// Canonical document key of the field.
    pub fn key(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::ServiceName => "service_name",
            Self::Entity => "entity",
            Self::Source => "source",
            Self::Severity => "severity",
            Self::Notes => "notes",
        }
    }

    /// Read the field as text. Empty values are reported as `None`.
    pub fn read(self, alert: &Alert) -> Option<String> {
        let value = match self {
            Self::Summary => alert.summary.clone(),
            Self::ServiceName => alert.service_name.clone(),
            Self::Entity => alert.entity.clone(),
            Self::Source => alert.source.clone(),
            Self::Severity => alert.severity.map(|s| s.as_str().to_string())?,
            Self::Notes => alert.notes.clone(),
        };
        (!value.is_empty()).then_some(value)
    }

    /// Write a textual value into the field. Unknown severities clear it.
    pub fn write(self, alert: &mut Alert, value: &str) {
        match self {
            Self::Summary => alert.summary = value.to_string(),
            Self::ServiceName => alert.service_name = value.to_string(),
            Self::Entity => alert.entity = value.to_string(),
            Self::Source => alert.source = value.to_string(),
            Self::Severity => alert.severity = crate::Severity::parse(value),
            Self::Notes => alert.notes = value.to_string(),
        }
    }
}

/// A resolved reference to either a named field or an `additional_details` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldRef {
    Known(AlertField),
    Detail(String),
}

impl FieldRef {
    pub fn resolve(name: &str) -> Self {
        match AlertField::parse(name) {
            Some(field) => Self::Known(field),
            None => Self::Detail(name.to_string()),
        }
    }

    pub fn read(&self, alert: &Alert) -> Option<String> {
        match self {
            Self::Known(field) => field.read(alert),
            Self::Detail(key) => alert.additional_details.get(key).and_then(detail_text),
        }
    }

    pub fn write(&self, alert: &mut Alert, value: &str) {
        match self {
            Self::Known(field) => field.write(alert, value),
            Self::Detail(key) => {
                alert
                    .additional_details
                    .insert(key.clone(), Value::String(value.to_string()));
            }
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(field) => f.write_str(field.key()),
            Self::Detail(key) => write!(f, "additional_details.{}", key),
        }
    }
}

/// Text rendering of a detail value: strings verbatim, other scalars as JSON text.
pub fn detail_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

impl Alert {
    /// Read a rule field by name, resolving aliases first and details second.
    pub fn field_value(&self, name: &str) -> Option<String> {
        FieldRef::resolve(name).read(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Severity;
    use chrono::Utc;

    fn alert() -> Alert {
        Alert::new("host-1", "disk full", Some(Severity::Error), Utc::now())
            .with_service("pay-api")
            .with_source("nagios")
            .with_detail("datacenter", "dc-1")
            .with_detail("rack", 7)
    }

    #[test]
    fn aliases_resolve_to_named_fields() {
        let alert = alert();
        assert_eq!(alert.field_value("Service").as_deref(), Some("pay-api"));
        assert_eq!(alert.field_value("servicename").as_deref(), Some("pay-api"));
        assert_eq!(alert.field_value("alertsummary").as_deref(), Some("disk full"));
        assert_eq!(alert.field_value("alertsource").as_deref(), Some("nagios"));
        assert_eq!(alert.field_value("severity").as_deref(), Some("ERROR"));
        assert_eq!(alert.field_value("ENTITY").as_deref(), Some("host-1"));
    }

    #[test]
    fn unknown_names_fall_back_to_details() {
        let alert = alert();
        assert_eq!(alert.field_value("datacenter").as_deref(), Some("dc-1"));
        assert_eq!(alert.field_value("rack").as_deref(), Some("7"));
        assert_eq!(alert.field_value("region"), None);
    }

    #[test]
    fn empty_named_fields_are_absent() {
        let alert = alert();
        assert_eq!(alert.field_value("notes"), None);
    }

    #[test]
    fn write_then_read_detail() {
        let mut alert = alert();
        FieldRef::resolve("zone").write(&mut alert, "z-3");
        assert_eq!(alert.field_value("zone").as_deref(), Some("z-3"));
    }
}
