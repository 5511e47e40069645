//! Typed filter and mutation model shared by every alert store backend.
//!
//! `AlertFilter` is a conjunction of optional predicates. `AlertFilter::matches`
//! is the reference semantics: the in-memory backend evaluates it directly and
//! the SQL backend compiles each predicate to an equivalent clause.

use alertdesk_shared::{
    Alert, AlertId, AlertStatus, FieldRef, GroupingReason, Severity, WorkLog,
};
use chrono::{DateTime, Utc};

/// Conjunctive filter over alert documents. Unset predicates match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertFilter {
    pub id: Option<AlertId>,
    pub id_not: Option<AlertId>,
    pub ids_in: Option<Vec<AlertId>>,
    pub status: Option<AlertStatus>,
    pub status_not: Option<AlertStatus>,
    pub first_seen_since: Option<DateTime<Utc>>,
    /// Restrict to correlation candidates: standalone alerts or group incidents.
    pub candidate_scope: bool,
    pub parent: Option<bool>,
    pub grouped: Option<bool>,
    /// Group incidents whose `group_alerts` contain this id.
    pub group_member: Option<AlertId>,
    pub field_equals: Vec<(FieldRef, String)>,
    /// Alerts attached to this node name by `entity` or `host`.
    pub entity_or_host: Option<String>,
}

impl AlertFilter {
    pub fn by_id(id: AlertId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_ids(ids: impl IntoIterator<Item = AlertId>) -> Self {
        Self {
            ids_in: Some(ids.into_iter().collect()),
            ..Self::default()
        }
    }

    /// The group incident that lists `child` among its members.
    pub fn parent_of(child: AlertId) -> Self {
        Self {
            parent: Some(true),
            group_member: Some(child),
            ..Self::default()
        }
    }

    pub fn attached_to(node: impl Into<String>) -> Self {
        Self {
            entity_or_host: Some(node.into()),
            ..Self::default()
        }
    }

    pub fn excluding(mut self, id: AlertId) -> Self {
        self.id_not = Some(id);
        self
    }

    pub fn with_status(mut self, status: AlertStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn without_status(mut self, status: AlertStatus) -> Self {
        self.status_not = Some(status);
        self
    }

    pub fn first_seen_since(mut self, since: DateTime<Utc>) -> Self {
        self.first_seen_since = Some(since);
        self
    }

    pub fn candidates_only(mut self) -> Self {
        self.candidate_scope = true;
        self
    }

    pub fn field_equals(mut self, field: FieldRef, value: impl Into<String>) -> Self {
        self.field_equals.push((field, value.into()));
        self
    }

    pub fn matches(&self, alert: &Alert) -> bool {
        if self.id.is_some_and(|id| alert.id != id) {
            return false;
        }
        if self.id_not.is_some_and(|id| alert.id == id) {
            return false;
        }
        if let Some(ids) = &self.ids_in {
            if !ids.contains(&alert.id) {
                return false;
            }
        }
        if self.status.is_some_and(|s| alert.status != s) {
            return false;
        }
        if self.status_not.is_some_and(|s| alert.status == s) {
            return false;
        }
        if self.first_seen_since.is_some_and(|t| alert.first_seen < t) {
            return false;
        }
        if self.candidate_scope && alert.grouped && !alert.parent {
            return false;
        }
        if self.parent.is_some_and(|p| alert.parent != p) {
            return false;
        }
        if self.grouped.is_some_and(|g| alert.grouped != g) {
            return false;
        }
        if let Some(member) = self.group_member {
            if !alert.group_alerts.contains(&member) {
                return false;
            }
        }
        for (field, value) in &self.field_equals {
            if field.read(alert).as_deref() != Some(value.as_str()) {
                return false;
            }
        }
        if let Some(node) = &self.entity_or_host {
            if alert.entity != *node && alert.host.as_deref() != Some(node.as_str()) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Paging and ordering for `find_many`. Sorting is always by first-seen time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FindOptions {
    pub sort: Option<SortOrder>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

impl FindOptions {
    pub fn limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn sorted(mut self, order: SortOrder) -> Self {
        self.sort = Some(order);
        self
    }
}

/// A single-document field mutation. A list of mutations is applied atomically
/// per document, mirroring `$set` / `$push` / `$addToSet`.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertMutation {
    SetStatus(AlertStatus),
    SetAcked(bool),
    SetSeverity(Option<Severity>),
    SetGrouping {
        grouped: bool,
        parent: bool,
        group_incident_id: Option<String>,
    },
    SetGroupingReason(GroupingReason),
    SetClearTime(Option<DateTime<Utc>>),
    SetPriority(Option<String>),
    PushWorklog(WorkLog),
    /// Idempotent add to `group_alerts`.
    AddGroupMember(AlertId),
}

impl AlertMutation {
    pub fn apply(&self, alert: &mut Alert) {
        match self {
            Self::SetStatus(status) => alert.status = *status,
            Self::SetAcked(acked) => alert.acked = *acked,
            Self::SetSeverity(severity) => alert.severity = *severity,
            Self::SetGrouping {
                grouped,
                parent,
                group_incident_id,
            } => {
                alert.grouped = *grouped;
                alert.parent = *parent;
                alert.group_incident_id = group_incident_id.clone();
            }
            Self::SetGroupingReason(reason) => alert.grouping_reason = Some(reason.clone()),
            Self::SetClearTime(at) => alert.clear_time = *at,
            Self::SetPriority(priority) => alert.priority = priority.clone(),
            Self::PushWorklog(entry) => alert.worklogs.push(entry.clone()),
            Self::AddGroupMember(id) => {
                if !alert.group_alerts.contains(id) {
                    alert.group_alerts.push(*id);
                }
            }
        }
    }

    /// Close an alert: status, clear time and the explaining worklog entry.
    pub fn close(worklog: WorkLog) -> Vec<Self> {
        vec![
            Self::PushWorklog(worklog),
            Self::SetStatus(AlertStatus::Closed),
            Self::SetClearTime(Some(Utc::now())),
        ]
    }

    /// Mark an alert as a child of the incident with display id `incident`.
    pub fn join_group(incident: impl Into<String>) -> Self {
        Self::SetGrouping {
            grouped: true,
            parent: false,
            group_incident_id: Some(incident.into()),
        }
    }
}

/// Time window a change must overlap: start at or before `end`, and no end
/// or an end at or after `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alertdesk_shared::Severity;
    use chrono::Duration;

    fn alert(entity: &str) -> Alert {
        Alert::new(entity, "disk full", Some(Severity::Warn), Utc::now())
    }

    #[test]
    fn candidate_scope_excludes_children_but_keeps_parents() {
        let filter = AlertFilter::default().candidates_only();

        let standalone = alert("a");
        let mut child = alert("b");
        child.grouped = true;
        let mut parent = alert("c");
        parent.grouped = true;
        parent.parent = true;

        assert!(filter.matches(&standalone));
        assert!(!filter.matches(&child));
        assert!(filter.matches(&parent));
    }

    #[test]
    fn field_equality_uses_alias_resolution() {
        let a = alert("a").with_service("pay-api").with_detail("dc", "eu-1");
        let filter = AlertFilter::default()
            .field_equals(FieldRef::resolve("service"), "pay-api")
            .field_equals(FieldRef::resolve("dc"), "eu-1");
        assert!(filter.matches(&a));

        let other = AlertFilter::default().field_equals(FieldRef::resolve("service"), "auth-api");
        assert!(!other.matches(&a));
    }

    #[test]
    fn time_and_identity_predicates() {
        let a = alert("a");
        let filter = AlertFilter::default()
            .excluding(a.id)
            .first_seen_since(Utc::now() - Duration::minutes(5));
        assert!(!filter.matches(&a));

        let b = alert("b");
        assert!(filter.matches(&b));
        assert!(!AlertFilter::default()
            .first_seen_since(Utc::now() + Duration::minutes(5))
            .matches(&b));
    }

    #[test]
    fn entity_or_host_matches_either_attachment() {
        let a = alert("svc-1").with_host("host-9");
        assert!(AlertFilter::attached_to("svc-1").matches(&a));
        assert!(AlertFilter::attached_to("host-9").matches(&a));
        assert!(!AlertFilter::attached_to("host-1").matches(&a));
    }

    #[test]
    fn add_group_member_is_idempotent() {
        let mut parent = alert("p");
        let child = AlertId::new_v4();
        AlertMutation::AddGroupMember(child).apply(&mut parent);
        AlertMutation::AddGroupMember(child).apply(&mut parent);
        assert_eq!(parent.group_alerts, vec![child]);
    }
}
