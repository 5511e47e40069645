//! Alert correlation into group incidents.
//!
//! For each similarity rule whose scope tags the alert carries, candidates that
//! share every scope value, started inside the rule window and are either
//! standalone or group incidents are scored by token Jaccard similarity. The
//! first rule producing a match above its threshold wins, and the alert is
//! merged into the match's incident (synthesizing one when the match is
//! standalone).
//!
//! Find-or-create is serialized per rule and scope values with [`KeyedLocks`],
//! so concurrent alerts of the same incident never create two parents.

use std::collections::HashSet;
use std::sync::Arc;

use alertdesk_repository::{AlertFilter, AlertMutation, AlertStore, FindOptions, RuleStore};
use alertdesk_shared::{
    Alert, AlertId, AlertStatus, CorrelationMode, CorrelationRule, FieldRef, GroupingReason,
    WorkLog,
};
use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::DeskConfig;
use crate::errors::DeskError;
use crate::locks::KeyedLocks;
use crate::similarity::similarity;
use crate::timeouts::bounded;

/// Longest child-to-parent chain followed before the hierarchy is declared corrupt.
pub const MAX_PARENT_DEPTH: usize = 4;

/// Entity of a synthesized incident whose rule does not scope on entity.
pub const GROUPED_ENTITY: &str = "Multiple";

/// What a correlation attempt did to the alert store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CorrelationOutcome {
    NoMatch,
    MergedIntoParent {
        parent_id: AlertId,
        incident_id: String,
        rule: String,
        score: f64,
    },
    CreatedParent {
        parent_id: AlertId,
        incident_id: String,
        rule: String,
        score: f64,
    },
    Skipped {
        reason: String,
    },
}

/// Scope tag values read from the source alert, in rule order.
#[derive(Debug, Clone)]
struct Scope {
    values: Vec<(String, FieldRef, String)>,
}

impl Scope {
    /// `None` when the alert lacks any of the rule's scope tags.
    fn of(rule: &CorrelationRule, alert: &Alert) -> Option<Self> {
        let values = rule
            .scope_tags
            .iter()
            .map(|tag| {
                let field = FieldRef::resolve(tag);
                field.read(alert).map(|value| (tag.clone(), field, value))
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self { values })
    }

    fn group_key(&self, rule: &CorrelationRule) -> String {
        let mut key = rule.name.clone();
        for (_, _, value) in &self.values {
            key.push('|');
            key.push_str(value);
        }
        key
    }

    fn reason(&self, rule: &CorrelationRule, score: f64) -> GroupingReason {
        let mut reasons: Vec<String> = self
            .values
            .iter()
            .map(|(tag, _, value)| format!("Same {}: {}", tag, value))
            .collect();
        reasons.push(format!("Similar content (Score: {:.2})", score));
        GroupingReason {
            kind: "SIMILARITY".to_string(),
            description: format!("Grouped by similarity rule: {}", rule.name),
            reasons,
            score,
        }
    }
}

struct BestMatch {
    candidate: Alert,
    score: f64,
}

fn incident_id() -> String {
    format!(
        "GRP-{}-{}",
        Utc::now().timestamp(),
        &Uuid::new_v4().simple().to_string()[..8]
    )
}

pub struct GroupingEngine {
    alerts: Arc<dyn AlertStore>,
    rules: Arc<dyn RuleStore>,
    locks: KeyedLocks,
    config: DeskConfig,
}

impl GroupingEngine {
    pub fn new(alerts: Arc<dyn AlertStore>, rules: Arc<dyn RuleStore>, config: DeskConfig) -> Self {
        Self {
            alerts,
            rules,
            locks: KeyedLocks::new(),
            config,
        }
    }

    pub async fn correlate_by_id(&self, id: AlertId) -> Result<CorrelationOutcome, DeskError> {
        let alert = self.load(id).await?;
        self.correlate(&alert).await
    }

    /// Correlate one ingested or updated alert against the configured rules.
    #[instrument(skip(self, alert), fields(alert_id = %alert.id, entity = %alert.entity))]
    pub async fn correlate(&self, alert: &Alert) -> Result<CorrelationOutcome, DeskError> {
        if let Some(reason) = ineligible(alert) {
            debug!(reason, "Alert not eligible for correlation");
            return Ok(CorrelationOutcome::Skipped {
                reason: reason.to_string(),
            });
        }

        let rules = bounded(
            "list_rules",
            self.config.point_timeout,
            self.rules.list_rules(),
        )
        .await?;

        for rule in &rules {
            if rule.group_window_minutes <= 0 {
                warn!(rule = %rule.name, window = rule.group_window_minutes, "Skipping misconfigured rule");
                continue;
            }
            if rule.correlation_mode != CorrelationMode::Similarity {
                debug!(rule = %rule.name, mode = ?rule.correlation_mode, "Skipping rule without executing logic");
                continue;
            }
            let Some(scope) = Scope::of(rule, alert) else {
                debug!(rule = %rule.name, "Alert lacks a scope tag, rule does not apply");
                continue;
            };

            let _guard = self.locks.lock(scope.group_key(rule)).await;

            // State may have moved while waiting for the lock.
            let current = self.load(alert.id).await?;
            if let Some(reason) = ineligible(&current) {
                return Ok(CorrelationOutcome::Skipped {
                    reason: reason.to_string(),
                });
            }

            let Some(best) = self.best_match(rule, &current, &scope).await? else {
                continue;
            };

            return match self.resolve(rule, &current, best, &scope).await {
                Ok(outcome) => Ok(outcome),
                Err(DeskError::ConsistencyViolation(reason)) => {
                    warn!(rule = %rule.name, reason = %reason, "Skipping correlation on inconsistent group state");
                    Ok(CorrelationOutcome::Skipped { reason })
                }
                Err(e) => Err(e),
            };
        }

        Ok(CorrelationOutcome::NoMatch)
    }

    async fn load(&self, id: AlertId) -> Result<Alert, DeskError> {
        bounded(
            "find_alert",
            self.config.point_timeout,
            self.alerts.find_one(&AlertFilter::by_id(id)),
        )
        .await?
        .ok_or_else(|| DeskError::not_found(format!("alert {}", id)))
    }

    async fn best_match(
        &self,
        rule: &CorrelationRule,
        current: &Alert,
        scope: &Scope,
    ) -> Result<Option<BestMatch>, DeskError> {
        let since = Utc::now() - Duration::minutes(rule.group_window_minutes);
        let mut filter = AlertFilter::default()
            .excluding(current.id)
            .without_status(AlertStatus::Closed)
            .first_seen_since(since)
            .candidates_only();
        for (_, field, value) in &scope.values {
            filter = filter.field_equals(field.clone(), value.clone());
        }

        let candidates = bounded(
            "find_candidates",
            self.config.point_timeout,
            self.alerts
                .find_many(&filter, FindOptions::limit(self.config.candidate_limit)),
        )
        .await?;

        let fields: Vec<FieldRef> = rule
            .similarity
            .fields
            .iter()
            .map(|f| FieldRef::resolve(f))
            .collect();

        let mut best: Option<BestMatch> = None;
        for candidate in candidates {
            let score = self.candidate_score(current, &candidate, &fields).await?;
            debug!(rule = %rule.name, candidate = %candidate.id, score, "Scored candidate");
            if score >= rule.similarity.threshold && best.as_ref().map_or(true, |b| score > b.score)
            {
                best = Some(BestMatch { candidate, score });
            }
        }
        Ok(best)
    }

    /// A group incident is as similar as its closest member.
    async fn candidate_score(
        &self,
        current: &Alert,
        candidate: &Alert,
        fields: &[FieldRef],
    ) -> Result<f64, DeskError> {
        let own = similarity(current, candidate, fields);
        if !candidate.parent || candidate.group_alerts.is_empty() {
            return Ok(own);
        }
        let children = bounded(
            "find_group_members",
            self.config.point_timeout,
            self.alerts.find_many(
                &AlertFilter::by_ids(candidate.group_alerts.iter().copied()),
                FindOptions::default(),
            ),
        )
        .await?;
        Ok(children
            .iter()
            .map(|child| similarity(current, child, fields))
            .fold(own, f64::max))
    }

    /// Walk from the match up to its incident, then merge or synthesize.
    async fn resolve(
        &self,
        rule: &CorrelationRule,
        current: &Alert,
        best: BestMatch,
        scope: &Scope,
    ) -> Result<CorrelationOutcome, DeskError> {
        let reason = scope.reason(rule, best.score);
        let mut target = best.candidate;
        let mut visited = HashSet::new();

        for _ in 0..=MAX_PARENT_DEPTH {
            if !visited.insert(target.id) {
                return Err(DeskError::consistency(format!(
                    "cycle in group hierarchy at alert {}",
                    target.id
                )));
            }
            if target.parent {
                return self.merge_into(rule, &target, current, reason).await;
            }
            if !target.grouped {
                return self.create_parent(rule, &target, current, scope, reason).await;
            }

            let child = target.id;
            target = bounded(
                "find_parent",
                self.config.point_timeout,
                self.alerts.find_one(&AlertFilter::parent_of(child)),
            )
            .await?
            .ok_or_else(|| {
                DeskError::consistency(format!("grouped alert {} has no parent", child))
            })?;
        }

        Err(DeskError::consistency(format!(
            "group hierarchy deeper than {} levels",
            MAX_PARENT_DEPTH
        )))
    }

    async fn merge_into(
        &self,
        rule: &CorrelationRule,
        parent: &Alert,
        current: &Alert,
        reason: GroupingReason,
    ) -> Result<CorrelationOutcome, DeskError> {
        let incident = parent.display_id();
        let score = reason.score;

        bounded(
            "add_group_member",
            self.config.point_timeout,
            self.alerts.update_one(
                &AlertFilter::by_id(parent.id),
                &[
                    AlertMutation::AddGroupMember(current.id),
                    AlertMutation::SetGroupingReason(reason),
                ],
            ),
        )
        .await?;
        bounded(
            "join_group",
            self.config.point_timeout,
            self.alerts.update_one(
                &AlertFilter::by_id(current.id),
                &[AlertMutation::join_group(incident.clone())],
            ),
        )
        .await?;

        info!(rule = %rule.name, incident = %incident, score, "Merged alert into existing incident");
        Ok(CorrelationOutcome::MergedIntoParent {
            parent_id: parent.id,
            incident_id: incident,
            rule: rule.name.clone(),
            score,
        })
    }

    async fn create_parent(
        &self,
        rule: &CorrelationRule,
        matched: &Alert,
        current: &Alert,
        scope: &Scope,
        reason: GroupingReason,
    ) -> Result<CorrelationOutcome, DeskError> {
        let score = reason.score;
        let mut parent = Alert::new(
            GROUPED_ENTITY,
            format!("Group: {} ({})", rule.name, current.summary),
            matched.severity,
            matched.first_seen,
        );
        parent.alert_id = incident_id();
        parent.last_seen = current.last_seen;
        parent.parent = true;
        parent.grouped = true;
        parent.group_alerts = vec![matched.id, current.id];
        // Later scoped searches must find the incident itself.
        for (_, field, value) in &scope.values {
            field.write(&mut parent, value);
        }
        parent.grouping_reason = Some(reason);
        parent.worklogs.push(WorkLog::system(format!(
            "Group incident created by rule {}",
            rule.name
        )));

        bounded(
            "insert_parent",
            self.config.point_timeout,
            self.alerts.insert(&parent),
        )
        .await?;
        bounded(
            "join_group",
            self.config.point_timeout,
            self.alerts.update_many(
                &AlertFilter::by_ids([matched.id, current.id]),
                &[AlertMutation::join_group(parent.alert_id.clone())],
            ),
        )
        .await?;

        info!(
            rule = %rule.name,
            incident = %parent.alert_id,
            matched = %matched.id,
            score,
            "Created group incident"
        );
        Ok(CorrelationOutcome::CreatedParent {
            parent_id: parent.id,
            incident_id: parent.alert_id,
            rule: rule.name.clone(),
            score,
        })
    }
}

fn ineligible(alert: &Alert) -> Option<&'static str> {
    if alert.parent {
        Some("alert is a group incident")
    } else if alert.grouped {
        Some("alert already belongs to a group incident")
    } else if !alert.is_open() {
        Some("alert is closed")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alertdesk_shared::Severity;

    fn rule(scope: &[&str]) -> CorrelationRule {
        CorrelationRule::similarity(
            "disk",
            30,
            scope.iter().map(|s| s.to_string()).collect(),
            vec!["summary".to_string()],
            0.5,
        )
    }

    #[test]
    fn scope_requires_every_tag() {
        let alert = Alert::new("h1", "disk full", Some(Severity::Warn), Utc::now())
            .with_service("pay-api");
        assert!(Scope::of(&rule(&["service"]), &alert).is_some());
        assert!(Scope::of(&rule(&["service", "datacenter"]), &alert).is_none());
    }

    #[test]
    fn group_key_and_reason_name_scope_values() {
        let alert = Alert::new("h1", "disk full", None, Utc::now())
            .with_service("pay-api")
            .with_detail("datacenter", "eu-1");
        let rule = rule(&["service", "datacenter"]);
        let scope = Scope::of(&rule, &alert).unwrap();

        assert_eq!(scope.group_key(&rule), "disk|pay-api|eu-1");
        let reason = scope.reason(&rule, 0.6);
        assert_eq!(reason.kind, "SIMILARITY");
        assert_eq!(reason.description, "Grouped by similarity rule: disk");
        assert_eq!(
            reason.reasons,
            vec![
                "Same service: pay-api".to_string(),
                "Same datacenter: eu-1".to_string(),
                "Similar content (Score: 0.60)".to_string(),
            ]
        );
    }

    #[test]
    fn incident_ids_are_prefixed_and_unique() {
        let a = incident_id();
        let b = incident_id();
        assert!(a.starts_with("GRP-"));
        assert_ne!(a, b);
    }
}
