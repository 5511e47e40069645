//! SQL compilation of the typed filter and mutation model.

use alertdesk_shared::FieldRef;
use serde_json::{json, Map, Value};
use sqlx::{Postgres, QueryBuilder};

use crate::errors::StoreError;
use crate::types::{AlertFilter, AlertMutation};

/// Append `WHERE …` for `filter`. Always emits a clause, `TRUE` when unconstrained.
pub(crate) fn push_filter<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &'a AlertFilter) {
    qb.push(" WHERE TRUE");

    if let Some(id) = filter.id {
        qb.push(" AND id = ").push_bind(id);
    }
    if let Some(id) = filter.id_not {
        qb.push(" AND id <> ").push_bind(id);
    }
    if let Some(ids) = &filter.ids_in {
        qb.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
    }
    if let Some(status) = filter.status {
        qb.push(" AND doc->>'status' = ").push_bind(status.as_str());
    }
    if let Some(status) = filter.status_not {
        qb.push(" AND doc->>'status' <> ").push_bind(status.as_str());
    }
    if let Some(since) = filter.first_seen_since {
        qb.push(" AND (doc->>'first_seen')::timestamptz >= ")
            .push_bind(since);
    }
    if filter.candidate_scope {
        qb.push(
            " AND (COALESCE((doc->>'grouped')::boolean, false) = false \
             OR COALESCE((doc->>'parent')::boolean, false) = true)",
        );
    }
    if let Some(parent) = filter.parent {
        qb.push(" AND COALESCE((doc->>'parent')::boolean, false) = ")
            .push_bind(parent);
    }
    if let Some(grouped) = filter.grouped {
        qb.push(" AND COALESCE((doc->>'grouped')::boolean, false) = ")
            .push_bind(grouped);
    }
    if let Some(member) = filter.group_member {
        qb.push(" AND doc->'group_alerts' @> ")
            .push_bind(json!([member]));
    }
    for (field, value) in &filter.field_equals {
        match field {
            // Keys come from a closed enum, never from input.
            FieldRef::Known(known) => {
                qb.push(format!(" AND doc->>'{}' = ", known.key()))
                    .push_bind(value.as_str());
            }
            FieldRef::Detail(key) => {
                qb.push(" AND doc->'additional_details'->>")
                    .push_bind(key.as_str())
                    .push(" = ")
                    .push_bind(value.as_str());
            }
        }
    }
    if let Some(node) = &filter.entity_or_host {
        qb.push(" AND (doc->>'entity' = ")
            .push_bind(node.as_str())
            .push(" OR doc->>'host' = ")
            .push_bind(node.as_str())
            .push(")");
    }
}

/// The three parts of a compiled mutation list.
pub(crate) struct CompiledMutation {
    /// Top-level keys replaced with `doc || patch`.
    pub patch: Value,
    /// Entries appended to `worklogs`.
    pub worklogs: Value,
    /// Ids added to `group_alerts` when absent.
    pub members: Value,
}

pub(crate) fn compile_mutations(
    mutations: &[AlertMutation],
) -> Result<CompiledMutation, StoreError> {
    let mut patch = Map::new();
    let mut worklogs = Vec::new();
    let mut members = Vec::new();

    for mutation in mutations {
        match mutation {
            AlertMutation::SetStatus(status) => {
                patch.insert("status".into(), serde_json::to_value(status)?);
            }
            AlertMutation::SetAcked(acked) => {
                patch.insert("acked".into(), Value::Bool(*acked));
            }
            AlertMutation::SetSeverity(severity) => {
                patch.insert("severity".into(), serde_json::to_value(severity)?);
            }
            AlertMutation::SetGrouping {
                grouped,
                parent,
                group_incident_id,
            } => {
                patch.insert("grouped".into(), Value::Bool(*grouped));
                patch.insert("parent".into(), Value::Bool(*parent));
                patch.insert(
                    "group_incident_id".into(),
                    serde_json::to_value(group_incident_id)?,
                );
            }
            AlertMutation::SetGroupingReason(reason) => {
                patch.insert("grouping_reason".into(), serde_json::to_value(reason)?);
            }
            AlertMutation::SetClearTime(at) => {
                patch.insert("clear_time".into(), serde_json::to_value(at)?);
            }
            AlertMutation::SetPriority(priority) => {
                patch.insert("priority".into(), serde_json::to_value(priority)?);
            }
            AlertMutation::PushWorklog(entry) => worklogs.push(serde_json::to_value(entry)?),
            AlertMutation::AddGroupMember(id) => {
                let id = serde_json::to_value(id)?;
                if !members.contains(&id) {
                    members.push(id);
                }
            }
        }
    }

    Ok(CompiledMutation {
        patch: Value::Object(patch),
        worklogs: Value::Array(worklogs),
        members: Value::Array(members),
    })
}

/// Append `SET doc = …` applying a compiled mutation in one expression.
///
/// `group_alerts` is rebuilt as the ordered distinct union of existing and new
/// members, which makes the add idempotent.
pub(crate) fn push_set(qb: &mut QueryBuilder<'_, Postgres>, compiled: CompiledMutation) {
    qb.push(" SET doc = jsonb_set(jsonb_set(doc || ")
        .push_bind(compiled.patch)
        .push(
            "::jsonb, '{worklogs}', COALESCE(doc->'worklogs', '[]'::jsonb) || ",
        )
        .push_bind(compiled.worklogs)
        .push(
            "::jsonb), '{group_alerts}', (SELECT COALESCE(jsonb_agg(m.e ORDER BY m.ord), '[]'::jsonb) \
             FROM (SELECT e, MIN(ord) AS ord FROM jsonb_array_elements(\
             COALESCE(doc->'group_alerts', '[]'::jsonb) || ",
        )
        .push_bind(compiled.members)
        .push("::jsonb) WITH ORDINALITY AS t(e, ord) GROUP BY e) m))");
}

#[cfg(test)]
mod tests {
    use super::*;
    use alertdesk_shared::{AlertStatus, WorkLog};
    use uuid::Uuid;

    #[test]
    fn unconstrained_filter_is_true() {
        let filter = AlertFilter::default();
        let mut qb = QueryBuilder::<Postgres>::new("SELECT doc FROM alerts");
        push_filter(&mut qb, &filter);
        assert_eq!(qb.sql(), "SELECT doc FROM alerts WHERE TRUE");
    }

    #[test]
    fn candidate_filter_compiles_every_predicate() {
        let filter = AlertFilter::default()
            .excluding(Uuid::new_v4())
            .without_status(AlertStatus::Closed)
            .candidates_only()
            .field_equals(FieldRef::resolve("service"), "pay-api")
            .field_equals(FieldRef::resolve("datacenter"), "eu-1");
        let mut qb = QueryBuilder::<Postgres>::new("SELECT doc FROM alerts");
        push_filter(&mut qb, &filter);
        let sql = qb.sql();
        assert!(sql.contains("id <> $1"));
        assert!(sql.contains("doc->>'status' <> $2"));
        assert!(sql.contains("(doc->>'parent')::boolean, false) = true"));
        assert!(sql.contains("doc->>'service_name' = $3"));
        assert!(sql.contains("doc->'additional_details'->>$4 = $5"));
    }

    #[test]
    fn mutations_split_into_patch_worklogs_and_members() {
        let member = Uuid::new_v4();
        let compiled = compile_mutations(&[
            AlertMutation::SetStatus(AlertStatus::Closed),
            AlertMutation::PushWorklog(WorkLog::system("closed")),
            AlertMutation::AddGroupMember(member),
            AlertMutation::AddGroupMember(member),
        ])
        .unwrap();
        assert_eq!(compiled.patch["status"], "CLOSED");
        assert_eq!(compiled.worklogs.as_array().map(Vec::len), Some(1));
        assert_eq!(compiled.members, json!([member]));
    }
}
