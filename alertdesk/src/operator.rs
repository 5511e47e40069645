//! Operator actions on single alerts: acknowledge, comment and view.

use std::sync::Arc;

use alertdesk_repository::{AlertFilter, AlertMutation, AlertStore, FindOptions};
use alertdesk_shared::{Alert, AlertId, WorkLog};
use serde::Serialize;
use tracing::info;

use crate::config::DeskConfig;
use crate::errors::DeskError;
use crate::timeouts::bounded;

/// An alert as shown to operators; incidents carry their members.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertView {
    #[serde(flatten)]
    pub alert: Alert,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub child_alerts: Vec<Alert>,
}

pub struct OperatorActions {
    alerts: Arc<dyn AlertStore>,
    config: DeskConfig,
}

impl OperatorActions {
    pub fn new(alerts: Arc<dyn AlertStore>, config: DeskConfig) -> Self {
        Self { alerts, config }
    }

    pub async fn acknowledge(&self, id: AlertId, actor: &str) -> Result<Alert, DeskError> {
        self.annotate(
            id,
            actor,
            vec![
                AlertMutation::PushWorklog(WorkLog::new(actor, "Alert acknowledged")),
                AlertMutation::SetAcked(true),
            ],
        )
        .await
    }

    pub async fn unacknowledge(&self, id: AlertId, actor: &str) -> Result<Alert, DeskError> {
        self.annotate(
            id,
            actor,
            vec![
                AlertMutation::PushWorklog(WorkLog::new(actor, "Alert unacknowledged")),
                AlertMutation::SetAcked(false),
            ],
        )
        .await
    }

    pub async fn add_comment(
        &self,
        id: AlertId,
        actor: &str,
        comment: &str,
    ) -> Result<Alert, DeskError> {
        if comment.trim().is_empty() {
            return Err(DeskError::validation("comment is required"));
        }
        self.annotate(
            id,
            actor,
            vec![AlertMutation::PushWorklog(WorkLog::new(actor, comment.trim()))],
        )
        .await
    }

    /// The alert, with member alerts expanded when it is a group incident.
    pub async fn view(&self, id: AlertId) -> Result<AlertView, DeskError> {
        let alert = self.load(id).await?;
        let child_alerts = if alert.parent && !alert.group_alerts.is_empty() {
            let mut children = bounded(
                "find_group_members",
                self.config.point_timeout,
                self.alerts.find_many(
                    &AlertFilter::by_ids(alert.group_alerts.iter().copied()),
                    FindOptions::default(),
                ),
            )
            .await?;
            // Keep incident membership order.
            children.sort_by_key(|c| alert.group_alerts.iter().position(|id| *id == c.id));
            children
        } else {
            Vec::new()
        };
        Ok(AlertView {
            alert,
            child_alerts,
        })
    }

    async fn annotate(
        &self,
        id: AlertId,
        actor: &str,
        mutations: Vec<AlertMutation>,
    ) -> Result<Alert, DeskError> {
        if actor.trim().is_empty() {
            return Err(DeskError::validation("author is required"));
        }
        let modified = bounded(
            "update_alert",
            self.config.point_timeout,
            self.alerts.update_one(&AlertFilter::by_id(id), &mutations),
        )
        .await?;
        if modified == 0 {
            return Err(DeskError::not_found(format!("alert {}", id)));
        }
        info!(alert = %id, actor = actor, "Operator action recorded");
        self.load(id).await
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
}
