//! Operator clear and the closure cascade through group incidents.
//!
//! - Clearing an incident closes every member.
//! - Clearing a member closes its incident once no member remains open;
//!   otherwise the incident's priority is recalculated.
//! - Clearing a standalone alert closes only that alert.

use std::sync::Arc;

use alertdesk_repository::{AlertFilter, AlertMutation, AlertStore, FindOptions};
use alertdesk_shared::{Alert, AlertId, AlertStatus, WorkLog};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::config::DeskConfig;
use crate::errors::DeskError;
use crate::timeouts::bounded;

pub const CHILD_CLOSED_BY_PARENT: &str = "Child alert closed due to closure of parent alert";
pub const PARENT_CLOSED_BY_CHILDREN: &str =
    "Parent alert closed automatically as all child alerts are closed";

/// Hook invoked when a member closes while siblings stay open, so the incident's
/// displayed priority reflects what is left.
#[async_trait]
pub trait PriorityRecalculator: Send + Sync {
    async fn recalculate(&self, parent: &Alert) -> Result<(), DeskError>;
}

/// Default hook: records the request and leaves the incident untouched.
pub struct LoggingRecalculator;

#[async_trait]
impl PriorityRecalculator for LoggingRecalculator {
    async fn recalculate(&self, parent: &Alert) -> Result<(), DeskError> {
        info!(incident = %parent.display_id(), "Priority recalculation requested");
        Ok(())
    }
}

/// Effect of a clear on the rest of the group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "cascade", rename_all = "snake_case")]
pub enum Cascade {
    /// The alert was already closed; nothing was written.
    AlreadyClosed,
    Standalone,
    ChildrenClosed { count: u64 },
    ParentClosed { parent_id: AlertId },
    ParentRecalculated { parent_id: AlertId },
    /// The alert claims membership but no incident lists it.
    ParentMissing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosureOutcome {
    pub alert_id: AlertId,
    #[serde(flatten)]
    pub cascade: Cascade,
}

pub struct ClosureService {
    alerts: Arc<dyn AlertStore>,
    recalculator: Arc<dyn PriorityRecalculator>,
    config: DeskConfig,
}

impl ClosureService {
    pub fn new(alerts: Arc<dyn AlertStore>, config: DeskConfig) -> Self {
        Self::with_recalculator(alerts, Arc::new(LoggingRecalculator), config)
    }

    pub fn with_recalculator(
        alerts: Arc<dyn AlertStore>,
        recalculator: Arc<dyn PriorityRecalculator>,
        config: DeskConfig,
    ) -> Self {
        Self {
            alerts,
            recalculator,
            config,
        }
    }

    /// Close `id` on behalf of `actor` and cascade through its group.
    #[instrument(skip(self, comment))]
    pub async fn clear(
        &self,
        id: AlertId,
        actor: &str,
        comment: Option<&str>,
    ) -> Result<ClosureOutcome, DeskError> {
        if actor.trim().is_empty() {
            return Err(DeskError::validation("author is required"));
        }
        let alert = bounded(
            "find_alert",
            self.config.point_timeout,
            self.alerts.find_one(&AlertFilter::by_id(id)),
        )
        .await?
        .ok_or_else(|| DeskError::not_found(format!("alert {}", id)))?;

        if !alert.is_open() {
            return Ok(ClosureOutcome {
                alert_id: id,
                cascade: Cascade::AlreadyClosed,
            });
        }

        let note = comment
            .filter(|c| !c.trim().is_empty())
            .unwrap_or("Alert cleared");
        bounded(
            "close_alert",
            self.config.point_timeout,
            self.alerts.update_one(
                &AlertFilter::by_id(id),
                &AlertMutation::close(WorkLog::new(actor, note)),
            ),
        )
        .await?;
        info!(alert = %alert.display_id(), "Alert cleared");

        let cascade = if alert.parent {
            self.close_children(&alert).await?
        } else if alert.grouped {
            self.settle_parent(&alert).await?
        } else {
            Cascade::Standalone
        };

        Ok(ClosureOutcome {
            alert_id: id,
            cascade,
        })
    }

    async fn close_children(&self, parent: &Alert) -> Result<Cascade, DeskError> {
        if parent.group_alerts.is_empty() {
            return Ok(Cascade::ChildrenClosed { count: 0 });
        }
        let members = || AlertFilter::by_ids(parent.group_alerts.iter().copied());
        // Already-closed members keep their clear time but still get the entry.
        let count = bounded(
            "close_children",
            self.config.point_timeout,
            self.alerts.update_many(
                &members().without_status(AlertStatus::Closed),
                &[
                    AlertMutation::SetStatus(AlertStatus::Closed),
                    AlertMutation::SetClearTime(Some(Utc::now())),
                ],
            ),
        )
        .await?;
        bounded(
            "log_children",
            self.config.point_timeout,
            self.alerts.update_many(
                &members(),
                &[AlertMutation::PushWorklog(WorkLog::system(
                    CHILD_CLOSED_BY_PARENT,
                ))],
            ),
        )
        .await?;
        info!(incident = %parent.display_id(), count, "Closed incident members");
        Ok(Cascade::ChildrenClosed { count })
    }

    async fn settle_parent(&self, child: &Alert) -> Result<Cascade, DeskError> {
        let Some(parent) = bounded(
            "find_parent",
            self.config.point_timeout,
            self.alerts.find_one(&AlertFilter::parent_of(child.id)),
        )
        .await?
        else {
            warn!(child = %child.id, incident = ?child.group_incident_id, "Grouped alert has no parent, skipping cascade");
            return Ok(Cascade::ParentMissing);
        };

        let members = bounded(
            "find_group_members",
            self.config.point_timeout,
            self.alerts.find_many(
                &AlertFilter::by_ids(parent.group_alerts.iter().copied()),
                FindOptions::default(),
            ),
        )
        .await?;

        if members.iter().all(|m| !m.is_open()) {
            if parent.is_open() {
                bounded(
                    "close_parent",
                    self.config.point_timeout,
                    self.alerts.update_one(
                        &AlertFilter::by_id(parent.id),
                        &AlertMutation::close(WorkLog::system(PARENT_CLOSED_BY_CHILDREN)),
                    ),
                )
                .await?;
                info!(incident = %parent.display_id(), "Closed incident after last member cleared");
            }
            return Ok(Cascade::ParentClosed {
                parent_id: parent.id,
            });
        }

        self.recalculator.recalculate(&parent).await?;
        Ok(Cascade::ParentRecalculated {
            parent_id: parent.id,
        })
    }
}
