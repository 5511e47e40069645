//! Changes overlapping an alert, split into those hitting its own entity and
//! those hitting a topology neighbor.

use std::sync::Arc;

use alertdesk_repository::{AlertStore, ChangeStore, GraphStore};
use alertdesk_shared::{AlertId, ChangeScope, RelatedChange, RelatedChangesView};
use tracing::{info, instrument};

use crate::config::DeskConfig;
use crate::context::{place, ContextLoader};
use crate::errors::DeskError;

pub struct RelatedChangesService {
    loader: ContextLoader,
}

impl RelatedChangesService {
    pub fn new(
        alerts: Arc<dyn AlertStore>,
        graph: Option<Arc<dyn GraphStore>>,
        changes: Arc<dyn ChangeStore>,
        config: DeskConfig,
    ) -> Self {
        Self {
            loader: ContextLoader {
                alerts,
                graph,
                changes,
                config,
            },
        }
    }

    /// Direct changes are newest first; neighbor changes are ordered by hop
    /// distance, then newest first.
    #[instrument(skip(self))]
    pub async fn related(&self, id: AlertId) -> Result<RelatedChangesView, DeskError> {
        let ctx = self.loader.load(id).await?;

        let mut direct_changes = Vec::new();
        let mut neighbor_changes = Vec::new();
        for change in &ctx.changes {
            let Some(placement) = place(change, &ctx.root, &ctx.hops) else {
                continue;
            };
            let related = RelatedChange::from_change(
                change,
                placement.entity,
                placement.hop_distance,
                placement.scope,
                ctx.alert.first_seen,
            );
            match placement.scope {
                ChangeScope::Direct => direct_changes.push(related),
                ChangeScope::Neighbor => neighbor_changes.push(related),
            }
        }
        direct_changes.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        neighbor_changes.sort_by(|a, b| {
            a.hop_distance
                .cmp(&b.hop_distance)
                .then_with(|| b.start_time.cmp(&a.start_time))
        });

        info!(
            alert = %ctx.alert.display_id(),
            direct = direct_changes.len(),
            neighbor = neighbor_changes.len(),
            "Collected related changes"
        );
        Ok(RelatedChangesView {
            alert_id: ctx.alert.display_id(),
            root_entity_id: ctx.root,
            direct_changes,
            neighbor_changes,
        })
    }
}
