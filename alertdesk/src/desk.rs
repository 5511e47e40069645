//! Service facade owning one instance of every core service over a shared set of stores.

use std::sync::Arc;

use alertdesk_repository::{AlertStore, ChangeStore, GraphStore, RuleStore};

use crate::closure::{ClosureService, PriorityRecalculator};
use crate::config::DeskConfig;
use crate::errors::DeskError;
use crate::grouping::GroupingEngine;
use crate::operator::OperatorActions;
use crate::rca::RcaAssembler;
use crate::related_changes::RelatedChangesService;
use crate::subgraph::SubgraphExtractor;

/// Store handles injected into the core. The graph store is optional: without it
/// topology views are unavailable and RCA degrades to alert and change data.
#[derive(Clone)]
pub struct Stores {
    pub alerts: Arc<dyn AlertStore>,
    pub rules: Arc<dyn RuleStore>,
    pub changes: Arc<dyn ChangeStore>,
    pub graph: Option<Arc<dyn GraphStore>>,
}

pub struct Desk {
    pub grouping: GroupingEngine,
    pub closure: ClosureService,
    pub operator: OperatorActions,
    pub rca: RcaAssembler,
    pub related_changes: RelatedChangesService,
    subgraph: Option<SubgraphExtractor>,
}

impl Desk {
    pub fn new(stores: Stores, config: DeskConfig) -> Self {
        let closure = ClosureService::new(stores.alerts.clone(), config.clone());
        Self::assemble(stores, closure, config)
    }

    pub fn with_recalculator(
        stores: Stores,
        recalculator: Arc<dyn PriorityRecalculator>,
        config: DeskConfig,
    ) -> Self {
        let closure =
            ClosureService::with_recalculator(stores.alerts.clone(), recalculator, config.clone());
        Self::assemble(stores, closure, config)
    }

    fn assemble(stores: Stores, closure: ClosureService, config: DeskConfig) -> Self {
        let subgraph = stores.graph.clone().map(|graph| {
            SubgraphExtractor::new(stores.alerts.clone(), graph, config.clone())
                .with_changes(stores.changes.clone())
        });
        Self {
            grouping: GroupingEngine::new(stores.alerts.clone(), stores.rules.clone(), config.clone()),
            closure,
            operator: OperatorActions::new(stores.alerts.clone(), config.clone()),
            rca: RcaAssembler::new(
                stores.alerts.clone(),
                stores.graph.clone(),
                stores.changes.clone(),
                config.clone(),
            ),
            related_changes: RelatedChangesService::new(
                stores.alerts,
                stores.graph,
                stores.changes,
                config,
            ),
            subgraph,
        }
    }

    /// The topology extractor, or `StoreUnavailable` when no graph store is wired.
    pub fn subgraph(&self) -> Result<&SubgraphExtractor, DeskError> {
        self.subgraph
            .as_ref()
            .ok_or_else(|| DeskError::unavailable("no graph store configured"))
    }
}
