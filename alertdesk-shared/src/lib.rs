//! # Alert Desk Shared
//!
//! This crate defines shared data structures and types used across the alert desk
//! ecosystem: alert records and their grouping state, correlation rules, change
//! records, topology fragments, and the rendered views (incident subgraph, RCA
//! payload, related changes) produced by the core services.

pub mod field;
pub mod types;

pub use field::{AlertField, FieldRef};
pub use types::alert::{
    Alert, AlertId, AlertStatus, GroupingReason, Severity, WorkLog, SYSTEM_AUTHOR,
};
pub use types::change::{Change, ChangeScope, ChangeStatus, OverlapType};
pub use types::rule::{CorrelationMode, CorrelationRule, SimilarityConfig};
pub use types::topology::{Neighborhood, TopologyEdge, TopologyNode};
pub use types::views::{
    AlertDetail, ChangeDetail, RcaContext, RcaEdge, RcaGraphPayload, RcaNode, RelatedChange,
    RelatedChangesView, SubgraphNode, SubgraphView,
};
