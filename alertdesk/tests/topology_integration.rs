//! Integration tests for the incident subgraph, RCA payload and related changes.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use alertdesk::config::DeskConfig;
use alertdesk::rca::{RcaAssembler, AFFECTS, AFFECTS_ENTITY, TEMPORAL_OVERLAP};
use alertdesk::related_changes::RelatedChangesService;
use alertdesk::subgraph::SubgraphExtractor;
use alertdesk::DeskError;
use alertdesk_repository::{
    GraphStore, MemoryAlertStore, MemoryChangeStore, MemoryGraphStore, StoreError,
};
use alertdesk_shared::{
    Alert, Change, ChangeScope, ChangeStatus, Neighborhood, OverlapType, Severity, TopologyEdge,
    TopologyNode,
};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use uuid::Uuid;

fn graph(edges: &[(&str, &str, &str)]) -> Arc<MemoryGraphStore> {
    Arc::new(
        MemoryGraphStore::from_parts(
            Vec::<TopologyNode>::new(),
            edges.iter().map(|(s, t, r)| TopologyEdge::new(*s, *t, *r)),
        )
        .unwrap(),
    )
}

fn change(
    change_id: &str,
    status: ChangeStatus,
    entity: &str,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
) -> Change {
    Change {
        id: Uuid::new_v4(),
        change_id: change_id.to_string(),
        name: format!("{} rollout", change_id),
        change_type: "deployment".to_string(),
        status,
        implemented_by: "release-bot".to_string(),
        affected_entities: vec![entity.to_string()],
        start_time: start,
        end_time: end,
    }
}

fn names(view: &alertdesk_shared::SubgraphView) -> Vec<&str> {
    view.nodes.iter().map(|n| n.name.as_str()).collect()
}

#[tokio::test]
async fn test_subgraph_keeps_path_to_alerting_node_and_drops_quiet_branch() {
    let topology = graph(&[("root", "A", "USES"), ("A", "B", "USES"), ("root", "C", "USES")]);
    let alerts = Arc::new(MemoryAlertStore::with_alerts([
        Alert::new("B", "disk full", Some(Severity::Warn), Utc::now()),
        Alert::new("svc-b", "latency", Some(Severity::Critical), Utc::now()).with_host("B"),
    ]));
    let extractor = SubgraphExtractor::new(alerts, topology, DeskConfig::default());

    let view = extractor.build("root", false).await.unwrap();
    assert_eq!(view.root, "root");
    assert_eq!(names(&view), vec!["A", "B", "root"]);
    assert!(!view.contains("C"));

    let b = view.node("B").unwrap();
    assert!(b.has_alert);
    assert_eq!(b.alerts.len(), 2);
    assert_eq!(b.severity, Some(Severity::Critical));
    assert!(!view.node("A").unwrap().has_alert);

    assert_eq!(
        view.edges,
        vec![TopologyEdge::new("root", "A", "USES"), TopologyEdge::new("A", "B", "USES")]
    );
}

#[tokio::test]
async fn test_subgraph_includes_quiet_node_between_alerting_nodes() {
    let topology = graph(&[
        ("root", "B", "USES"),
        ("B", "M", "DEPENDS_ON"),
        ("M", "D", "DEPENDS_ON"),
        ("root", "E", "USES"),
        ("E", "D", "USES"),
        ("root", "Q", "USES"),
    ]);
    let alerts = Arc::new(MemoryAlertStore::with_alerts([
        Alert::new("B", "5xx spike", Some(Severity::Error), Utc::now()),
        Alert::new("D", "queue backlog", Some(Severity::Warn), Utc::now()),
    ]));
    let extractor = SubgraphExtractor::new(alerts, topology, DeskConfig::default());

    let view = extractor.build("root", false).await.unwrap();
    assert!(view.contains("M"));
    assert!(!view.node("M").unwrap().has_alert);
    assert!(!view.contains("Q"));
    assert!(view
        .edges
        .iter()
        .all(|e| view.contains(&e.source) && view.contains(&e.target)));
}

#[tokio::test]
async fn test_subgraph_without_alerting_nodes_is_empty() {
    let topology = graph(&[("root", "A", "USES")]);
    let extractor = SubgraphExtractor::new(
        Arc::new(MemoryAlertStore::new()),
        topology,
        DeskConfig::default(),
    );

    let view = extractor.build("root", false).await.unwrap();
    assert_eq!(view.root, "root");
    assert!(view.nodes.is_empty());
    assert!(view.edges.is_empty());
}

#[tokio::test]
async fn test_subgraph_unknown_root_is_not_found() {
    let extractor = SubgraphExtractor::new(
        Arc::new(MemoryAlertStore::new()),
        graph(&[("root", "A", "USES")]),
        DeskConfig::default(),
    );

    assert!(matches!(
        extractor.build("nowhere", false).await,
        Err(DeskError::NotFound(_))
    ));
    assert!(matches!(
        extractor.build("  ", false).await,
        Err(DeskError::Validation(_))
    ));
}

#[tokio::test]
async fn test_subgraph_change_overlay_marks_changed_nodes_interesting() {
    let topology = graph(&[("root", "A", "USES"), ("root", "C", "USES")]);
    let now = Utc::now();
    let changes = Arc::new(MemoryChangeStore::new([
        change("CHG-1", ChangeStatus::InProgress, "C", now - Duration::hours(1), None),
        change(
            "CHG-2",
            ChangeStatus::Completed,
            "A",
            now - Duration::hours(3),
            Some(now - Duration::hours(2)),
        ),
    ]));
    let extractor = SubgraphExtractor::new(
        Arc::new(MemoryAlertStore::new()),
        topology,
        DeskConfig::default(),
    )
    .with_changes(changes);

    let plain = extractor.build("root", false).await.unwrap();
    assert!(plain.nodes.is_empty());

    let overlaid = extractor.build("root", true).await.unwrap();
    assert_eq!(names(&overlaid), vec!["C", "root"]);
    let c = overlaid.node("C").unwrap();
    assert!(!c.has_alert);
    assert_eq!(c.changes.len(), 1);
    assert_eq!(c.changes[0].change_id, "CHG-1");
}

/// db-1 is used by app-1, which runs on host-9.
struct RcaFixture {
    alert: Alert,
    alerts: Arc<MemoryAlertStore>,
    changes: Arc<MemoryChangeStore>,
    graph: Arc<MemoryGraphStore>,
}

fn rca_fixture() -> RcaFixture {
    let now = Utc::now();
    let alert = Alert::new(
        "db-1",
        "replication lag",
        Some(Severity::Critical),
        now - Duration::minutes(30),
    );
    let changes = Arc::new(MemoryChangeStore::new([
        change("CHG-1", ChangeStatus::Completed, "db-1", now - Duration::minutes(60), None),
        change(
            "CHG-2",
            ChangeStatus::Completed,
            "host-9",
            now - Duration::minutes(10),
            Some(now - Duration::minutes(5)),
        ),
        change("CHG-3", ChangeStatus::Cancelled, "db-1", now - Duration::minutes(20), None),
        change(
            "CHG-4",
            ChangeStatus::Completed,
            "db-1",
            now - Duration::hours(3),
            Some(now - Duration::hours(2)),
        ),
    ]));
    RcaFixture {
        alerts: Arc::new(MemoryAlertStore::with_alerts([alert.clone()])),
        alert,
        changes,
        graph: graph(&[("app-1", "db-1", "USES"), ("app-1", "host-9", "RUNS_ON")]),
    }
}

#[tokio::test]
async fn test_rca_payload_overlays_direct_and_neighbor_changes() {
    let fx = rca_fixture();
    let assembler = RcaAssembler::new(
        fx.alerts.clone(),
        Some(fx.graph.clone()),
        fx.changes.clone(),
        DeskConfig::default(),
    );

    let payload = assembler.assemble(fx.alert.id).await.unwrap();
    let alert_node = format!("alert:{}", fx.alert.display_id());
    assert_eq!(payload.rca_context.alert_id, fx.alert.display_id());
    assert_eq!(payload.rca_context.session_id, fx.alert.display_id());
    assert_eq!(payload.rca_context.root_entity_id, "db-1");

    let mut ids: Vec<&str> = payload.nodes.iter().map(|n| n.id.as_str()).collect();
    ids.sort();
    let mut expected = vec![
        alert_node.as_str(),
        "change:CHG-1",
        "change:CHG-2",
        "entity:app-1",
        "entity:db-1",
        "entity:host-9",
    ];
    expected.sort();
    assert_eq!(ids, expected);

    let root = payload.node("entity:db-1").unwrap();
    assert_eq!(root.attributes["is_root"], json!(true));
    let direct = payload.node("change:CHG-1").unwrap();
    assert_eq!(direct.attributes["scope"], json!("direct"));
    assert_eq!(direct.attributes["hop_distance"], json!(0));
    let neighbor = payload.node("change:CHG-2").unwrap();
    assert_eq!(neighbor.attributes["scope"], json!("neighbor"));
    assert_eq!(neighbor.attributes["hop_distance"], json!(2));

    assert_eq!(payload.edges_of_type(AFFECTS_ENTITY).count(), 1);
    assert_eq!(payload.edges_of_type("USES").count(), 1);
    assert_eq!(payload.edges_of_type("RUNS_ON").count(), 1);
    let affects: Vec<(&str, &str)> = payload
        .edges_of_type(AFFECTS)
        .map(|e| (e.from.as_str(), e.to.as_str()))
        .collect();
    assert!(affects.contains(&("change:CHG-1", "entity:db-1")));
    assert!(affects.contains(&("change:CHG-2", "entity:host-9")));

    let overlap = |change: &str| {
        payload
            .edges_of_type(TEMPORAL_OVERLAP)
            .find(|e| e.from == change)
            .and_then(|e| e.attributes.as_ref())
            .map(|a| a["overlap_type"].clone())
    };
    assert_eq!(overlap("change:CHG-1"), Some(json!("before_alert")));
    assert_eq!(overlap("change:CHG-2"), Some(json!("during_alert")));
    assert!(payload
        .edges_of_type(TEMPORAL_OVERLAP)
        .all(|e| e.to == alert_node));
}

#[tokio::test]
async fn test_rca_without_graph_store_keeps_alert_and_direct_changes() {
    let fx = rca_fixture();
    let assembler = RcaAssembler::new(
        fx.alerts.clone(),
        None,
        fx.changes.clone(),
        DeskConfig::default(),
    );

    let payload = assembler.assemble(fx.alert.id).await.unwrap();
    assert_eq!(payload.nodes.len(), 3);
    assert!(payload.node("entity:db-1").is_some());
    assert!(payload.node("change:CHG-1").is_some());
    assert!(payload.node("change:CHG-2").is_none());
    assert_eq!(payload.edges.len(), 3);
}

#[tokio::test]
async fn test_rca_unknown_alert_is_not_found() {
    let fx = rca_fixture();
    let assembler = RcaAssembler::new(fx.alerts, Some(fx.graph), fx.changes, DeskConfig::default());
    assert!(matches!(
        assembler.assemble(Uuid::new_v4()).await,
        Err(DeskError::NotFound(_))
    ));
}

// Graph store that is down, or hangs far beyond any budget
struct BrokenGraph {
    hang: bool,
}

#[async_trait::async_trait]
impl GraphStore for BrokenGraph {
    async fn neighborhood(
        &self,
        _root: &str,
        _max_hops: u32,
    ) -> Result<Option<Neighborhood>, StoreError> {
        if self.hang {
            tokio::time::sleep(StdDuration::from_secs(3600)).await;
        }
        Err(StoreError::unavailable("connection refused"))
    }

    async fn shortest_path(
        &self,
        _from: &str,
        _to: &str,
        _max_hops: u32,
    ) -> Result<Option<Vec<String>>, StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }
}

#[tokio::test]
async fn test_rca_degrades_when_graph_store_is_down() {
    let fx = rca_fixture();
    let assembler = RcaAssembler::new(
        fx.alerts,
        Some(Arc::new(BrokenGraph { hang: false })),
        fx.changes,
        DeskConfig::default(),
    );

    let payload = assembler.assemble(fx.alert.id).await.unwrap();
    assert!(payload.node("entity:db-1").is_some());
    assert!(payload.node("entity:app-1").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_rca_graph_timeout_fails_the_request() {
    let fx = rca_fixture();
    let config = DeskConfig {
        graph_timeout: StdDuration::from_secs(2),
        ..DeskConfig::default()
    };
    let assembler = RcaAssembler::new(
        fx.alerts,
        Some(Arc::new(BrokenGraph { hang: true })),
        fx.changes,
        config,
    );

    assert!(matches!(
        assembler.assemble(fx.alert.id).await,
        Err(DeskError::StoreTimeout(_))
    ));
}

#[tokio::test]
async fn test_related_changes_split_direct_and_neighbor() {
    let fx = rca_fixture();
    let service = RelatedChangesService::new(
        fx.alerts,
        Some(fx.graph),
        fx.changes,
        DeskConfig::default(),
    );

    let view = service.related(fx.alert.id).await.unwrap();
    assert_eq!(view.root_entity_id, "db-1");

    assert_eq!(view.direct_changes.len(), 1);
    let direct = &view.direct_changes[0];
    assert_eq!(direct.change_id, "CHG-1");
    assert_eq!(direct.change_scope, ChangeScope::Direct);
    assert_eq!(direct.overlap_type, OverlapType::BeforeAlert);
    assert_eq!(direct.hop_distance, 0);

    assert_eq!(view.neighbor_changes.len(), 1);
    let neighbor = &view.neighbor_changes[0];
    assert_eq!(neighbor.change_id, "CHG-2");
    assert_eq!(neighbor.affected_entity_id, "host-9");
    assert_eq!(neighbor.hop_distance, 2);
    assert_eq!(neighbor.overlap_type, OverlapType::DuringAlert);
}
