//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use alertdesk::config::DeskConfig;
use alertdesk::server::create_app;
use alertdesk::{Desk, Stores};
use alertdesk_repository::{
    GraphStore, MemoryAlertStore, MemoryChangeStore, MemoryGraphStore, MemoryRuleStore,
};
use alertdesk_shared::{Alert, Severity, TopologyEdge, TopologyNode};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(alerts: Vec<Alert>, with_graph: bool) -> Router {
    let graph = MemoryGraphStore::from_parts(
        Vec::<TopologyNode>::new(),
        [TopologyEdge::new("app-1", "db-1", "USES")],
    )
    .unwrap();
    let stores = Stores {
        alerts: Arc::new(MemoryAlertStore::with_alerts(alerts)),
        rules: Arc::new(MemoryRuleStore::new([])),
        changes: Arc::new(MemoryChangeStore::new([])),
        graph: with_graph.then(|| Arc::new(graph) as Arc<dyn GraphStore>),
    };
    let desk = Desk::new(stores, DeskConfig::default());
    create_app(Arc::new(desk), &["http://localhost:3000".to_string()])
}

async fn call(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app.oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health() {
    let (status, body) = call(app(vec![], true), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_malformed_alert_id_is_bad_request() {
    let (status, body) = call(app(vec![], true), Method::GET, "/alerts/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_unknown_alert_and_entity_are_not_found() {
    let id = uuid::Uuid::new_v4();
    let (status, _) = call(app(vec![], true), Method::GET, &format!("/alerts/{}/rca", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(app(vec![], true), Method::GET, "/entity/nowhere", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_entity_subgraph_without_graph_store_is_unavailable() {
    let (status, _) = call(app(vec![], false), Method::GET, "/entity/db-1", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_entity_subgraph_renders_alerting_nodes() {
    let alert = Alert::new("db-1", "replication lag", Some(Severity::Critical), Utc::now());
    let (status, body) = call(
        app(vec![alert], true),
        Method::GET,
        "/entity/app-1?changes=true",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["root"], "app-1");
    assert_eq!(body["nodes"].as_array().unwrap().len(), 2);
    assert_eq!(body["edges"][0]["type"], "USES");
}

#[tokio::test]
async fn test_clear_requires_author_and_reports_cascade() {
    let alert = Alert::new("db-1", "replication lag", None, Utc::now());
    let uri = format!("/alerts/{}/clear", alert.id);

    let (status, _) = call(app(vec![alert.clone()], true), Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        app(vec![alert], true),
        Method::POST,
        &uri,
        Some(json!({ "author": "alice", "comment": "failover done" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cascade"], "standalone");
}

#[tokio::test]
async fn test_comment_and_correlate_routes() {
    let alert = Alert::new("db-1", "replication lag", None, Utc::now());
    let app = app(vec![alert.clone()], true);

    let (status, body) = call(
        app.clone(),
        Method::POST,
        &format!("/alerts/{}/comment", alert.id),
        Some(json!({ "author": "bob", "comment": "paging dba" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["worklogs"][0]["comment"], "paging dba");

    let (status, body) = call(
        app,
        Method::POST,
        &format!("/alerts/{}/correlate", alert.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "no_match");
}
