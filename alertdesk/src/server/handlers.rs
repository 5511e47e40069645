// HTTP request handlers
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use alertdesk_shared::AlertId;

use crate::errors::DeskError;
use crate::server::state::AppState;

/// Body of operator actions. Comment is required only by `/comment`.
#[derive(Debug, Default, Deserialize)]
pub struct ActionRequest {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubgraphQuery {
    #[serde(default)]
    pub changes: bool,
}

impl IntoResponse for DeskError {
    fn into_response(self) -> Response {
        let status = match &self {
            DeskError::Validation(_) => StatusCode::BAD_REQUEST,
            DeskError::NotFound(_) => StatusCode::NOT_FOUND,
            DeskError::StoreTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            DeskError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            DeskError::ConsistencyViolation(_) | DeskError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            warn!(error = %self, "Request rejected");
        }
        (
            status,
            Json(json!({
                "status": "error",
                "message": self.to_string()
            })),
        )
            .into_response()
    }
}

fn parse_id(raw: &str) -> Result<AlertId, DeskError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| DeskError::validation(format!("invalid alert id: {}", raw)))
}

fn action(body: Option<Json<ActionRequest>>) -> ActionRequest {
    body.map(|Json(req)| req).unwrap_or_default()
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

pub async fn entity_subgraph(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<SubgraphQuery>,
) -> Result<impl IntoResponse, DeskError> {
    let view = state.desk.subgraph()?.build(&name, query.changes).await?;
    Ok(Json(view))
}

pub async fn view_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DeskError> {
    let id = parse_id(&id)?;
    Ok(Json(state.desk.operator.view(id).await?))
}

pub async fn correlate_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DeskError> {
    let id = parse_id(&id)?;
    let outcome = state.desk.grouping.correlate_by_id(id).await?;
    info!(alert = %id, outcome = ?outcome, "Correlation requested over HTTP");
    Ok(Json(outcome))
}

pub async fn clear_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<ActionRequest>>,
) -> Result<impl IntoResponse, DeskError> {
    let id = parse_id(&id)?;
    let req = action(body);
    let outcome = state
        .desk
        .closure
        .clear(id, &req.author, req.comment.as_deref())
        .await?;
    Ok(Json(outcome))
}

pub async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<ActionRequest>>,
) -> Result<impl IntoResponse, DeskError> {
    let id = parse_id(&id)?;
    let req = action(body);
    Ok(Json(state.desk.operator.acknowledge(id, &req.author).await?))
}

pub async fn unacknowledge_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<ActionRequest>>,
) -> Result<impl IntoResponse, DeskError> {
    let id = parse_id(&id)?;
    let req = action(body);
    Ok(Json(state.desk.operator.unacknowledge(id, &req.author).await?))
}

pub async fn comment_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<ActionRequest>>,
) -> Result<impl IntoResponse, DeskError> {
    let id = parse_id(&id)?;
    let req = action(body);
    let comment = req.comment.unwrap_or_default();
    let alert = state
        .desk
        .operator
        .add_comment(id, &req.author, &comment)
        .await?;
    Ok((StatusCode::CREATED, Json(alert)))
}

pub async fn rca_graph(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DeskError> {
    let id = parse_id(&id)?;
    Ok(Json(state.desk.rca.assemble(id).await?))
}

pub async fn related_changes(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, DeskError> {
    let id = parse_id(&id)?;
    Ok(Json(state.desk.related_changes.related(id).await?))
}
