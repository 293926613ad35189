use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use crate::{
    adapters::inbound::http::{AnalyzeResponse, DashboardResponse, StoredVerdictResponse},
    app_state::AppState,
    domain::{
        models::{IssueKey, ProjectId},
        ports::inbound::TriageOptions,
    },
};

use super::{client_key, ApiError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/analyze/:project/:issue_number", post(analyze))
        .route("/issue/:project/:issue_number", get(current_verdict))
        .route("/dashboard/:project", get(dashboard))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeQuery {
    #[serde(default)]
    force: bool,
}

#[instrument(name = "POST /triage/analyze", skip(app_state, connect_info))]
async fn analyze(
    State(app_state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Path((project, issue_number)): Path<(String, i32)>,
    Query(query): Query<AnalyzeQuery>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    app_state
        .analyze_limiter
        .check(&client_key(connect_info))?;

    let key = IssueKey::new(project, issue_number);
    let outcome = app_state
        .triage_service
        .analyze(&key, TriageOptions { force: query.force })
        .await?;

    Ok(Json(outcome.into()))
}

#[instrument(name = "GET /triage/issue", skip(app_state))]
async fn current_verdict(
    State(app_state): State<AppState>,
    Path((project, issue_number)): Path<(String, i32)>,
) -> Result<Json<StoredVerdictResponse>, ApiError> {
    let stored = app_state
        .triage_service
        .current_verdict(&IssueKey::new(project, issue_number))
        .await?;
    Ok(Json(stored.into()))
}

#[instrument(name = "GET /triage/dashboard", skip(app_state))]
async fn dashboard(
    State(app_state): State<AppState>,
    Path(project): Path<String>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let dashboard = app_state
        .triage_service
        .dashboard(&ProjectId::new(project))
        .await?;
    Ok(Json(dashboard.into()))
}
