use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Path, State},
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    adapters::inbound::http::{BatchStartedResponse, BatchStatusResponse, CancelResponse},
    app_state::AppState,
    domain::models::ProjectId,
};

use super::{client_key, ApiError};

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/:project",
        post(start_batch).get(batch_status).delete(cancel_batch),
    )
}

#[instrument(name = "POST /triage/batch", skip(app_state, connect_info))]
async fn start_batch(
    State(app_state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Path(project): Path<String>,
) -> Result<Json<BatchStartedResponse>, ApiError> {
    app_state.batch_limiter.check(&client_key(connect_info))?;

    let handle = app_state
        .batch_service
        .start(&ProjectId::new(project))
        .await?;
    Ok(Json(handle.into()))
}

#[instrument(name = "GET /triage/batch", skip(app_state))]
async fn batch_status(
    State(app_state): State<AppState>,
    Path(project): Path<String>,
) -> Json<BatchStatusResponse> {
    let status = app_state
        .batch_service
        .status(&ProjectId::new(project))
        .await;
    Json(status.into())
}

#[instrument(name = "DELETE /triage/batch", skip(app_state))]
async fn cancel_batch(
    State(app_state): State<AppState>,
    Path(project): Path<String>,
) -> Json<CancelResponse> {
    let cancelled = app_state
        .batch_service
        .cancel(&ProjectId::new(project))
        .await;
    Json(CancelResponse { cancelled })
}
