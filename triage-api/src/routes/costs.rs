use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use crate::{
    adapters::inbound::http::CostsResponse,
    app_state::AppState,
};

use super::ApiError;

const DEFAULT_DAYS: u32 = 30;
const MAX_DAYS: u32 = 365;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(costs))
}

#[derive(Debug, Deserialize)]
struct CostsQuery {
    days: Option<u32>,
}

#[instrument(name = "GET /costs", skip(app_state))]
async fn costs(
    State(app_state): State<AppState>,
    Query(query): Query<CostsQuery>,
) -> Result<Json<CostsResponse>, ApiError> {
    let days = query.days.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS);
    let (summary, records) = app_state.triage_service.costs(days).await?;

    Ok(Json(CostsResponse {
        days,
        summary,
        daily: records.into_iter().map(Into::into).collect(),
    }))
}
