use crate::api::AppState;
use crate::error::AppError;
use crate::orchestration::RunSummary;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 500;

#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct RunsResponse {
    pub runs: Vec<RunSummary>,
}

/// Most recent reconciliation runs.
pub async fn get_runs(
    Query(params): Query<RunsQuery>,
    State(state): State<AppState>,
) -> Result<Json<RunsResponse>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 || limit > MAX_LIMIT {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_LIMIT
        )));
    }

    let runs = state.repo.query_runs(limit).await?;
    Ok(Json(RunsResponse { runs }))
}
