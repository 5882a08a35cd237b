use crate::api::AppState;
use crate::domain::{FormattedPosition, Symbol, TimeMs};
use crate::error::AppError;
use crate::report;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const DEFAULT_LIMIT: u32 = 100;
const MAX_LIMIT: u32 = 1000;
const EXPORT_LIMIT: u32 = 100_000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsQuery {
    pub symbol: Option<String>,
    pub from_ms: Option<i64>,
    pub to_ms: Option<i64>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsHistoryResponse {
    pub positions: Vec<FormattedPosition>,
}

struct PositionFilter {
    symbol: Option<Symbol>,
    from_ms: Option<TimeMs>,
    to_ms: Option<TimeMs>,
}

impl PositionsQuery {
    fn filter(&self) -> Result<PositionFilter, AppError> {
        let symbol = match self.symbol.as_deref() {
            Some(s) => Some(
                Symbol::from_str(s).map_err(|_| AppError::BadRequest("Invalid symbol".into()))?,
            ),
            None => None,
        };

        let from_ms = self.from_ms.map(TimeMs::new);
        let to_ms = self.to_ms.map(TimeMs::new);
        if let (Some(from_ms), Some(to_ms)) = (from_ms, to_ms) {
            if from_ms > to_ms {
                return Err(AppError::BadRequest("fromMs must be <= toMs".into()));
            }
        }

        Ok(PositionFilter {
            symbol,
            from_ms,
            to_ms,
        })
    }

    fn limit(&self) -> Result<u32, AppError> {
        match self.limit {
            None => Ok(DEFAULT_LIMIT),
            Some(0) => Err(AppError::BadRequest("limit must be positive".into())),
            Some(n) if n > MAX_LIMIT => Err(AppError::BadRequest(format!(
                "limit must be <= {}",
                MAX_LIMIT
            ))),
            Some(n) => Ok(n),
        }
    }
}

/// Stored positions by close time, newest first.
pub async fn get_positions_history(
    Query(params): Query<PositionsQuery>,
    State(state): State<AppState>,
) -> Result<Json<PositionsHistoryResponse>, AppError> {
    let filter = params.filter()?;
    let limit = params.limit()?;

    let positions = state
        .repo
        .query_positions(filter.symbol.as_ref(), filter.from_ms, filter.to_ms, limit)
        .await
        .map_err(|e| AppError::Internal(format!("Position query failed: {}", e)))?;

    Ok(Json(PositionsHistoryResponse { positions }))
}

/// Reject a selection that does not fit in one export. `rows` is the result
/// of a query capped at `limit + 1`.
fn ensure_export_fits(rows: usize, limit: u32) -> Result<(), AppError> {
    if rows > limit as usize {
        return Err(AppError::BadRequest(format!(
            "export exceeds {} positions, narrow fromMs/toMs",
            limit
        )));
    }
    Ok(())
}

/// CSV of stored positions in close-time order.
pub async fn export_positions(
    Query(params): Query<PositionsQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let filter = params.filter()?;

    let mut positions = state
        .repo
        .query_positions(
            filter.symbol.as_ref(),
            filter.from_ms,
            filter.to_ms,
            EXPORT_LIMIT + 1,
        )
        .await
        .map_err(|e| AppError::Internal(format!("Position query failed: {}", e)))?;
    ensure_export_fits(positions.len(), EXPORT_LIMIT)?;
    positions.reverse();

    let body = report::to_csv_bytes(&positions)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"positions.csv\"",
            ),
        ],
        body,
    )
        .into_response())
}
