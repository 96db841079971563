// src/routes/block_routes.rs

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AppState, BlockRow, OkResponse},
    scheduling,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_blocks).post(create_block))
        .route("/{block_id}", axum::routing::delete(delete_block))
}

#[derive(Debug, Serialize)]
pub struct BlockOut {
    pub id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub reason: Option<String>,
    pub staff_id: Option<Uuid>,
}

impl From<BlockRow> for BlockOut {
    fn from(row: BlockRow) -> Self {
        BlockOut {
            id: row.block_id,
            start_date: row.start_date,
            end_date: row.end_date,
            start_time: row.start_time,
            end_time: row.end_time,
            reason: row.reason,
            staff_id: row.staff_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateBlockRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub reason: Option<String>,
    pub staff_id: Option<Uuid>,
}

pub async fn list_blocks(State(state): State<AppState>) -> Result<Json<Vec<BlockOut>>, ApiError> {
    let rows: Vec<BlockRow> = sqlx::query_as::<_, BlockRow>(
        r#"
        SELECT block_id, start_date, end_date, start_time, end_time, reason, staff_id
        FROM block
        ORDER BY start_date ASC, start_time ASC
        "#,
    )
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(rows.into_iter().map(BlockOut::from).collect()))
}

/// Blocks only stop new bookings; appointments already inside the window
/// are left alone (the dashboard warns about them, the engine does not).
pub async fn create_block(
    State(state): State<AppState>,
    _auth: AuthContext,
    Json(req): Json<CreateBlockRequest>,
) -> Result<Json<BlockOut>, ApiError> {
    if req.start_date > req.end_date {
        return Err(ApiError::validation("start_date must be on or before end_date"));
    }
    let start = scheduling::parse_hhmm(&req.start_time)
        .map_err(|e| ApiError::validation(e.to_string()))?;
    let end = scheduling::parse_hhmm(&req.end_time)
        .map_err(|e| ApiError::validation(e.to_string()))?;
    if start >= end {
        return Err(ApiError::validation("start_time must be before end_time"));
    }

    let row: BlockRow = sqlx::query_as::<_, BlockRow>(
        r#"
        INSERT INTO block (start_date, end_date, start_time, end_time, reason, staff_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING block_id, start_date, end_date, start_time, end_time, reason, staff_id
        "#,
    )
    .bind(req.start_date)
    .bind(req.end_date)
    .bind(&req.start_time)
    .bind(&req.end_time)
    .bind(req.reason.as_deref())
    .bind(req.staff_id)
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(row.into()))
}

pub async fn delete_block(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(block_id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    let rows = sqlx::query(r#"DELETE FROM block WHERE block_id = $1"#)
        .bind(block_id)
        .execute(&state.db)
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    if rows.rows_affected() == 0 {
        return Err(ApiError::not_found("Block"));
    }

    Ok(Json(OkResponse::new()))
}
