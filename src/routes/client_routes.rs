// src/routes/client_routes.rs

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AppState, ClientRow},
    phone,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_clients))
        .route("/lookup", get(lookup_client))
}

#[derive(Debug, Serialize)]
pub struct ClientOut {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ClientRow> for ClientOut {
    fn from(row: ClientRow) -> Self {
        ClientOut {
            id: row.client_id,
            name: row.name,
            phone: row.phone,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/* ============================================================
   GET /api/clients/lookup?phone=
   ============================================================ */

/// Public: the booking form prefills the name for returning clients.
/// A miss is the normal first-visit outcome, reported as 404.
pub async fn lookup_client(
    State(state): State<AppState>,
    Query(q): Query<LookupQuery>,
) -> Result<Json<ClientOut>, ApiError> {
    let normalized = phone::normalize(&q.phone);
    if normalized.is_empty() {
        return Err(ApiError::validation("phone is required"));
    }

    let row: ClientRow = sqlx::query_as::<_, ClientRow>(
        r#"
        SELECT client_id, name, phone, email, created_at
        FROM client
        WHERE phone = $1
        "#,
    )
    .bind(&normalized)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(|| ApiError::not_found("Client"))?;

    Ok(Json(row.into()))
}

/* ============================================================
   GET /api/clients?skip&limit
   ============================================================ */

pub async fn list_clients(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<ClientOut>>, ApiError> {
    let skip = q.skip.unwrap_or(0).max(0);
    let limit = q.limit.unwrap_or(100).clamp(1, 500);

    let rows: Vec<ClientRow> = sqlx::query_as::<_, ClientRow>(
        r#"
        SELECT client_id, name, phone, email, created_at
        FROM client
        ORDER BY created_at DESC
        OFFSET $1 LIMIT $2
        "#,
    )
    .bind(skip)
    .bind(limit)
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(rows.into_iter().map(ClientOut::from).collect()))
}
