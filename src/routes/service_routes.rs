// src/routes/service_routes.rs

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AppState, OkResponse, ServiceRow},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_services).post(create_service))
        .route("/{service_id}", axum::routing::put(update_service).delete(delete_service))
}

#[derive(Debug, Serialize)]
pub struct ServiceOut {
    pub id: Uuid,
    pub name: String,
    pub duration_min: i32,
    pub price: Option<f64>,
    pub active: bool,
}

impl From<ServiceRow> for ServiceOut {
    fn from(row: ServiceRow) -> Self {
        ServiceOut {
            id: row.service_id,
            name: row.name,
            duration_min: row.duration_min,
            price: row.price,
            active: row.active,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub duration_min: i32,
    pub price: Option<f64>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub duration_min: Option<i32>,
    pub price: Option<f64>,
    pub active: Option<bool>,
}

fn validate_duration(duration_min: i32) -> Result<(), ApiError> {
    if duration_min <= 0 {
        return Err(ApiError::validation("duration_min must be a positive integer"));
    }
    Ok(())
}

fn validate_price(price: Option<f64>) -> Result<(), ApiError> {
    if let Some(p) = price {
        if p < 0.0 || !p.is_finite() {
            return Err(ApiError::validation("price must be non-negative"));
        }
    }
    Ok(())
}

/* ============================================================
   GET /api/services  (public: the booking flow lists these)
   ============================================================ */

pub async fn list_services(
    State(state): State<AppState>,
) -> Result<Json<Vec<ServiceOut>>, ApiError> {
    let rows: Vec<ServiceRow> = sqlx::query_as::<_, ServiceRow>(
        r#"
        SELECT service_id, name, duration_min, price, active
        FROM service
        WHERE active = true
        ORDER BY name ASC
        "#,
    )
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(rows.into_iter().map(ServiceOut::from).collect()))
}

/* ============================================================
   POST /api/services
   ============================================================ */

pub async fn create_service(
    State(state): State<AppState>,
    _auth: AuthContext,
    Json(req): Json<CreateServiceRequest>,
) -> Result<Json<ServiceOut>, ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("name is required"));
    }
    validate_duration(req.duration_min)?;
    validate_price(req.price)?;

    let row: ServiceRow = sqlx::query_as::<_, ServiceRow>(
        r#"
        INSERT INTO service (name, duration_min, price, active)
        VALUES ($1, $2, $3, $4)
        RETURNING service_id, name, duration_min, price, active
        "#,
    )
    .bind(name)
    .bind(req.duration_min)
    .bind(req.price)
    .bind(req.active.unwrap_or(true))
    .fetch_one(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(row.into()))
}

/* ============================================================
   PUT /api/services/{id}  (partial update)
   ============================================================ */

pub async fn update_service(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(service_id): Path<Uuid>,
    Json(req): Json<UpdateServiceRequest>,
) -> Result<Json<ServiceOut>, ApiError> {
    if let Some(d) = req.duration_min {
        validate_duration(d)?;
    }
    validate_price(req.price)?;
    let name = match &req.name {
        Some(n) => {
            let n = n.trim();
            if n.is_empty() {
                return Err(ApiError::validation("name must not be empty"));
            }
            Some(n.to_string())
        }
        None => None,
    };

    let row: Option<ServiceRow> = sqlx::query_as::<_, ServiceRow>(
        r#"
        UPDATE service
        SET
          name         = COALESCE($2, name),
          duration_min = COALESCE($3, duration_min),
          price        = COALESCE($4, price),
          active       = COALESCE($5, active)
        WHERE service_id = $1
        RETURNING service_id, name, duration_min, price, active
        "#,
    )
    .bind(service_id)
    .bind(name)
    .bind(req.duration_min)
    .bind(req.price)
    .bind(req.active)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let row = row.ok_or_else(|| ApiError::not_found("Service"))?;
    Ok(Json(row.into()))
}

/* ============================================================
   DELETE /api/services/{id}
   ============================================================ */

/// Services referenced by historical appointments are never removed;
/// deletion deactivates, which hides the service from the booking flow.
pub async fn delete_service(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(service_id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    let rows = sqlx::query(
        r#"
        UPDATE service
        SET active = false
        WHERE service_id = $1
        "#,
    )
    .bind(service_id)
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    if rows.rows_affected() == 0 {
        return Err(ApiError::not_found("Service"));
    }

    Ok(Json(OkResponse::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_duration() {
        assert!(validate_duration(45).is_ok());
        assert!(validate_duration(0).is_err());
        assert!(validate_duration(-30).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(None).is_ok());
        assert!(validate_price(Some(0.0)).is_ok());
        assert!(validate_price(Some(1500.0)).is_ok());
        assert!(validate_price(Some(-1.0)).is_err());
        assert!(validate_price(Some(f64::NAN)).is_err());
    }
}
