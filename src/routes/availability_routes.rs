// src/routes/availability_routes.rs

use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AppState, AvailabilityDayRow, AvailabilityRangeRow},
    scheduling::{self, MinuteWindow},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_availability))
        .route("/{date}", axum::routing::put(put_availability))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangePayload {
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityOut {
    pub id: Uuid,
    pub date: NaiveDate,
    pub enabled: bool,
    pub slot_size_min: i32,
    pub staff_id: Option<Uuid>,
    pub ranges: Vec<RangePayload>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    #[serde(rename = "from")]
    pub from_date: NaiveDate,
    #[serde(rename = "to")]
    pub to_date: NaiveDate,
    pub staff_id: Option<Uuid>,
}

/// Full-overwrite payload: the stored day becomes exactly this.
#[derive(Debug, Deserialize)]
pub struct AvailabilityWrite {
    pub enabled: bool,
    pub slot_size_min: i32,
    pub ranges: Vec<RangePayload>,
    pub staff_id: Option<Uuid>,
}

fn parse_ranges(ranges: &[RangePayload]) -> Result<Vec<MinuteWindow>, ApiError> {
    ranges
        .iter()
        .map(|r| {
            let start = scheduling::parse_hhmm(&r.start_time)
                .map_err(|e| ApiError::validation(e.to_string()))?;
            let end = scheduling::parse_hhmm(&r.end_time)
                .map_err(|e| ApiError::validation(e.to_string()))?;
            Ok(MinuteWindow::new(start, end))
        })
        .collect()
}

/* ============================================================
   GET /api/availability?from&to[&staff_id]
   ============================================================ */

/// Returns only explicitly configured days; absent dates are closed and
/// are never synthesized here.
pub async fn get_availability(
    State(state): State<AppState>,
    Query(q): Query<AvailabilityQuery>,
) -> Result<Json<Vec<AvailabilityOut>>, ApiError> {
    if q.from_date > q.to_date {
        return Err(ApiError::validation("from must be on or before to"));
    }

    let days: Vec<AvailabilityDayRow> = sqlx::query_as::<_, AvailabilityDayRow>(
        r#"
        SELECT availability_day_id, date, enabled, slot_size_min, staff_id
        FROM availability_day
        WHERE date >= $1
          AND date <= $2
          AND staff_id IS NOT DISTINCT FROM $3
        ORDER BY date ASC
        "#,
    )
    .bind(q.from_date)
    .bind(q.to_date)
    .bind(q.staff_id)
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let ranges: Vec<AvailabilityRangeRow> = sqlx::query_as::<_, AvailabilityRangeRow>(
        r#"
        SELECT r.availability_day_id, r.start_time, r.end_time
        FROM availability_range r
        JOIN availability_day d ON d.availability_day_id = r.availability_day_id
        WHERE d.date >= $1
          AND d.date <= $2
          AND d.staff_id IS NOT DISTINCT FROM $3
        ORDER BY r.position ASC
        "#,
    )
    .bind(q.from_date)
    .bind(q.to_date)
    .bind(q.staff_id)
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let mut by_day: HashMap<Uuid, Vec<RangePayload>> = HashMap::new();
    for r in ranges {
        by_day.entry(r.availability_day_id).or_default().push(RangePayload {
            start_time: r.start_time,
            end_time: r.end_time,
        });
    }

    let out = days
        .into_iter()
        .map(|d| AvailabilityOut {
            ranges: by_day.remove(&d.availability_day_id).unwrap_or_default(),
            id: d.availability_day_id,
            date: d.date,
            enabled: d.enabled,
            slot_size_min: d.slot_size_min,
            staff_id: d.staff_id,
        })
        .collect();

    Ok(Json(out))
}

/* ============================================================
   PUT /api/availability/{date}
   ============================================================ */

pub async fn put_availability(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(date): Path<NaiveDate>,
    Json(req): Json<AvailabilityWrite>,
) -> Result<Json<AvailabilityOut>, ApiError> {
    let windows = parse_ranges(&req.ranges)?;
    scheduling::validate_day(req.slot_size_min, &windows)
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let mut tx = state
        .db
        .begin()
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let existing: Option<Uuid> = sqlx::query_scalar(
        r#"
        SELECT availability_day_id
        FROM availability_day
        WHERE date = $1
          AND staff_id IS NOT DISTINCT FROM $2
        "#,
    )
    .bind(date)
    .bind(req.staff_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let day_id = match existing {
        Some(id) => {
            sqlx::query(
                r#"
                UPDATE availability_day
                SET enabled = $2, slot_size_min = $3
                WHERE availability_day_id = $1
                "#,
            )
            .bind(id)
            .bind(req.enabled)
            .bind(req.slot_size_min)
            .execute(&mut *tx)
            .await
            .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

            sqlx::query(r#"DELETE FROM availability_range WHERE availability_day_id = $1"#)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

            id
        }
        None => sqlx::query_scalar(
            r#"
            INSERT INTO availability_day (date, enabled, slot_size_min, staff_id)
            VALUES ($1, $2, $3, $4)
            RETURNING availability_day_id
            "#,
        )
        .bind(date)
        .bind(req.enabled)
        .bind(req.slot_size_min)
        .bind(req.staff_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?,
    };

    // Stored order is presentation order for the calendar UI.
    for (position, r) in req.ranges.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO availability_range (availability_day_id, position, start_time, end_time)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(day_id)
        .bind(position as i32)
        .bind(&r.start_time)
        .bind(&r.end_time)
        .execute(&mut *tx)
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;
    }

    tx.commit()
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(AvailabilityOut {
        id: day_id,
        date,
        enabled: req.enabled,
        slot_size_min: req.slot_size_min,
        staff_id: req.staff_id,
        ranges: req.ranges,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(ranges: &[(&str, &str)]) -> Vec<RangePayload> {
        ranges
            .iter()
            .map(|(s, e)| RangePayload {
                start_time: s.to_string(),
                end_time: e.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_parse_ranges_accepts_wire_times() {
        let windows = parse_ranges(&payload(&[("10:00", "13:00"), ("14:45", "21:30")])).unwrap();
        assert_eq!(windows[0], MinuteWindow::new(600, 780));
        assert_eq!(windows[1], MinuteWindow::new(885, 1290));
    }

    #[test]
    fn test_parse_ranges_rejects_garbage() {
        assert!(parse_ranges(&payload(&[("10am", "13:00")])).is_err());
        assert!(parse_ranges(&payload(&[("10:00", "25:00")])).is_err());
    }
}
