// src/routes/slot_routes.rs

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use chrono::{NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{AppState, AppointmentStatus, AvailabilityDayRow, ServiceRow},
    scheduling::{self, slots::generate_slots, transitions, DayAvailability, DayConfig, MinuteWindow},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_slots))
}

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub date: NaiveDate,
    pub service_id: Uuid,
    pub staff_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SlotOut {
    pub start_time: String,
    pub end_time: String,
    pub available: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct StoredWindow {
    start_time: String,
    end_time: String,
}

fn to_window(start_time: &str, end_time: &str) -> Result<MinuteWindow, ApiError> {
    let start = scheduling::parse_hhmm(start_time)
        .map_err(|e| ApiError::Internal(format!("stored time malformed: {e}")))?;
    let end = scheduling::parse_hhmm(end_time)
        .map_err(|e| ApiError::Internal(format!("stored time malformed: {e}")))?;
    Ok(MinuteWindow::new(start, end))
}

/* ============================================================
   GET /api/slots?date&service_id[&staff_id]
   ============================================================ */

pub async fn get_slots(
    State(state): State<AppState>,
    Query(q): Query<SlotQuery>,
) -> Result<Json<Vec<SlotOut>>, ApiError> {
    // The generator itself never consults the clock; the no-past-slots
    // policy lives here, in shop-local time.
    let now = chrono::Utc::now().with_timezone(&state.shop_tz);
    let today = now.date_naive();
    if q.date < today {
        return Ok(Json(Vec::new()));
    }
    let not_before = if q.date == today {
        Some((now.hour() * 60 + now.minute()) as i32)
    } else {
        None
    };

    let Some(service) = sqlx::query_as::<_, ServiceRow>(
        r#"
        SELECT service_id, name, duration_min, price, active
        FROM service
        WHERE service_id = $1
        "#,
    )
    .bind(q.service_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    else {
        return Ok(Json(Vec::new()));
    };

    let day: Option<AvailabilityDayRow> = sqlx::query_as::<_, AvailabilityDayRow>(
        r#"
        SELECT availability_day_id, date, enabled, slot_size_min, staff_id
        FROM availability_day
        WHERE date = $1
          AND staff_id IS NOT DISTINCT FROM $2
        "#,
    )
    .bind(q.date)
    .bind(q.staff_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let config = match day {
        None => DayConfig::Unconfigured,
        Some(d) => {
            let stored: Vec<StoredWindow> = sqlx::query_as::<_, StoredWindow>(
                r#"
                SELECT start_time, end_time
                FROM availability_range
                WHERE availability_day_id = $1
                ORDER BY position ASC
                "#,
            )
            .bind(d.availability_day_id)
            .fetch_all(&state.db)
            .await
            .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

            let ranges = stored
                .iter()
                .map(|w| to_window(&w.start_time, &w.end_time))
                .collect::<Result<Vec<_>, _>>()?;
            DayConfig::Configured(DayAvailability {
                enabled: d.enabled,
                slot_size_min: d.slot_size_min,
                ranges,
            })
        }
    };

    // Shop-wide blocks always apply; staff-scoped blocks only when asking
    // about that staff member.
    let blocked: Vec<StoredWindow> = sqlx::query_as::<_, StoredWindow>(
        r#"
        SELECT start_time, end_time
        FROM block
        WHERE start_date <= $1
          AND end_date >= $1
          AND (staff_id IS NULL OR staff_id = $2)
        "#,
    )
    .bind(q.date)
    .bind(q.staff_id)
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    #[derive(Debug, sqlx::FromRow)]
    struct BusyRow {
        start_time: String,
        end_time: String,
        status: AppointmentStatus,
    }

    let busy: Vec<BusyRow> = sqlx::query_as::<_, BusyRow>(
        r#"
        SELECT start_time, end_time, status
        FROM appointment
        WHERE date = $1
          AND staff_id IS NOT DISTINCT FROM $2
        "#,
    )
    .bind(q.date)
    .bind(q.staff_id)
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let block_windows = blocked
        .iter()
        .map(|w| to_window(&w.start_time, &w.end_time))
        .collect::<Result<Vec<_>, _>>()?;
    let busy_windows = busy
        .iter()
        .filter(|a| transitions::occupies_slot(a.status))
        .map(|a| to_window(&a.start_time, &a.end_time))
        .collect::<Result<Vec<_>, _>>()?;

    let slots = generate_slots(&config, service.duration_min, &block_windows, &busy_windows);

    let out = slots
        .into_iter()
        .filter(|s| not_before.is_none_or(|cutoff| s.start_min >= cutoff))
        .map(|s| SlotOut {
            start_time: scheduling::format_hhmm(s.start_min),
            end_time: scheduling::format_hhmm(s.end_min),
            available: true,
        })
        .collect();

    Ok(Json(out))
}
