// src/routes/appointment_routes.rs

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, put},
};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::auth_context::AuthContext,
    models::{AppState, AppointmentRow, AppointmentStatus, OkResponse, ServiceRow},
    notify::messages,
    phone,
    scheduling::{self, transitions, MinuteWindow},
};

use super::service_routes::ServiceOut;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_appointments).post(create_appointment))
        .route("/{appointment_id}", patch(patch_appointment).delete(delete_appointment))
        .route("/{appointment_id}/cancel", put(cancel_appointment))
        .route("/{appointment_id}/confirm", put(confirm_appointment))
        .route("/{appointment_id}/finish", put(finish_appointment))
        .route("/{appointment_id}/reschedule", put(reschedule_appointment))
}

/* ============================================================
   DTOs
   ============================================================ */

#[derive(Debug, Serialize)]
pub struct AppointmentOut {
    pub id: Uuid,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub service_id: Uuid,
    pub staff_id: Option<Uuid>,
    pub client_name: String,
    pub client_phone: String,
    pub note: Option<String>,
    pub status: AppointmentStatus,
    pub is_paid: bool,
    pub service: Option<ServiceOut>,
}

#[derive(Debug, Deserialize)]
pub struct AppointmentCreate {
    pub date: NaiveDate,
    pub start_time: String,
    pub service_id: Uuid,
    pub staff_id: Option<Uuid>,
    pub client_name: String,
    pub client_phone: String,
    pub note: Option<String>,
    pub is_paid: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct AppointmentUpdate {
    pub status: Option<AppointmentStatus>,
    pub is_paid: Option<bool>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AppointmentReschedule {
    pub date: NaiveDate,
    pub start_time: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "from")]
    pub from_date: Option<NaiveDate>,
    #[serde(rename = "to")]
    pub to_date: Option<NaiveDate>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct FinishQuery {
    pub is_paid: Option<bool>,
}

#[derive(Debug, sqlx::FromRow)]
struct AppointmentJoinRow {
    appointment_id: Uuid,
    date: NaiveDate,
    start_time: String,
    end_time: String,
    service_id: Uuid,
    staff_id: Option<Uuid>,
    client_name: String,
    client_phone: String,
    note: Option<String>,
    status: AppointmentStatus,
    is_paid: bool,
    service_name: String,
    service_duration_min: i32,
    service_price: Option<f64>,
    service_active: bool,
}

impl From<AppointmentJoinRow> for AppointmentOut {
    fn from(r: AppointmentJoinRow) -> Self {
        AppointmentOut {
            id: r.appointment_id,
            date: r.date,
            start_time: r.start_time,
            end_time: r.end_time,
            service_id: r.service_id,
            staff_id: r.staff_id,
            client_name: r.client_name,
            client_phone: r.client_phone,
            note: r.note,
            status: r.status,
            is_paid: r.is_paid,
            service: Some(ServiceOut {
                id: r.service_id,
                name: r.service_name,
                duration_min: r.service_duration_min,
                price: r.service_price,
                active: r.service_active,
            }),
        }
    }
}

const APPOINTMENT_JOIN_SELECT: &str = r#"
    SELECT
      a.appointment_id,
      a.date,
      a.start_time,
      a.end_time,
      a.service_id,
      a.staff_id,
      a.client_name,
      a.client_phone,
      a.note,
      a.status,
      a.is_paid,
      s.name         AS service_name,
      s.duration_min AS service_duration_min,
      s.price        AS service_price,
      s.active       AS service_active
    FROM appointment a
    JOIN service s ON s.service_id = a.service_id
"#;

/* ============================================================
   Helpers
   ============================================================ */

/// Advisory-lock key for one calendar day: concurrent creates for the same
/// date serialize on this, so both re-check occupancy against a settled
/// ledger before inserting.
fn date_lock_key(date: NaiveDate) -> i64 {
    date.num_days_from_ce() as i64
}

/// The interval a booking occupies: tiled start plus the full service
/// duration. Times of day top out at 23:59, so the occupied interval must
/// end before midnight.
fn occupied_window(start_min: i32, duration_min: i32) -> Result<MinuteWindow, ApiError> {
    let end_min = start_min + duration_min;
    if end_min >= 24 * 60 {
        return Err(ApiError::validation("appointment does not fit within the day"));
    }
    Ok(MinuteWindow::new(start_min, end_min))
}

async fn fetch_out(db: &sqlx::PgPool, appointment_id: Uuid) -> Result<AppointmentOut, ApiError> {
    let row: AppointmentJoinRow = sqlx::query_as::<_, AppointmentJoinRow>(&format!(
        "{APPOINTMENT_JOIN_SELECT} WHERE a.appointment_id = $1"
    ))
    .bind(appointment_id)
    .fetch_optional(db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(|| ApiError::not_found("Appointment"))?;

    Ok(row.into())
}

async fn load_appointment(
    db: &sqlx::PgPool,
    appointment_id: Uuid,
) -> Result<AppointmentRow, ApiError> {
    sqlx::query_as::<_, AppointmentRow>(
        r#"
        SELECT
          appointment_id, date, start_time, end_time, service_id, staff_id,
          client_id, client_name, client_phone, note, status, is_paid,
          created_at, confirmation_sent_at
        FROM appointment
        WHERE appointment_id = $1
        "#,
    )
    .bind(appointment_id)
    .fetch_optional(db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(|| ApiError::not_found("Appointment"))
}

#[derive(Debug, sqlx::FromRow)]
struct OccupiedRow {
    start_time: String,
    end_time: String,
    status: AppointmentStatus,
}

/// Re-check occupancy at write time, inside the caller's transaction (which
/// must already hold the per-date advisory lock).
async fn ensure_slot_free(
    conn: &mut sqlx::PgConnection,
    date: NaiveDate,
    staff_id: Option<Uuid>,
    window: MinuteWindow,
    exclude: Option<Uuid>,
) -> Result<(), ApiError> {
    let occupied: Vec<OccupiedRow> = sqlx::query_as::<_, OccupiedRow>(
        r#"
        SELECT start_time, end_time, status
        FROM appointment
        WHERE date = $1
          AND staff_id IS NOT DISTINCT FROM $2
          AND ($3::uuid IS NULL OR appointment_id <> $3)
        "#,
    )
    .bind(date)
    .bind(staff_id)
    .bind(exclude)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    for o in occupied {
        if !transitions::occupies_slot(o.status) {
            continue;
        }
        let start = scheduling::parse_hhmm(&o.start_time)
            .map_err(|e| ApiError::Internal(format!("stored time malformed: {e}")))?;
        let end = scheduling::parse_hhmm(&o.end_time)
            .map_err(|e| ApiError::Internal(format!("stored time malformed: {e}")))?;
        if scheduling::overlaps(window, MinuteWindow::new(start, end)) {
            return Err(ApiError::slot_taken());
        }
    }
    Ok(())
}

fn service_name(out: &AppointmentOut) -> &str {
    out.service.as_ref().map(|s| s.name.as_str()).unwrap_or("el servicio")
}

/* ============================================================
   GET /api/appointments[?from&to | ?date]
   ============================================================ */

pub async fn list_appointments(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<AppointmentOut>>, ApiError> {
    // A ?date filter takes precedence over the from/to range.
    let (date_eq, from_date, to_date) = match q.date {
        Some(d) => (Some(d), None, None),
        None => (None, q.from_date, q.to_date),
    };

    let rows: Vec<AppointmentJoinRow> = sqlx::query_as::<_, AppointmentJoinRow>(&format!(
        r#"
        {APPOINTMENT_JOIN_SELECT}
        WHERE ($1::date IS NULL OR a.date = $1)
          AND ($2::date IS NULL OR a.date >= $2)
          AND ($3::date IS NULL OR a.date <= $3)
        ORDER BY a.date ASC, a.start_time ASC
        "#
    ))
    .bind(date_eq)
    .bind(from_date)
    .bind(to_date)
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(rows.into_iter().map(AppointmentOut::from).collect()))
}

/* ============================================================
   POST /api/appointments  (public booking flow)
   ============================================================ */

pub async fn create_appointment(
    State(state): State<AppState>,
    Json(req): Json<AppointmentCreate>,
) -> Result<Json<AppointmentOut>, ApiError> {
    let client_name = req.client_name.trim().to_string();
    if client_name.is_empty() {
        return Err(ApiError::validation("client_name is required"));
    }
    let client_phone = phone::normalize(&req.client_phone);
    if client_phone.is_empty() {
        return Err(ApiError::validation("client_phone is required"));
    }
    let start_min =
        scheduling::parse_hhmm(&req.start_time).map_err(|e| ApiError::validation(e.to_string()))?;

    let mut tx = state
        .db
        .begin()
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(date_lock_key(req.date))
        .execute(&mut *tx)
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let service: ServiceRow = sqlx::query_as::<_, ServiceRow>(
        r#"
        SELECT service_id, name, duration_min, price, active
        FROM service
        WHERE service_id = $1
          AND active = true
        "#,
    )
    .bind(req.service_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?
    .ok_or_else(|| ApiError::not_found("Service"))?;

    let window = occupied_window(start_min, service.duration_min)?;
    ensure_slot_free(&mut tx, req.date, req.staff_id, window, None).await?;

    // Find-or-create the client by normalized phone; a returning client's
    // name is refreshed to whatever they typed this time.
    let existing: Option<Uuid> =
        sqlx::query_scalar(r#"SELECT client_id FROM client WHERE phone = $1"#)
            .bind(&client_phone)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let client_id = match existing {
        Some(id) => {
            sqlx::query(r#"UPDATE client SET name = $2 WHERE client_id = $1"#)
                .bind(id)
                .bind(&client_name)
                .execute(&mut *tx)
                .await
                .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;
            id
        }
        None => sqlx::query_scalar(
            r#"
            INSERT INTO client (name, phone)
            VALUES ($1, $2)
            RETURNING client_id
            "#,
        )
        .bind(&client_name)
        .bind(&client_phone)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?,
    };

    let status = if state.booking_auto_confirm {
        AppointmentStatus::Confirmed
    } else {
        AppointmentStatus::Pending
    };

    let appointment_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO appointment (
          date, start_time, end_time, service_id, staff_id,
          client_id, client_name, client_phone, note, status, is_paid
        )
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
        RETURNING appointment_id
        "#,
    )
    .bind(req.date)
    .bind(scheduling::format_hhmm(window.start_min))
    .bind(scheduling::format_hhmm(window.end_min))
    .bind(service.service_id)
    .bind(req.staff_id)
    .bind(client_id)
    .bind(&client_name)
    .bind(&client_phone)
    .bind(req.note.as_deref())
    .bind(status)
    .bind(req.is_paid.unwrap_or(false))
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    tx.commit()
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let start_time = scheduling::format_hhmm(window.start_min);
    let body = match status {
        AppointmentStatus::Pending => messages::booking_request_received(
            &state.shop_name,
            &client_name,
            req.date,
            &start_time,
            &service.name,
        ),
        _ => messages::booking_confirmed(
            &state.shop_name,
            &client_name,
            req.date,
            &start_time,
            &service.name,
        ),
    };
    state.notifier.whatsapp(&client_phone, body);
    state.notifier.telegram(messages::admin_new_request(
        &client_name,
        &client_phone,
        req.date,
        &start_time,
        &service.name,
    ));

    Ok(Json(fetch_out(&state.db, appointment_id).await?))
}

/* ============================================================
   Status transitions
   ============================================================ */

async fn set_status(
    db: &sqlx::PgPool,
    appointment_id: Uuid,
    new_status: AppointmentStatus,
) -> Result<(), ApiError> {
    sqlx::query(
        r#"
        UPDATE appointment
        SET status = $2
        WHERE appointment_id = $1
        "#,
    )
    .bind(appointment_id)
    .bind(new_status)
    .execute(db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;
    Ok(())
}

pub async fn cancel_appointment(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<AppointmentOut>, ApiError> {
    let appt = load_appointment(&state.db, appointment_id).await?;
    transitions::validate_transition(appt.status, AppointmentStatus::Cancelled)
        .map_err(|_| ApiError::invalid_transition(appt.status, AppointmentStatus::Cancelled))?;

    set_status(&state.db, appointment_id, AppointmentStatus::Cancelled).await?;

    state.notifier.whatsapp(
        &appt.client_phone,
        messages::appointment_cancelled(&appt.client_name, appt.date, &appt.start_time),
    );
    if let Some(admin_phone) = &state.admin_phone {
        state.notifier.whatsapp(
            admin_phone,
            messages::admin_cancelled(&appt.client_name, appt.date, &appt.start_time),
        );
    }

    Ok(Json(fetch_out(&state.db, appointment_id).await?))
}

pub async fn confirm_appointment(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<AppointmentOut>, ApiError> {
    let appt = load_appointment(&state.db, appointment_id).await?;
    transitions::validate_transition(appt.status, AppointmentStatus::Confirmed)
        .map_err(|_| ApiError::invalid_transition(appt.status, AppointmentStatus::Confirmed))?;

    set_status(&state.db, appointment_id, AppointmentStatus::Confirmed).await?;

    let out = fetch_out(&state.db, appointment_id).await?;
    state.notifier.whatsapp(
        &out.client_phone,
        messages::booking_confirmed(
            &state.shop_name,
            &out.client_name,
            out.date,
            &out.start_time,
            service_name(&out),
        ),
    );

    Ok(Json(out))
}

pub async fn finish_appointment(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
    Query(q): Query<FinishQuery>,
) -> Result<Json<AppointmentOut>, ApiError> {
    let appt = load_appointment(&state.db, appointment_id).await?;
    transitions::validate_transition(appt.status, AppointmentStatus::Finished)
        .map_err(|_| ApiError::invalid_transition(appt.status, AppointmentStatus::Finished))?;

    sqlx::query(
        r#"
        UPDATE appointment
        SET status = $2, is_paid = $3
        WHERE appointment_id = $1
        "#,
    )
    .bind(appointment_id)
    .bind(AppointmentStatus::Finished)
    .bind(q.is_paid.unwrap_or(false))
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(fetch_out(&state.db, appointment_id).await?))
}

/* ============================================================
   PUT /api/appointments/{id}/reschedule
   ============================================================ */

pub async fn reschedule_appointment(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
    Json(req): Json<AppointmentReschedule>,
) -> Result<Json<AppointmentOut>, ApiError> {
    let appt = load_appointment(&state.db, appointment_id).await?;
    if transitions::is_terminal(appt.status) {
        return Err(ApiError::Conflict(
            "INVALID_TRANSITION",
            format!("cannot reschedule a {:?} appointment", appt.status),
        ));
    }
    let start_min =
        scheduling::parse_hhmm(&req.start_time).map_err(|e| ApiError::validation(e.to_string()))?;

    let mut tx = state
        .db
        .begin()
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(date_lock_key(req.date))
        .execute(&mut *tx)
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    // The occupied length follows the booked service, active or not.
    let duration_min: i32 =
        sqlx::query_scalar(r#"SELECT duration_min FROM service WHERE service_id = $1"#)
            .bind(appt.service_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let window = occupied_window(start_min, duration_min)?;
    ensure_slot_free(&mut tx, req.date, appt.staff_id, window, Some(appointment_id)).await?;

    sqlx::query(
        r#"
        UPDATE appointment
        SET date = $2, start_time = $3, end_time = $4
        WHERE appointment_id = $1
        "#,
    )
    .bind(appointment_id)
    .bind(req.date)
    .bind(scheduling::format_hhmm(window.start_min))
    .bind(scheduling::format_hhmm(window.end_min))
    .execute(&mut *tx)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    tx.commit()
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    state.notifier.whatsapp(
        &appt.client_phone,
        messages::appointment_rescheduled(
            &appt.client_name,
            req.date,
            &scheduling::format_hhmm(window.start_min),
        ),
    );

    Ok(Json(fetch_out(&state.db, appointment_id).await?))
}

/* ============================================================
   PATCH /api/appointments/{id}
   ============================================================ */

pub async fn patch_appointment(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
    Json(req): Json<AppointmentUpdate>,
) -> Result<Json<AppointmentOut>, ApiError> {
    let appt = load_appointment(&state.db, appointment_id).await?;

    // Paying can be recorded or corrected in any status; a status change
    // must pass the state machine.
    if let Some(new_status) = req.status {
        transitions::validate_transition(appt.status, new_status)
            .map_err(|_| ApiError::invalid_transition(appt.status, new_status))?;
    }

    sqlx::query(
        r#"
        UPDATE appointment
        SET
          status  = COALESCE($2, status),
          is_paid = COALESCE($3, is_paid),
          note    = COALESCE($4, note)
        WHERE appointment_id = $1
        "#,
    )
    .bind(appointment_id)
    .bind(req.status)
    .bind(req.is_paid)
    .bind(req.note.as_deref())
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    Ok(Json(fetch_out(&state.db, appointment_id).await?))
}

/* ============================================================
   DELETE /api/appointments/{id}  (hard delete, history pruning)
   ============================================================ */

pub async fn delete_appointment(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    let rows = sqlx::query(r#"DELETE FROM appointment WHERE appointment_id = $1"#)
        .bind(appointment_id)
        .execute(&state.db)
        .await
        .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    if rows.rows_affected() == 0 {
        return Err(ApiError::not_found("Appointment"));
    }

    Ok(Json(OkResponse::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occupied_window_follows_service_duration() {
        let w = occupied_window(600, 60).unwrap();
        assert_eq!((w.start_min, w.end_min), (600, 660));
    }

    #[test]
    fn test_occupied_window_rejects_past_midnight() {
        // 23:30 + 45min would spill into the next day.
        assert!(occupied_window(23 * 60 + 30, 45).is_err());
        // 24:00 is not a representable time of day either.
        assert!(occupied_window(23 * 60, 60).is_err());
        assert!(occupied_window(22 * 60, 60).is_ok());
    }

    #[test]
    fn test_date_lock_key_distinct_per_day() {
        let a = date_lock_key(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        let b = date_lock_key(NaiveDate::from_ymd_opt(2024, 1, 11).unwrap());
        assert_ne!(a, b);
        assert_eq!(b - a, 1);
    }
}
