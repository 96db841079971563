// src/routes/webhook_routes.rs

use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;

use crate::{
    error::ApiError,
    models::{AppState, AppointmentRow, AppointmentStatus, OkResponse},
    notify::messages,
    phone,
    scheduling::transitions,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/ultramsg", post(ultramsg_webhook))
}

/// Inbound payload shape used by the WhatsApp bridge:
/// `{ "data": { "body": "...", "from": "549...@c.us" } }`.
#[derive(Debug, Deserialize)]
pub struct UltraMsgPayload {
    #[serde(default)]
    pub data: UltraMsgData,
}

#[derive(Debug, Default, Deserialize)]
pub struct UltraMsgData {
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub from: String,
}

/* ============================================================
   POST /api/webhooks/ultramsg
   ============================================================ */

/// Handles the client's "1" (confirm) / "2" (cancel) replies to the
/// confirmation prompt. Everything else is acknowledged and dropped:
/// the bridge must never see an error for chatter we don't understand.
pub async fn ultramsg_webhook(
    State(state): State<AppState>,
    Json(payload): Json<UltraMsgPayload>,
) -> Result<Json<OkResponse>, ApiError> {
    let body = payload.data.body.trim().to_string();
    let from = phone::normalize(&payload.data.from);

    if body.is_empty() || from.is_empty() {
        return Ok(Json(OkResponse::new()));
    }
    let confirmed = match body.as_str() {
        "1" => true,
        "2" => false,
        _ => return Ok(Json(OkResponse::new())),
    };

    tracing::info!("webhook reply {body:?} from {from}");

    // Only appointments we recently prompted are eligible, so a stray "1"
    // months later cannot resurrect anything.
    let candidates: Vec<AppointmentRow> = sqlx::query_as::<_, AppointmentRow>(
        r#"
        SELECT
          appointment_id, date, start_time, end_time, service_id, staff_id,
          client_id, client_name, client_phone, note, status, is_paid,
          created_at, confirmation_sent_at
        FROM appointment
        WHERE status = $1
          AND confirmation_sent_at IS NOT NULL
          AND confirmation_sent_at >= now() - interval '48 hours'
        ORDER BY confirmation_sent_at DESC
        "#,
    )
    .bind(AppointmentStatus::Pending)
    .fetch_all(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    let Some(appt) = candidates
        .into_iter()
        .find(|a| phone::normalize(&a.client_phone) == from)
    else {
        tracing::warn!("no pending appointment with a recent prompt for {from}");
        return Ok(Json(OkResponse::new()));
    };

    let new_status = if confirmed {
        AppointmentStatus::Confirmed
    } else {
        AppointmentStatus::Cancelled
    };
    if transitions::validate_transition(appt.status, new_status).is_err() {
        // Candidates are PENDING by query, so this only races another reply.
        return Ok(Json(OkResponse::new()));
    }

    sqlx::query(
        r#"
        UPDATE appointment
        SET status = $2
        WHERE appointment_id = $1
        "#,
    )
    .bind(appt.appointment_id)
    .bind(new_status)
    .execute(&state.db)
    .await
    .map_err(|e| ApiError::Internal(format!("db error: {e}")))?;

    if confirmed {
        state.notifier.whatsapp(
            &appt.client_phone,
            messages::reply_confirmed_ack(&appt.client_name, appt.date, &appt.start_time),
        );
    } else {
        state
            .notifier
            .whatsapp(&appt.client_phone, messages::reply_cancelled_ack());
    }
    if let Some(admin_phone) = &state.admin_phone {
        state.notifier.whatsapp(
            admin_phone,
            messages::admin_client_replied(confirmed, &appt.client_name, appt.date, &appt.start_time),
        );
    }

    Ok(Json(OkResponse::new()))
}
