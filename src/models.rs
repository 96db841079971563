use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::notify::Notifier;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub session_ttl_hours: i64,
    pub shop_name: String,
    pub shop_tz: chrono_tz::Tz,
    pub booking_auto_confirm: bool,
    pub admin_phone: Option<String>,
    pub notifier: Notifier,
}

/* -------------------------
   Appointment status
--------------------------*/

/// Stored as the Postgres enum `appointment_status`
/// (migrations/005_appointment.sql).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "appointment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    NoShow,
    Finished,
}

/* -------------------------
   API DTOs
--------------------------*/

/// Login is form-encoded (the admin SPA posts an OAuth2-style password form).
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn new() -> Self {
        OkResponse { ok: true }
    }
}

/* -------------------------
   DB Row Models
--------------------------*/

#[derive(Debug, FromRow)]
pub struct AdminUserRow {
    pub admin_user_id: Uuid,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, FromRow)]
pub struct SessionTokenRow {
    pub session_token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ServiceRow {
    pub service_id: Uuid,
    pub name: String,
    pub duration_min: i32,
    pub price: Option<f64>,
    pub active: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct AvailabilityDayRow {
    pub availability_day_id: Uuid,
    pub date: NaiveDate,
    pub enabled: bool,
    pub slot_size_min: i32,
    pub staff_id: Option<Uuid>,
}

#[derive(Debug, Clone, FromRow)]
pub struct AvailabilityRangeRow {
    pub availability_day_id: Uuid,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct BlockRow {
    pub block_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub reason: Option<String>,
    pub staff_id: Option<Uuid>,
}

#[derive(Debug, Clone, FromRow)]
pub struct AppointmentRow {
    pub appointment_id: Uuid,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub service_id: Uuid,
    pub staff_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub client_name: String,
    pub client_phone: String,
    pub note: Option<String>,
    pub status: AppointmentStatus,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
    pub confirmation_sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ClientRow {
    pub client_id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}
