//! Confirmation reminder sweep.
//!
//! PENDING appointments get one WhatsApp prompt asking the client to reply
//! 1 (confirm) or 2 (cancel). Appointments booked a day or more ahead are
//! prompted about a day before; short-notice bookings are prompted about an
//! hour before. `confirmation_sent_at` is stamped only after the bridge
//! accepted the message, so a downed bridge retries on the next sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, NaiveDate, NaiveTime};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::AppointmentStatus;
use crate::notify::{messages, MessageGateway};

const SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, sqlx::FromRow)]
struct ReminderRow {
    appointment_id: Uuid,
    client_name: String,
    client_phone: String,
    date: NaiveDate,
    start_time: String,
    created_at: chrono::DateTime<chrono::Utc>,
    service_name: String,
}

pub fn spawn_reminder_loop(
    pool: PgPool,
    gateway: Arc<dyn MessageGateway>,
    shop_tz: chrono_tz::Tz,
    shop_name: String,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(e) = run_sweep(&pool, gateway.as_ref(), shop_tz, &shop_name).await {
                tracing::error!("reminder sweep failed: {e}");
            }
        }
    });
}

async fn run_sweep(
    pool: &PgPool,
    gateway: &dyn MessageGateway,
    shop_tz: chrono_tz::Tz,
    shop_name: &str,
) -> anyhow::Result<()> {
    let now = chrono::Utc::now().with_timezone(&shop_tz).naive_local();
    let today = now.date();
    let horizon = today + ChronoDuration::days(3);

    let rows: Vec<ReminderRow> = sqlx::query_as::<_, ReminderRow>(
        r#"
        SELECT
          a.appointment_id,
          a.client_name,
          a.client_phone,
          a.date,
          a.start_time,
          a.created_at,
          s.name AS service_name
        FROM appointment a
        JOIN service s ON s.service_id = a.service_id
        WHERE a.status = $1
          AND a.confirmation_sent_at IS NULL
          AND a.date >= $2
          AND a.date <= $3
        ORDER BY a.date, a.start_time
        "#,
    )
    .bind(AppointmentStatus::Pending)
    .bind(today)
    .bind(horizon)
    .fetch_all(pool)
    .await?;

    for row in rows {
        let Ok(start) = NaiveTime::parse_from_str(&row.start_time, "%H:%M") else {
            tracing::warn!("appointment {} has malformed start_time", row.appointment_id);
            continue;
        };
        let appt_at = row.date.and_time(start);
        let created_local = row.created_at.with_timezone(&shop_tz).naive_local();

        let lead_time = appt_at - created_local;
        let time_until = appt_at - now;

        // Booked well in advance: remind the day before. Booked on short
        // notice: remind shortly before the slot.
        let should_send = if lead_time >= ChronoDuration::hours(24) {
            time_until <= ChronoDuration::hours(25)
        } else {
            time_until <= ChronoDuration::minutes(75)
        };
        if !should_send {
            continue;
        }

        let body = messages::confirmation_reminder(
            shop_name,
            &row.client_name,
            row.date,
            &row.start_time,
            &row.service_name,
        );
        match gateway.send_whatsapp(&row.client_phone, &body).await {
            Ok(()) => {
                sqlx::query(
                    r#"
                    UPDATE appointment
                    SET confirmation_sent_at = now()
                    WHERE appointment_id = $1
                    "#,
                )
                .bind(row.appointment_id)
                .execute(pool)
                .await?;
                tracing::info!("confirmation prompt sent for {}", row.appointment_id);
            }
            Err(e) => {
                tracing::warn!(
                    "confirmation prompt for {} not sent: {e}",
                    row.appointment_id
                );
            }
        }
    }

    Ok(())
}
