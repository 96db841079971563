//! Outbound notifications.
//!
//! Ledger writes never wait on the messaging side: handlers enqueue a
//! [`Notification`] after their transaction commits and a single worker
//! task drains the queue against the gateways. A failed or unconfigured
//! gateway is logged and dropped, never surfaced to the booking client.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::phone;

#[derive(Debug, Clone)]
pub enum Notification {
    Whatsapp { to: String, body: String },
    Telegram { body: String },
}

/// Seam over the two messaging backends so the worker and the reminder
/// sweep can be exercised without the network.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    async fn send_whatsapp(&self, to: &str, body: &str) -> anyhow::Result<()>;
    async fn send_telegram(&self, body: &str) -> anyhow::Result<()>;
}

/// Production gateway: WhatsApp via the local bridge's `POST /send`,
/// admin alerts via the Telegram Bot API.
pub struct HttpGateway {
    http: reqwest::Client,
    bridge_url: Option<String>,
    telegram_bot_token: Option<String>,
    telegram_chat_id: Option<String>,
}

impl HttpGateway {
    pub fn from_config(cfg: &Config) -> Self {
        HttpGateway {
            http: reqwest::Client::new(),
            bridge_url: cfg.whatsapp_bridge_url.clone(),
            telegram_bot_token: cfg.telegram_bot_token.clone(),
            telegram_chat_id: cfg.telegram_chat_id.clone(),
        }
    }
}

#[async_trait]
impl MessageGateway for HttpGateway {
    async fn send_whatsapp(&self, to: &str, body: &str) -> anyhow::Result<()> {
        let Some(bridge) = &self.bridge_url else {
            anyhow::bail!("WHATSAPP_BRIDGE_URL not configured");
        };
        let resp = self
            .http
            .post(format!("{bridge}/send"))
            .json(&json!({ "to": phone::normalize(to), "body": body }))
            .send()
            .await?;
        resp.error_for_status()?;
        Ok(())
    }

    async fn send_telegram(&self, body: &str) -> anyhow::Result<()> {
        let (Some(token), Some(chat_id)) = (&self.telegram_bot_token, &self.telegram_chat_id)
        else {
            anyhow::bail!("Telegram credentials not configured");
        };
        let resp = self
            .http
            .post(format!("https://api.telegram.org/bot{token}/sendMessage"))
            .json(&json!({ "chat_id": chat_id, "text": body, "parse_mode": "HTML" }))
            .send()
            .await?;
        resp.error_for_status()?;
        Ok(())
    }
}

/// Cloneable handle handlers use to enqueue notifications after commit.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
    /// Spawn the worker task and return the sending handle.
    pub fn spawn(gateway: Arc<dyn MessageGateway>) -> Notifier {
        let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();
        tokio::spawn(async move {
            while let Some(n) = rx.recv().await {
                let res = match &n {
                    Notification::Whatsapp { to, body } => gateway.send_whatsapp(to, body).await,
                    Notification::Telegram { body } => gateway.send_telegram(body).await,
                };
                if let Err(e) = res {
                    tracing::warn!("notification dropped: {e}");
                }
            }
        });
        Notifier { tx }
    }

    pub fn whatsapp(&self, to: impl Into<String>, body: impl Into<String>) {
        let _ = self.tx.send(Notification::Whatsapp {
            to: to.into(),
            body: body.into(),
        });
    }

    pub fn telegram(&self, body: impl Into<String>) {
        let _ = self.tx.send(Notification::Telegram { body: body.into() });
    }
}

/* -------------------------
   Message catalogue
--------------------------*/

pub mod messages {
    use super::NaiveDate;

    pub fn booking_request_received(
        shop: &str,
        client_name: &str,
        date: NaiveDate,
        start_time: &str,
        service: &str,
    ) -> String {
        format!(
            "¡Hola {client_name}! 💇‍♀️ Reservaste un turno en {shop}:\n\
             📅 Fecha: {date}\n\
             🕒 Hora: {start_time}\n\
             ✨ Servicio: {service}\n\n\
             ✅ *Por favor, respondé este mensaje con un 1 para CONFIRMAR tu asistencia* \
             o con un *2 para CANCELAR*."
        )
    }

    pub fn booking_confirmed(
        shop: &str,
        client_name: &str,
        date: NaiveDate,
        start_time: &str,
        service: &str,
    ) -> String {
        format!(
            "¡Hola {client_name}! 💇‍♀️ Tu turno en {shop} está CONFIRMADO:\n\
             📅 Fecha: {date}\n\
             🕒 Hora: {start_time}\n\
             ✨ Servicio: {service}\n\
             ¡Te esperamos!"
        )
    }

    pub fn appointment_cancelled(client_name: &str, date: NaiveDate, start_time: &str) -> String {
        format!(
            "Hola {client_name}. Te informamos que tu turno del día {date} \
             a las {start_time} ha sido CANCELADO. Si fue un error, por favor contactanos."
        )
    }

    pub fn appointment_rescheduled(client_name: &str, date: NaiveDate, start_time: &str) -> String {
        format!(
            "¡Hola {client_name}! Tu turno ha sido REPROGRAMADO:\n\
             📅 Nueva fecha: {date}\n\
             🕒 Nueva hora: {start_time}\n\
             ¡Te esperamos!"
        )
    }

    pub fn confirmation_reminder(
        shop: &str,
        client_name: &str,
        date: NaiveDate,
        start_time: &str,
        service: &str,
    ) -> String {
        format!(
            "👋 Hola {client_name}\n\n\
             Confirmación de tu turno en *{shop}*:\n\
             📅 *{}*\n\
             ⏰ *{start_time} hs*\n\
             💇‍♀️ {service}\n\n\
             ⚠️ Respondé con un 1 para confirmar o un 2 para cancelar.",
            date.format("%d/%m")
        )
    }

    pub fn reply_confirmed_ack(client_name: &str, date: NaiveDate, start_time: &str) -> String {
        format!(
            "✅ ¡Gracias {client_name}! Tu turno ha sido CONFIRMADO. \
             Te esperamos el {date} a las {start_time}."
        )
    }

    pub fn reply_cancelled_ack() -> String {
        "Turno cancelado correctamente. ¡Esperamos verte pronto!".to_string()
    }

    pub fn admin_new_request(
        client_name: &str,
        client_phone: &str,
        date: NaiveDate,
        start_time: &str,
        service: &str,
    ) -> String {
        format!(
            "<b>🚨 ¡NUEVA SOLICITUD DE TURNO! 🚨</b>\n\n\
             👤 <b>Cliente:</b> {client_name}\n\
             📞 <b>Tel:</b> {client_phone}\n\
             📅 <b>Fecha:</b> {date}\n\
             🕒 <b>Hora:</b> {start_time}\n\
             ✨ <b>Servicio:</b> {service}"
        )
    }

    pub fn admin_cancelled(client_name: &str, date: NaiveDate, start_time: &str) -> String {
        format!(
            "❌ Turno Cancelado ❌\n👤 Cliente: {client_name}\n📅 Fecha: {date}\n🕒 Hora: {start_time}"
        )
    }

    pub fn admin_client_replied(
        confirmed: bool,
        client_name: &str,
        date: NaiveDate,
        start_time: &str,
    ) -> String {
        let head = if confirmed {
            "✅ Turno CONFIRMADO por cliente"
        } else {
            "❌ Turno CANCELADO por cliente"
        };
        format!("{head}\n👤 Cliente: {client_name}\n📅 Fecha: {date}\n🕒 Hora: {start_time}")
    }
}
