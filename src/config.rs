use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub session_ttl_hours: i64,
    pub shop_name: String,
    pub shop_tz: chrono_tz::Tz,
    pub booking_auto_confirm: bool,
    pub whatsapp_bridge_url: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub admin_phone: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let session_ttl_hours = env::var("SESSION_TTL_HOURS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(24);
        let shop_name = env::var("SHOP_NAME").unwrap_or_else(|_| "Roma Cabello".to_string());
        let shop_tz: chrono_tz::Tz = env::var("SHOP_TIMEZONE")
            .unwrap_or_else(|_| "America/Argentina/Cordoba".to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("SHOP_TIMEZONE: {e}"))?;
        // When false, client bookings start PENDING and wait for the
        // WhatsApp confirm-by-reply flow instead of confirming immediately.
        let booking_auto_confirm = env::var("BOOKING_AUTO_CONFIRM")
            .ok()
            .and_then(|s| s.parse::<bool>().ok())
            .unwrap_or(true);

        Ok(Self {
            database_url,
            bind_addr,
            session_ttl_hours,
            shop_name,
            shop_tz,
            booking_auto_confirm,
            whatsapp_bridge_url: env::var("WHATSAPP_BRIDGE_URL").ok().filter(|s| !s.is_empty()),
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok().filter(|s| !s.is_empty()),
            telegram_chat_id: env::var("TELEGRAM_CHAT_ID").ok().filter(|s| !s.is_empty()),
            admin_phone: env::var("ADMIN_PHONE").ok().filter(|s| !s.is_empty()),
        })
    }
}
