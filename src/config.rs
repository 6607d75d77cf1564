//! Environment configuration.

use anyhow::Context;

pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// When unset, order confirmations are disabled.
    pub nats_url: Option<String>,
    pub notify_subject: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse().context("invalid PORT")?,
            Err(_) => 8080,
        };
        Ok(Self {
            port,
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            nats_url: std::env::var("NATS_URL").ok(),
            notify_subject: std::env::var("NOTIFY_SUBJECT")
                .unwrap_or_else(|_| "notify.order-confirmation".to_string()),
        })
    }
}
