//! Handles settings for the application.
//!
//! Configuration is read from an optional `settings.toml` and from the
//! environment (`CAMBISTA_SERVER__PORT=8080` overrides `server.port`).

use chrono::Duration;
use chrono_tz::Tz;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use engine::UpdateWindow;
use serde::Deserialize;

const DEFAULT_FEED_URL: &str = "https://open.er-api.com/v6/latest/USD";

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

/// Where operations are stored: `memory` or `sqlite:<path>`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl TryFrom<String> for Database {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "memory" {
            return Ok(Self::Memory);
        }
        match value.strip_prefix("sqlite:") {
            Some(path) if !path.is_empty() => Ok(Self::Sqlite(path.to_string())),
            _ => Err(format!(
                "invalid database `{value}`, expected `memory` or `sqlite:<path>`"
            )),
        }
    }
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: String,
    pub port: u16,
    pub database: Database,
}

impl Server {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Reference rate feed.
#[derive(Debug, Deserialize)]
pub struct Rates {
    pub enabled: bool,
    pub feed_url: String,
    /// Key looked up in the feed's `rates` object.
    pub currency: String,
    pub poll_interval_secs: u64,
    pub window_start_hour: u32,
    pub window_end_hour: u32,
}

impl Rates {
    pub fn window(&self) -> UpdateWindow {
        UpdateWindow {
            start_hour: self.window_start_hour,
            end_hour: self.window_end_hour,
        }
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

#[derive(Debug, Deserialize)]
pub struct Trash {
    pub retention_days: i64,
    pub sweep_interval_secs: u64,
}

impl Trash {
    pub fn retention(&self) -> Duration {
        Duration::days(self.retention_days)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Server,
    pub rates: Rates,
    pub trash: Trash,
    /// IANA time zone of the desk.
    pub timezone: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        defaults()?
            .add_source(File::with_name("settings").required(false))
            .add_source(
                Environment::with_prefix("CAMBISTA")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|err| ConfigError::Message(format!("invalid timezone: {err}")))
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("app.level", "info")?
        .set_default("server.bind", "127.0.0.1")?
        .set_default("server.port", 3000)?
        .set_default("server.database", "sqlite:cambista.db")?
        .set_default("rates.enabled", true)?
        .set_default("rates.feed_url", DEFAULT_FEED_URL)?
        .set_default("rates.currency", "PEN")?
        .set_default("rates.poll_interval_secs", 4 * 60 * 60)?
        .set_default("rates.window_start_hour", 8)?
        .set_default("rates.window_end_hour", 20)?
        .set_default("trash.retention_days", engine::DEFAULT_TRASH_RETENTION_DAYS)?
        .set_default("trash.sweep_interval_secs", 60 * 60)?
        .set_default("timezone", "America/Lima")
}
