//! Environment-driven configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;

const DEFAULT_MONITORED_SERVICES: &str = "telegram=https://downdetector.su/status/telegram/,\
    youtube=https://downdetector.su/status/youtube/,\
    vkontakte=https://downdetector.su/status/vkontakte/,\
    tiktok=https://downdetector.su/status/tiktok/";

pub const DEFAULT_STARTED_TEMPLATE: &str =
    "⚠️ Outage detected: {{ service | title }}\n❗ Reports in the last hour: {{ hourly }}";

pub const DEFAULT_RESOLVED_TEMPLATE: &str =
    "✅ {{ service | title }} is working again\n❕ Reports in the last hour: {{ hourly }}";

/// A service whose outage-report page is polled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonitoredServiceConfig {
    pub name: String,
    pub url: String,
}

#[derive(Clone, Debug)]
pub struct NotificationTemplates {
    pub started: String,
    pub resolved: String,
}

impl Default for NotificationTemplates {
    fn default() -> Self {
        Self {
            started: DEFAULT_STARTED_TEMPLATE.to_string(),
            resolved: DEFAULT_RESOLVED_TEMPLATE.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bot_token: String,
    /// Resolved through `getMe` at startup when not configured.
    pub bot_username: Option<String>,
    pub telegram_api_url: String,
    pub admin_ids: Vec<i64>,
    pub admin_log_chat_id: Option<i64>,
    pub db_url: String,
    pub db_path: String,
    pub logs_path: PathBuf,
    pub poll_interval: Duration,
    pub failure_threshold: u32,
    pub fetch_timeout: Duration,
    pub send_rate_per_second: u32,
    pub monitored_services: Vec<MonitoredServiceConfig>,
    pub persist_outage_state: bool,
    pub clear_broadcasts_daily: bool,
    pub display_utc_offset_hours: i32,
    pub templates: NotificationTemplates,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            bot_username: None,
            telegram_api_url: "https://api.telegram.org".to_string(),
            admin_ids: Vec::new(),
            admin_log_chat_id: None,
            db_url: "sqlite://data/outage-bot.db".to_string(),
            db_path: "data/outage-bot.db".to_string(),
            logs_path: PathBuf::from("logs"),
            poll_interval: Duration::from_secs(300),
            failure_threshold: 40,
            fetch_timeout: Duration::from_secs(15),
            send_rate_per_second: 25,
            monitored_services: parse_monitored_services(DEFAULT_MONITORED_SERVICES)
                .unwrap_or_default(),
            persist_outage_state: false,
            clear_broadcasts_daily: true,
            display_utc_offset_hours: 4,
            templates: NotificationTemplates::default(),
        }
    }
}

impl Config {
    /// Builds the configuration from environment variables, falling back to defaults for
    /// everything except the bot token.
    pub fn from_env() -> Result<Self, AppError> {
        let default = Self::default();

        let bot_token = env_var("BOT_TOKEN").ok_or_else(|| AppError::missing_config("BOT_TOKEN"))?;
        let admin_ids = match env_var("ADMIN_IDS") {
            Some(raw) => parse_id_list(&raw).map_err(|e| AppError::invalid_config("ADMIN_IDS", e))?,
            None => Vec::new(),
        };
        let admin_log_chat_id = match env_var("ADMIN_LOG_CHAT_ID") {
            Some(raw) => Some(parse_var::<i64>("ADMIN_LOG_CHAT_ID", &raw)?),
            None => admin_ids.first().copied(),
        };
        let monitored_services = match env_var("MONITORED_SERVICES") {
            Some(raw) => parse_monitored_services(&raw)
                .map_err(|e| AppError::invalid_config("MONITORED_SERVICES", e))?,
            None => default.monitored_services,
        };

        Ok(Self {
            bot_token,
            bot_username: env_var("BOT_USERNAME").map(|s| s.trim_start_matches('@').to_string()),
            telegram_api_url: env_var("TELEGRAM_API_URL").unwrap_or(default.telegram_api_url),
            admin_ids,
            admin_log_chat_id,
            db_url: env_var("DB_URL").unwrap_or(default.db_url),
            db_path: env_var("DB_PATH").unwrap_or(default.db_path),
            logs_path: env_var("LOGS_PATH").map_or(default.logs_path, PathBuf::from),
            poll_interval: Duration::from_secs(env_or("POLL_INTERVAL", 300)?),
            failure_threshold: env_or("FAILURE_THRESHOLD", default.failure_threshold)?,
            fetch_timeout: Duration::from_secs(env_or("FETCH_TIMEOUT", 15)?),
            send_rate_per_second: env_or("SEND_RATE_PER_SECOND", default.send_rate_per_second)?,
            monitored_services,
            persist_outage_state: env_or("PERSIST_OUTAGE_STATE", default.persist_outage_state)?,
            clear_broadcasts_daily: env_or(
                "CLEAR_BROADCASTS_DAILY",
                default.clear_broadcasts_daily,
            )?,
            display_utc_offset_hours: env_or(
                "DISPLAY_UTC_OFFSET_HOURS",
                default.display_utc_offset_hours,
            )?,
            templates: NotificationTemplates {
                started: env_var("OUTAGE_STARTED_TEMPLATE").unwrap_or(default.templates.started),
                resolved: env_var("OUTAGE_RESOLVED_TEMPLATE")
                    .unwrap_or(default.templates.resolved),
            },
        })
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    match env_var(key) {
        Some(raw) => parse_var(key, &raw),
        None => Ok(default),
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| AppError::invalid_config(key, e.to_string()))
}

/// Parses a comma separated list of chat ids, e.g. `"1,2, 3"`.
pub fn parse_id_list(raw: &str) -> Result<Vec<i64>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>().map_err(|e| format!("`{s}`: {e}")))
        .collect()
}

/// Parses `name=url` pairs separated by commas.
pub fn parse_monitored_services(raw: &str) -> Result<Vec<MonitoredServiceConfig>, String> {
    let mut services: Vec<MonitoredServiceConfig> = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (name, url) = entry
            .split_once('=')
            .ok_or_else(|| format!("`{entry}` is not in `name=url` form"))?;
        let (name, url) = (name.trim().to_lowercase(), url.trim());
        if name.is_empty() || !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(format!("`{entry}` needs a name and an http(s) url"));
        }
        if services.iter().any(|s| s.name == name) {
            return Err(format!("service `{name}` is listed twice"));
        }
        services.push(MonitoredServiceConfig {
            name,
            url: url.to_string(),
        });
    }
    Ok(services)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("1, 2,3,").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_id_list("").unwrap(), Vec::<i64>::new());
        assert!(parse_id_list("1,abc").is_err());
    }

    #[test]
    fn test_parse_monitored_services() {
        let services =
            parse_monitored_services("Telegram=https://a.test/telegram/, youtube = http://b.test")
                .unwrap();
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].name, "telegram");
        assert_eq!(services[1].url, "http://b.test");

        assert!(parse_monitored_services("telegram").is_err());
        assert!(parse_monitored_services("telegram=ftp://x").is_err());
        assert!(parse_monitored_services("a=https://x,a=https://y").is_err());
    }

    #[test]
    fn test_default_services() {
        let config = Config::default();
        let names: Vec<_> = config
            .monitored_services
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, ["telegram", "youtube", "vkontakte", "tiktok"]);
        assert_eq!(config.failure_threshold, 40);
    }
}
