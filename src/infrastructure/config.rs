use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

const APP_JSON: &str = "app.json";
const DEFAULT_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_REFRESH_DELAY_MS: u64 = 1_000;
const SUPPORTED_SCHEMA: u64 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppConfigFile {
    schema: u8,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    refresh_delay_ms: Option<u64>,
}

/// Resolved runtime configuration of the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub base_url: Url,
    pub timezone: Tz,
    /// Delay between a successful commit and the follow-up feed refresh.
    pub refresh_delay: Duration,
    /// Opaque `Cookie` header value forwarded on every request.
    pub session_cookie: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("valid default base url"),
            timezone: Tz::UTC,
            refresh_delay: Duration::from_millis(DEFAULT_REFRESH_DELAY_MS),
            session_cookie: None,
        }
    }
}

fn default_app_json() -> serde_json::Value {
    serde_json::json!({
        "schema": SUPPORTED_SCHEMA,
        "baseUrl": DEFAULT_BASE_URL,
        "timezone": DEFAULT_TIMEZONE,
        "refreshDelayMs": DEFAULT_REFRESH_DELAY_MS
    })
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&default_app_json())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != SUPPORTED_SCHEMA {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_app_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    load_app_config_with_lookup(config_dir, |key| std::env::var(key).ok())
}

/// Reads `app.json` and applies `BREAKSYNC_*` overrides from `lookup`.
pub fn load_app_config_with_lookup<F>(config_dir: &Path, lookup: F) -> Result<AppConfig, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    let path = config_dir.join(APP_JSON);
    let file: AppConfigFile = serde_json::from_value(read_config(&path)?)?;

    let base_url = optional_lookup_value(&lookup, &["BREAKSYNC_BASE_URL"])
        .or_else(|| non_blank(file.base_url))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let timezone = optional_lookup_value(&lookup, &["BREAKSYNC_TIMEZONE"])
        .or_else(|| non_blank(file.timezone))
        .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
    let refresh_delay_ms = match optional_lookup_value(&lookup, &["BREAKSYNC_REFRESH_DELAY_MS"]) {
        Some(raw) => raw.parse::<u64>().map_err(|error| {
            InfraError::InvalidConfig(format!("BREAKSYNC_REFRESH_DELAY_MS must be an integer: {error}"))
        })?,
        None => file.refresh_delay_ms.unwrap_or(DEFAULT_REFRESH_DELAY_MS),
    };

    Ok(AppConfig {
        base_url: parse_base_url(&base_url)?,
        timezone: parse_timezone(&timezone)?,
        refresh_delay: Duration::from_millis(refresh_delay_ms),
        session_cookie: optional_lookup_value(&lookup, &["BREAKSYNC_SESSION_COOKIE"]),
    })
}

fn parse_base_url(raw: &str) -> Result<Url, InfraError> {
    let url = Url::parse(raw)
        .map_err(|error| InfraError::InvalidConfig(format!("invalid baseUrl '{raw}': {error}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(InfraError::InvalidConfig(format!(
            "baseUrl must use http or https: {raw}"
        )));
    }
    Ok(url)
}

fn parse_timezone(raw: &str) -> Result<Tz, InfraError> {
    raw.parse::<Tz>()
        .map_err(|error| InfraError::InvalidConfig(format!("invalid timezone '{raw}': {error}")))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn optional_lookup_value<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    for key in keys {
        if let Some(value) = lookup(key) {
            let normalized = value.trim();
            if !normalized.is_empty() {
                return Some(normalized.to_string());
            }
        }
    }
    None
}
