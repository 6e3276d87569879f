use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
pub const DEFAULT_REMOTE_API_BASE: &str = "https://api.github.com/";
pub const DEFAULT_USER_AGENT: &str = "pomotato";

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigBundle {
    pub app: serde_json::Value,
}

fn default_app_config() -> serde_json::Value {
    serde_json::json!({
        "schema": 1,
        "appName": "Pomotato",
        "timezone": null,
        "remoteApiBase": DEFAULT_REMOTE_API_BASE,
        "userAgent": DEFAULT_USER_AGENT
    })
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&default_app_config())?;
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
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_configs(config_dir: &Path) -> Result<ConfigBundle, InfraError> {
    Ok(ConfigBundle {
        app: read_config(&config_dir.join(APP_JSON))?,
    })
}

fn read_app_string(config_dir: &Path, key: &str) -> Result<Option<String>, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    Ok(app
        .get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned))
}

/// IANA zone used for calendar-day bucketing. `None` means the host's local zone.
pub fn read_timezone(config_dir: &Path) -> Result<Option<chrono_tz::Tz>, InfraError> {
    let Some(name) = read_app_string(config_dir, "timezone")? else {
        return Ok(None);
    };
    name.parse::<chrono_tz::Tz>()
        .map(Some)
        .map_err(|_| InfraError::InvalidConfig(format!("unknown timezone '{name}' in {APP_JSON}")))
}

pub fn read_remote_api_base(config_dir: &Path) -> Result<String, InfraError> {
    Ok(read_app_string(config_dir, "remoteApiBase")?
        .unwrap_or_else(|| DEFAULT_REMOTE_API_BASE.to_string()))
}

pub fn read_user_agent(config_dir: &Path) -> Result<String, InfraError> {
    Ok(read_app_string(config_dir, "userAgent")?.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()))
}
