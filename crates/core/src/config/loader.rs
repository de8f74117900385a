//! Configuration file loading

use super::schema::Settings;
use crate::error::{Error, Result, ResultExt};
use std::path::{Path, PathBuf};

/// Environment variables that override file values.
pub const ENV_API_URL: &str = "TASKROUTE_API_URL";
/// Bearer token for the backend.
pub const ENV_API_TOKEN: &str = "TASKROUTE_API_TOKEN";
/// Push feed URL.
pub const ENV_FEED_URL: &str = "TASKROUTE_FEED_URL";
/// Directions provider key.
pub const ENV_DIRECTIONS_KEY: &str = "GOOGLE_DIRECTIONS_API_KEY";

/// Configuration wrapper
#[derive(Debug, Clone)]
pub struct Config {
    /// Parsed and validated settings
    pub settings: Settings,
    /// File the settings came from, if any
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from an explicit path, a discovered file, or defaults.
    ///
    /// An explicit path that does not exist is an error; a missing discovered
    /// file is not. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) if !p.exists() => return Err(Error::config_not_found(p)),
            Some(p) => Some(p.to_path_buf()),
            None => find_config_file(),
        };

        let mut settings = match config_path {
            Some(ref p) => load_config_file(p)?,
            None => Settings::default(),
        };

        apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
        validate(&settings)?;

        Ok(Self {
            settings,
            path: config_path,
        })
    }

    /// Defaults only (no file, no environment)
    pub fn defaults() -> Self {
        Self {
            settings: Settings::default(),
            path: None,
        }
    }
}

/// Find configuration file in standard locations
fn find_config_file() -> Option<PathBuf> {
    let local = [".taskroute.toml", "taskroute.toml"]
        .into_iter()
        .map(PathBuf::from);
    let user = dirs::config_dir().map(|dir| dir.join("taskroute").join("config.toml"));

    local.chain(user).find(|candidate| candidate.exists())
}

/// Load and parse a TOML configuration file
fn load_config_file(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)
        .map_err(Error::from)
        .context(format!("Reading {}", path.display()))?;

    toml::from_str(&content)
        .map_err(Error::from)
        .context(format!("Parsing {}", path.display()))
}

/// Overlay secrets and endpoints from the environment.
pub(crate) fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = non_empty(ENV_API_URL) {
        settings.api.base_url = url;
    }
    if let Some(token) = non_empty(ENV_API_TOKEN) {
        settings.api.token = Some(token);
    }
    if let Some(url) = non_empty(ENV_FEED_URL) {
        settings.feed.url = url;
    }
    if let Some(key) = non_empty(ENV_DIRECTIONS_KEY) {
        settings.routing.api_key = Some(key);
    }
}

/// Validate settings after all overrides
pub fn validate(settings: &Settings) -> Result<()> {
    check_url("api.base_url", &settings.api.base_url, &["http://", "https://"])?;
    check_url("feed.url", &settings.feed.url, &["ws://", "wss://"])?;
    check_url(
        "routing.provider_url",
        &settings.routing.provider_url,
        &["http://", "https://"],
    )?;

    if settings.api.timeout_secs == 0 {
        return Err(Error::invalid_config("api.timeout_secs", "must be greater than zero"));
    }
    if !(settings.routing.hysteresis_m.is_finite() && settings.routing.hysteresis_m > 0.0) {
        return Err(Error::invalid_config("routing.hysteresis_m", "must be a positive number of meters"));
    }
    if !(settings.routing.arrival_m.is_finite() && settings.routing.arrival_m > 0.0) {
        return Err(Error::invalid_config("routing.arrival_m", "must be a positive number of meters"));
    }
    if settings.routing.max_requests_per_minute == 0 {
        return Err(Error::invalid_config(
            "routing.max_requests_per_minute",
            "must be greater than zero",
        ));
    }

    Ok(())
}

fn check_url(field: &str, value: &str, schemes: &[&str]) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid_config(field, "cannot be empty"));
    }
    if !schemes.iter().any(|s| value.starts_with(s)) {
        return Err(Error::invalid_config(
            field,
            format!("must start with one of {}", schemes.join(", ")),
        ));
    }
    Ok(())
}
