use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use axum::http::HeaderValue;
use dap_stores::area_store::DEFAULT_AREA_QUERY_LIMIT;
use fxhash::FxHashMap;
use thiserror::Error;
use tracing::Level;

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8080";
pub const DEFAULT_API_PREFIX: &str = "/api/v1";
pub const DEFAULT_ORS_BACKEND_URL: &str = "https://api.openrouteservice.org/v2";
const DEFAULT_ORS_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}': {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(name: &'static str, value: &str, reason: impl ToString) -> Self {
        ConfigError::InvalidValue {
            name,
            value: value.to_owned(),
            reason: reason.to_string(),
        }
    }
}

/// Which origins may call the API from a browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Disabled,
    Any,
    List(Vec<HeaderValue>),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Normalized to a leading slash and no trailing slash, empty for the root.
    pub api_prefix: String,
    pub ors_backend_url: String,
    pub ors_servers: FxHashMap<String, String>,
    pub ors_timeout: Duration,
    pub areas_file: Option<PathBuf>,
    pub speed_profiles_file: Option<PathBuf>,
    pub area_query_limit: usize,
    pub cors_origins: CorsOrigins,
    pub log_level: Level,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source. Unset and blank
    /// variables fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let bind_address = parse_var(
            "DAP_BIND_ADDRESS",
            var("DAP_BIND_ADDRESS"),
            DEFAULT_BIND_ADDRESS,
        )?;

        let ors_timeout_secs: u64 = parse_var(
            "DAP_ORS_TIMEOUT_SECS",
            var("DAP_ORS_TIMEOUT_SECS"),
            &DEFAULT_ORS_TIMEOUT_SECS.to_string(),
        )?;
        if ors_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "DAP_ORS_TIMEOUT_SECS",
                "0",
                "must be greater than zero",
            ));
        }

        let area_query_limit: usize = parse_var(
            "DAP_AREA_QUERY_LIMIT",
            var("DAP_AREA_QUERY_LIMIT"),
            &DEFAULT_AREA_QUERY_LIMIT.to_string(),
        )?;
        if area_query_limit == 0 {
            return Err(ConfigError::invalid(
                "DAP_AREA_QUERY_LIMIT",
                "0",
                "must be greater than zero",
            ));
        }

        let log_level = parse_var("DAP_LOG_LEVEL", var("DAP_LOG_LEVEL"), "info")?;

        Ok(Config {
            bind_address,
            api_prefix: normalize_prefix(
                &var("DAP_API_PREFIX").unwrap_or_else(|| DEFAULT_API_PREFIX.to_owned()),
            ),
            ors_backend_url: var("DAP_ORS_BACKEND_URL")
                .unwrap_or_else(|| DEFAULT_ORS_BACKEND_URL.to_owned()),
            ors_servers: parse_ors_servers(var("DAP_ORS_SERVERS").as_deref().unwrap_or(""))?,
            ors_timeout: Duration::from_secs(ors_timeout_secs),
            areas_file: var("DAP_AREAS_FILE").map(PathBuf::from),
            speed_profiles_file: var("DAP_SPEED_PROFILES_FILE").map(PathBuf::from),
            area_query_limit,
            cors_origins: parse_cors_origins(var("DAP_CORS_ORIGINS").as_deref().unwrap_or(""))?,
            log_level,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            api_prefix: DEFAULT_API_PREFIX.to_owned(),
            ors_backend_url: DEFAULT_ORS_BACKEND_URL.to_owned(),
            ors_servers: FxHashMap::default(),
            ors_timeout: Duration::from_secs(DEFAULT_ORS_TIMEOUT_SECS),
            areas_file: None,
            speed_profiles_file: None,
            area_query_limit: DEFAULT_AREA_QUERY_LIMIT,
            cors_origins: CorsOrigins::Disabled,
            log_level: Level::INFO,
        }
    }
}

fn parse_var<T>(name: &'static str, value: Option<String>, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    let value = value.unwrap_or_else(|| default.to_owned());
    value
        .trim()
        .parse()
        .map_err(|error: T::Err| ConfigError::invalid(name, &value, error))
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// `name=url` pairs separated by `;`.
fn parse_ors_servers(value: &str) -> Result<FxHashMap<String, String>, ConfigError> {
    let mut servers = FxHashMap::default();

    for entry in value.split(';').map(str::trim).filter(|entry| !entry.is_empty()) {
        let (name, url) = entry
            .split_once('=')
            .map(|(name, url)| (name.trim(), url.trim()))
            .filter(|(name, url)| !name.is_empty() && !url.is_empty())
            .ok_or_else(|| ConfigError::invalid("DAP_ORS_SERVERS", entry, "expected name=url"))?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::invalid(
                "DAP_ORS_SERVERS",
                entry,
                "url must start with http:// or https://",
            ));
        }

        servers.insert(name.to_owned(), url.to_owned());
    }

    Ok(servers)
}

fn parse_cors_origins(value: &str) -> Result<CorsOrigins, ConfigError> {
    let origins: Vec<&str> = value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .collect();

    if origins.is_empty() {
        return Ok(CorsOrigins::Disabled);
    }

    if origins.contains(&"*") {
        return Ok(CorsOrigins::Any);
    }

    origins
        .into_iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|error| ConfigError::invalid("DAP_CORS_ORIGINS", origin, error))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(CorsOrigins::List)
}
