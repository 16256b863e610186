//! Runtime configuration.
//!
//! Values come from the process environment, optionally seeded by a `.env`
//! file. Every variable has a default matching the stock backend setup.

use crate::error::AppError;
use crate::fs_manager::PortablePathManager;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_ENDPOINT: &str = "/api/v1/detect-hallucination";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 5;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" | "bunyan" => Ok(LogFormat::Json),
            other => Err(AppError::Config(format!("Unknown log format: {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Base address of the detection service.
    pub base_url: Url,
    /// Path of the detection endpoint, relative to `base_url`.
    pub endpoint: String,
    /// Upper bound for a single detection call.
    pub request_timeout: Duration,
    /// Period of the popup's liveness probe.
    pub health_interval: Duration,
    pub data_dir: PathBuf,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            health_interval: Duration::from_secs(DEFAULT_HEALTH_INTERVAL_SECS),
            data_dir: PortablePathManager::data_dir(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Loads `.env` (if any) and then reads the environment.
    pub fn load() -> Result<Self, AppError> {
        dotenv::dotenv().ok();
        Self::from_env()
    }

    pub fn from_env() -> Result<Self, AppError> {
        let mut config = Config::default();

        if let Ok(raw) = env::var("HD_API_BASE_URL") {
            config.base_url = Url::parse(raw.trim())?;
        }
        if let Ok(raw) = env::var("HD_API_ENDPOINT") {
            let trimmed = raw.trim();
            config.endpoint = if trimmed.starts_with('/') {
                trimmed.to_string()
            } else {
                format!("/{}", trimmed)
            };
        }
        if let Some(secs) = read_secs("HD_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = read_secs("HD_HEALTH_INTERVAL_SECS")? {
            config.health_interval = Duration::from_secs(secs);
        }
        if let Ok(raw) = env::var("HD_DATA_DIR") {
            config.data_dir = PathBuf::from(raw);
        }
        if let Ok(raw) = env::var("HD_LOG_FORMAT") {
            config.log_format = raw.parse()?;
        }

        Ok(config)
    }

    /// Full URL of the detection endpoint.
    pub fn detect_url(&self) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), self.endpoint)
    }
}

fn read_secs(key: &str) -> Result<Option<u64>, AppError> {
    match env::var(key) {
        Ok(raw) => {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| AppError::Config(format!("{} must be a positive integer, got {:?}", key, raw)))?;
            if secs == 0 {
                return Err(AppError::Config(format!("{} must be greater than zero", key)));
            }
            Ok(Some(secs))
        }
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: [&str; 6] = [
        "HD_API_BASE_URL",
        "HD_API_ENDPOINT",
        "HD_REQUEST_TIMEOUT_SECS",
        "HD_HEALTH_INTERVAL_SECS",
        "HD_DATA_DIR",
        "HD_LOG_FORMAT",
    ];

    fn unset_all() -> Vec<(&'static str, Option<&'static str>)> {
        KEYS.iter().map(|k| (*k, None)).collect()
    }

    #[test]
    fn test_defaults() {
        temp_env::with_vars(unset_all(), || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.detect_url(), "http://localhost:8000/api/v1/detect-hallucination");
            assert_eq!(config.request_timeout, Duration::from_secs(15));
            assert_eq!(config.health_interval, Duration::from_secs(5));
            assert_eq!(config.log_format, LogFormat::Pretty);
        });
    }

    #[test]
    fn test_overrides() {
        let mut vars = unset_all();
        vars.retain(|(k, _)| *k != "HD_API_BASE_URL" && *k != "HD_API_ENDPOINT" && *k != "HD_LOG_FORMAT");
        vars.push(("HD_API_BASE_URL", Some("http://10.0.0.2:9000/")));
        vars.push(("HD_API_ENDPOINT", Some("check")));
        vars.push(("HD_LOG_FORMAT", Some("json")));
        temp_env::with_vars(vars, || {
            let config = Config::from_env().unwrap();
            assert_eq!(config.detect_url(), "http://10.0.0.2:9000/check");
            assert_eq!(config.log_format, LogFormat::Json);
        });
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        temp_env::with_vars(
            [("HD_REQUEST_TIMEOUT_SECS", Some("soon")), ("HD_HEALTH_INTERVAL_SECS", None)],
            || {
                assert!(matches!(Config::from_env(), Err(AppError::Config(_))));
            },
        );
        temp_env::with_vars([("HD_REQUEST_TIMEOUT_SECS", None), ("HD_HEALTH_INTERVAL_SECS", Some("0"))], || {
            assert!(matches!(Config::from_env(), Err(AppError::Config(_))));
        });
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        temp_env::with_var("HD_API_BASE_URL", Some("not a url"), || {
            assert!(matches!(Config::from_env(), Err(AppError::Config(_))));
        });
    }
}
