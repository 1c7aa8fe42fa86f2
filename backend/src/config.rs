//! Environment-driven configuration.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_STORAGE_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port the API server binds to.
    pub port: u16,
    /// Directory holding the CSV data files.
    pub data_dir: String,
    /// Bound on any single storage operation.
    pub storage_timeout: Duration,
}

impl Config {
    /// Read configuration from the environment, falling back to defaults and
    /// warning on unparsable values.
    pub fn from_env() -> Self {
        Self {
            port: read_var("LUNCHBOX_PORT", DEFAULT_PORT),
            data_dir: env::var("LUNCHBOX_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string()),
            storage_timeout: Duration::from_millis(read_var(
                "LUNCHBOX_STORAGE_TIMEOUT_MS",
                DEFAULT_STORAGE_TIMEOUT_MS,
            )),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_dir: DEFAULT_DATA_DIR.to_string(),
            storage_timeout: Duration::from_millis(DEFAULT_STORAGE_TIMEOUT_MS),
        }
    }
}

fn read_var<T>(name: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
{
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Invalid {}='{}', using default {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.data_dir, "./data");
        assert_eq!(config.storage_timeout, Duration::from_secs(5));
    }
}
