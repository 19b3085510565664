//! Configuration loading
//!
//! Every setting is resolved with the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Credentials have no default; missing ones are a startup error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_MARKET: &str = "IT";
pub const DEFAULT_CATALOG_RETRY_DELAY_MS: u64 = 1000;
pub const DEFAULT_SEND_PACING_MS: u64 = 1000;
pub const DEFAULT_LATEST_PACING_MS: u64 = 3000;
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

const APP_DIR: &str = "release-radar";
const CONFIG_FILE_ENV: &str = "RADAR_CONFIG";

/// Contents of the TOML config file; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub bot_token: Option<String>,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub database_path: Option<PathBuf>,
    pub market: Option<String>,
    pub catalog_retry_delay_ms: Option<u64>,
    pub send_pacing_ms: Option<u64>,
    pub latest_pacing_ms: Option<u64>,
    pub poll_timeout_secs: Option<u64>,
}

impl TomlConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
}

/// Fully resolved configuration
#[derive(Clone, PartialEq, Eq)]
pub struct RadarConfig {
    pub bot_token: String,
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub database_path: PathBuf,
    pub market: String,
    pub catalog_retry_delay_ms: u64,
    pub send_pacing_ms: u64,
    pub latest_pacing_ms: u64,
    pub poll_timeout_secs: u64,
}

impl fmt::Debug for RadarConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RadarConfig")
            .field("bot_token", &"<redacted>")
            .field("spotify_client_id", &self.spotify_client_id)
            .field("spotify_client_secret", &"<redacted>")
            .field("database_path", &self.database_path)
            .field("market", &self.market)
            .field("catalog_retry_delay_ms", &self.catalog_retry_delay_ms)
            .field("send_pacing_ms", &self.send_pacing_ms)
            .field("latest_pacing_ms", &self.latest_pacing_ms)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish()
    }
}

impl RadarConfig {
    /// Resolve configuration from the process environment and config file
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let toml_config = match locate_config_file(overrides)? {
            Some(path) => {
                info!("Loading config file: {}", path.display());
                TomlConfig::from_file(&path)?
            }
            None => {
                warn!("No config file found, using environment and defaults");
                TomlConfig::default()
            }
        };

        Self::resolve(overrides, toml_config, |name| std::env::var(name).ok())
    }

    /// Resolve from explicit sources; `env` looks up an environment variable
    pub fn resolve(
        overrides: &ConfigOverrides,
        toml_config: TomlConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let env = |name: &str| env(name).filter(|value| !value.trim().is_empty());

        let required = |env_name: &str, toml_value: Option<String>, toml_key: &str| -> Result<String> {
            env(env_name)
                .or(toml_value.filter(|value| !value.trim().is_empty()))
                .ok_or_else(|| {
                    Error::Config(format!(
                        "{} not configured. Set the {} environment variable or `{}` in the config file",
                        toml_key, env_name, toml_key
                    ))
                })
        };

        let number = |env_name: &str, toml_value: Option<u64>, default: u64| -> Result<u64> {
            match env(env_name) {
                Some(raw) => raw.trim().parse().map_err(|_| {
                    Error::Config(format!("{} must be a non-negative integer, got {:?}", env_name, raw))
                }),
                None => Ok(toml_value.unwrap_or(default)),
            }
        };

        let database_path = overrides
            .database_path
            .clone()
            .or_else(|| env("RADAR_DATABASE_PATH").map(PathBuf::from))
            .or(toml_config.database_path)
            .unwrap_or_else(default_database_path);

        Ok(Self {
            bot_token: required("BOT_TOKEN", toml_config.bot_token, "bot_token")?,
            spotify_client_id: required(
                "SPOTIFY_CLIENT_ID",
                toml_config.spotify_client_id,
                "spotify_client_id",
            )?,
            spotify_client_secret: required(
                "SPOTIFY_CLIENT_SECRET",
                toml_config.spotify_client_secret,
                "spotify_client_secret",
            )?,
            database_path,
            market: env("RADAR_MARKET")
                .or(toml_config.market)
                .unwrap_or_else(|| DEFAULT_MARKET.to_string()),
            catalog_retry_delay_ms: number(
                "RADAR_CATALOG_RETRY_DELAY_MS",
                toml_config.catalog_retry_delay_ms,
                DEFAULT_CATALOG_RETRY_DELAY_MS,
            )?,
            send_pacing_ms: number(
                "RADAR_SEND_PACING_MS",
                toml_config.send_pacing_ms,
                DEFAULT_SEND_PACING_MS,
            )?,
            latest_pacing_ms: number(
                "RADAR_LATEST_PACING_MS",
                toml_config.latest_pacing_ms,
                DEFAULT_LATEST_PACING_MS,
            )?,
            poll_timeout_secs: number(
                "RADAR_POLL_TIMEOUT_SECS",
                toml_config.poll_timeout_secs,
                DEFAULT_POLL_TIMEOUT_SECS,
            )?,
        })
    }
}

/// Find the config file to read, if any
///
/// An explicitly named file (CLI or `RADAR_CONFIG`) must exist; the
/// platform locations are optional.
fn locate_config_file(overrides: &ConfigOverrides) -> Result<Option<PathBuf>> {
    let explicit = overrides
        .config_path
        .clone()
        .or_else(|| std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from));

    if let Some(path) = explicit {
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(Error::Config(format!("Config file not found: {}", path.display())));
    }

    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Ok(Some(path));
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(APP_DIR).join("config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }
    }

    Ok(None)
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("./radar_data"))
        .join("radar.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    fn credentials() -> Vec<(&'static str, &'static str)> {
        vec![
            ("BOT_TOKEN", "123:abc"),
            ("SPOTIFY_CLIENT_ID", "cid"),
            ("SPOTIFY_CLIENT_SECRET", "secret"),
        ]
    }

    #[test]
    fn test_defaults_apply_when_only_credentials_given() {
        let config = RadarConfig::resolve(
            &ConfigOverrides::default(),
            TomlConfig::default(),
            env_from(&credentials()),
        )
        .unwrap();

        assert_eq!(config.bot_token, "123:abc");
        assert_eq!(config.market, "IT");
        assert_eq!(config.catalog_retry_delay_ms, 1000);
        assert_eq!(config.send_pacing_ms, 1000);
        assert_eq!(config.latest_pacing_ms, 3000);
        assert_eq!(config.poll_timeout_secs, 30);
        assert_eq!(config.database_path, default_database_path());
    }

    #[test]
    fn test_missing_credentials_is_config_error() {
        let result = RadarConfig::resolve(
            &ConfigOverrides::default(),
            TomlConfig::default(),
            env_from(&[("BOT_TOKEN", "123:abc")]),
        );

        match result {
            Err(Error::Config(msg)) => assert!(msg.contains("SPOTIFY_CLIENT_ID")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_env_value_counts_as_missing() {
        let mut pairs = credentials();
        pairs[0] = ("BOT_TOKEN", "   ");
        let result = RadarConfig::resolve(&ConfigOverrides::default(), TomlConfig::default(), env_from(&pairs));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_priority_cli_over_env_over_toml() {
        let toml_config = TomlConfig {
            bot_token: Some("toml-token".to_string()),
            database_path: Some(PathBuf::from("/toml/radar.db")),
            market: Some("DE".to_string()),
            send_pacing_ms: Some(250),
            ..Default::default()
        };
        let mut pairs = credentials();
        pairs.push(("RADAR_DATABASE_PATH", "/env/radar.db"));

        let overrides = ConfigOverrides {
            config_path: None,
            database_path: Some(PathBuf::from("/cli/radar.db")),
        };
        let config = RadarConfig::resolve(&overrides, toml_config.clone(), env_from(&pairs)).unwrap();

        // CLI wins for the database, env wins for the token, TOML fills the rest
        assert_eq!(config.database_path, PathBuf::from("/cli/radar.db"));
        assert_eq!(config.bot_token, "123:abc");
        assert_eq!(config.market, "DE");
        assert_eq!(config.send_pacing_ms, 250);

        let config = RadarConfig::resolve(&ConfigOverrides::default(), toml_config, env_from(&pairs)).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/env/radar.db"));
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let mut pairs = credentials();
        pairs.push(("RADAR_SEND_PACING_MS", "fast"));
        let result = RadarConfig::resolve(&ConfigOverrides::default(), TomlConfig::default(), env_from(&pairs));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = RadarConfig::resolve(
            &ConfigOverrides::default(),
            TomlConfig::default(),
            env_from(&credentials()),
        )
        .unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("123:abc"));
        assert!(!printed.contains("\"secret\""));
    }
}
