//! Config file loading tests
//!
//! Uses serial_test: these tests set process environment variables
//! (RADAR_CONFIG, BOT_TOKEN, ...) and must not run in parallel.

use radar_common::config::{ConfigOverrides, RadarConfig, TomlConfig};
use radar_common::Error;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

const ENV_VARS: [&str; 5] = [
    "RADAR_CONFIG",
    "BOT_TOKEN",
    "SPOTIFY_CLIENT_ID",
    "SPOTIFY_CLIENT_SECRET",
    "RADAR_DATABASE_PATH",
];

fn clear_env() {
    for name in ENV_VARS {
        env::remove_var(name);
    }
}

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_toml_config_parses_partial_file() {
    let parsed: TomlConfig = toml::from_str("market = \"US\"\nsend_pacing_ms = 50\n").unwrap();
    assert_eq!(parsed.market.as_deref(), Some("US"));
    assert_eq!(parsed.send_pacing_ms, Some(50));
    assert!(parsed.bot_token.is_none());
}

#[test]
#[serial]
fn test_load_from_cli_config_file() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
        bot_token = "file-token"
        spotify_client_id = "file-id"
        spotify_client_secret = "file-secret"
        database_path = "/data/radar.db"
        market = "SE"
        "#,
    );

    let overrides = ConfigOverrides {
        config_path: Some(path),
        database_path: None,
    };
    let config = RadarConfig::load(&overrides).unwrap();

    assert_eq!(config.bot_token, "file-token");
    assert_eq!(config.market, "SE");
    assert_eq!(config.database_path, PathBuf::from("/data/radar.db"));
}

#[test]
#[serial]
fn test_env_overrides_config_file() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        "bot_token = \"file-token\"\nspotify_client_id = \"file-id\"\nspotify_client_secret = \"file-secret\"\n",
    );
    env::set_var("RADAR_CONFIG", &path);
    env::set_var("BOT_TOKEN", "env-token");

    let config = RadarConfig::load(&ConfigOverrides::default()).unwrap();
    assert_eq!(config.bot_token, "env-token");
    assert_eq!(config.spotify_client_id, "file-id");

    clear_env();
}

#[test]
#[serial]
fn test_missing_explicit_config_file_is_error() {
    clear_env();
    let overrides = ConfigOverrides {
        config_path: Some(PathBuf::from("/nonexistent/release-radar.toml")),
        database_path: None,
    };

    assert!(matches!(RadarConfig::load(&overrides), Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_malformed_config_file_is_error() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "bot_token = [unclosed");

    let overrides = ConfigOverrides {
        config_path: Some(path),
        database_path: None,
    };
    assert!(matches!(RadarConfig::load(&overrides), Err(Error::Config(_))));
}
