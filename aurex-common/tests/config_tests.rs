//! Configuration loading, write-back and API key resolution
//!
//! Tests touching `AUREX_ACOUSTID_API_KEY` are marked `#[serial]` so they do
//! not race on the process environment.

use aurex_common::config::{
    load_config, resolve_acoustid_api_key, write_toml_config, AurexConfig, ACOUSTID_KEY_ENV,
};
use aurex_common::logging::{build_filter, init_tracing};
use aurex_common::Error;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("does-not-exist.toml");

    let config = load_config(Some(&path)).unwrap();
    assert_eq!(config, AurexConfig::default());
}

#[test]
fn test_malformed_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("aurex.toml");
    std::fs::write(&path, "[lookup\nstage_timeout_ms = ").unwrap();

    match load_config(Some(&path)) {
        Err(Error::Config(msg)) => assert!(msg.contains("Parse TOML failed")),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[test]
fn test_write_then_load_preserves_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("aurex.toml");

    let mut config = AurexConfig::default();
    config.logging.level = "debug".to_string();
    config.lookup.acoustid_api_key = Some("written-key".to_string());
    config.cache.path = Some(PathBuf::from("/tmp/aurex-cache.db"));

    write_toml_config(&config, &path).unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("toml.tmp").exists());

    let loaded = load_config(Some(&path)).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.cache.database_path(), PathBuf::from("/tmp/aurex-cache.db"));
}

#[test]
fn test_unwritable_destination_is_io_error() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"file, not a directory").unwrap();

    let result = write_toml_config(&AurexConfig::default(), &blocker.join("aurex.toml"));
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
#[serial]
fn test_env_key_overrides_toml() {
    env::set_var(ACOUSTID_KEY_ENV, "env-key");

    let mut config = AurexConfig::default();
    config.lookup.acoustid_api_key = Some("toml-key".to_string());

    assert_eq!(resolve_acoustid_api_key(&config).unwrap(), "env-key");

    env::remove_var(ACOUSTID_KEY_ENV);
}

#[test]
#[serial]
fn test_toml_key_used_when_env_blank() {
    env::set_var(ACOUSTID_KEY_ENV, "   ");

    let mut config = AurexConfig::default();
    config.lookup.acoustid_api_key = Some(" toml-key ".to_string());

    assert_eq!(resolve_acoustid_api_key(&config).unwrap(), "toml-key");

    env::remove_var(ACOUSTID_KEY_ENV);
}

#[test]
#[serial]
fn test_missing_key_is_config_error() {
    env::remove_var(ACOUSTID_KEY_ENV);

    let err = resolve_acoustid_api_key(&AurexConfig::default()).unwrap_err();
    assert!(err.to_string().contains("AcoustID API key not configured"));
}

#[test]
#[serial]
fn test_logging_init_is_idempotent() {
    env::remove_var("RUST_LOG");
    let config = AurexConfig::default();

    assert!(build_filter(&config.logging).is_ok());
    init_tracing(&config.logging).unwrap();
    // A second installation attempt reports false instead of panicking
    assert!(!init_tracing(&config.logging).unwrap());
}
