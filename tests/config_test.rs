//! Config file loading.

use std::time::Duration;

use abn_lookup::{AbnLookup, Config, LookupError};

#[test]
fn load_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        [api]
        base_url = "https://abr.example/api/v1"
        timeout_secs = 5

        [cache]
        retention_secs = 30
        "#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.api.base_url, "https://abr.example/api/v1");
    assert_eq!(config.timeout(), Duration::from_secs(5));
    assert_eq!(config.cache_config().retention, Duration::from_secs(30));
    assert_eq!(config.sweep_interval(), Duration::from_secs(60));
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let err = Config::load(Some(&path)).unwrap_err();
    match err {
        LookupError::Configuration(msg) => assert!(msg.contains("absent.toml"), "{msg}"),
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn parse_error_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[cache]\nretention_secs = \"soon\"\n").unwrap();

    let err = Config::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("broken.toml"), "{err}");
}

#[test]
fn zero_retention_is_rejected() {
    let config = Config::from_toml_str("[cache]\nretention_secs = 0\n").unwrap();
    assert!(matches!(config.validate(), Err(LookupError::Configuration(_))));
}

#[test]
fn builder_from_config() {
    let config = Config::from_toml_str(
        r#"
        [api]
        base_url = "http://localhost:8080/api/v1"
        "#,
    )
    .unwrap();
    let lookup = AbnLookup::builder()
        .base_url(config.api.base_url.clone())
        .cache_config(config.cache_config())
        .build()
        .unwrap();
    assert_eq!(lookup.cache().config().retention, Duration::from_secs(120));
}
