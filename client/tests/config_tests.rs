use std::io::Write;
use std::path::PathBuf;

use client::PictureFormat;
use client::config::{ClientConfig, ConfigError};
use serial_test::serial;

const VARS: [&str; 6] = [
    "CLUTCH_CONFIG_PATH",
    "CLUTCH_API_BASE",
    "CLUTCH_TIMEOUT_MS",
    "CLUTCH_AUTH_SCHEME",
    "CLUTCH_SESSION_FILE",
    "CLUTCH_PROFILE_PICTURE",
];

fn clear_env() {
    for var in VARS {
        // SAFETY: tests touching the environment are serialized.
        unsafe { std::env::remove_var(var) };
    }
}

fn set_env(key: &str, value: &str) {
    // SAFETY: tests touching the environment are serialized.
    unsafe { std::env::set_var(key, value) };
}

#[test]
#[serial]
fn test_defaults_without_environment() {
    clear_env();

    let config = ClientConfig::from_env().expect("Failed to load config");
    assert_eq!(config.base_url(), "https://clutchden.onrender.com/api");
    assert_eq!(config.timeout_ms, 15_000);
    assert_eq!(config.auth_scheme, "Bearer");
    assert_eq!(config.profile_picture, PictureFormat::Binary);
}

#[test]
#[serial]
fn test_environment_overrides() {
    clear_env();
    set_env("CLUTCH_API_BASE", "http://localhost:5000/");
    set_env("CLUTCH_TIMEOUT_MS", "750");
    set_env("CLUTCH_PROFILE_PICTURE", "json_url");
    set_env("CLUTCH_SESSION_FILE", "/tmp/clutch-test/session.json");

    let config = ClientConfig::from_env().expect("Failed to load config");
    clear_env();

    assert_eq!(config.base_url(), "http://localhost:5000/api");
    assert_eq!(config.timeout_ms, 750);
    assert_eq!(config.profile_picture, PictureFormat::JsonUrl);
    assert_eq!(
        config.session_file_path(),
        PathBuf::from("/tmp/clutch-test/session.json")
    );
}

#[test]
#[serial]
fn test_file_then_environment() {
    clear_env();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
api_base = "https://staging.example.com"
timeout_ms = 5000
auth_scheme = "Token"

[endpoints]
profile = "/users/{{id}}"
"#
    )
    .unwrap();

    set_env("CLUTCH_CONFIG_PATH", file.path().to_str().unwrap());
    set_env("CLUTCH_TIMEOUT_MS", "1200");

    let config = ClientConfig::from_env().expect("Failed to load config");
    clear_env();

    assert_eq!(config.base_url(), "https://staging.example.com/api");
    assert_eq!(config.timeout_ms, 1200);
    assert_eq!(config.auth_scheme, "Token");
    assert_eq!(config.endpoints.profile, "/users/{id}");
}

#[test]
#[serial]
fn test_invalid_timeout_is_rejected() {
    clear_env();
    set_env("CLUTCH_TIMEOUT_MS", "soon");

    let result = ClientConfig::from_env();
    clear_env();

    assert!(matches!(
        result,
        Err(ConfigError::Invalid {
            key: "CLUTCH_TIMEOUT_MS",
            ..
        })
    ));
}

#[test]
#[serial]
fn test_missing_config_file() {
    clear_env();
    set_env("CLUTCH_CONFIG_PATH", "/nonexistent/clutch.toml");

    let result = ClientConfig::from_env();
    clear_env();

    assert!(matches!(result, Err(ConfigError::Read(_))));
}

#[test]
fn test_load_from_file_rejects_bad_toml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "timeout_ms = \"fast\"").unwrap();

    let result = ClientConfig::load_from_file(file.path());
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}
