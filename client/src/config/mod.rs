use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ClientError;

pub const DEFAULT_API_BASE: &str = "https://clutchden.onrender.com/api";
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_AUTH_SCHEME: &str = "Bearer";

const API_SUFFIX: &str = "/api";
const SESSION_DIR_NAME: &str = "clutchden";
const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(toml::de::Error),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl From<ConfigError> for ClientError {
    fn from(err: ConfigError) -> Self {
        ClientError::Config(err.to_string())
    }
}

/// How the backend serves `GET` on the profile-picture endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PictureFormat {
    /// Image bytes streamed in the body.
    #[default]
    Binary,
    /// JSON pointing at a URL (`{ "url": ... }`, possibly enveloped).
    JsonUrl,
}

/// Routes that differed between backend revisions. Everything else is fixed.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EndpointConfig {
    /// `{id}` is replaced with the user id.
    pub profile: String,
    pub profile_picture: String,
    pub upload_profile_picture: String,
}

impl EndpointConfig {
    pub fn profile_path(&self, user_id: &str) -> String {
        self.profile.replace("{id}", user_id)
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            profile: "/users/profile/{id}".to_string(),
            profile_picture: "/users/profile-picture".to_string(),
            upload_profile_picture: "/upload/profile-picture".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base: String,
    pub timeout_ms: u64,
    /// Scheme written in front of the stored token on every request.
    pub auth_scheme: String,
    pub session_file: Option<PathBuf>,
    pub profile_picture: PictureFormat,
    pub endpoints: EndpointConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            auth_scheme: DEFAULT_AUTH_SCHEME.to_string(),
            session_file: None,
            profile_picture: PictureFormat::default(),
            endpoints: EndpointConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(ConfigError::Read)?;
        let config: ClientConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the configuration from `.env`, an optional TOML file named by
    /// `CLUTCH_CONFIG_PATH`, and `CLUTCH_*` overrides, in that order.
    pub fn from_env() -> Result<Self, ConfigError> {
        if dotenvy::dotenv().is_err() {
            log::debug!("No .env file found, using process environment only");
        }

        let mut config = match std::env::var("CLUTCH_CONFIG_PATH") {
            Ok(path) => {
                log::info!("Loading client configuration from '{}'", path);
                Self::load_from_file(&path)?
            }
            Err(_) => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `CLUTCH_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base) = lookup("CLUTCH_API_BASE") {
            self.api_base = base;
        }
        if let Some(raw) = lookup("CLUTCH_TIMEOUT_MS") {
            self.timeout_ms = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "CLUTCH_TIMEOUT_MS",
                reason: format!("'{}' is not a number of milliseconds", raw),
            })?;
        }
        if let Some(scheme) = lookup("CLUTCH_AUTH_SCHEME") {
            self.auth_scheme = scheme;
        }
        if let Some(path) = lookup("CLUTCH_SESSION_FILE") {
            self.session_file = Some(PathBuf::from(path));
        }
        if let Some(format) = lookup("CLUTCH_PROFILE_PICTURE") {
            self.profile_picture = match format.trim() {
                "binary" => PictureFormat::Binary,
                "json_url" => PictureFormat::JsonUrl,
                other => {
                    return Err(ConfigError::Invalid {
                        key: "CLUTCH_PROFILE_PICTURE",
                        reason: format!("expected 'binary' or 'json_url', got '{}'", other),
                    });
                }
            };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.base_url();
        reqwest::Url::parse(&base).map_err(|e| ConfigError::Invalid {
            key: "api_base",
            reason: format!("'{}': {}", base, e),
        })?;

        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }

        let scheme = self.auth_scheme.trim();
        if scheme.is_empty() || scheme.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid {
                key: "auth_scheme",
                reason: format!("'{}' is not a single word", self.auth_scheme),
            });
        }

        Ok(())
    }

    /// API base with a guaranteed `/api` suffix and no trailing slash.
    pub fn base_url(&self) -> String {
        normalize_api_base(&self.api_base)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn session_file_path(&self) -> PathBuf {
        if let Some(path) = &self.session_file {
            return path.clone();
        }

        dirs::data_local_dir()
            .map(|dir| dir.join(SESSION_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from(format!(".{}", SESSION_DIR_NAME)))
            .join(SESSION_FILE_NAME)
    }
}

pub fn normalize_api_base(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.ends_with(API_SUFFIX) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, API_SUFFIX)
    }
}
