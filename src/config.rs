// src/config.rs
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";
pub const DEFAULT_REPLICATE_BASE_URL: &str = "https://api.replicate.com/v1";
/// stable-video-diffusion on Replicate.
pub const DEFAULT_VIDEO_MODEL_VERSION: &str =
    "cfa36b8c25b70c9ce84ad8fb45b2a8cd47c13c36fefa46976caa6d67dcf6eb89";

#[derive(Error, Debug)]
#[error("invalid value {value:?} for {key}")]
pub struct ConfigError {
    pub key: String,
    pub value: String,
}

#[derive(Clone)]
pub struct ImageProviderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

#[derive(Clone)]
pub struct VideoProviderConfig {
    pub api_token: Option<String>,
    pub base_url: String,
    pub model_version: String,
}

#[derive(Debug, Clone)]
pub struct PollConfig {
    pub processing_interval: Duration,
    pub queued_interval: Duration,
    pub max_attempts: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub image: ImageProviderConfig,
    pub video: VideoProviderConfig,
    pub poll: PollConfig,
}

impl Default for ImageProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }
}

impl Default for VideoProviderConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            base_url: DEFAULT_REPLICATE_BASE_URL.to_string(),
            model_version: DEFAULT_VIDEO_MODEL_VERSION.to_string(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            processing_interval: Duration::from_secs(3),
            queued_interval: Duration::from_secs(5),
            max_attempts: 200,
            timeout: Duration::from_secs(600),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            image: ImageProviderConfig::default(),
            video: VideoProviderConfig::default(),
            poll: PollConfig::default(),
        }
    }
}

impl fmt::Debug for ImageProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl fmt::Debug for VideoProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoProviderConfig")
            .field("api_token", &redact(&self.api_token))
            .field("base_url", &self.base_url)
            .field("model_version", &self.model_version)
            .finish()
    }
}

fn redact(secret: &Option<String>) -> &'static str {
    match secret {
        Some(_) => "<set>",
        None => "<unset>",
    }
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                log::warn!("Failed to load .env file: {}", e);
            }
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let secret = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let text = |key: &str, default: String| secret(key).unwrap_or(default);

        Ok(Config {
            host: text("HOST", defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port)?,
            image: ImageProviderConfig {
                api_key: secret("OPENAI_API_KEY"),
                base_url: text("OPENAI_BASE_URL", defaults.image.base_url),
                model: text("OPENAI_IMAGE_MODEL", defaults.image.model),
            },
            video: VideoProviderConfig {
                api_token: secret("REPLICATE_API_TOKEN"),
                base_url: text("REPLICATE_BASE_URL", defaults.video.base_url),
                model_version: text("REPLICATE_MODEL_VERSION", defaults.video.model_version),
            },
            poll: PollConfig {
                processing_interval: Duration::from_secs(parse_positive(
                    &lookup,
                    "POLL_PROCESSING_INTERVAL_SECS",
                    defaults.poll.processing_interval.as_secs(),
                )?),
                queued_interval: Duration::from_secs(parse_positive(
                    &lookup,
                    "POLL_QUEUED_INTERVAL_SECS",
                    defaults.poll.queued_interval.as_secs(),
                )?),
                max_attempts: parse_positive(
                    &lookup,
                    "POLL_MAX_ATTEMPTS",
                    defaults.poll.max_attempts,
                )?,
                timeout: Duration::from_secs(parse_positive(
                    &lookup,
                    "POLL_TIMEOUT_SECS",
                    defaults.poll.timeout.as_secs(),
                )?),
            },
        })
    }

    pub fn bind_addr(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| ConfigError {
            key: key.to_string(),
            value: raw,
        }),
        _ => Ok(default),
    }
}

/// Like [`parse_or`], but zero is rejected.
fn parse_positive<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Default + PartialEq,
{
    let value = parse_or(lookup, key, default)?;
    if value == T::default() {
        return Err(ConfigError {
            key: key.to_string(),
            value: lookup(key).unwrap_or_default(),
        });
    }
    Ok(value)
}
