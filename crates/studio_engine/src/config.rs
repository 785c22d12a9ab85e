use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::batch::BatchSettings;
use crate::poller::PollSettings;
use crate::types::{FailureKind, ToolError};

pub const DEFAULT_GENAI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_YOUTUBE_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

const PLACEHOLDER_CLIENT_ID: &str = "YOUR_GOOGLE_CLIENT_ID.apps.googleusercontent.com";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} is not configured")]
    Missing(&'static str),
    #[error("{0} still holds a placeholder value")]
    Placeholder(&'static str),
    #[error("invalid base url {url}: {message}")]
    InvalidBaseUrl { url: String, message: String },
}

impl From<ConfigError> for ToolError {
    fn from(err: ConfigError) -> Self {
        ToolError::new(FailureKind::Configuration, err.to_string())
    }
}

/// Credentials read once at start-up. Never logged.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub client_id: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key.as_ref().map(|_| engine_logging::REDACTED))
            .field("client_id", &self.client_id)
            .finish()
    }
}

impl Credentials {
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        require("STUDIO_API_KEY", self.api_key.as_deref(), |value| {
            value.starts_with("YOUR_")
        })
    }

    pub fn require_client_id(&self) -> Result<&str, ConfigError> {
        require("STUDIO_GOOGLE_CLIENT_ID", self.client_id.as_deref(), |value| {
            value == PLACEHOLDER_CLIENT_ID || value.starts_with("YOUR_")
        })
    }
}

fn require<'a>(
    name: &'static str,
    value: Option<&'a str>,
    is_placeholder: impl Fn(&str) -> bool,
) -> Result<&'a str, ConfigError> {
    let value = value.map(str::trim).filter(|v| !v.is_empty());
    match value {
        None => Err(ConfigError::Missing(name)),
        Some(v) if is_placeholder(v) => Err(ConfigError::Placeholder(name)),
        Some(v) => Ok(v),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    pub text: String,
    pub image: String,
    pub video: String,
    pub speech: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            text: "gemini-2.5-flash".to_string(),
            image: "imagen-3.0-generate-002".to_string(),
            video: "veo-2.0-generate-001".to_string(),
            speech: "gemini-2.5-flash-preview-tts".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub credentials: Credentials,
    pub genai_base_url: String,
    pub youtube_base_url: String,
    pub models: ModelSettings,
    pub http: HttpSettings,
    pub poll: PollSettings,
    pub batch: BatchSettings,
    pub output_dir: PathBuf,
}

impl EngineConfig {
    pub fn default_with_output(output_dir: PathBuf) -> Self {
        Self {
            credentials: Credentials::default(),
            genai_base_url: DEFAULT_GENAI_BASE_URL.to_string(),
            youtube_base_url: DEFAULT_YOUTUBE_BASE_URL.to_string(),
            models: ModelSettings::default(),
            http: HttpSettings::default(),
            poll: PollSettings::default(),
            batch: BatchSettings::default(),
            output_dir,
        }
    }

    /// Reads configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let output_dir = lookup("STUDIO_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("output"));
        let mut config = Self::default_with_output(output_dir);
        config.credentials = Credentials {
            api_key: lookup("STUDIO_API_KEY"),
            client_id: lookup("STUDIO_GOOGLE_CLIENT_ID"),
        };
        if let Some(url) = lookup("STUDIO_GENAI_BASE_URL") {
            config.genai_base_url = url;
        }
        if let Some(url) = lookup("STUDIO_YOUTUBE_BASE_URL") {
            config.youtube_base_url = url;
        }
        if let Some(concurrency) = lookup("STUDIO_BATCH_CONCURRENCY").and_then(|v| v.parse().ok()) {
            config.batch.concurrency = concurrency;
        }
        config
    }

    /// Directory generated media is staged in before the caller keeps or drops it.
    pub fn artifact_dir(&self) -> PathBuf {
        self.output_dir.join(".artifacts")
    }
}
