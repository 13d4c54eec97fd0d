//! Configuration file parsing and structures.
//!
//! homevoice reads an optional TOML file. Every section has defaults, so an
//! empty file (or no file at all) gives a working text-only assistant that
//! keeps its devices in `devices.json`.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tracing_subscriber::filter::LevelFilter;

/// Top-level configuration structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub assistant: AssistantConfig,

    #[serde(default)]
    pub dialogflow: DialogflowConfig,

    #[serde(default)]
    pub speech: SpeechConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,

    /// Per-target levels, e.g. `reqwest = "warn"`
    #[serde(default)]
    pub overrides: HashMap<String, LogLevel>,
}

fn default_devices_path() -> PathBuf {
    PathBuf::from("devices.json")
}

fn default_language_code() -> String {
    "en".to_string()
}

fn default_session_id() -> String {
    "123456".to_string()
}

#[derive(Debug, Deserialize)]
pub struct AssistantConfig {
    /// JSON file holding the device records
    #[serde(default = "default_devices_path")]
    pub devices_path: PathBuf,

    /// Language tag sent with every NLU request
    #[serde(default = "default_language_code")]
    pub language_code: String,

    /// NLU session identifier
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            devices_path: default_devices_path(),
            language_code: default_language_code(),
            session_id: default_session_id(),
        }
    }
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("dialogflow_credentials.json")
}

fn default_endpoint() -> String {
    "https://dialogflow.googleapis.com".to_string()
}

/// Dialogflow NLU configuration
#[derive(Debug, Deserialize)]
pub struct DialogflowConfig {
    /// Service-account key file; also provides the project id
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for DialogflowConfig {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
            endpoint: default_endpoint(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SpeechConfig {
    /// Text-to-speech program; speech output is muted when absent
    #[serde(default)]
    pub tts: Option<TtsConfig>,

    /// Speech recognizer program; Speak is unavailable when absent
    #[serde(default)]
    pub recognizer: Option<RecognizerConfig>,
}

#[derive(Debug, Deserialize)]
pub struct TtsConfig {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,
}

fn default_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Deserialize)]
pub struct RecognizerConfig {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Give up listening after this many seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        toml::from_str(&contents).map_err(ConfigError::Parse)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
}
