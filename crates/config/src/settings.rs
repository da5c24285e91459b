//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Session registry configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// LLM call parameters
    #[serde(default)]
    pub llm: LlmConfig,

    /// Audio ingestion configuration
    #[serde(default)]
    pub audio: AudioConfig,

    /// Knowledge retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Company/persona block for the sales prompt
    #[serde(default)]
    pub company: CompanyConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audio.flush_threshold_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "audio.flush_threshold_bytes".to_string(),
                message: "flush threshold must be positive".to_string(),
            });
        }

        if self.retrieval.top_k == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.top_k".to_string(),
                message: "top_k must be at least 1".to_string(),
            });
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "llm.temperature".to_string(),
                message: "temperature must be within [0, 2]".to_string(),
            });
        }

        if self.llm.worker_pool_size == 0 || self.audio.worker_pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "worker_pool_size".to_string(),
                message: "worker pools must have at least one slot".to_string(),
            });
        }

        Ok(())
    }
}

/// Session registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Maximum concurrent call sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Idle session expiry in seconds
    #[serde(default = "default_session_timeout")]
    pub timeout_seconds: u64,

    /// How often the expiry sweep runs, in seconds
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

fn default_max_sessions() -> usize {
    100
}
fn default_session_timeout() -> u64 {
    3600
}
fn default_cleanup_interval() -> u64 {
    300
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            timeout_seconds: default_session_timeout(),
            cleanup_interval_seconds: default_cleanup_interval(),
        }
    }
}

/// LLM call parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Sampling temperature for conversational replies
    #[serde(default)]
    pub temperature: f32,

    /// Token budget for conversational replies
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature for summaries
    #[serde(default = "default_summary_temperature")]
    pub summary_temperature: f32,

    /// Token budget for summaries
    #[serde(default = "default_max_tokens")]
    pub summary_max_tokens: u32,

    /// Bounded pool size for in-flight model calls
    #[serde(default = "default_llm_pool_size")]
    pub worker_pool_size: usize,
}

fn default_max_tokens() -> u32 {
    150
}
fn default_summary_temperature() -> f32 {
    0.1
}
fn default_llm_pool_size() -> usize {
    10
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            summary_temperature: default_summary_temperature(),
            summary_max_tokens: default_max_tokens(),
            worker_pool_size: default_llm_pool_size(),
        }
    }
}

/// Audio ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Buffered bytes before a chunk is flushed to transcription
    #[serde(default = "default_flush_threshold")]
    pub flush_threshold_bytes: usize,

    /// Bounded pool size for in-flight transcription calls
    #[serde(default = "default_audio_pool_size")]
    pub worker_pool_size: usize,
}

fn default_flush_threshold() -> usize {
    8000
}
fn default_audio_pool_size() -> usize {
    4
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            flush_threshold_bytes: default_flush_threshold(),
            worker_pool_size: default_audio_pool_size(),
        }
    }
}

/// Knowledge retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Chunks injected into the prompt per turn
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    3
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

/// Company/persona block used to build the sales system prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyConfig {
    /// Company the agent sells for
    #[serde(default = "default_company_name")]
    pub name: String,

    /// Service lines, as "Name: description" strings
    #[serde(default = "default_services")]
    pub services: Vec<String>,

    /// Industries served
    #[serde(default = "default_industries")]
    pub industries: Vec<String>,
}

fn default_company_name() -> String {
    "Arcline Consulting".to_string()
}

fn default_services() -> Vec<String> {
    vec![
        "Custom Software Development: Building tailored software solutions for businesses".to_string(),
        "Web Development: Creating modern, responsive websites and web applications".to_string(),
        "Mobile App Development: Developing iOS and Android applications".to_string(),
        "Cloud Solutions: Cloud migration, hosting, and infrastructure management".to_string(),
        "Digital Transformation: Helping businesses modernize their digital processes".to_string(),
        "IT Consulting: Strategic technology planning and implementation".to_string(),
    ]
}

fn default_industries() -> Vec<String> {
    vec![
        "Healthcare".to_string(),
        "Finance".to_string(),
        "Education".to_string(),
        "Retail".to_string(),
        "Manufacturing".to_string(),
        "Technology".to_string(),
    ]
}

impl Default for CompanyConfig {
    fn default() -> Self {
        Self {
            name: default_company_name(),
            services: default_services(),
            industries: default_industries(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (`SALESCALL__` prefix)
/// 2. `config/{env}.yaml` (if env specified)
/// 3. `config/default.yaml`
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("SALESCALL")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}
