//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default Gemini model used for both interview and report calls.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Settings for the interview and report steps.
#[derive(Debug, Clone)]
pub struct AssessmentConfig {
    /// Optional stand-in turn cap. When set, the interview counts as complete
    /// once this many user turns have been answered, even if the model has
    /// not declared completion.
    pub max_turns: Option<u32>,
    /// Whether to request a warm-up greeting before the first user turn.
    pub warm_up: bool,
    /// Sampling temperature for interview turns.
    pub interview_temperature: f32,
    /// Sampling temperature for the final report.
    pub report_temperature: f32,
    /// Max output tokens for an interview reply.
    pub interview_max_tokens: u32,
    /// Max output tokens for the report.
    pub report_max_tokens: u32,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            max_turns: None,
            warm_up: false,
            interview_temperature: 0.4,
            report_temperature: 0.2,
            interview_max_tokens: 512,
            report_max_tokens: 2048,
        }
    }
}

impl AssessmentConfig {
    /// Load from `SWASTHYA_*` environment variables, falling back to defaults
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_turns: env_parse::<u32>("SWASTHYA_MAX_TURNS").filter(|n| *n > 0),
            warm_up: env_flag("SWASTHYA_WARM_UP"),
            interview_temperature: env_parse("SWASTHYA_INTERVIEW_TEMPERATURE")
                .unwrap_or(defaults.interview_temperature),
            report_temperature: env_parse("SWASTHYA_REPORT_TEMPERATURE")
                .unwrap_or(defaults.report_temperature),
            interview_max_tokens: env_parse("SWASTHYA_INTERVIEW_MAX_TOKENS")
                .unwrap_or(defaults.interview_max_tokens),
            report_max_tokens: env_parse("SWASTHYA_REPORT_MAX_TOKENS")
                .unwrap_or(defaults.report_max_tokens),
        }
    }
}

/// Process-level settings for the binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub api_key: SecretString,
    pub model: String,
    pub port: u16,
    /// Transport timeout for every remote model call.
    pub request_timeout: Duration,
    /// Run the terminal front end in the foreground.
    pub cli: bool,
}

impl ServerConfig {
    /// Load from the environment. Only `GEMINI_API_KEY` is required.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;

        let model = std::env::var("SWASTHYA_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let port = match std::env::var("SWASTHYA_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "SWASTHYA_PORT".to_string(),
                message: format!("not a port number: {raw}"),
            })?,
            Err(_) => 8080,
        };

        let timeout_secs: u64 = env_parse("SWASTHYA_REQUEST_TIMEOUT_SECS").unwrap_or(60);

        Ok(Self {
            api_key: SecretString::from(api_key),
            model,
            port,
            request_timeout: Duration::from_secs(timeout_secs),
            cli: env_flag("SWASTHYA_CLI"),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable configuration value");
            None
        }
    }
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
