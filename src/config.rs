use std::env;

use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_SEARCH_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_ANALYSIS_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY (or API_KEY) not found in environment. Set it in .env or the shell.")]
    MissingApiKey,

    #[error("API key is empty")]
    EmptyApiKey,

    #[error("Base URL must start with http:// or https://, got '{0}'")]
    InvalidBaseUrl(String),

    #[error("Timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Model name for {0} must not be empty")]
    EmptyModel(&'static str),

    #[error("Temperature must be between 0.0 and 2.0, got {0}")]
    TemperatureOutOfRange(f32),

    #[error("Invalid value for {var}: '{value}'")]
    InvalidValue { var: &'static str, value: String },
}

/// Runtime settings for the Gemini client.
#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    /// Model used for search-grounded update discovery.
    pub search_model: String,
    /// Model used for schema-constrained template analysis.
    pub analysis_model: String,
    /// Transport timeout in seconds.
    pub timeout: u64,
    pub temperature: Option<f32>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("search_model", &self.search_model)
            .field("analysis_model", &self.analysis_model)
            .field("timeout", &self.timeout)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Config {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            search_model: DEFAULT_SEARCH_MODEL.to_string(),
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT_SECS,
            temperature: None,
        }
    }

    /// Load configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .or_else(|| lookup("API_KEY"))
            .ok_or(ConfigError::MissingApiKey)?;

        let mut config = Self::new(api_key.trim());

        if let Some(base_url) = lookup("GEMINI_BASE_URL") {
            config.base_url = base_url.trim().trim_end_matches('/').to_string();
        }
        if let Some(model) = lookup("GEMINI_SEARCH_MODEL") {
            config.search_model = model.trim().to_string();
        }
        if let Some(model) = lookup("GEMINI_ANALYSIS_MODEL") {
            config.analysis_model = model.trim().to_string();
        }
        if let Some(raw) = lookup("GEMINI_TIMEOUT") {
            config.timeout = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: "GEMINI_TIMEOUT",
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup("GEMINI_TEMPERATURE") {
            let temp = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: "GEMINI_TEMPERATURE",
                value: raw.clone(),
            })?;
            config.temperature = Some(temp);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.timeout == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.search_model.is_empty() {
            return Err(ConfigError::EmptyModel("search"));
        }
        if self.analysis_model.is_empty() {
            return Err(ConfigError::EmptyModel("analysis"));
        }
        if let Some(temp) = self.temperature {
            if !(0.0..=2.0).contains(&temp) {
                return Err(ConfigError::TemperatureOutOfRange(temp));
            }
        }
        Ok(())
    }
}
