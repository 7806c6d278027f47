use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

/// Custom error types for Gemini API interactions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeminiError {
    #[error("Gemini servers are currently busy. Please try again in a few moments.")]
    ServerBusy,

    #[error("Network connection failed: {message}")]
    NetworkError { message: String },

    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {message}")]
    ParseError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Prompt was blocked by the provider: {reason}")]
    Blocked { reason: String },
}

impl GeminiError {
    pub fn is_server_busy(&self) -> bool {
        matches!(self, GeminiError::ServerBusy)
    }

    pub fn is_network_error(&self) -> bool {
        matches!(self, GeminiError::NetworkError { .. } | GeminiError::Timeout { .. })
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            GeminiError::ServerBusy => {
                "🚫 Gemini servers are currently busy. Please try again in a few moments."
                    .to_string()
            }
            GeminiError::NetworkError { .. } => {
                "🌐 Network connection failed. Please check your internet connection and try again."
                    .to_string()
            }
            GeminiError::Timeout { seconds } => {
                format!(
                    "⏰ Request timed out after {} seconds. The server might be overloaded.",
                    seconds
                )
            }
            GeminiError::ApiError { status, .. } => match *status {
                400 => "❌ The request was rejected as invalid. Check the model name.".to_string(),
                401 | 403 => "🔑 The API key was rejected. Check GEMINI_API_KEY.".to_string(),
                _ => format!("❌ API error ({}). Please try again later.", status),
            },
            GeminiError::ParseError { .. } => {
                "⚠️ Failed to parse server response. Please try again.".to_string()
            }
            GeminiError::ConfigError { message } => {
                format!("⚙️ Configuration error: {}", message)
            }
            GeminiError::Blocked { reason } => {
                format!("🛑 The provider refused to answer ({}).", reason)
            }
        }
    }
}

/// Search-grounded generation: the model may consult live web content, but
/// the reply is free-form text.
#[async_trait]
pub trait SearchGrounded: Send + Sync {
    async fn generate_grounded(&self, prompt: &str) -> Result<String, GeminiError>;
}

/// Schema-constrained generation: the reply is JSON matching `schema`.
///
/// The provider does not combine this mode with search grounding.
#[async_trait]
pub trait StructuredOutput: Send + Sync {
    async fn generate_structured(&self, prompt: &str, schema: &Schema) -> Result<String, GeminiError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaType {
    Object,
    Array,
    String,
}

/// Subset of the OpenAPI schema accepted as `responseSchema`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    #[serde(rename = "type")]
    pub kind: SchemaType,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Schema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl Schema {
    pub fn string() -> Self {
        Self { kind: SchemaType::String, properties: BTreeMap::new(), items: None, required: Vec::new() }
    }

    pub fn array_of(items: Schema) -> Self {
        Self {
            kind: SchemaType::Array,
            properties: BTreeMap::new(),
            items: Some(Box::new(items)),
            required: Vec::new(),
        }
    }

    /// Object whose listed properties are all required.
    pub fn object<I>(properties: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, Schema)>,
    {
        let properties: BTreeMap<String, Schema> =
            properties.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        let required = properties.keys().cloned().collect();
        Self { kind: SchemaType::Object, properties, items: None, required }
    }
}

/// API request/response structures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Content {
    pub fn user(text: &str) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part { text: Some(text.to_string()) }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<&'a Schema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn into_text(self) -> Result<String, GeminiError> {
        let Some(first) = self.candidates.into_iter().next() else {
            if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(GeminiError::Blocked { reason });
            }
            return Err(GeminiError::ParseError { message: "No candidates in API response".to_string() });
        };

        Ok(first
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
            .unwrap_or_default())
    }
}

/// Gemini API client
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    config: Config,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.config.base_url)
            .field("search_model", &self.config.search_model)
            .field("analysis_model", &self.config.analysis_model)
            .finish()
    }
}

impl GeminiClient {
    /// Create a new Gemini client with the given configuration
    pub fn new(config: Config) -> Result<Self, GeminiError> {
        config.validate().map_err(|e| GeminiError::ConfigError {
            message: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(concat!("reguwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GeminiError::ConfigError {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    /// Map reqwest errors to our custom error types
    fn map_reqwest_error(&self, error: reqwest::Error) -> GeminiError {
        if error.is_timeout() {
            return GeminiError::Timeout {
                seconds: self.config.timeout,
            };
        }

        if error.is_connect() {
            return GeminiError::NetworkError {
                message: "Failed to connect to server".to_string(),
            };
        }

        if error.is_request() {
            return GeminiError::NetworkError {
                message: "Request failed".to_string(),
            };
        }

        GeminiError::NetworkError {
            message: format!("Request error: {}", error),
        }
    }

    /// Handle error responses from the server
    async fn handle_error_response(
        &self,
        status: StatusCode,
        response: reqwest::Response,
    ) -> GeminiError {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        match status {
            StatusCode::TOO_MANY_REQUESTS
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::BAD_GATEWAY
            | StatusCode::GATEWAY_TIMEOUT => GeminiError::ServerBusy,
            _ => {
                let message = serde_json::from_str::<ApiErrorEnvelope>(&error_text)
                    .map(|e| e.error.message)
                    .unwrap_or(error_text);
                GeminiError::ApiError {
                    status: status.as_u16(),
                    message,
                }
            }
        }
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest<'_>,
    ) -> Result<String, GeminiError> {
        let url = format!("{}/models/{}:generateContent", self.config.base_url, model);
        tracing::debug!("POST {} (tools={}, structured={})", url, request.tools.len(), request.generation_config.is_some());

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.handle_error_response(status, response).await);
        }

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GeminiError::ParseError { message: format!("Failed to parse API response: {}", e) })?;

        api_response.into_text()
    }
}

#[async_trait]
impl SearchGrounded for GeminiClient {
    async fn generate_grounded(&self, prompt: &str) -> Result<String, GeminiError> {
        let request = GenerateContentRequest {
            contents: vec![Content::user(prompt)],
            tools: vec![Tool { google_search: GoogleSearch {} }],
            generation_config: self.config.temperature.map(|t| GenerationConfig {
                temperature: Some(t),
                ..Default::default()
            }),
        };
        self.generate(&self.config.search_model, &request).await
    }
}

#[async_trait]
impl StructuredOutput for GeminiClient {
    async fn generate_structured(&self, prompt: &str, schema: &Schema) -> Result<String, GeminiError> {
        let request = GenerateContentRequest {
            contents: vec![Content::user(prompt)],
            tools: Vec::new(),
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json"),
                response_schema: Some(schema),
                temperature: self.config.temperature,
            }),
        };
        self.generate(&self.config.analysis_model, &request).await
    }
}
