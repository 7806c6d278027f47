use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] crate::gemini::GeminiError),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AgentError {
    /// The provider-side cause, if the failure came from the model call.
    pub fn into_llm(self) -> Option<crate::gemini::GeminiError> {
        match self {
            AgentError::Llm(e) => Some(e),
            _ => None,
        }
    }
}

/// One request/response exchange with the model.
#[async_trait]
pub trait Agent {
    type Input: Send + Sync;
    type Output: Send + Sync;
    async fn execute(&self, input: &Self::Input) -> Result<Self::Output, AgentError>;
}

/// Organization the prompts are written on behalf of.
pub const CLIENT_NAME: &str = "Moto Financial";

pub mod fetcher;
pub mod auditor;

pub use fetcher::UpdateFetcher;
pub use auditor::{AuditInput, TemplateAuditor};
