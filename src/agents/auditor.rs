use async_trait::async_trait;
use tracing::{error, info};
use uuid::Uuid;

use crate::gemini::{Schema, StructuredOutput};
use crate::types::ComplianceVerdict;

use super::{Agent, AgentError, CLIENT_NAME};

/// Judges a document template against a digest of known updates using
/// schema-constrained output.
#[derive(Clone)]
pub struct TemplateAuditor<C> {
    client: C,
    schema: Schema,
}

#[derive(Debug, Clone)]
pub struct AuditInput {
    pub template: String,
    /// `REGULATOR: title` pairs joined with ` | `; may be empty.
    pub digest: String,
}

impl<C: StructuredOutput> TemplateAuditor<C> {
    pub fn new(client: C) -> Self {
        Self { client, schema: verdict_schema() }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Strict variant: every failure is returned to the caller.
    pub async fn audit(&self, input: &AuditInput) -> Result<ComplianceVerdict, AgentError> {
        if input.template.trim().is_empty() {
            return Err(AgentError::InvalidInput("template text is empty".into()));
        }

        let request_id = Uuid::new_v4();
        info!(
            "TemplateAuditor[{}]: auditing {} chars of template against {} chars of update digest",
            request_id,
            input.template.len(),
            input.digest.len()
        );
        let prompt = build_audit_prompt(&input.template, &input.digest);
        let verdict = self
            .client
            .generate_structured(&prompt, &self.schema)
            .await
            .map_err(AgentError::from)
            .and_then(|raw| serde_json::from_str::<ComplianceVerdict>(&raw).map_err(AgentError::from))
            .inspect_err(|e| error!("TemplateAuditor[{}]: audit failed: {}", request_id, e))?;

        info!(
            "TemplateAuditor[{}]: verdict {} with {} suggested change(s)",
            request_id,
            verdict.status,
            verdict.suggested_changes.len()
        );
        Ok(verdict)
    }
}

/// Output schema for a compliance verdict.
pub fn verdict_schema() -> Schema {
    Schema::object([
        ("status", Schema::string()),
        ("summary", Schema::string()),
        ("suggestedChanges", Schema::array_of(Schema::string())),
    ])
}

pub fn build_audit_prompt(template: &str, digest: &str) -> String {
    format!(
        r#"
You are a Canadian Regulatory Compliance Specialist for "{client}".

Analyze the following document template content against these recent regulatory updates:
UPDATES: {digest}

TEMPLATE CONTENT:
"""
{template}
"""

TASK:
1. Determine if the template needs changes to remain compliant.
2. Check for required legal headers, specific font mentions, or mandatory disclosure clauses.

Return a JSON object:
{{
  "status": "Compliant" | "At Risk" | "Needs Review",
  "summary": "Detailed compliance reasoning",
  "suggestedChanges": ["Actionable step 1", "Actionable step 2"]
}}
"#,
        client = CLIENT_NAME,
        digest = digest,
        template = template,
    )
}

#[async_trait]
impl<C: StructuredOutput> Agent for TemplateAuditor<C> {
    type Input = AuditInput;
    type Output = Option<ComplianceVerdict>;

    async fn execute(&self, input: &Self::Input) -> Result<Self::Output, AgentError> {
        if input.template.trim().is_empty() {
            info!("TemplateAuditor: template is empty, skipping audit");
            return Ok(None);
        }
        Ok(self.audit(input).await.ok())
    }
}
