use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::console::{self, Console};
use crate::dashboard::{AuditOutcome, Dashboard, DashboardState, RefreshOutcome};
use crate::gemini::GeminiClient;
use crate::types::{ComplianceVerdict, Regulator, RegulatoryUpdate, DEFAULT_SELECTION};

/// Wires configuration, the Gemini client and the dashboard together for
/// each CLI entry point.
pub struct Orchestrator {
    client: GeminiClient,
}

impl Orchestrator {
    pub fn new(cfg: Config) -> Result<Self> {
        info!(
            "Using search model {} and analysis model {}",
            cfg.search_model, cfg.analysis_model
        );
        let client = GeminiClient::new(cfg)?;
        Ok(Self { client })
    }

    fn dashboard(&self, selected: BTreeSet<Regulator>) -> Dashboard<GeminiClient, GeminiClient> {
        let state = DashboardState { selected, ..Default::default() };
        Dashboard::with_state(self.client.clone(), self.client.clone(), state)
    }

    pub async fn run_console(&self) -> Result<()> {
        info!("Interactive mode: type /help for commands");
        let console = Console::new(self.dashboard(DEFAULT_SELECTION.into_iter().collect()));
        console.run().await
    }

    /// One fetch for `regulators`; falls back to the seed feed when nothing
    /// usable comes back.
    pub async fn run_fetch(
        &self,
        regulators: BTreeSet<Regulator>,
        out: Option<&Path>,
    ) -> Result<Vec<RegulatoryUpdate>> {
        if regulators.is_empty() {
            bail!("select at least one regulator");
        }
        let dashboard = self.dashboard(regulators);
        info!("Fetch mode: searching for recent updates");
        if let RefreshOutcome::Unchanged(cause) = dashboard.refresh().await {
            if let Some(e) = cause {
                console::display_error(&anyhow::Error::new(e));
            }
            info!("Fetch returned nothing usable; showing the seed feed");
        }

        let updates = dashboard.snapshot().await.updates;
        console::display_updates(&updates);
        if let Some(path) = out {
            write_json(path, &updates).await?;
        }
        Ok(updates)
    }

    /// Audit the template at `template_path`, optionally refreshing the feed
    /// first so the digest reflects live updates.
    pub async fn run_audit(
        &self,
        template_path: &Path,
        regulators: BTreeSet<Regulator>,
        fetch_first: bool,
        out: Option<&Path>,
    ) -> Result<Option<ComplianceVerdict>> {
        let template = tokio::fs::read_to_string(template_path)
            .await
            .with_context(|| format!("reading template {}", template_path.display()))?;
        if template.trim().is_empty() {
            bail!("template {} is empty", template_path.display());
        }

        let dashboard = self.dashboard(regulators);
        if fetch_first {
            info!("Audit mode: refreshing the feed before auditing");
            if let RefreshOutcome::Unchanged(Some(e)) = dashboard.refresh().await {
                console::display_error(&anyhow::Error::new(e));
            }
        }
        dashboard.set_template_text(template).await;

        info!("Audit mode: analyzing {}", template_path.display());
        let verdict = match dashboard.analyze().await {
            AuditOutcome::Verdict(v) => Some(v),
            AuditOutcome::NoVerdict(Some(e)) => {
                console::display_error(&anyhow::Error::new(e));
                None
            }
            _ => None,
        };
        console::display_verdict(verdict.as_ref());
        if let (Some(path), Some(v)) = (out, &verdict) {
            write_json(path, v).await?;
        }
        Ok(verdict)
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let pretty = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, pretty)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    info!("Saved {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_json_creates_parent_dirs() {
        let dir = std::env::temp_dir().join(format!("reguwatch-test-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("updates.json");
        write_json(&path, &crate::types::seed_updates()).await.unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        let back: Vec<RegulatoryUpdate> = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, crate::types::seed_updates());
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
