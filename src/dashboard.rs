use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::agents::{AgentError, AuditInput, TemplateAuditor, UpdateFetcher};
use crate::gemini::{GeminiError, SearchGrounded, StructuredOutput};
use crate::types::{
    seed_updates, update_digest, ComplianceVerdict, Regulator, RegulatoryUpdate, DEFAULT_SELECTION,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Feed,
    Templates,
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "feed" => Ok(View::Feed),
            "templates" | "template" => Ok(View::Templates),
            other => Err(format!("unknown view '{}' (expected feed or templates)", other)),
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { View::Feed => "feed", View::Templates => "templates" })
    }
}

/// Everything the dashboard shows. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardState {
    pub view: View,
    pub selected: BTreeSet<Regulator>,
    pub updates: Vec<RegulatoryUpdate>,
    pub template_text: String,
    pub verdict: Option<ComplianceVerdict>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            view: View::Feed,
            selected: DEFAULT_SELECTION.into_iter().collect(),
            updates: seed_updates(),
            template_text: String::new(),
            verdict: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The update list was replaced with this many fresh entries.
    Replaced(usize),
    /// Nothing usable came back; the previous list is kept. Carries the
    /// provider error when the search call itself failed.
    Unchanged(Option<GeminiError>),
    /// Another refresh was already in flight.
    Suppressed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuditOutcome {
    Verdict(ComplianceVerdict),
    /// The verdict was cleared. Carries the provider error when the model
    /// call itself failed.
    NoVerdict(Option<GeminiError>),
    /// Template text was blank; no request was made.
    Skipped,
    Suppressed,
}

/// Clears an in-flight flag when dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Injectable state container driving the two model-backed operations.
pub struct Dashboard<S, A> {
    fetcher: UpdateFetcher<S>,
    auditor: TemplateAuditor<A>,
    state: RwLock<DashboardState>,
    fetching: AtomicBool,
    auditing: AtomicBool,
}

impl<S: SearchGrounded, A: StructuredOutput> Dashboard<S, A> {
    pub fn new(search: S, structured: A) -> Self {
        Self::with_state(search, structured, DashboardState::default())
    }

    pub fn with_state(search: S, structured: A, state: DashboardState) -> Self {
        Self {
            fetcher: UpdateFetcher::new(search),
            auditor: TemplateAuditor::new(structured),
            state: RwLock::new(state),
            fetching: AtomicBool::new(false),
            auditing: AtomicBool::new(false),
        }
    }

    pub async fn snapshot(&self) -> DashboardState {
        self.state.read().await.clone()
    }

    pub fn is_fetching(&self) -> bool {
        self.fetching.load(Ordering::Acquire)
    }

    pub fn is_auditing(&self) -> bool {
        self.auditing.load(Ordering::Acquire)
    }

    pub async fn set_view(&self, view: View) {
        self.state.write().await.view = view;
    }

    /// Flip a regulator in or out of the selection; returns whether it is
    /// now selected.
    pub async fn toggle_regulator(&self, regulator: Regulator) -> bool {
        let mut state = self.state.write().await;
        if state.selected.remove(&regulator) {
            false
        } else {
            state.selected.insert(regulator);
            true
        }
    }

    pub async fn set_template_text(&self, text: impl Into<String>) {
        self.state.write().await.template_text = text.into();
    }

    /// Fetch fresh updates for the current selection.
    pub async fn refresh(&self) -> RefreshOutcome {
        let Some(_guard) = InFlight::acquire(&self.fetching) else {
            info!("Dashboard: refresh already in flight, ignoring");
            return RefreshOutcome::Suppressed;
        };

        let selected = self.state.read().await.selected.clone();
        match self.fetcher.fetch(&selected).await {
            Ok(updates) if !updates.is_empty() => {
                let count = updates.len();
                self.state.write().await.updates = updates;
                info!("Dashboard: replaced feed with {} update(s)", count);
                RefreshOutcome::Replaced(count)
            }
            Ok(_) => {
                warn!("Dashboard: no updates found in search response, keeping current feed");
                RefreshOutcome::Unchanged(None)
            }
            Err(AgentError::InvalidInput(msg)) => {
                warn!("Dashboard: refresh skipped: {}", msg);
                RefreshOutcome::Unchanged(None)
            }
            Err(e) => {
                warn!("Dashboard: refresh failed, keeping current feed");
                RefreshOutcome::Unchanged(e.into_llm())
            }
        }
    }

    /// Audit the current template text against the current feed.
    pub async fn analyze(&self) -> AuditOutcome {
        let input = {
            let state = self.state.read().await;
            if state.template_text.trim().is_empty() {
                return AuditOutcome::Skipped;
            }
            AuditInput {
                template: state.template_text.clone(),
                digest: update_digest(&state.updates),
            }
        };

        let Some(_guard) = InFlight::acquire(&self.auditing) else {
            info!("Dashboard: audit already in flight, ignoring");
            return AuditOutcome::Suppressed;
        };

        match self.auditor.audit(&input).await {
            Ok(verdict) => {
                self.state.write().await.verdict = Some(verdict.clone());
                AuditOutcome::Verdict(verdict)
            }
            Err(e) => {
                warn!("Dashboard: audit failed, clearing verdict");
                self.state.write().await.verdict = None;
                AuditOutcome::NoVerdict(e.into_llm())
            }
        }
    }
}
