use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use tracing::{error, info};
use uuid::Uuid;

use crate::extract::extract_json_array;
use crate::gemini::SearchGrounded;
use crate::types::{Regulator, RegulatoryUpdate};

use super::{Agent, AgentError, CLIENT_NAME};

/// Days of history the search is asked to cover.
pub const LOOKBACK_DAYS: i64 = 90;
/// Number of updates requested from the model; not enforced on the reply.
pub const REQUESTED_UPDATES: usize = 5;

/// Asks a search-grounded model for recent announcements from a set of
/// regulators and parses whatever array it returns.
#[derive(Clone)]
pub struct UpdateFetcher<C> {
    client: C,
}

impl<C: SearchGrounded> UpdateFetcher<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Send the search prompt and return the raw reply text.
    pub async fn search(&self, regulators: &BTreeSet<Regulator>, today: NaiveDate) -> Result<String, AgentError> {
        if regulators.is_empty() {
            return Err(AgentError::InvalidInput("at least one regulator must be selected".into()));
        }
        let prompt = build_search_prompt(regulators, today);
        Ok(self.client.generate_grounded(&prompt).await?)
    }

    /// Search and parse. Transport failures are returned; an unparseable
    /// reply is an empty list.
    pub async fn fetch(&self, regulators: &BTreeSet<Regulator>) -> Result<Vec<RegulatoryUpdate>, AgentError> {
        let request_id = Uuid::new_v4();
        info!(
            "UpdateFetcher[{}]: searching {} regulator(s)",
            request_id,
            regulators.len()
        );

        let raw = self
            .search(regulators, Utc::now().date_naive())
            .await
            .inspect_err(|e| error!("UpdateFetcher[{}]: search request failed: {}", request_id, e))?;

        info!(
            "UpdateFetcher[{}]: received {} chars, extracting JSON array",
            request_id,
            raw.len()
        );
        let updates: Vec<RegulatoryUpdate> = extract_json_array(&raw);
        info!("UpdateFetcher[{}]: parsed {} update(s)", request_id, updates.len());
        Ok(updates)
    }
}

pub fn build_search_prompt(regulators: &BTreeSet<Regulator>, today: NaiveDate) -> String {
    let codes = regulators.iter().map(Regulator::code).collect::<Vec<_>>().join(", ");
    let since = today - Duration::days(LOOKBACK_DAYS);

    format!(
        r#"
Today is {today}. Search the official websites and news releases of the following Canadian regulators: {codes}.
Find the {count} most recent (last {days} days, published on or after {since}) significant updates, guidance notes, or notices of amendment.

Specifically look for updates that impact:
1. Customer communication standards
2. Document template requirements (e.g. font sizes, mandatory wording)
3. Disclosure requirements for banking or insurance products

Our customer "{client}" is a major Canadian financial services provider. Identify updates with high impact for them.

Output the findings ONLY as a JSON array of objects with this structure:
[{{
  "id": "unique_id",
  "regulator": "Name of Regulator",
  "date": "YYYY-MM-DD",
  "title": "Clear concise title",
  "summary": "1-2 sentence impact summary",
  "url": "Direct link to the announcement",
  "impactLevel": "High" | "Medium" | "Low"
}}]
"#,
        today = today.format("%Y-%m-%d"),
        codes = codes,
        count = REQUESTED_UPDATES,
        days = LOOKBACK_DAYS,
        since = since.format("%Y-%m-%d"),
        client = CLIENT_NAME,
    )
}

#[async_trait]
impl<C: SearchGrounded> Agent for UpdateFetcher<C> {
    type Input = BTreeSet<Regulator>;
    type Output = Vec<RegulatoryUpdate>;

    /// Transport and parse failures degrade to an empty list; only an empty
    /// selection is reported as an error.
    async fn execute(&self, regulators: &Self::Input) -> Result<Self::Output, AgentError> {
        match self.fetch(regulators).await {
            Ok(updates) => Ok(updates),
            Err(e @ AgentError::InvalidInput(_)) => Err(e),
            Err(_) => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::GeminiError;
    use crate::types::ImpactLevel;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CannedSearch {
        reply: Option<String>,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
    }

    impl CannedSearch {
        fn replying(text: &str) -> Self {
            Self { reply: Some(text.to_string()), calls: AtomicUsize::new(0), last_prompt: Mutex::new(None) }
        }

        fn failing() -> Self {
            Self { reply: None, calls: AtomicUsize::new(0), last_prompt: Mutex::new(None) }
        }
    }

    #[async_trait]
    impl SearchGrounded for CannedSearch {
        async fn generate_grounded(&self, prompt: &str) -> Result<String, GeminiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            self.reply.clone().ok_or(GeminiError::ServerBusy)
        }
    }

    fn selection(regs: &[Regulator]) -> BTreeSet<Regulator> {
        regs.iter().copied().collect()
    }

    const REPLY: &str = r#"Sure! Here is what I found:
```json
[{"id":"osfi-1","regulator":"OSFI","date":"2024-06-03","title":"Guideline B-13","summary":"Technology risk expectations.","url":"https://www.osfi-bsif.gc.ca/b13","impactLevel":"High"},
 {"id":"csa-7","regulator":"CSA","date":"2024-05-28","title":"Plain language disclosure","summary":"Fund facts wording changes.","url":"https://www.securities-administrators.ca/n","impactLevel":"Low"}]
```
Let me know if you need more."#;

    #[test]
    fn prompt_names_regulators_window_and_fields() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let prompt = build_search_prompt(&selection(&[Regulator::Csa, Regulator::Fsra]), today);
        assert!(prompt.contains("regulators: FSRA, CSA."));
        assert!(prompt.contains("Today is 2024-06-30"));
        assert!(prompt.contains("on or after 2024-04-01"));
        assert!(prompt.contains("last 90 days"));
        assert!(prompt.contains("Find the 5 most recent"));
        assert!(prompt.contains("\"impactLevel\": \"High\" | \"Medium\" | \"Low\""));
        assert!(prompt.contains("Moto Financial"));
    }

    #[tokio::test]
    async fn parses_updates_wrapped_in_prose() {
        let fetcher = UpdateFetcher::new(CannedSearch::replying(REPLY));
        let updates = fetcher.execute(&selection(&[Regulator::Osfi, Regulator::Csa])).await.unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].id, "osfi-1");
        assert_eq!(updates[0].impact_level, Some(ImpactLevel::High));
        assert_eq!(updates[1].regulator, "CSA");
        assert_eq!(fetcher.client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transport_failure_yields_empty_list() {
        let fetcher = UpdateFetcher::new(CannedSearch::failing());
        let updates = fetcher.execute(&selection(&[Regulator::Fsra])).await.unwrap();
        assert!(updates.is_empty());
    }

    #[tokio::test]
    async fn unparseable_reply_yields_empty_list() {
        let fetcher = UpdateFetcher::new(CannedSearch::replying("I could not find anything recent."));
        let updates = fetcher.execute(&selection(&[Regulator::Fsra])).await.unwrap();
        assert!(updates.is_empty());
    }

    #[tokio::test]
    async fn non_object_element_discards_the_whole_reply() {
        let reply = r#"[{"id":"1","regulator":"FSRA","date":"d","title":"t","summary":"s","url":"u","impactLevel":"High"},"see above"]"#;
        let fetcher = UpdateFetcher::new(CannedSearch::replying(reply));
        let updates = fetcher.execute(&selection(&[Regulator::Fsra])).await.unwrap();
        assert!(updates.is_empty());
    }

    #[tokio::test]
    async fn loosely_shaped_records_are_kept() {
        let reply = r#"Results:
[{"id":1,"regulator":"FSRA","date":"2024-06-01","title":"Numeric id","summary":"s","url":"u","impactLevel":"High"},
 {"id":"b","regulator":"CIRO","date":"2024-06-02","title":"Lowercase impact","summary":"s","url":"u","impactLevel":"high"},
 {"id":"c","regulator":"CSA","date":"2024-06-03","title":"No link","summary":"s","impactLevel":"Low"},
 {"id":"d","title":"Sparse"}]"#;
        let fetcher = UpdateFetcher::new(CannedSearch::replying(reply));
        let updates = fetcher.execute(&selection(&[Regulator::Fsra])).await.unwrap();
        assert_eq!(updates.len(), 4);
        assert_eq!(updates[0].id, "1");
        assert_eq!(updates[1].impact_level, Some(ImpactLevel::High));
        assert_eq!(updates[2].url, "");
        assert_eq!(updates[3].regulator, "");
        assert_eq!(updates[3].impact_level, None);
    }

    #[tokio::test]
    async fn fetch_returns_the_transport_error() {
        let fetcher = UpdateFetcher::new(CannedSearch::failing());
        let err = fetcher.fetch(&selection(&[Regulator::Fsra])).await.unwrap_err();
        assert!(matches!(err, AgentError::Llm(GeminiError::ServerBusy)));
    }

    #[tokio::test]
    async fn empty_selection_is_rejected_without_a_call() {
        let fetcher = UpdateFetcher::new(CannedSearch::replying(REPLY));
        let err = fetcher.execute(&BTreeSet::new()).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidInput(_)));
        assert_eq!(fetcher.client.calls.load(Ordering::SeqCst), 0);
        assert!(fetcher.client.last_prompt.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn identical_replies_parse_identically() {
        let fetcher = UpdateFetcher::new(CannedSearch::replying(REPLY));
        let regs = selection(&[Regulator::Osfi]);
        let first = fetcher.execute(&regs).await.unwrap();
        let second = fetcher.execute(&regs).await.unwrap();
        assert_eq!(first, second);
    }
}
