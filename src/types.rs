use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Canadian financial-services oversight bodies tracked by the watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Regulator {
    Fsra,
    Ciro,
    Osfi,
    Ccir,
    Fintrac,
    Csa,
}

impl Regulator {
    pub const ALL: [Regulator; 6] = [
        Regulator::Fsra,
        Regulator::Ciro,
        Regulator::Osfi,
        Regulator::Ccir,
        Regulator::Fintrac,
        Regulator::Csa,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Regulator::Fsra => "FSRA",
            Regulator::Ciro => "CIRO",
            Regulator::Osfi => "OSFI",
            Regulator::Ccir => "CCIR",
            Regulator::Fintrac => "FINTRAC",
            Regulator::Csa => "CSA",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Regulator::Fsra => "Financial Services Regulatory Authority (Ontario)",
            Regulator::Ciro => "Canadian Investment Regulatory Organization",
            Regulator::Osfi => "Office of the Superintendent of Financial Institutions",
            Regulator::Ccir => "Canadian Council of Insurance Regulators",
            Regulator::Fintrac => "FINTRAC Canada",
            Regulator::Csa => "Canadian Securities Administrators",
        }
    }

    pub fn url(&self) -> &'static str {
        match self {
            Regulator::Fsra => "https://www.fsrao.ca/",
            Regulator::Ciro => "https://www.ciro.ca/",
            Regulator::Osfi => "https://www.osfi-bsif.gc.ca/",
            Regulator::Ccir => "https://www.ccir-ccra.org/",
            Regulator::Fintrac => "https://fintrac-canafe.canada.ca/",
            Regulator::Csa => "https://www.securities-administrators.ca/",
        }
    }
}

impl fmt::Display for Regulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Regulator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Regulator::ALL
            .into_iter()
            .find(|r| r.code().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                format!(
                    "unknown regulator '{}' (expected one of: {})",
                    wanted,
                    Regulator::ALL.map(|r| r.code()).join(", ")
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactLevel {
    High,
    Medium,
    Low,
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self { ImpactLevel::High => "High", ImpactLevel::Medium => "Medium", ImpactLevel::Low => "Low" };
        f.write_str(s)
    }
}

impl FromStr for ImpactLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(ImpactLevel::High),
            "medium" => Ok(ImpactLevel::Medium),
            "low" => Ok(ImpactLevel::Low),
            other => Err(format!("unknown impact level '{}'", other)),
        }
    }
}

/// One regulatory announcement as reported by the model.
///
/// The model's shape is trusted, not checked: absent or `null` fields read
/// as empty text, numbers and booleans are kept as their JSON text, and an
/// unrecognised `impactLevel` reads as `None`. `regulator` stays free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegulatoryUpdate {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub regulator: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub summary: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub url: String,
    #[serde(default, deserialize_with = "lenient_impact", skip_serializing_if = "Option::is_none")]
    pub impact_level: Option<ImpactLevel>,
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn lenient_impact<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<ImpactLevel>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s.parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplianceStatus {
    Compliant,
    #[serde(rename = "At Risk")]
    AtRisk,
    #[serde(rename = "Needs Review")]
    NeedsReview,
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComplianceStatus::Compliant => "Compliant",
            ComplianceStatus::AtRisk => "At Risk",
            ComplianceStatus::NeedsReview => "Needs Review",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceVerdict {
    pub status: ComplianceStatus,
    pub summary: String,
    pub suggested_changes: Vec<String>,
}

/// Regulators selected when the dashboard starts.
pub const DEFAULT_SELECTION: [Regulator; 3] = [Regulator::Fsra, Regulator::Ciro, Regulator::Csa];

/// Updates shown before the first fetch completes.
pub fn seed_updates() -> Vec<RegulatoryUpdate> {
    vec![
        RegulatoryUpdate {
            id: "1".to_string(),
            regulator: Regulator::Fsra.to_string(),
            date: "2024-05-15".to_string(),
            title: "New Guidance on Unfair Claims Settlement Practices".to_string(),
            summary: "Updates to the Treat Customers Fairly (TCF) framework specifically for property and casualty insurers.".to_string(),
            url: "https://www.fsrao.ca/newsroom".to_string(),
            impact_level: Some(ImpactLevel::High),
        },
        RegulatoryUpdate {
            id: "2".to_string(),
            regulator: Regulator::Ciro.to_string(),
            date: "2024-05-10".to_string(),
            title: "Proposed Amendments to Proficiency Requirements".to_string(),
            summary: "Revised standards for continuing education and initial registration of investment advisors.".to_string(),
            url: "https://www.ciro.ca/news".to_string(),
            impact_level: Some(ImpactLevel::Medium),
        },
    ]
}

/// One-line digest of known updates, fed to the template audit.
pub fn update_digest(updates: &[RegulatoryUpdate]) -> String {
    updates
        .iter()
        .map(|u| format!("{}: {}", u.regulator, u.title))
        .collect::<Vec<_>>()
        .join(" | ")
}
