// src/model/mod.rs

use serde::{Deserialize, Serialize};

/// One declared outcome label of a proposed step, e.g. "balance" or "left".
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExpectedOutcome {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ExpectedOutcome {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            note: None,
        }
    }
}

/// One branch of a structured verification procedure.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prob: Option<f64>,
}

/// Richer verification spec a proposal may carry: the procedure, its mutually
/// exclusive outcomes, an estimated cost and the fields worth logging.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VerificationSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedure: Option<String>,
    #[serde(default)]
    pub outcomes: Vec<VerificationOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default)]
    pub log_fields: Vec<String>,
}

/// A candidate next step before it is scored or accepted. Produced fresh each
/// iteration; only the chosen one survives, as a scratchpad entry.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Proposal {
    pub text: String,
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how_to_verify: Option<String>,
    #[serde(default)]
    pub expected_outcomes: Vec<ExpectedOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationSpec>,
}

impl Proposal {
    pub fn new(text: &str, rationale: &str) -> Self {
        Self {
            text: text.to_string(),
            rationale: rationale.to_string(),
            ..Self::default()
        }
    }

    /// True when the proposal names a concrete check for its own claim.
    pub fn has_verification_hook(&self) -> bool {
        self.how_to_verify
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty())
    }
}

/// Score breakdown for one (task, scratchpad, proposal) triple. Never cached
/// across scratchpad mutations: redundancy and consistency depend on history.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScoreParts {
    pub rules_score: f64,
    pub redundancy_score: f64,
    pub consistency_score: f64,
    pub total_score: f64,
    pub entropy_boost: f64,
    pub voi: f64,
    pub cost: f64,
}

/// A proposal together with its score breakdown.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoredStep {
    pub proposal: Proposal,
    pub score: ScoreParts,
}
