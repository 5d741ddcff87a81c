// src/verifier/mod.rs

use std::collections::HashSet;

use crate::config::ReasoningConfig;
use crate::heuristics::{self, StepClassification, TaskConstraints};
use crate::model::{Proposal, ScoreParts};
use crate::scratchpad::State;
use crate::text;

/// Pure scoring seam: (task, scratchpad, proposal) -> score breakdown.
/// Implementations must be deterministic and side-effect free.
pub trait Verifier: Send + Sync {
    fn score_step(&self, task: &str, state: &State, proposal: &Proposal) -> ScoreParts;
}

/// Rule-based verifier combining length, vagueness, verification hooks,
/// outcome entropy, task-constraint compliance, redundancy against the full
/// history and contradiction markers into a weighted total.
pub struct RuleVerifier {
    w_rules: f64,
    w_redundancy: f64,
    w_consistency: f64,
}

impl RuleVerifier {
    pub fn new(config: &ReasoningConfig) -> Self {
        Self {
            w_rules: config.w_rules,
            w_redundancy: config.w_redundancy,
            w_consistency: config.w_consistency,
        }
    }
}

impl Verifier for RuleVerifier {
    fn score_step(&self, task: &str, state: &State, proposal: &Proposal) -> ScoreParts {
        let step_text = proposal.text.trim();
        let mut rules = 0.0;

        // Short, concrete steps beat long ones.
        let length = text::char_len(step_text);
        if length <= 200 {
            rules += 0.3;
        } else if length <= 400 {
            rules += 0.1;
        } else {
            rules -= 0.2;
        }

        let vague = heuristics::vague_hit_count(step_text);
        if vague > 0 {
            rules -= (vague as f64 * 0.2).min(0.6);
        }

        if proposal.has_verification_hook() {
            rules += 0.2;
        }

        // Information-gain proxy: declared mutually exclusive outcomes.
        let entropy_boost = estimate_outcome_entropy(proposal);
        rules += entropy_boost;

        let cost = proposal
            .verification
            .as_ref()
            .and_then(|v| v.cost)
            .unwrap_or(1.0);
        let voi = entropy_boost / cost.max(1.0);
        rules += voi.min(0.2);

        let info_hits = heuristics::info_gain_hits(step_text);
        if info_hits > 0 {
            rules += (info_hits as f64 * 0.08).min(0.3);
        }

        if heuristics::is_meta_opener(step_text) {
            rules -= 0.35;
        }

        if heuristics::is_final_step(step_text) {
            rules += if proposal.has_verification_hook() { 0.15 } else { 0.05 };
        }

        let constraints = heuristics::extract_constraints(task);
        let classification = heuristics::classify_step(step_text, &constraints);
        rules += objective_gain(&constraints, &classification, step_text);

        let task_keywords = text::extract_keywords(task, 5);
        let step_keywords = text::extract_keywords(step_text, 5);
        if step_keywords.iter().any(|k| task_keywords.contains(k)) {
            rules += 0.15;
        } else {
            rules -= 0.1;
        }

        // Novelty against the entire history: the worst (max) similarity sets
        // the penalty, the average feeds a small exploration bonus.
        let mut redundancy = 0.0;
        if state.steps.is_empty() {
            redundancy += 0.05;
        } else {
            let sims: Vec<f64> = state
                .steps
                .iter()
                .map(|s| text::jaccard_similarity(&s.text, step_text))
                .collect();
            let max_sim = sims.iter().copied().fold(0.0_f64, f64::max);
            let avg_sim = sims.iter().sum::<f64>() / sims.len() as f64;
            if max_sim >= 0.95 {
                redundancy -= 0.5;
            } else if max_sim >= 0.8 {
                redundancy -= 0.3;
            } else {
                redundancy += 0.1;
            }
            if avg_sim < 0.3 {
                rules += 0.2;
            } else if avg_sim < 0.5 {
                rules += 0.1;
            }
        }

        let consistency = if heuristics::has_contradiction_marker(step_text) {
            -0.3
        } else {
            0.05
        };

        let total = self.w_rules * rules + self.w_redundancy * redundancy + self.w_consistency * consistency;
        ScoreParts {
            rules_score: rules,
            redundancy_score: redundancy,
            consistency_score: consistency,
            total_score: total,
            entropy_boost,
            voi,
            cost,
        }
    }
}

fn objective_gain(
    constraints: &TaskConstraints,
    classification: &StepClassification,
    step_text: &str,
) -> f64 {
    let mut gain = 0.0;
    if classification.is_observation {
        gain += 0.3;
    }
    if !constraints.enumerated_factors.is_empty() {
        if classification.mentioned_factors == 1 {
            gain += 0.15;
        } else if classification.mentioned_factors > 1 {
            gain -= 0.25;
        }
    }
    if classification.is_relabel_or_assign {
        gain += 0.1;
    }
    if constraints.single_action_only {
        if classification.action_verb_count > 1 || heuristics::conjunction_count(step_text) > 0 {
            gain -= 0.2;
        }
        if classification.mentioned_factors > 1 {
            gain -= 0.25;
        }
    }
    if constraints.minimality_desired {
        if classification.is_observation {
            gain += 0.1;
        } else if classification.is_deduction {
            gain -= 0.05;
        }
    }
    gain
}

/// Entropy proxy over declared outcomes: structured verification outcomes
/// first, then expected-outcome labels, then pattern sniffing over the
/// verification hook and rationale.
fn estimate_outcome_entropy(proposal: &Proposal) -> f64 {
    let boost = |n: usize| (0.12 * (n as f64).log2()).min(0.25);

    let structured: HashSet<String> = proposal
        .verification
        .iter()
        .flat_map(|v| v.outcomes.iter())
        .map(|o| o.label.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .collect();
    if structured.len() >= 2 {
        return boost(structured.len());
    }

    let declared: HashSet<String> = proposal
        .expected_outcomes
        .iter()
        .map(|o| o.label.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .collect();
    if declared.len() >= 2 {
        return boost(declared.len());
    }

    let mut joined = String::new();
    if let Some(v) = &proposal.how_to_verify {
        joined.push_str(v);
        joined.push('\n');
    }
    joined.push_str(&proposal.rationale);
    let joined = joined.to_lowercase();
    if joined.trim().is_empty() {
        return 0.0;
    }

    let mut outcomes: HashSet<&str> = HashSet::new();
    let re = |p: &str| regex::Regex::new(p).unwrap();
    if re(r"balance").is_match(&joined) {
        outcomes.insert("balance");
    }
    if re(r"left\s*(tilt|heavy)").is_match(&joined) {
        outcomes.insert("left");
    }
    if re(r"right\s*(tilt|heavy)").is_match(&joined) {
        outcomes.insert("right");
    }
    if re(r"(heavier|lighter)").is_match(&joined) {
        outcomes.insert("polarity");
    }
    let separators = re(r"(;|\bor\b|/)").find_iter(&joined).count();
    if separators >= 1 {
        outcomes.insert("alt1");
    }
    if separators >= 2 {
        outcomes.insert("alt2");
    }
    if re(r"\bif\b.*\bthen\b").is_match(&joined) {
        outcomes.insert("if");
        if re(r"\belse\b").is_match(&joined) {
            outcomes.insert("else");
        }
    }
    if outcomes.len() <= 1 {
        return 0.0;
    }
    boost(outcomes.len())
}
