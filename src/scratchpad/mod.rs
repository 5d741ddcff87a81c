// src/scratchpad/mod.rs

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::model::{ExpectedOutcome, ScoreParts, ScoredStep};
use crate::text;

pub const HINT_CAP: usize = 20;
const HINT_PROMOTIONS_PER_BATCH: usize = 3;
const NEAR_DUPLICATE: f64 = 0.9;
const SUMMARY_STEPS: usize = 5;

/// Free-text log of what verification outcomes taught us about the task.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Uncertainty {
    #[serde(default)]
    pub hypotheses: Vec<String>,
    #[serde(default)]
    pub eliminated: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

/// An accepted proposal plus the score it earned against the scratchpad state
/// that preceded its append. Immutable once created.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepEntry {
    pub index: usize,
    pub text: String,
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how_to_verify: Option<String>,
    #[serde(default)]
    pub expected_outcomes: Vec<ExpectedOutcome>,
    pub score: ScoreParts,
}

/// The ordered, append-mostly log of accepted steps for one task session,
/// plus the shared hint pool. Owned exclusively by one session; grows by
/// append, shrinks only by single-element pop.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct State {
    pub task: String,
    pub steps: Vec<StepEntry>,
    pub created_at: u64,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub uncertainty: Uncertainty,
}

impl State {
    /// Pure constructor: an empty scratchpad for a task.
    pub fn new(task: &str) -> Self {
        Self {
            task: task.to_string(),
            steps: Vec::new(),
            created_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            hints: Vec::new(),
            uncertainty: Uncertainty::default(),
        }
    }

    pub fn last_step(&self) -> Option<&StepEntry> {
        self.steps.last()
    }

    /// Append the chosen step. Step indices stay contiguous from 0. When the
    /// proposal carries structured verification outcomes and
    /// `execute_verification` is on, their state updates land in the
    /// uncertainty notes.
    pub fn apply_step(&mut self, chosen: &ScoredStep, execute_verification: bool) {
        let index = self.steps.len();
        self.steps.push(StepEntry {
            index,
            text: chosen.proposal.text.clone(),
            rationale: chosen.proposal.rationale.clone(),
            how_to_verify: chosen.proposal.how_to_verify.clone(),
            expected_outcomes: chosen.proposal.expected_outcomes.clone(),
            score: chosen.score.clone(),
        });
        if execute_verification {
            if let Some(spec) = &chosen.proposal.verification {
                for outcome in &spec.outcomes {
                    if let Some(update) = &outcome.state_update {
                        self.uncertainty
                            .notes
                            .push(format!("{}: {}", outcome.label, update));
                    }
                }
            }
        }
    }

    /// Pop the last step; no-op on an empty scratchpad.
    pub fn backtrack(&mut self) {
        self.steps.pop();
    }

    /// The last two step texts are identical after trimming.
    pub fn is_stagnating(&self) -> bool {
        let n = self.steps.len();
        if n < 2 {
            return false;
        }
        self.steps[n - 1].text.trim() == self.steps[n - 2].text.trim()
    }

    /// Some step text repeats anywhere earlier in the history.
    pub fn is_looping(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.steps.iter().any(|s| !seen.insert(s.text.as_str()))
    }

    /// Promote up to three well-verified candidate texts per batch into the
    /// shared hint pool; the pool is capped and evicts oldest first.
    pub fn update_hints_from_candidates(&mut self, scored: &[ScoredStep]) {
        let mut promoted = 0;
        for candidate in scored {
            if promoted >= HINT_PROMOTIONS_PER_BATCH {
                break;
            }
            if !candidate.proposal.has_verification_hook() {
                continue;
            }
            let hint = candidate.proposal.text.trim();
            if hint.is_empty() {
                continue;
            }
            if self
                .hints
                .iter()
                .any(|h| text::jaccard_similarity(h, hint) >= NEAR_DUPLICATE)
            {
                continue;
            }
            self.hints.push(hint.to_string());
            if self.hints.len() > HINT_CAP {
                self.hints.remove(0);
            }
            promoted += 1;
        }
    }

    /// Plain-text summary: the task plus the last few distinct steps in order.
    pub fn summarize(&self) -> String {
        let mut last_distinct: Vec<&str> = Vec::new();
        for step in self.steps.iter().rev() {
            let t = step.text.trim();
            if t.is_empty() || last_distinct.contains(&t) {
                continue;
            }
            last_distinct.push(t);
            if last_distinct.len() == SUMMARY_STEPS {
                break;
            }
        }
        last_distinct.reverse();
        let bullets = if last_distinct.is_empty() {
            "- (no steps)".to_string()
        } else {
            last_distinct
                .iter()
                .map(|s| format!("- {s}"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        format!("Summary:\nTask: {}\n{}", self.task, bullets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Proposal;

    fn scored(text: &str) -> ScoredStep {
        ScoredStep {
            proposal: Proposal::new(text, "r"),
            score: ScoreParts::default(),
        }
    }

    fn scored_with_hook(text: &str) -> ScoredStep {
        let mut s = scored(text);
        s.proposal.how_to_verify = Some("check it".to_string());
        s
    }

    #[test]
    fn indices_are_contiguous_from_zero() {
        let mut state = State::new("t");
        state.apply_step(&scored("a"), false);
        state.apply_step(&scored("b"), false);
        state.apply_step(&scored("c"), false);
        let indices: Vec<usize> = state.steps.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn backtrack_round_trips_apply() {
        let mut state = State::new("t");
        state.apply_step(&scored("a"), false);
        let before: Vec<String> = state.steps.iter().map(|s| s.text.clone()).collect();
        state.apply_step(&scored("b"), false);
        state.backtrack();
        let after: Vec<String> = state.steps.iter().map(|s| s.text.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn backtrack_on_empty_is_a_noop() {
        let mut state = State::new("t");
        state.backtrack();
        assert!(state.steps.is_empty());
    }

    #[test]
    fn stagnation_needs_two_identical_tails() {
        let mut state = State::new("t");
        state.apply_step(&scored("X"), false);
        assert!(!state.is_stagnating());
        state.apply_step(&scored(" X "), false);
        assert!(state.is_stagnating());
        state.backtrack();
        state.apply_step(&scored("Y"), false);
        assert!(!state.is_stagnating());
    }

    #[test]
    fn looping_detects_any_repeat() {
        let mut state = State::new("t");
        for t in ["A", "B", "A"] {
            state.apply_step(&scored(t), false);
        }
        assert!(state.is_looping());
        let mut fresh = State::new("t");
        for t in ["A", "B", "C"] {
            fresh.apply_step(&scored(t), false);
        }
        assert!(!fresh.is_looping());
    }

    #[test]
    fn hints_require_a_verification_hook() {
        let mut state = State::new("t");
        state.update_hints_from_candidates(&[scored("no hook here")]);
        assert!(state.hints.is_empty());
        state.update_hints_from_candidates(&[scored_with_hook("Measure the first group")]);
        assert_eq!(state.hints.len(), 1);
    }

    #[test]
    fn at_most_three_hints_per_batch() {
        let mut state = State::new("t");
        let batch: Vec<ScoredStep> = (0..5)
            .map(|i| scored_with_hook(&format!("candidate number {i} does something distinct")))
            .collect();
        state.update_hints_from_candidates(&batch);
        assert_eq!(state.hints.len(), 3);
    }

    #[test]
    fn hint_pool_caps_at_twenty_fifo() {
        let mut state = State::new("t");
        for i in 0..25 {
            state.update_hints_from_candidates(&[scored_with_hook(&format!(
                "unique hint number {i} about widget {i}"
            ))]);
        }
        assert_eq!(state.hints.len(), HINT_CAP);
        assert!(state.hints[0].contains("number 5"));
        assert!(state.hints[19].contains("number 24"));
    }

    #[test]
    fn near_duplicate_hints_are_not_promoted() {
        let mut state = State::new("t");
        state.update_hints_from_candidates(&[scored_with_hook("Measure the first group")]);
        state.update_hints_from_candidates(&[scored_with_hook("Measure the first group")]);
        assert_eq!(state.hints.len(), 1);
    }

    #[test]
    fn verification_outcomes_feed_uncertainty_notes() {
        let mut state = State::new("Weigh the coins");
        let mut chosen = scored_with_hook("Weigh c1 vs c2.");
        chosen.proposal.verification = Some(crate::domain::weighing_verification());
        state.apply_step(&chosen, true);
        assert_eq!(state.uncertainty.notes.len(), 3);
        assert!(state.uncertainty.notes[0].starts_with("balance:"));
    }

    #[test]
    fn summary_lists_last_distinct_steps() {
        let mut state = State::new("Weigh 12 coins to find the counterfeit");
        assert!(state.summarize().ends_with("- (no steps)"));
        for t in ["a", "b", "a"] {
            state.apply_step(&scored(t), false);
        }
        let summary = state.summarize();
        assert!(summary.starts_with("Summary:\nTask: Weigh 12 coins to find the counterfeit"));
        assert!(summary.ends_with("- b\n- a"));
    }
}
