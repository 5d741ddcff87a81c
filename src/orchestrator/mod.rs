// src/orchestrator/mod.rs

use std::error::Error;
use std::fmt;

use crate::beam;
use crate::config::ReasoningConfig;
use crate::domain::{self, FallbackFlavor};
use crate::extract;
use crate::hygiene;
use crate::model::{Proposal, ScoredStep};
use crate::sampler::{Sampler, reborrow_sampler};
use crate::scratchpad::State;
use crate::selector;
use crate::verifier::Verifier;

/// Result of one pipeline iteration: the accepted step, the presented
/// candidate slate (sorted by total score descending) and the successor
/// scratchpad state.
#[derive(Clone, Debug)]
pub struct Iteration {
    pub chosen: ScoredStep,
    pub candidates: Vec<ScoredStep>,
    pub new_state: State,
}

/// The only failure this core surfaces to its caller; everything else
/// degrades into the heuristic fallback path.
#[derive(Debug)]
pub enum IterationError {
    NoCandidates,
}

impl fmt::Display for IterationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IterationError::NoCandidates => write!(f, "no candidate steps generated"),
        }
    }
}

impl Error for IterationError {}

/// Prompt contract with the sampler. The reply must be either a pure JSON
/// array of `{"text", "rationale", "how_to_verify", "expected_outcomes"}`
/// objects (a fenced block is fine) or labeled prose the extractor's lower
/// tiers understand; anything else falls through to template proposals.
pub fn build_prompt(task: &str, state: &State, num_candidates: usize) -> String {
    let mut recent: Vec<String> = state
        .steps
        .iter()
        .rev()
        .take(3)
        .map(|s| format!("{}. {}", s.index + 1, s.text))
        .collect();
    recent.reverse();
    let recent_block = if recent.is_empty() {
        "(none)".to_string()
    } else {
        recent.join("\n")
    };
    [
        "You are the Reasoning Booster. Generate small, local, verifiable next steps for the task.",
        "Task:",
        task,
        "Recent steps:",
        &recent_block,
        &format!(
            "Return exactly {num_candidates} items as pure JSON: [{{\"text\": \"...\", \"rationale\": \"...\", \"how_to_verify\": \"...\", \"expected_outcomes\": [\"...\"]}}], with no other text. Steps must be short (<= 200 characters)."
        ),
    ]
    .join("\n\n")
}

/// Raw candidate generation: ask the sampler and parse its reply, or fall
/// back to deterministic task-shaped templates. Sampler failure is an input
/// to the fallback chain, never an error.
pub fn generate_candidate_steps(
    task: &str,
    state: &State,
    config: &ReasoningConfig,
    sampler: Option<&mut dyn Sampler>,
) -> Vec<Proposal> {
    let Some(sampler) = sampler else {
        return domain::fallback_proposals(task, state, config.num_candidates, FallbackFlavor::NoSampler);
    };
    let prompt = build_prompt(task, state, config.num_candidates);
    if let Some(raw) = sampler.sample(&prompt, config.sampling_max_tokens) {
        let extracted = extract::extract_proposals(&raw, config.num_candidates);
        if !extracted.is_empty() {
            return extracted;
        }
    }
    domain::fallback_proposals(task, state, config.num_candidates, FallbackFlavor::ParseFailure)
}

/// Score every proposal against the current scratchpad and sort by total
/// score descending.
pub fn score_candidates(
    verifier: &dyn Verifier,
    task: &str,
    state: &State,
    proposals: Vec<Proposal>,
) -> Vec<ScoredStep> {
    let mut scored: Vec<ScoredStep> = proposals
        .into_iter()
        .map(|proposal| {
            let score = verifier.score_step(task, state, &proposal);
            ScoredStep { proposal, score }
        })
        .collect();
    scored.sort_by(|a, b| b.score.total_score.total_cmp(&a.score.total_score));
    scored
}

/// One full iteration: generate, refine, score, select, optionally beam on
/// stagnation, then append the winner (undoing it again if that stagnates or
/// loops and backtracking is allowed).
pub fn run_one_iteration(
    verifier: &dyn Verifier,
    config: &ReasoningConfig,
    task: &str,
    state: &State,
    mut sampler: Option<&mut dyn Sampler>,
) -> Result<Iteration, IterationError> {
    let raw = generate_candidate_steps(task, state, config, reborrow_sampler(&mut sampler));
    let refined = hygiene::refine_candidates(raw, task, state, config.num_candidates);
    let scored = score_candidates(verifier, task, state, refined);
    if scored.is_empty() {
        return Err(IterationError::NoCandidates);
    }

    let mut new_state = state.clone();
    new_state.update_hints_from_candidates(&scored);

    let last_text = state.last_step().map(|s| s.text.as_str());
    let (candidates, mut chosen) = selector::select_top(&scored, config.top_m, last_text);

    if let Some(previous) = state.last_step() {
        let improvement = chosen.score.total_score - previous.score.total_score;
        if improvement < config.min_improvement && config.beam_width > 1 {
            chosen = beam::shallow_beam(
                verifier,
                config,
                task,
                state,
                &candidates,
                reborrow_sampler(&mut sampler),
            );
        }
    }

    new_state.apply_step(&chosen, config.execute_verification);
    if (new_state.is_stagnating() || new_state.is_looping()) && config.allow_backtrack {
        new_state.backtrack();
    }

    Ok(Iteration {
        chosen,
        candidates,
        new_state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::ScriptedSampler;
    use crate::verifier::RuleVerifier;

    #[test]
    fn prompt_carries_task_and_recent_steps() {
        let mut state = State::new("Weigh 12 coins to find the counterfeit");
        let prompt = build_prompt(&state.task.clone(), &state, 5);
        assert!(prompt.contains("Weigh 12 coins"));
        assert!(prompt.contains("(none)"));
        assert!(prompt.contains("Return exactly 5 items"));

        for t in ["a", "b", "c", "d"] {
            state.apply_step(
                &ScoredStep {
                    proposal: Proposal::new(t, "r"),
                    score: crate::model::ScoreParts::default(),
                },
                false,
            );
        }
        let prompt = build_prompt(&state.task.clone(), &state, 5);
        assert!(!prompt.contains("1. a"));
        assert!(prompt.contains("2. b\n3. c\n4. d"));
    }

    #[test]
    fn candidates_come_back_sorted() {
        let config = ReasoningConfig::default();
        let verifier = RuleVerifier::new(&config);
        let state = State::new("Check the pump assembly");
        let result =
            run_one_iteration(&verifier, &config, &state.task.clone(), &state, None).unwrap();
        assert!(!result.candidates.is_empty());
        let totals: Vec<f64> = result
            .candidates
            .iter()
            .map(|c| c.score.total_score)
            .collect();
        assert!(totals.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn parse_failure_degrades_to_templates() {
        let config = ReasoningConfig::default();
        let verifier = RuleVerifier::new(&config);
        let state = State::new("Check the pump assembly");
        let mut sampler =
            ScriptedSampler::new(vec![Some("not json, no bullets, just prose.".to_string())]);
        let result = run_one_iteration(
            &verifier,
            &config,
            &state.task.clone(),
            &state,
            Some(&mut sampler),
        )
        .unwrap();
        assert!(!result.chosen.proposal.text.is_empty());
        assert_eq!(result.new_state.steps.len(), 1);
    }

    #[test]
    fn sampler_json_is_preferred_over_templates() {
        let config = ReasoningConfig::default();
        let verifier = RuleVerifier::new(&config);
        let state = State::new("Check the device calibration");
        let mut sampler = ScriptedSampler::new(vec![Some(
            "prose before\n```json\n[{\"text\":\"Check X\",\"rationale\":\"r\",\"how_to_verify\":\"compare A and B\"}]\n```\nprose after"
                .to_string(),
        )]);
        let result = run_one_iteration(
            &verifier,
            &config,
            &state.task.clone(),
            &state,
            Some(&mut sampler),
        )
        .unwrap();
        assert_eq!(result.chosen.proposal.text, "Check X");
        assert_eq!(
            result.chosen.proposal.how_to_verify.as_deref(),
            Some("compare A and B")
        );
    }

    #[test]
    fn stagnating_append_is_backtracked() {
        let config = ReasoningConfig::default();
        let verifier = RuleVerifier::new(&config);
        let mut state = State::new("Check the device calibration");
        // Seed history so the only sampler candidate exactly repeats it.
        let repeat = r#"[{"text":"Check X","rationale":"r"}]"#;
        let mut sampler = ScriptedSampler::new(vec![Some(repeat.to_string())]);
        let first = run_one_iteration(
            &verifier,
            &config,
            &state.task.clone(),
            &state,
            Some(&mut sampler),
        )
        .unwrap();
        state = first.new_state;
        assert_eq!(state.steps.len(), 1);
        // Second iteration: hygiene filters the repeat, so templates flow in
        // and the scratchpad keeps making progress instead of looping.
        let mut sampler = ScriptedSampler::new(vec![Some(repeat.to_string())]);
        let second = run_one_iteration(
            &verifier,
            &config,
            &state.task.clone(),
            &state,
            Some(&mut sampler),
        )
        .unwrap();
        assert_eq!(second.new_state.steps.len(), 2);
        assert_ne!(second.new_state.steps[1].text, "Check X");
    }
}
