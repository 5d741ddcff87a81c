// src/beam/mod.rs
//
// Shallow look-ahead over the top-M branch heads. A UCB1-style bandit decides
// which branch to expand next, so the bounded expansion budget flows toward
// trajectories that keep scoring well instead of being spread uniformly.

use crate::config::ReasoningConfig;
use crate::model::ScoredStep;
use crate::orchestrator;
use crate::sampler::{Sampler, reborrow_sampler};
use crate::scratchpad::State;
use crate::verifier::Verifier;

const EXPLORATION: f64 = 0.3;
const PRIOR_EMA: f64 = 0.7;

struct Branch {
    head: ScoredStep,
    state: State,
    cumulative: f64,
    prior: f64,
    pulls: u32,
}

/// Explore up to `beam_width` branches, spending `(beam_depth - 1) * beam_width`
/// expansions, and return the head proposal of the branch with the best
/// cumulative trajectory score. Ties favor the earlier branch. Backend calls
/// happen one at a time: every expansion decision depends on the bandit
/// statistics updated by the previous one.
pub fn shallow_beam(
    verifier: &dyn Verifier,
    config: &ReasoningConfig,
    task: &str,
    state: &State,
    top: &[ScoredStep],
    mut sampler: Option<&mut dyn Sampler>,
) -> ScoredStep {
    debug_assert!(!top.is_empty(), "beam needs at least one branch head");
    let width = config.beam_width.max(1).min(top.len());
    let mut branches: Vec<Branch> = top[..width]
        .iter()
        .map(|head| {
            let mut branch_state = state.clone();
            branch_state.apply_step(head, false);
            Branch {
                head: head.clone(),
                state: branch_state,
                cumulative: head.score.total_score,
                prior: head.score.voi,
                pulls: 0,
            }
        })
        .collect();

    let depth = config.beam_depth.max(1);
    let mut budget = (depth - 1) * config.beam_width.max(1);
    let mut total_pulls: u32 = 0;

    while budget > 0 {
        let idx = best_ucb(&branches, total_pulls, config.voi_alpha);
        let branch = &mut branches[idx];
        let proposals = orchestrator::generate_candidate_steps(
            task,
            &branch.state,
            config,
            reborrow_sampler(&mut sampler),
        );
        let scored = orchestrator::score_candidates(verifier, task, &branch.state, proposals);
        // An empty expansion still counts as a pull so the loop terminates.
        if let Some(best) = scored.first() {
            branch.cumulative += best.score.total_score;
            branch.prior = PRIOR_EMA * branch.prior + (1.0 - PRIOR_EMA) * best.score.voi;
            branch.state.apply_step(best, false);
        }
        branch.pulls += 1;
        total_pulls += 1;
        budget -= 1;
    }

    let mut best = &branches[0];
    for branch in &branches[1..] {
        if branch.cumulative > best.cumulative {
            best = branch;
        }
    }
    best.head.clone()
}

fn best_ucb(branches: &[Branch], total_pulls: u32, voi_alpha: f64) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, branch) in branches.iter().enumerate() {
        let avg = branch.cumulative / (branch.pulls as f64 + 1.0);
        let explore = EXPLORATION
            * ((f64::from(total_pulls + 1)).ln() / f64::from(branch.pulls.max(1))).sqrt();
        let value = avg + branch.prior * voi_alpha + explore;
        if value > best_value {
            best_value = value;
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Proposal, ScoreParts};
    use crate::sampler::ScriptedSampler;
    use crate::verifier::RuleVerifier;

    fn head(text: &str, total: f64) -> ScoredStep {
        ScoredStep {
            proposal: Proposal::new(text, "r"),
            score: ScoreParts {
                total_score: total,
                ..ScoreParts::default()
            },
        }
    }

    fn beam_config() -> ReasoningConfig {
        ReasoningConfig {
            beam_width: 2,
            beam_depth: 2,
            ..ReasoningConfig::default()
        }
    }

    #[test]
    fn heuristic_expansions_pick_a_branch_deterministically() {
        let config = beam_config();
        let verifier = RuleVerifier::new(&config);
        let state = State::new("Check the pump assembly");
        let top = vec![head("Check the intake valve", 0.5), head("Check the outflow", 0.5)];
        let a = shallow_beam(&verifier, &config, &state.task.clone(), &state, &top, None);
        let b = shallow_beam(&verifier, &config, &state.task.clone(), &state, &top, None);
        assert_eq!(a.proposal.text, b.proposal.text);
    }

    #[test]
    fn budget_bounds_sampler_calls() {
        let config = beam_config();
        let verifier = RuleVerifier::new(&config);
        let state = State::new("Check the pump assembly");
        let top = vec![head("Check the intake valve", 0.5), head("Check the outflow", 0.5)];
        let mut sampler = ScriptedSampler::new(vec![
            Some(r#"[{"text":"Check the seal next","rationale":"r","how_to_verify":"compare pressure readings"}]"#.to_string()),
            Some(r#"[{"text":"Check the gasket next","rationale":"r"}]"#.to_string()),
            Some(r#"[{"text":"never requested","rationale":"r"}]"#.to_string()),
        ]);
        shallow_beam(
            &verifier,
            &config,
            &state.task.clone(),
            &state,
            &top,
            Some(&mut sampler),
        );
        // (beam_depth - 1) * beam_width expansions, one call each.
        assert_eq!(sampler.calls(), 2);
    }

    #[test]
    fn better_trajectory_wins_even_from_a_tied_start() {
        let config = ReasoningConfig {
            beam_width: 2,
            beam_depth: 3,
            ..ReasoningConfig::default()
        };
        let verifier = RuleVerifier::new(&config);
        let state = State::new("Check the pump assembly");
        // Both heads tie; the first branch gets strong verified continuations,
        // so its cumulative trajectory must win.
        let top = vec![head("Check the intake valve", 0.4), head("Check the outflow", 0.4)];
        let strong = r#"[{"text":"Check the pump seal and record the pressure","rationale":"r","how_to_verify":"compare pressure before and after","expected_outcomes":["pass","fail","retry"]}]"#;
        let mut sampler = ScriptedSampler::new(vec![
            Some(strong.to_string()),
            Some(strong.to_string()),
            Some(strong.to_string()),
            Some(strong.to_string()),
        ]);
        let chosen = shallow_beam(
            &verifier,
            &config,
            &state.task.clone(),
            &state,
            &top,
            Some(&mut sampler),
        );
        assert_eq!(chosen.proposal.text, "Check the intake valve");
    }
}
