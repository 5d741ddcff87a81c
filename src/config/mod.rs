// src/config/mod.rs

use serde::{Deserialize, Serialize};

/// Per-session tuning for candidate generation, scoring and the shallow beam.
/// Supplied once when the session is created; immutable afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReasoningConfig {
    /// Upper bound on scratchpad length; the session loop stops appending past it.
    pub max_steps: usize,
    /// Candidates requested per iteration (best-of-N pool size).
    pub num_candidates: usize,
    /// How many candidates survive selection for presentation and beam heads.
    pub top_m: usize,
    /// Undo the just-appended step when it stagnates or loops.
    pub allow_backtrack: bool,
    pub w_rules: f64,
    pub w_redundancy: f64,
    pub w_consistency: f64,
    /// Token cap passed through to the sampler on every call.
    pub sampling_max_tokens: usize,
    /// Minimum score delta over the previous step; below it the beam kicks in.
    pub min_improvement: f64,
    pub beam_width: usize,
    pub beam_depth: usize,
    /// Hard budget of sampler calls per session.
    pub llm_max_calls: usize,
    /// Weight of the value-of-information prior in beam branch selection, in [0, 1].
    pub voi_alpha: f64,
    /// Record per-outcome state updates from structured verification specs
    /// into the scratchpad's uncertainty notes.
    pub execute_verification: bool,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            max_steps: 16,
            num_candidates: 5,
            top_m: 2,
            allow_backtrack: true,
            w_rules: 0.6,
            w_redundancy: 0.25,
            w_consistency: 0.15,
            sampling_max_tokens: 800,
            min_improvement: 0.01,
            beam_width: 1,
            beam_depth: 2,
            llm_max_calls: 8,
            voi_alpha: 0.5,
            execute_verification: false,
        }
    }
}
