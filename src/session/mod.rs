// src/session/mod.rs

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::json;

use crate::config::ReasoningConfig;
use crate::model::ScoredStep;
use crate::orchestrator::{self, IterationError};
use crate::sampler::{BudgetedSampler, Sampler, SamplerDiagnostics};
use crate::scratchpad::State;
use crate::trace::{IterationTrace, TraceStage};
use crate::verifier::Verifier;

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// What one iteration presented and picked, kept for inspection.
#[derive(Clone, Debug, Serialize)]
pub struct IterationRecord {
    pub chosen: ScoredStep,
    pub candidates: Vec<ScoredStep>,
}

/// One reasoning session: scratchpad, config, iteration history and trace.
/// Sessions share no mutable state, so independent sessions can run fully
/// concurrently.
pub struct Session {
    pub id: String,
    pub state: State,
    pub config: ReasoningConfig,
    pub history: Vec<IterationRecord>,
    pub trace: IterationTrace,
    budget_noted: bool,
}

impl Session {
    pub fn new(task: &str, config: ReasoningConfig) -> Self {
        let mut trace = IterationTrace::new();
        trace.record(TraceStage::Start, task);
        Self {
            id: make_session_id(),
            state: State::new(task),
            config,
            history: Vec::new(),
            trace,
            budget_noted: false,
        }
    }

    /// One pipeline iteration against this session's scratchpad.
    pub fn step(
        &mut self,
        verifier: &dyn Verifier,
        sampler: Option<&mut dyn Sampler>,
    ) -> Result<(), IterationError> {
        let before = self.state.steps.len();
        let iteration = orchestrator::run_one_iteration(
            verifier,
            &self.config,
            &self.state.task,
            &self.state,
            sampler,
        )?;
        self.trace.record(
            TraceStage::Chosen,
            format!(
                "{} ({:.3})",
                iteration.chosen.proposal.text, iteration.chosen.score.total_score
            ),
        );
        if iteration.new_state.steps.len() <= before {
            self.trace
                .record(TraceStage::Backtracked, "undid a stagnating or looping step");
        }
        self.state = iteration.new_state;
        self.history.push(IterationRecord {
            chosen: iteration.chosen,
            candidates: iteration.candidates,
        });
        Ok(())
    }

    /// Run up to `iterations` steps with a budgeted sampler. Once the budget
    /// is spent, remaining iterations silently continue on the heuristic
    /// template path.
    pub fn run<S: Sampler>(
        &mut self,
        verifier: &dyn Verifier,
        iterations: usize,
        mut sampler: Option<&mut BudgetedSampler<S>>,
    ) -> Result<(), IterationError> {
        for _ in 0..iterations {
            if self.state.steps.len() >= self.config.max_steps {
                break;
            }
            let backend_live = sampler.as_ref().is_some_and(|s| !s.exhausted());
            if sampler.is_some() && !backend_live && !self.budget_noted {
                self.budget_noted = true;
                self.trace.record(
                    TraceStage::Budget,
                    "sampler call budget spent; continuing heuristically",
                );
            }
            let dyn_sampler: Option<&mut dyn Sampler> = if backend_live {
                sampler.as_mut().map(|s| &mut **s as &mut dyn Sampler)
            } else {
                None
            };
            self.step(verifier, dyn_sampler)?;
        }
        Ok(())
    }

    /// Heuristic-only run: no sampler at all.
    pub fn run_heuristic(
        &mut self,
        verifier: &dyn Verifier,
        iterations: usize,
    ) -> Result<(), IterationError> {
        for _ in 0..iterations {
            if self.state.steps.len() >= self.config.max_steps {
                break;
            }
            self.step(verifier, None)?;
        }
        Ok(())
    }

    pub fn summarize(&self) -> String {
        self.state.summarize()
    }

    /// Pretty-JSON payload of the finished session for callers and logs.
    pub fn payload(&self, diagnostics: Option<&SamplerDiagnostics>) -> String {
        serde_json::to_string_pretty(&json!({
            "sessionId": self.id,
            "summary": self.summarize(),
            "steps": self.state.steps,
            "hints": self.state.hints,
            "config": self.config,
            "diagnostics": diagnostics,
        }))
        .unwrap_or_default()
    }
}

fn make_session_id() -> String {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let serial = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("ses_{}_{}", to_base36(seconds), to_base36(serial))
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
