// src/sampler/mod.rs

use std::collections::VecDeque;

use serde::Serialize;
use serde_json::{Value, json};

/// The one external collaborator of the core: maps a prompt to raw text.
/// `None` means "no output available" (network failure, empty reply, spent
/// budget); the pipeline treats it as input to its fallback chain, never as
/// a fatal error. Retry policy, if any, belongs to the implementation.
pub trait Sampler: Send {
    fn sample(&mut self, prompt: &str, max_tokens: usize) -> Option<String>;
}

/// Reborrow a `&mut Option<&mut dyn Sampler>` as a fresh `Option<&mut dyn
/// Sampler>` with a shorter lifetime, so it can be passed into repeated
/// calls (e.g. inside a loop) without moving the original out.
pub fn reborrow_sampler<'a>(
    sampler: &'a mut Option<&mut dyn Sampler>,
) -> Option<&'a mut dyn Sampler> {
    match sampler {
        Some(s) => Some(&mut **s),
        None => None,
    }
}

/// Blocking adapter for an Ollama-style `/api/generate` endpoint.
pub struct OllamaSampler {
    model: String,
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl OllamaSampler {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            endpoint: "http://localhost:11434/api/generate".to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }
}

impl Sampler for OllamaSampler {
    fn sample(&mut self, prompt: &str, max_tokens: usize) -> Option<String> {
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": { "num_predict": max_tokens }
        });
        let response = self.client.post(&self.endpoint).json(&payload).send().ok()?;
        let body: Value = response.json().ok()?;
        body.get("response")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
    }
}

/// Call accounting for one session's sampler usage.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SamplerDiagnostics {
    pub total_calls: usize,
    pub failures: usize,
    pub last_prompt_chars: usize,
    pub last_response_chars: usize,
}

/// Enforces the hard per-session call budget. Once spent, every request
/// reports "no output", which downgrades the pipeline to its heuristic
/// template path instead of failing.
pub struct BudgetedSampler<S> {
    inner: S,
    max_calls: usize,
    pub diagnostics: SamplerDiagnostics,
}

impl<S: Sampler> BudgetedSampler<S> {
    pub fn new(inner: S, max_calls: usize) -> Self {
        Self {
            inner,
            max_calls,
            diagnostics: SamplerDiagnostics::default(),
        }
    }

    pub fn exhausted(&self) -> bool {
        self.diagnostics.total_calls >= self.max_calls
    }
}

impl<S: Sampler> Sampler for BudgetedSampler<S> {
    fn sample(&mut self, prompt: &str, max_tokens: usize) -> Option<String> {
        if self.exhausted() {
            return None;
        }
        self.diagnostics.total_calls += 1;
        self.diagnostics.last_prompt_chars = prompt.chars().count();
        match self.inner.sample(prompt, max_tokens) {
            Some(text) => {
                self.diagnostics.last_response_chars = text.chars().count();
                Some(text)
            }
            None => {
                self.diagnostics.failures += 1;
                None
            }
        }
    }
}

/// Replays a fixed queue of canned responses; the queue running dry reads as
/// backend failure. Used by tests and offline demos.
pub struct ScriptedSampler {
    responses: VecDeque<Option<String>>,
    calls: usize,
}

impl ScriptedSampler {
    pub fn new(responses: Vec<Option<String>>) -> Self {
        Self {
            responses: responses.into(),
            calls: 0,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl Sampler for ScriptedSampler {
    fn sample(&mut self, _prompt: &str, _max_tokens: usize) -> Option<String> {
        self.calls += 1;
        self.responses.pop_front().flatten()
    }
}
