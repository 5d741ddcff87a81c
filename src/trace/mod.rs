// src/trace/mod.rs

use std::fmt;

/// Stages a session records events for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceStage {
    Start,
    Chosen,
    Backtracked,
    Budget,
    Summary,
}

impl fmt::Display for TraceStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TraceStage::Start => "start",
            TraceStage::Chosen => "chosen",
            TraceStage::Backtracked => "backtracked",
            TraceStage::Budget => "budget",
            TraceStage::Summary => "summary",
        };
        write!(f, "{name}")
    }
}

/// Labeled in-memory event log for one session; nothing global, nothing
/// persisted.
#[derive(Debug, Default)]
pub struct IterationTrace {
    entries: Vec<(TraceStage, String)>,
}

impl IterationTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stage: TraceStage, detail: impl Into<String>) {
        self.entries.push((stage, detail.into()));
    }

    pub fn entries(&self) -> &[(TraceStage, String)] {
        &self.entries
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(stage, detail)| format!("[{stage}] {detail}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
