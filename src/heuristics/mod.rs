// src/heuristics/mod.rs
//
// Regex-based classification predicates used by the extractor, the hygiene
// filter and the verifier. Kept as standalone pure functions so the
// vocabularies can change without touching orchestration logic.

use regex::Regex;

/// Verbs that mark a line of prose as an actionable step rather than filler.
const ACTION_WORDS: &str = "weigh|check|measure|compare|label|record|draw|pick|test|observe|split|divide|count|mark|swap|assign|verify|select|identify|list";

/// Verbs the constraint classifier recognizes when judging single-action focus.
const CLASSIFIER_VERBS: [&str; 19] = [
    "draw", "pick", "measure", "record", "log", "reduce", "increase", "check", "verify", "label",
    "assign", "test", "apply", "set", "use", "skip", "relabel", "rename", "observe",
];

pub fn contains_action_word(text: &str) -> bool {
    Regex::new(&format!(r"(?i)\b({ACTION_WORDS})\b"))
        .unwrap()
        .is_match(text)
}

/// Lines that merely echo a field label or a placeholder instead of a step.
pub fn is_placeholder_line(text: &str) -> bool {
    Regex::new(
        r"(?i)^\s*((text|rationale|how[_\s]?to[_\s]?verify|outcomes?)\s*[:\-]?\s*|your (next )?step( here)?|text here|\.{3}|<[^>]*>)\s*$",
    )
    .unwrap()
    .is_match(text)
}

pub fn vague_hit_count(text: &str) -> usize {
    Regex::new(r"(?i)(obviously|evidently|clearly|trivial|without proof)")
        .unwrap()
        .find_iter(text)
        .count()
}

pub fn is_meta_opener(text: &str) -> bool {
    Regex::new(r"(?i)^(we\s+are|standard approach|each step must|we must|the task|important:)")
        .unwrap()
        .is_match(text)
}

pub fn has_contradiction_marker(text: &str) -> bool {
    Regex::new(r"(?i)(in contradiction|in conflict|contradicts|inconsistent)")
        .unwrap()
        .is_match(text)
}

pub fn info_gain_hits(text: &str) -> usize {
    Regex::new(r"(?i)(if\s|then\s|case|outcome|tilt|balance|verify|check|observe|measure)")
        .unwrap()
        .find_iter(text)
        .count()
}

pub fn is_final_step(text: &str) -> bool {
    Regex::new(r"(?i)^final\s+step\s*:").unwrap().is_match(text)
}

pub fn conjunction_count(text: &str) -> usize {
    Regex::new(r"(?i)\b(and|then)\b")
        .unwrap()
        .find_iter(text)
        .count()
}

/// Constraints recovered from the task statement itself.
#[derive(Clone, Debug, Default)]
pub struct TaskConstraints {
    pub single_action_only: bool,
    pub minimality_desired: bool,
    pub enumerated_factors: Vec<String>,
}

pub fn extract_constraints(task: &str) -> TaskConstraints {
    let single_action_only = Regex::new(
        r"(?i)\b(single|exactly\s+one|only\s+one|adjust\s+one\s+factor\s+at\s+a\s+time|one\s+draw|one)\b",
    )
    .unwrap()
    .is_match(task);
    let minimality_desired = Regex::new(r"(?i)(minimal\s+steps|minimize|as\s+few\s+steps|efficient)")
        .unwrap()
        .is_match(task);

    // Enumerations like "(temperature, pressure, flow)" first; otherwise a
    // comma-separated tail after the first ':' or ','.
    let mut enumerated_factors: Vec<String> = Vec::new();
    if let Some(captures) = Regex::new(r"\(([^)]{3,})\)").unwrap().captures(task) {
        enumerated_factors = captures[1]
            .split(|c| c == ',' || c == ';' || c == '/')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty() && s.chars().count() <= 40)
            .collect();
    } else {
        let parts: Vec<&str> = task.split(|c| c == ':' || c == ',').collect();
        if parts.len() > 2 {
            let tail = parts[1..].join(",");
            let cands: Vec<String> = tail
                .split(|c| c == ',' || c == ';')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect();
            if (3..=12).contains(&cands.len()) {
                enumerated_factors = cands;
            }
        }
    }
    let mut seen = std::collections::HashSet::new();
    enumerated_factors.retain(|f| seen.insert(f.clone()));

    TaskConstraints {
        single_action_only,
        minimality_desired,
        enumerated_factors,
    }
}

/// How a proposal relates to the task's constraints.
#[derive(Clone, Debug, Default)]
pub struct StepClassification {
    pub action_verb_count: usize,
    pub mentioned_factors: usize,
    pub is_observation: bool,
    pub is_relabel_or_assign: bool,
    pub is_deduction: bool,
}

pub fn classify_step(text: &str, constraints: &TaskConstraints) -> StepClassification {
    let lower = text.to_lowercase();
    let action_verb_count = CLASSIFIER_VERBS
        .iter()
        .filter(|v| Regex::new(&format!(r"(?i)\b{v}\b")).unwrap().is_match(text))
        .count();
    let is_observation = Regex::new(r"(?i)\b(draw|pick|measure|record|log|check|verify|test|observe)\b")
        .unwrap()
        .is_match(text);
    let is_relabel_or_assign = Regex::new(r"(?i)\b(label|assign|relabel|rename)\b")
        .unwrap()
        .is_match(text);
    let is_deduction = Regex::new(r"(?i)^\s*(if|then|therefore|hence|thus)\b")
        .unwrap()
        .is_match(text)
        || Regex::new(r"(?i)\bif\b.*\bthen\b").unwrap().is_match(text);
    let mentioned_factors = constraints
        .enumerated_factors
        .iter()
        .filter(|f| f.chars().count() >= 2 && lower.contains(f.as_str()))
        .count();

    StepClassification {
        action_verb_count,
        mentioned_factors,
        is_observation,
        is_relabel_or_assign,
        is_deduction,
    }
}
