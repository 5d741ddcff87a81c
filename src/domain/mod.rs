// src/domain/mod.rs
//
// Task-shaped fallback proposals. These guarantee forward progress when the
// sampler is absent, fails, or returns unparseable text; they are not meant
// to outscore well-formed backend candidates.

use regex::Regex;

use crate::model::{ExpectedOutcome, Proposal, VerificationOutcome, VerificationSpec};
use crate::scratchpad::State;

/// Which fallback path asked for templates; only the recorded rationale differs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FallbackFlavor {
    NoSampler,
    ParseFailure,
}

const NO_SAMPLER_TEMPLATES: [&str; 5] = [
    "Identify one concrete subgoal derived from the task.",
    "State a small check or measurement to validate progress.",
    "Split the problem into two smaller actions and pick one.",
    "List the assumptions or constraints blocking the next step.",
    "Pick a next action doable in under fifteen minutes.",
];

const PARSE_FAILURE_TEMPLATES: [&str; 5] = [
    "Introduce a small, reversible change and observe the impact.",
    "Check a local constraint or assumption implied by the task.",
    "Split the goal into two subgoals and select one.",
    "Compare two equivalent formulations and choose one.",
    "Test a quick check to rule out an invalid path.",
];

pub fn is_weighing_task(text: &str) -> bool {
    Regex::new(r"(?i)(\bweigh|\bbalance|\bscale|\bpan\b|\bcoins?\b)")
        .unwrap()
        .is_match(text)
}

/// First plausible item count named in the task; 12 when none is given.
pub fn item_count(task: &str) -> usize {
    Regex::new(r"\b(\d{1,3})\b")
        .unwrap()
        .captures(task)
        .and_then(|c| c[1].parse::<usize>().ok())
        .filter(|n| (4..=64).contains(n))
        .unwrap_or(12)
}

/// Deterministic task-shaped proposals, rotated by scratchpad length so that
/// consecutive fallback iterations do not repeat the same head.
pub fn fallback_proposals(
    task: &str,
    state: &State,
    n: usize,
    flavor: FallbackFlavor,
) -> Vec<Proposal> {
    if n == 0 {
        return Vec::new();
    }
    if is_weighing_task(task) {
        return rotated(weighing_templates(task), state.steps.len(), n);
    }
    let (templates, rationale) = match flavor {
        FallbackFlavor::NoSampler => (
            &NO_SAMPLER_TEMPLATES,
            "Heuristic diversified proposal without a sampler",
        ),
        FallbackFlavor::ParseFailure => (
            &PARSE_FAILURE_TEMPLATES,
            "Fallback diversified proposal after parse failure",
        ),
    };
    let base = state.steps.len() % templates.len();
    (0..n)
        .map(|i| Proposal::new(templates[(base + i) % templates.len()], rationale))
        .collect()
}

fn rotated(templates: Vec<Proposal>, offset: usize, n: usize) -> Vec<Proposal> {
    let len = templates.len();
    let base = offset % len;
    (0..n.min(len))
        .map(|i| templates[(base + i) % len].clone())
        .collect()
}

/// Canonical tri-outcome spec for a balance weighing, with per-outcome
/// suspect-set updates.
pub fn weighing_verification() -> VerificationSpec {
    VerificationSpec {
        kind: Some("weighing".to_string()),
        procedure: Some("Place the two groups on the pans and read the tilt.".to_string()),
        outcomes: vec![
            VerificationOutcome {
                label: "balance".to_string(),
                rule: Some("no tilt".to_string()),
                state_update: Some("narrow: suspects outside the compared groups".to_string()),
                prob: None,
            },
            VerificationOutcome {
                label: "left".to_string(),
                rule: Some("left pan heavier or right lighter".to_string()),
                state_update: Some("narrow: focus on left-heavy or right-light suspects".to_string()),
                prob: None,
            },
            VerificationOutcome {
                label: "right".to_string(),
                rule: Some("right pan heavier or left lighter".to_string()),
                state_update: Some("narrow: focus on right-heavy or left-light suspects".to_string()),
                prob: None,
            },
        ],
        cost: Some(1.0),
        log_fields: vec!["left".to_string(), "right".to_string(), "outcome".to_string()],
    }
}

fn weighing_templates(task: &str) -> Vec<Proposal> {
    let count = item_count(task);
    let labels: Vec<String> = (1..=count).map(|i| format!("c{i}")).collect();
    let half = count / 2;
    let third = (count / 3).max(1);

    let mut templates = vec![
        weighing_step(&labels[..half], &labels[half..half * 2]),
        weighing_step(&labels[..third], &labels[third..third * 2]),
    ];
    templates.push(Proposal {
        text: format!("Label the items c1 through c{count} and record the current suspect set."),
        rationale: "Stable labels keep weighings comparable across steps.".to_string(),
        how_to_verify: Some("Check that every item carries exactly one label.".to_string()),
        ..Proposal::default()
    });
    templates.push(Proposal {
        text: "Record the outcome of the last weighing and narrow the suspect set.".to_string(),
        rationale: "Each recorded outcome eliminates a block of suspects.".to_string(),
        how_to_verify: Some("Check that the suspect set strictly shrank.".to_string()),
        ..Proposal::default()
    });
    templates.push(Proposal {
        text: "Compare two equal-sized groups drawn from the remaining suspects.".to_string(),
        rationale: "Equal group sizes keep all three outcomes informative.".to_string(),
        how_to_verify: Some("Observe whether the pans balance or tilt left or right.".to_string()),
        expected_outcomes: vec![
            ExpectedOutcome::new("balance"),
            ExpectedOutcome::new("left"),
            ExpectedOutcome::new("right"),
        ],
        verification: Some(weighing_verification()),
        ..Proposal::default()
    });
    templates
}

fn weighing_step(left: &[String], right: &[String]) -> Proposal {
    Proposal {
        text: format!("Weigh {} vs {}.", left.join(" "), right.join(" ")),
        rationale: "An equal-count weighing splits the suspect set by outcome.".to_string(),
        how_to_verify: Some("Observe whether the pans balance or tilt left or right.".to_string()),
        expected_outcomes: vec![
            ExpectedOutcome::new("balance"),
            ExpectedOutcome::new("left"),
            ExpectedOutcome::new("right"),
        ],
        verification: Some(weighing_verification()),
    }
}
