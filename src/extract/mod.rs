// src/extract/mod.rs
//
// Turns raw sampler output into structured proposals. Tiers are attempted in
// order and each one only runs when the previous produced nothing: fenced
// JSON, bracketed JSON arrays embedded in prose, labeled prose blocks,
// bullet/numbered lists. Never fails; the worst case is an empty list.

use regex::Regex;
use serde_json::Value;

use crate::heuristics;
use crate::model::{ExpectedOutcome, Proposal, VerificationOutcome, VerificationSpec};
use crate::text;

const MAX_OUTCOME_LABELS: usize = 6;
const PROSE_TEXT_CAP: usize = 200;
const CONTINUATION_CAP: usize = 220;

pub fn extract_proposals(raw: &str, k: usize) -> Vec<Proposal> {
    if raw.trim().is_empty() || k == 0 {
        return Vec::new();
    }
    let cleaned = strip_thinking_blocks(raw);

    let fenced = from_fenced_blocks(&cleaned, k);
    if !fenced.is_empty() {
        return fenced;
    }
    let bracketed = from_bracketed_arrays(&cleaned, k);
    if !bracketed.is_empty() {
        return bracketed;
    }
    let labeled = from_labeled_blocks(&cleaned, k);
    if !labeled.is_empty() {
        return labeled;
    }
    from_bullet_lines(&cleaned, k)
}

/// Hidden-reasoning spans are dropped before any parsing tier runs.
fn strip_thinking_blocks(raw: &str) -> String {
    Regex::new(r"(?is)<think>.*?</think>")
        .unwrap()
        .replace_all(raw, "")
        .into_owned()
}

/// Prefer the last fenced code block that parses as a proposal array.
fn from_fenced_blocks(cleaned: &str, k: usize) -> Vec<Proposal> {
    let fence = Regex::new(r"(?s)```[a-zA-Z]*\n(.*?)```").unwrap();
    let blocks: Vec<&str> = fence
        .captures_iter(cleaned)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect();
    for block in blocks.iter().rev() {
        let mut items = parse_json_proposals(block.trim());
        if !items.is_empty() {
            items.truncate(k);
            return items;
        }
    }
    Vec::new()
}

/// Scan for the rightmost, shortest bracketed substring that parses as a
/// proposal array; tolerates prose before and after the JSON.
fn from_bracketed_arrays(cleaned: &str, k: usize) -> Vec<Proposal> {
    let mut end = cleaned.rfind(']');
    while let Some(e) = end {
        let mut start = cleaned[..e].rfind('[');
        while let Some(s) = start {
            let mut items = parse_json_proposals(&cleaned[s..=e]);
            if !items.is_empty() {
                items.truncate(k);
                return items;
            }
            if s == 0 {
                break;
            }
            start = cleaned[..s].rfind('[');
        }
        if e == 0 {
            break;
        }
        end = cleaned[..e].rfind(']');
    }
    Vec::new()
}

fn parse_json_proposals(candidate: &str) -> Vec<Proposal> {
    let Ok(value) = serde_json::from_str::<Value>(candidate) else {
        return Vec::new();
    };
    let Some(entries) = value.as_array() else {
        return Vec::new();
    };
    entries.iter().filter_map(proposal_from_value).collect()
}

/// The single point where backend-supplied JSON is trusted into the model.
fn proposal_from_value(value: &Value) -> Option<Proposal> {
    let text = value.get("text")?.as_str()?.trim();
    if text.is_empty() {
        return None;
    }
    let rationale = string_field(value, &["rationale"]).unwrap_or_default();
    let how_to_verify =
        string_field(value, &["how_to_verify", "howToVerify"]).filter(|s| !s.is_empty());
    let expected_outcomes = outcomes_from_value(
        value
            .get("expected_outcomes")
            .or_else(|| value.get("expectedOutcomes")),
    );
    let verification = value.get("verification").and_then(verification_from_value);
    Some(Proposal {
        text: text.to_string(),
        rationale,
        how_to_verify,
        expected_outcomes,
        verification,
    })
}

fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| value.get(*k).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
}

fn outcomes_from_value(value: Option<&Value>) -> Vec<ExpectedOutcome> {
    let Some(value) = value else {
        return Vec::new();
    };
    match value {
        Value::String(s) => split_outcome_labels(s),
        Value::Array(entries) => entries
            .iter()
            .filter_map(|e| match e {
                Value::String(label) => {
                    let label = label.trim();
                    (!label.is_empty()).then(|| ExpectedOutcome::new(label))
                }
                Value::Object(_) => {
                    let label = e.get("label")?.as_str()?.trim();
                    if label.is_empty() {
                        return None;
                    }
                    Some(ExpectedOutcome {
                        label: label.to_string(),
                        note: string_field(e, &["note"]).filter(|s| !s.is_empty()),
                    })
                }
                _ => None,
            })
            .take(MAX_OUTCOME_LABELS)
            .collect(),
        _ => Vec::new(),
    }
}

fn verification_from_value(value: &Value) -> Option<VerificationSpec> {
    if !value.is_object() {
        return None;
    }
    let outcomes = value
        .get("outcomes")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| {
                    let label = e.get("label")?.as_str()?.trim();
                    if label.is_empty() {
                        return None;
                    }
                    Some(VerificationOutcome {
                        label: label.to_string(),
                        rule: string_field(e, &["rule"]).filter(|s| !s.is_empty()),
                        state_update: string_field(e, &["state_update", "stateUpdate"])
                            .filter(|s| !s.is_empty()),
                        prob: e.get("prob").and_then(Value::as_f64),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    Some(VerificationSpec {
        kind: string_field(value, &["kind"]).filter(|s| !s.is_empty()),
        procedure: string_field(value, &["procedure"]).filter(|s| !s.is_empty()),
        outcomes,
        cost: value.get("cost").and_then(Value::as_f64),
        log_fields: value
            .get("log_fields")
            .or_else(|| value.get("logFields"))
            .and_then(Value::as_array)
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    })
}

/// Outcome labels in prose come as one delimited string.
pub fn split_outcome_labels(raw: &str) -> Vec<ExpectedOutcome> {
    raw.split(|c| c == ';' || c == '/' || c == '|' || c == ',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(MAX_OUTCOME_LABELS)
        .map(ExpectedOutcome::new)
        .collect()
}

fn label_value(line: &str, label_pattern: &str) -> Option<String> {
    Regex::new(&format!(r"(?i)^{label_pattern}\s*[:\-]\s*(.*)$"))
        .unwrap()
        .captures(line)
        .map(|c| c[1].trim().to_string())
}

fn accept_prose_text(text: &str) -> bool {
    !text.is_empty()
        && text::char_len(text) <= PROSE_TEXT_CAP
        && !heuristics::is_placeholder_line(text)
        && heuristics::contains_action_word(text)
}

/// Paragraphs carrying `Text:` / `Rationale:` / `How_to_verify:` / `Outcomes:`
/// labels, one proposal per paragraph.
fn from_labeled_blocks(cleaned: &str, k: usize) -> Vec<Proposal> {
    let paragraph_break = Regex::new(r"\r?\n[ \t]*\r?\n").unwrap();
    let mut items: Vec<Proposal> = Vec::new();
    for block in paragraph_break.split(cleaned) {
        if items.len() >= k {
            break;
        }
        let mut proposal = Proposal::default();
        let mut has_text = false;
        for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(v) = label_value(line, "text") {
                proposal.text = v;
                has_text = true;
            } else if let Some(v) = label_value(line, "rationale") {
                proposal.rationale = v;
            } else if let Some(v) = label_value(line, r"how[_\s]?to[_\s]?verify") {
                proposal.how_to_verify = Some(v).filter(|s| !s.is_empty());
            } else if let Some(v) = label_value(line, "outcomes?") {
                proposal.expected_outcomes = split_outcome_labels(&v);
            }
        }
        if has_text && accept_prose_text(&proposal.text) {
            if proposal.rationale.is_empty() {
                proposal.rationale = "Parsed from labeled prose".to_string();
            }
            if !items.iter().any(|p| p.text == proposal.text) {
                items.push(proposal);
            }
        }
    }
    items
}

/// Bulleted or numbered lines start proposals; labeled continuation lines
/// attach to the current one, and unlabeled action lines extend its text.
fn from_bullet_lines(cleaned: &str, k: usize) -> Vec<Proposal> {
    let bullet = Regex::new(r"^[-*\d]+[.)]?\s+(.*)$").unwrap();
    let mut items: Vec<Proposal> = Vec::new();
    let mut current: Option<Proposal> = None;

    for line in cleaned.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(captures) = bullet.captures(line) {
            flush(&mut current, &mut items);
            if items.len() >= k {
                return items;
            }
            current = Some(Proposal::new(captures[1].trim(), "Parsed from prose"));
            continue;
        }
        let Some(item) = current.as_mut() else {
            continue;
        };
        if let Some(v) = label_value(line, "rationale") {
            item.rationale = v;
        } else if let Some(v) = label_value(line, r"how[_\s]?to[_\s]?verify") {
            item.how_to_verify = Some(v).filter(|s| !s.is_empty());
        } else if let Some(v) = label_value(line, "outcomes?") {
            item.expected_outcomes = split_outcome_labels(&v);
        } else if heuristics::contains_action_word(line) && text::char_len(&item.text) < CONTINUATION_CAP {
            item.text = text::clip_chars(&format!("{} {}", item.text, line), CONTINUATION_CAP);
        }
    }
    flush(&mut current, &mut items);
    items.truncate(k);
    items
}

fn flush(current: &mut Option<Proposal>, items: &mut Vec<Proposal>) {
    if let Some(proposal) = current.take() {
        if accept_prose_text(&proposal.text) && !items.iter().any(|p| p.text == proposal.text) {
            items.push(proposal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_json_wins_over_surrounding_prose() {
        let raw = "Here are the steps.\n```json\n[{\"text\":\"Check X\",\"rationale\":\"r\",\"how_to_verify\":\"compare A and B\"}]\n```\nHope that helps!";
        let items = extract_proposals(raw, 5);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "Check X");
        assert_eq!(items[0].how_to_verify.as_deref(), Some("compare A and B"));
    }

    #[test]
    fn last_fenced_block_is_preferred() {
        let raw = "```json\n[{\"text\":\"Check first draft\"}]\n```\nrevised:\n```json\n[{\"text\":\"Check final draft\"}]\n```";
        let items = extract_proposals(raw, 5);
        assert_eq!(items[0].text, "Check final draft");
    }

    #[test]
    fn thinking_blocks_are_stripped_before_parsing() {
        let raw = "<think>[{\"text\":\"Check leaked reasoning\"}]</think>\n[{\"text\":\"Measure the output\",\"rationale\":\"r\"}]";
        let items = extract_proposals(raw, 5);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "Measure the output");
    }

    #[test]
    fn bracketed_array_found_inside_prose() {
        let raw = "Sure thing [see notes]. The plan: [{\"text\":\"Weigh c1 vs c2\",\"rationale\":\"r\"}] as requested.";
        let items = extract_proposals(raw, 3);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "Weigh c1 vs c2");
    }

    #[test]
    fn invalid_entries_are_skipped() {
        let raw = "[{\"rationale\":\"no text\"}, {\"text\":\"  \"}, {\"text\":\"Record the tilt\"}]";
        let items = extract_proposals(raw, 5);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "Record the tilt");
    }

    #[test]
    fn labeled_blocks_parse_into_proposals() {
        let raw = "Text: Weigh c1 c2 vs c3 c4\nRationale: halves the suspects\nHow_to_verify: watch the tilt\nOutcomes: balance; left; right\n\nText: Rationale:\n";
        let items = extract_proposals(raw, 5);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "Weigh c1 c2 vs c3 c4");
        assert_eq!(items[0].how_to_verify.as_deref(), Some("watch the tilt"));
        let labels: Vec<&str> = items[0].expected_outcomes.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["balance", "left", "right"]);
    }

    #[test]
    fn bullets_with_continuations() {
        let raw = "- Weigh the first half against the second half\nRationale: splits the space\nHow_to_verify: observe the pans\n- Record the outcome in the log\n2) Compare the two lightest items";
        let items = extract_proposals(raw, 5);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].how_to_verify.as_deref(), Some("observe the pans"));
        assert_eq!(items[2].text, "Compare the two lightest items");
    }

    #[test]
    fn bullet_without_action_word_is_rejected() {
        let raw = "- just some filler words here\n- Measure the first group";
        let items = extract_proposals(raw, 5);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "Measure the first group");
    }

    #[test]
    fn plain_prose_yields_nothing() {
        assert!(extract_proposals("not json, no bullets, just prose.", 5).is_empty());
        assert!(extract_proposals("", 5).is_empty());
    }

    #[test]
    fn outcome_labels_are_capped_at_six() {
        let labels = split_outcome_labels("a;b;c;d;e;f;g;h");
        assert_eq!(labels.len(), 6);
    }

    #[test]
    fn structured_verification_is_parsed() {
        let raw = r#"[{"text":"Weigh c1 vs c2","rationale":"r","verification":{"kind":"weighing","outcomes":[{"label":"balance","state_update":"both genuine"}],"cost":2}}]"#;
        let items = extract_proposals(raw, 5);
        let spec = items[0].verification.as_ref().unwrap();
        assert_eq!(spec.kind.as_deref(), Some("weighing"));
        assert_eq!(spec.cost, Some(2.0));
        assert_eq!(spec.outcomes[0].state_update.as_deref(), Some("both genuine"));
    }
}
