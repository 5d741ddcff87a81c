// src/hygiene/mod.rs
//
// Cleans the raw candidate pool before scoring: boilerplate and oversized
// texts go, near-duplicates of history go, verification-backed proposals sort
// first, and domain templates top the pool up to the requested size.

use crate::domain::{self, FallbackFlavor};
use crate::heuristics;
use crate::model::Proposal;
use crate::scratchpad::State;
use crate::text;

const NEAR_DUPLICATE: f64 = 0.9;
const MAX_TEXT_CHARS: usize = 400;
const HINT_OVERLAP_TOKENS: usize = 2;

pub fn refine_candidates(
    raw: Vec<Proposal>,
    task: &str,
    state: &State,
    limit: usize,
) -> Vec<Proposal> {
    let limit = limit.max(1);

    let mut kept: Vec<Proposal> = raw
        .into_iter()
        .filter(|p| {
            let t = p.text.trim();
            !t.is_empty() && text::char_len(t) <= MAX_TEXT_CHARS && !heuristics::is_meta_opener(t)
        })
        .filter(|p| {
            state
                .steps
                .iter()
                .all(|s| text::jaccard_similarity(&s.text, &p.text) < NEAR_DUPLICATE)
        })
        .collect();

    kept.sort_by(|a, b| {
        let verify = sort_rank(b, state).cmp(&sort_rank(a, state));
        verify.then(text::char_len(&a.text).cmp(&text::char_len(&b.text)))
    });

    if kept.len() < limit {
        for template in domain::fallback_proposals(task, state, limit * 2, FallbackFlavor::NoSampler)
        {
            if kept.len() >= limit {
                break;
            }
            if kept
                .iter()
                .all(|p| text::jaccard_similarity(&p.text, &template.text) < NEAR_DUPLICATE)
            {
                kept.push(template);
            }
        }
    }

    let mut deduped: Vec<Proposal> = Vec::new();
    for proposal in kept {
        if deduped
            .iter()
            .all(|p| text::jaccard_similarity(&p.text, &proposal.text) < NEAR_DUPLICATE)
        {
            deduped.push(proposal);
        }
    }
    deduped.truncate(limit);
    deduped
}

/// (has verification hook, overlaps the shared hint pool); higher sorts first.
fn sort_rank(proposal: &Proposal, state: &State) -> (bool, bool) {
    let hint_overlap = state
        .hints
        .iter()
        .any(|h| text::shared_token_count(h, &proposal.text) >= HINT_OVERLAP_TOKENS);
    (proposal.has_verification_hook(), hint_overlap)
}
