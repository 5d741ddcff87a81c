// src/selector/mod.rs

use crate::model::ScoredStep;
use crate::text;

/// Score-seeded farthest-first ordering: the best-scoring candidate seeds the
/// picked set, then each round adds the candidate maximizing its minimum
/// text distance (1 - Jaccard) to everything picked so far, ties going to
/// the higher score. Expects `scored` sorted by total score descending.
pub fn diversify_rank(scored: &[ScoredStep]) -> Vec<ScoredStep> {
    if scored.len() <= 1 {
        return scored.to_vec();
    }
    let mut remaining: Vec<&ScoredStep> = scored.iter().collect();
    let mut picked: Vec<&ScoredStep> = vec![remaining.remove(0)];
    while !remaining.is_empty() {
        let mut best_idx = 0;
        let mut best_dist = f64::NEG_INFINITY;
        for (i, candidate) in remaining.iter().enumerate() {
            let min_dist = picked
                .iter()
                .map(|p| 1.0 - text::jaccard_similarity(&p.proposal.text, &candidate.proposal.text))
                .fold(f64::INFINITY, f64::min);
            // Strict '>' keeps the earlier (higher-scoring) candidate on ties.
            if min_dist > best_dist {
                best_dist = min_dist;
                best_idx = i;
            }
        }
        picked.push(remaining.remove(best_idx));
    }
    picked.into_iter().cloned().collect()
}

/// Diversity-first top-M, re-sorted by score for presentation, plus the
/// chosen step: the first candidate whose text differs from the previous
/// scratchpad step, falling back to the top-ranked one.
pub fn select_top(
    scored: &[ScoredStep],
    top_m: usize,
    last_step_text: Option<&str>,
) -> (Vec<ScoredStep>, ScoredStep) {
    let mut top: Vec<ScoredStep> = diversify_rank(scored)
        .into_iter()
        .take(top_m.max(1))
        .collect();
    top.sort_by(|a, b| b.score.total_score.total_cmp(&a.score.total_score));
    let chosen = top
        .iter()
        .find(|c| last_step_text.is_none_or(|last| c.proposal.text.trim() != last.trim()))
        .unwrap_or(&top[0])
        .clone();
    (top, chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Proposal, ScoreParts};

    fn scored(text: &str, total: f64) -> ScoredStep {
        ScoredStep {
            proposal: Proposal::new(text, "r"),
            score: ScoreParts {
                total_score: total,
                ..ScoreParts::default()
            },
        }
    }

    #[test]
    fn top_is_sorted_by_score_descending() {
        let pool = vec![
            scored("alpha beta gamma", 0.9),
            scored("delta epsilon zeta", 0.5),
            scored("eta theta iota", 0.7),
        ];
        let (top, _) = select_top(&pool, 3, None);
        let totals: Vec<f64> = top.iter().map(|c| c.score.total_score).collect();
        assert!(totals.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn diversification_prefers_distant_texts() {
        // Pool sorted by score; the near-clone of the seed should lose its
        // second place to the distant lower-scoring candidate.
        let pool = vec![
            scored("weigh c1 c2 c3 c4 against c5 c6 c7 c8", 0.9),
            scored("weigh c1 c2 c3 c4 against c5 c6 c7 c9", 0.8),
            scored("record every outcome in a separate log", 0.3),
        ];
        let ranked = diversify_rank(&pool);
        assert_eq!(ranked[0].proposal.text, pool[0].proposal.text);
        assert_eq!(ranked[1].proposal.text, pool[2].proposal.text);
    }

    #[test]
    fn chosen_skips_the_previous_step_text() {
        let pool = vec![
            scored("repeat the last action", 0.9),
            scored("try a different probe", 0.8),
        ];
        let (_, chosen) = select_top(&pool, 2, Some("repeat the last action"));
        assert_eq!(chosen.proposal.text, "try a different probe");
    }

    #[test]
    fn chosen_falls_back_to_top_when_all_repeat() {
        let pool = vec![scored("repeat the last action", 0.9)];
        let (_, chosen) = select_top(&pool, 2, Some("repeat the last action"));
        assert_eq!(chosen.proposal.text, "repeat the last action");
    }
}
