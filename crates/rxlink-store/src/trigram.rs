//! Trigram similarity in the style of PostgreSQL `pg_trgm`.
//!
//! Words (alphanumeric runs, lowercased) are padded with two leading spaces
//! and one trailing space before being cut into three-character windows.
//! Similarity is the Jaccard index of the two trigram sets.

use std::collections::BTreeSet;

use rxlink_model::{CompositionHit, MedicineRecord, StrengthQuery, cmp_weightage_desc};

/// Minimum similarity for a composition name to count as a match.
pub const TRIGRAM_THRESHOLD: f64 = 0.3;

pub fn trigrams(value: &str) -> BTreeSet<String> {
    let mut set = BTreeSet::new();
    for word in value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let padded: Vec<char> = "  "
            .chars()
            .chain(word.to_lowercase().chars())
            .chain(" ".chars())
            .collect();
        for window in padded.windows(3) {
            set.insert(window.iter().collect());
        }
    }
    set
}

/// Jaccard similarity of the trigram sets, 0 when either side has none.
pub fn trigram_similarity(a: &str, b: &str) -> f64 {
    let left = trigrams(a);
    let right = trigrams(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(&right).count();
    let union = left.len() + right.len() - shared;
    shared as f64 / union as f64
}

/// Score a record against a composition fragment.
///
/// `None` when no composition reaches [`TRIGRAM_THRESHOLD`]. Otherwise the
/// similarity is the best over all compositions and the rank reflects the
/// requested strength.
pub fn score_composition(
    record: &MedicineRecord,
    fragment: &str,
    strength: Option<&StrengthQuery>,
) -> Option<CompositionHit> {
    let mut best = 0.0_f64;
    let mut strength_matched = false;
    for composition in &record.compositions {
        let score = trigram_similarity(&composition.name, fragment);
        if score < TRIGRAM_THRESHOLD {
            continue;
        }
        best = best.max(score);
        if let Some(s) = strength {
            strength_matched |= composition.has_strength(&s.value, &s.unit);
        }
    }
    if best < TRIGRAM_THRESHOLD {
        return None;
    }
    let rank_score = match strength {
        Some(_) if strength_matched => CompositionHit::STRENGTH_MATCH,
        Some(_) => CompositionHit::NAME_ONLY,
        None => CompositionHit::NO_STRENGTH,
    };
    Some(CompositionHit {
        record: record.clone(),
        similarity: best,
        rank_score,
    })
}

/// Rank desc, similarity desc, weightage desc, shorter name, lower id.
pub fn sort_composition_hits(hits: &mut [CompositionHit]) {
    hits.sort_by(|a, b| {
        b.rank_score
            .cmp(&a.rank_score)
            .then_with(|| b.similarity.total_cmp(&a.similarity))
            .then_with(|| cmp_weightage_desc(a.record.weightage, b.record.weightage))
            .then_with(|| a.record.name_len().cmp(&b.record.name_len()))
            .then_with(|| a.record.id.cmp(&b.record.id))
    });
}
