//! Normalized string similarity for medicine names.
//!
//! Case-insensitive, with a containment shortcut so that truncated OCR
//! fragments ("Para") still score against the full catalog name.

use rapidfuzz::distance::levenshtein;

/// Score assigned to one string containing the other, before length scaling.
pub const CONTAINMENT_WEIGHT: f64 = 0.8;

/// Similarity of two names in `[0, 1]`.
///
/// Empty input scores 0, case-insensitive equality scores 1, containment
/// scores `0.8 * shorter / longer`, and everything else falls back to
/// `1 - levenshtein / longer`. Lengths are counted in characters.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a == b {
        return 1.0;
    }

    let len_a = a.chars().count();
    let len_b = b.chars().count();
    let longer = len_a.max(len_b) as f64;

    if a.contains(&b) || b.contains(&a) {
        let shorter = len_a.min(len_b) as f64;
        return CONTAINMENT_WEIGHT * (shorter / longer);
    }

    let distance = levenshtein::distance(a.chars(), b.chars()) as f64;
    (1.0 - distance / longer).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs_score_zero() {
        assert_eq!(similarity("", "Dolo"), 0.0);
        assert_eq!(similarity("Dolo", ""), 0.0);
        assert_eq!(similarity("", ""), 0.0);
    }

    #[test]
    fn equality_ignores_case() {
        assert_eq!(similarity("PARACETAMOL", "paracetamol"), 1.0);
    }

    #[test]
    fn containment_scales_by_length() {
        let score = similarity("Para", "Paracetamol");
        assert!((score - 0.8 * 4.0 / 11.0).abs() < 1e-12);
        assert!((score - 0.290_909).abs() < 1e-4);
    }

    #[test]
    fn single_edit_uses_levenshtein() {
        // one substitution over eleven characters
        let score = similarity("Paracetam0l", "Paracetamol");
        assert!((score - 10.0 / 11.0).abs() < 1e-12);
    }

    #[test]
    fn unrelated_names_floor_at_zero() {
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }
}
