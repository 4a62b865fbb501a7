mod common;

use common::{
    FailingStore, FlakyExactStore, PanickingStore, VecStore, id, record, record_with_salt,
};
use rxlink_match::{FuzzyMatcher, MatchError, MatchWeights, SearchOptions};
use rxlink_model::{Composition, MatchStatus, MatchType, StoreError};

fn pantocid_store() -> VecStore {
    VecStore::new(vec![
        record(7, "Pantocid DSR Capsule"),
        record(8, "Pantocid 40"),
        record(9, "Pantocid HP Kit"),
    ])
}

#[test]
fn blank_name_is_rejected_without_store_calls() {
    let matcher = FuzzyMatcher::new(PanickingStore);
    let result = matcher
        .search("   ", &SearchOptions::default())
        .expect("search");
    assert_eq!(result.status, MatchStatus::Rejected);
    assert_eq!(result.message, "Medicine name is required");
    assert!(!result.is_success());
}

#[test]
fn exact_match_short_circuits_weighted_fuzzy_candidates() {
    let store = VecStore::new(vec![
        record(1, "Dolo"),
        record(2, "Dolo 650").with_weightage(100.0),
    ]);
    let result = FuzzyMatcher::new(store)
        .search("Dolo", &SearchOptions::default())
        .expect("search");
    assert!(result.is_success());
    assert_eq!(result.matched_id(), Some(id(1)));
    assert_eq!(result.match_type, Some(MatchType::Exact));
    assert_eq!(result.confidence, 1.0);
    assert!(result.alternatives.is_empty());
}

#[test]
fn exact_phase_can_be_skipped() {
    let store = VecStore::new(vec![record(1, "Dolo"), record(2, "Dolo 650")]);
    let options = SearchOptions {
        prefer_exact_match: false,
        ..SearchOptions::default()
    };
    let result = FuzzyMatcher::new(store)
        .search("Dolo", &options)
        .expect("search");
    assert_eq!(result.matched_id(), Some(id(1)));
    assert_eq!(result.match_type, Some(MatchType::Fuzzy));
}

#[test]
fn fuzzy_match_reports_runners_up() {
    let result = FuzzyMatcher::new(pantocid_store())
        .search("Pantocid DSR Capsul", &SearchOptions::default())
        .expect("search");
    assert_eq!(result.status, MatchStatus::Matched);
    assert_eq!(result.matched_id(), Some(id(7)));
    assert_eq!(result.match_type, Some(MatchType::Fuzzy));
    assert!((result.confidence - 0.76).abs() < 1e-9);
    assert_eq!(result.search_term_used.as_deref(), Some("Pantocid DSR Capsul"));
    assert_eq!(result.alternatives.len(), 2);
    assert!(result.alternatives.iter().all(|alt| alt.id != id(7)));
    assert!(
        result
            .alternatives
            .iter()
            .all(|alt| alt.confidence <= result.confidence)
    );
}

#[test]
fn threshold_gates_success_only() {
    let options = SearchOptions::default().with_min_similarity(0.8);
    let result = FuzzyMatcher::new(pantocid_store())
        .search("Pantocid DSR Capsul", &options)
        .expect("search");
    assert_eq!(result.status, MatchStatus::LowConfidence);
    assert!(!result.is_success());
    assert!(result.confidence < options.min_similarity);
    assert_eq!(result.suggestion.map(|r| r.id), Some(id(7)));
}

#[test]
fn truncated_name_yields_low_confidence_suggestion() {
    let store = VecStore::new(vec![record(5, "Paracetamol")]);
    let result = FuzzyMatcher::new(store)
        .search("Para", &SearchOptions::default())
        .expect("search");
    assert_eq!(result.status, MatchStatus::LowConfidence);
    assert!(result.matched.is_none());
    assert!((result.confidence - 0.8 * 4.0 / 11.0).abs() < 1e-9);
    assert_eq!(
        result.message,
        "Low confidence match. Suggested: Paracetamol"
    );
}

#[test]
fn unrelated_name_gets_suggestion_from_loose_store() {
    let store = VecStore::new(vec![record(5, "Paracetamol")]).match_everything();
    let result = FuzzyMatcher::new(store)
        .search("Xyzzyxx", &SearchOptions::default())
        .expect("search");
    assert_eq!(result.status, MatchStatus::LowConfidence);
    assert!(result.confidence < 0.7);
    assert_eq!(result.suggestion.map(|r| r.id), Some(id(5)));
}

#[test]
fn unrelated_name_is_not_found_in_strict_store() {
    let store = VecStore::new(vec![record(5, "Paracetamol")]);
    let result = FuzzyMatcher::new(store)
        .search("Xyzzyxx", &SearchOptions::default())
        .expect("search");
    assert_eq!(result.status, MatchStatus::NotFound);
    assert_eq!(result.message, "Medicine not found in catalog");
    assert_eq!(result.confidence, 0.0);
    assert!(result.suggestion.is_none());
}

#[test]
fn inactive_records_are_invisible() {
    let store = VecStore::new(vec![record(1, "Dolo").inactive(), record(2, "Dolo 650")]);
    let result = FuzzyMatcher::new(store)
        .search("Dolo", &SearchOptions::default())
        .expect("search");
    assert_ne!(result.matched_id(), Some(id(1)));
    assert_ne!(result.suggestion.map(|r| r.id), Some(id(1)));
}

#[test]
fn strength_match_ranks_composition_first() {
    let store = VecStore::new(vec![
        record_with_salt(20, "Calpol", "Paracetamol", "500"),
        record_with_salt(21, "Pacimol", "Paracetamol", "650"),
    ]);
    let matcher = FuzzyMatcher::new(store);

    let options = SearchOptions::default().with_salt("Paracetamol 500mg");
    let result = matcher.search("Xqzv", &options).expect("search");
    assert_eq!(result.status, MatchStatus::Matched);
    assert_eq!(result.match_type, Some(MatchType::Composition));
    assert_eq!(result.matched_id(), Some(id(20)));
    assert_eq!(result.confidence, 1.0);
    assert_eq!(result.alternatives[0].id, id(21));
    assert!((result.alternatives[0].confidence - 0.9).abs() < 1e-9);

    let options = SearchOptions::default().with_salt("Paracetamol 650mg");
    let result = matcher.search("Xqzv", &options).expect("search");
    assert_eq!(result.matched_id(), Some(id(21)));
}

#[test]
fn glued_salt_strength_still_filters_compositions() {
    let store = VecStore::new(vec![
        record_with_salt(20, "Calpol", "Paracetamol", "500"),
        record_with_salt(21, "Pacimol", "Paracetamol", "650"),
    ]);
    let matcher = FuzzyMatcher::new(store);
    let options = SearchOptions::default().with_salt("Paracetamol500mg");
    let result = matcher.search("Xqzv", &options).expect("search");
    assert_eq!(result.status, MatchStatus::Matched);
    assert_eq!(result.match_type, Some(MatchType::Composition));
    assert_eq!(result.matched_id(), Some(id(20)));
    assert_eq!(result.confidence, 1.0);
}

#[test]
fn composition_weights_are_configurable() {
    let store = VecStore::new(vec![record_with_salt(20, "Calpol", "Paracetamol", "500")]);
    let matcher = FuzzyMatcher::new(store).with_weights(MatchWeights {
        strength_bonus: 1.0,
        composition_discount: 0.5,
    });
    let options = SearchOptions::default().with_salt("Paracetamol 500mg");
    let result = matcher.search("Xqzv", &options).expect("search");
    assert_eq!(result.status, MatchStatus::LowConfidence);
    assert!((result.confidence - 0.5).abs() < 1e-9);
}

#[test]
fn composition_lookup_runs_only_without_name_hits() {
    let calpol = record(20, "Calpol")
        .with_composition(Composition::new("Paracetamol").with_strength("500", "mg"))
        .expect("record");
    let store = VecStore::new(vec![calpol, record(30, "Dolo 650")]);
    let options = SearchOptions::default()
        .with_salt("Paracetamol 500mg")
        .with_min_similarity(0.5);
    let result = FuzzyMatcher::new(store)
        .search("Dolo 65", &options)
        .expect("search");
    assert_eq!(result.match_type, Some(MatchType::Fuzzy));
    assert_eq!(result.matched_id(), Some(id(30)));
}

#[test]
fn ocr_digit_in_name_resolves_by_exact_match() {
    let paracetamol = record(42, "Paracetamol")
        .with_composition(Composition::new("Paracetamol").with_strength("500", "mg"))
        .expect("record");
    let store = VecStore::new(vec![paracetamol, record(43, "Paracip 500")]);
    let result = FuzzyMatcher::new(store)
        .search("Paracetam0l 500mg", &SearchOptions::default())
        .expect("search");
    assert!(result.is_success());
    assert_eq!(result.matched_id(), Some(id(42)));
    assert_eq!(result.match_type, Some(MatchType::Exact));
    assert_eq!(result.confidence, 1.0);
    assert_eq!(result.search_term_used.as_deref(), Some("ParacetamOl"));
}

#[test]
fn total_store_failure_is_an_error() {
    let matcher = FuzzyMatcher::new(FailingStore(StoreError::Timeout));
    let err = matcher
        .search("Dolo", &SearchOptions::default())
        .expect_err("all lookups fail");
    assert_eq!(
        err,
        MatchError::StoreUnavailable {
            failed_queries: 4,
            last_error: StoreError::Timeout,
        }
    );
}

#[test]
fn partial_store_failure_degrades_to_remaining_queries() {
    let store = FlakyExactStore(VecStore::new(vec![record(1, "Dolo")]));
    let result = FuzzyMatcher::new(store)
        .search("Dolo", &SearchOptions::default())
        .expect("search");
    assert_eq!(result.matched_id(), Some(id(1)));
    assert_eq!(result.match_type, Some(MatchType::Fuzzy));
}

#[test]
fn matcher_accepts_shared_store_handles() {
    let store = std::sync::Arc::new(VecStore::new(vec![record(1, "Dolo")]));
    let matcher = FuzzyMatcher::new(std::sync::Arc::clone(&store));
    let result = matcher
        .search("dolo", &SearchOptions::default())
        .expect("search");
    assert_eq!(result.matched_id(), Some(id(1)));
    assert!(store.query_count() >= 1);
}
