use std::collections::BTreeSet;

use proptest::prelude::*;
use rxlink_match::{NameVariationGenerator, OcrConfusion, similarity};

proptest! {
    #[test]
    fn similarity_stays_in_unit_interval(a in "\\PC{0,24}", b in "\\PC{0,24}") {
        let score = similarity(&a, &b);
        prop_assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn similarity_is_symmetric(a in "[A-Za-z0-9 ]{0,20}", b in "[A-Za-z0-9 ]{0,20}") {
        prop_assert_eq!(similarity(&a, &b), similarity(&b, &a));
    }

    #[test]
    fn identical_names_score_one(a in "[A-Za-z]{1,20}") {
        prop_assert_eq!(similarity(&a, &a.to_uppercase()), 1.0);
    }

    #[test]
    fn variations_are_deterministic(name in "[A-Za-z0-9()\\-_. ]{0,30}") {
        let generator = NameVariationGenerator::new();
        prop_assert_eq!(generator.generate(&name), generator.generate(&name));
    }

    #[test]
    fn variations_are_never_shorter_than_three_chars(name in "\\PC{0,30}") {
        let variations = NameVariationGenerator::new().generate(&name);
        prop_assert!(variations.iter().all(|v| v.chars().count() >= 3));
    }
}

#[test]
fn variation_set_for_dosage_and_strength_suffixes() {
    let expected: BTreeSet<String> = [
        "Dolo 650 Tab",
        "dolo 650 tab",
        "Dolo 650",
        "dolo 650",
        "Dolo",
        "dolo",
        "Dolo 65O Tab",
        "dolo 65o tab",
        "dolo 65O tab",
        "Dolo 65O",
        "dolo 65o",
        "dolo 65O",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    let generator = NameVariationGenerator::new();
    assert_eq!(generator.generate("Dolo 650 Tab").to_set(), expected);
    assert_eq!(generator.generate(" Dolo 650 Tab ").to_set(), expected);
}

#[test]
fn every_confusion_direction_round_trips_through_text() {
    for confusion in OcrConfusion::ALL {
        let parsed: OcrConfusion = confusion.to_string().parse().expect("parse");
        assert_eq!(parsed, confusion);
    }
}
