#![deny(unsafe_code)]

//! Fuzzy resolution of OCR-extracted medicine names.
//!
//! [`FuzzyMatcher`] resolves one name against a [`ReferenceMedicineStore`];
//! [`LinkingOrchestrator`] runs it over a prescription's medicines and tallies
//! the outcome.
//!
//! [`ReferenceMedicineStore`]: rxlink_model::ReferenceMedicineStore

pub mod error;
pub mod linking;
pub mod matcher;
pub mod options;
pub mod similarity;
pub mod variations;

pub use error::{ConfigError, LinkError, MatchError, ParseOcrConfusionError};
pub use linking::LinkingOrchestrator;
pub use matcher::FuzzyMatcher;
pub use options::{LinkOptions, MatchWeights, MatcherConfig, SearchOptions};
pub use similarity::similarity;
pub use variations::{
    ExtractedStrength, NameVariationGenerator, OcrConfusion, Variations, extract_strength,
};
