#![deny(unsafe_code)]

//! Data model for medicine-name resolution.
//!
//! Catalog records, match results, batch-linking outcomes, and the read-only
//! store contract shared by the matcher and the catalog backends.

pub mod error;
pub mod ids;
pub mod linking;
pub mod matching;
pub mod medicine;
pub mod store;

pub use error::{ModelError, Result};
pub use ids::MedicineId;
pub use linking::{
    ConfidenceBand, LinkMethod, LinkedMedicine, LinkingReport, LinkingStatistics, MedicineInput,
};
pub use matching::{
    AlternativeMatch, MatchCandidate, MatchResult, MatchStatus, MatchType, cmp_weightage_desc,
};
pub use medicine::{Composition, MAX_COMPOSITIONS, MedicineRecord};
pub use store::{
    CompositionHit, Deadline, RankedRecord, ReferenceMedicineStore, StoreError, StoreResult,
    StrengthQuery,
};
