//! Read-only contract for the reference medicine catalog.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::ids::MedicineId;
use crate::medicine::MedicineRecord;

/// Infrastructure failure of a catalog lookup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    /// The backing catalog cannot be reached.
    #[error("catalog unavailable: {message}")]
    Unavailable { message: String },

    /// The lookup ran past its deadline.
    #[error("catalog lookup timed out")]
    Timeout,

    /// The query itself failed.
    #[error("catalog query failed: {message}")]
    Query { message: String },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Point in time after which a lookup should give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// No deadline.
    pub const fn none() -> Self {
        Self(None)
    }

    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now().checked_add(timeout))
    }

    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map_or(Self::none(), Self::after)
    }

    pub fn instant(&self) -> Option<Instant> {
        self.0
    }

    pub fn is_expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    /// Fails with [`StoreError::Timeout`] once the deadline has passed.
    pub fn check(&self) -> StoreResult<()> {
        if self.is_expired() {
            Err(StoreError::Timeout)
        } else {
            Ok(())
        }
    }
}

/// Substring hit with its store-side rank.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRecord {
    pub record: MedicineRecord,
    /// 100 exact, 90 prefix, 80 substring, 70 otherwise.
    pub rank_score: i32,
}

impl RankedRecord {
    pub const EXACT: i32 = 100;
    pub const PREFIX: i32 = 90;
    pub const SUBSTRING: i32 = 80;
    pub const OTHER: i32 = 70;

    /// Rank of `brand_name` against a lookup fragment, case-insensitive.
    pub fn rank_for(brand_name: &str, fragment: &str) -> i32 {
        let name = brand_name.to_lowercase();
        let fragment = fragment.to_lowercase();
        if name == fragment {
            Self::EXACT
        } else if name.starts_with(&fragment) {
            Self::PREFIX
        } else if name.contains(&fragment) {
            Self::SUBSTRING
        } else {
            Self::OTHER
        }
    }
}

/// Strength filter for composition lookups, e.g. `500` + `mg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrengthQuery {
    pub value: String,
    pub unit: String,
}

impl StrengthQuery {
    pub fn new(value: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            unit: unit.into(),
        }
    }
}

/// Composition lookup hit.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionHit {
    pub record: MedicineRecord,
    /// Best trigram similarity over the record's compositions.
    pub similarity: f64,
    /// 100 strength match, 80 name-only match, 85 when no strength was asked.
    pub rank_score: i32,
}

impl CompositionHit {
    pub const STRENGTH_MATCH: i32 = 100;
    pub const NAME_ONLY: i32 = 80;
    pub const NO_STRENGTH: i32 = 85;
}

/// Read-only queries against the reference catalog.
///
/// Implementations must only return active records and must be safe to share
/// across worker threads.
pub trait ReferenceMedicineStore: Send + Sync {
    /// Case-insensitive brand-name equality.
    fn find_exact_by_name(
        &self,
        name: &str,
        deadline: Deadline,
    ) -> StoreResult<Option<MedicineRecord>>;

    /// Case-insensitive brand-name containment, best rank first, at most `limit`.
    fn find_by_substring(
        &self,
        fragment: &str,
        limit: usize,
        deadline: Deadline,
    ) -> StoreResult<Vec<RankedRecord>>;

    /// Trigram similarity against composition names.
    fn find_by_composition_fuzzy(
        &self,
        fragment: &str,
        strength: Option<&StrengthQuery>,
        limit: usize,
        deadline: Deadline,
    ) -> StoreResult<Vec<CompositionHit>>;

    fn find_by_id(&self, id: MedicineId, deadline: Deadline)
    -> StoreResult<Option<MedicineRecord>>;
}

macro_rules! forward_store {
    ($($ty:ty),+) => {$(
        impl<T: ReferenceMedicineStore + ?Sized> ReferenceMedicineStore for $ty {
            fn find_exact_by_name(
                &self,
                name: &str,
                deadline: Deadline,
            ) -> StoreResult<Option<MedicineRecord>> {
                (**self).find_exact_by_name(name, deadline)
            }

            fn find_by_substring(
                &self,
                fragment: &str,
                limit: usize,
                deadline: Deadline,
            ) -> StoreResult<Vec<RankedRecord>> {
                (**self).find_by_substring(fragment, limit, deadline)
            }

            fn find_by_composition_fuzzy(
                &self,
                fragment: &str,
                strength: Option<&StrengthQuery>,
                limit: usize,
                deadline: Deadline,
            ) -> StoreResult<Vec<CompositionHit>> {
                (**self).find_by_composition_fuzzy(fragment, strength, limit, deadline)
            }

            fn find_by_id(
                &self,
                id: MedicineId,
                deadline: Deadline,
            ) -> StoreResult<Option<MedicineRecord>> {
                (**self).find_by_id(id, deadline)
            }
        }
    )+};
}

forward_store!(&T, Arc<T>, Box<T>);
