//! Batch linking inputs, per-medicine outcomes, and statistics.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::ids::MedicineId;
use crate::matching::{AlternativeMatch, MatchType};
use crate::medicine::MedicineRecord;

/// One medicine mention from a prescription.
///
/// Field-name variants from upstream payloads are normalized by the caller
/// before this struct is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicineInput {
    pub name: String,
    #[serde(default)]
    pub salt: Option<String>,
    /// Catalog id chosen manually upstream; skips fuzzy search entirely.
    #[serde(default)]
    pub existing_id: Option<MedicineId>,
}

impl MedicineInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            salt: None,
            existing_id: None,
        }
    }

    /// Validating constructor for boundary code.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyName`] for a blank name.
    pub fn try_new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ModelError::EmptyName);
        }
        Ok(Self::new(name))
    }

    #[must_use]
    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        let salt = salt.into();
        self.salt = if salt.trim().is_empty() {
            None
        } else {
            Some(salt)
        };
        self
    }

    #[must_use]
    pub fn with_existing_id(mut self, id: MedicineId) -> Self {
        self.existing_id = Some(id);
        self
    }
}

/// How a medicine ended up linked (or not).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMethod {
    Manual,
    Exact,
    Fuzzy,
    Composition,
    /// A search ran but produced no match above the threshold.
    Failed,
    /// No search ran, or it could not complete.
    NotLinked,
}

impl LinkMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Exact => "exact",
            Self::Fuzzy => "fuzzy",
            Self::Composition => "composition",
            Self::Failed => "failed",
            Self::NotLinked => "not_linked",
        }
    }

    pub fn is_linked(&self) -> bool {
        matches!(
            self,
            Self::Manual | Self::Exact | Self::Fuzzy | Self::Composition
        )
    }
}

impl From<MatchType> for LinkMethod {
    fn from(match_type: MatchType) -> Self {
        match match_type {
            MatchType::Exact => Self::Exact,
            MatchType::Fuzzy => Self::Fuzzy,
            MatchType::Composition => Self::Composition,
        }
    }
}

impl fmt::Display for LinkMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence band of a linked medicine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    /// Below 0.7.
    Low,
    /// 0.7 up to (not including) 0.9.
    Medium,
    /// 0.9 and above.
    High,
}

impl ConfidenceBand {
    pub const HIGH_MIN: f64 = 0.9;
    pub const MEDIUM_MIN: f64 = 0.7;

    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= Self::HIGH_MIN {
            Self::High
        } else if confidence >= Self::MEDIUM_MIN {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// A medicine after the linking pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedMedicine {
    /// Position in the input batch.
    pub index: usize,
    pub input: MedicineInput,
    pub method: LinkMethod,
    pub medicine_id: Option<MedicineId>,
    /// Catalog record for automatic links; manual links carry only the id.
    pub record: Option<MedicineRecord>,
    pub confidence: Option<f64>,
    pub search_term_used: Option<String>,
    pub alternatives: Vec<AlternativeMatch>,
    pub suggestion: Option<MedicineRecord>,
    pub error: Option<String>,
}

impl LinkedMedicine {
    pub fn manual(index: usize, input: MedicineInput, id: MedicineId) -> Self {
        Self {
            index,
            input,
            method: LinkMethod::Manual,
            medicine_id: Some(id),
            record: None,
            confidence: Some(1.0),
            search_term_used: None,
            alternatives: Vec::new(),
            suggestion: None,
            error: None,
        }
    }

    pub fn unlinked(
        index: usize,
        input: MedicineInput,
        method: LinkMethod,
        error: Option<String>,
    ) -> Self {
        Self {
            index,
            input,
            method,
            medicine_id: None,
            record: None,
            confidence: None,
            search_term_used: None,
            alternatives: Vec::new(),
            suggestion: None,
            error,
        }
    }

    pub fn is_linked(&self) -> bool {
        self.method.is_linked() && self.medicine_id.is_some()
    }

    /// Display name: the catalog name when linked, otherwise the input name.
    pub fn display_name(&self) -> &str {
        self.record
            .as_ref()
            .map_or(self.input.name.as_str(), |r| r.brand_name.as_str())
    }

    /// Salt text: the input salt, or the first catalog composition with its dose.
    pub fn display_salt(&self) -> Option<String> {
        if let Some(salt) = &self.input.salt {
            return Some(salt.clone());
        }
        let first = self.record.as_ref()?.compositions.first()?;
        Some(match first.dose() {
            Some(dose) => format!("{} {dose}", first.name),
            None => first.name.clone(),
        })
    }
}

/// Tallies for one linking batch.
///
/// Pure counts, so the result does not depend on input order. Partial
/// statistics from parallel workers combine with [`Self::merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkingStatistics {
    pub total: usize,
    pub manual: usize,
    pub exact: usize,
    pub fuzzy: usize,
    pub composition: usize,
    pub failed: usize,
    pub not_linked: usize,
    pub high_confidence: usize,
    pub medium_confidence: usize,
    pub low_confidence: usize,
}

impl LinkingStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket one processed medicine.
    pub fn record(&mut self, medicine: &LinkedMedicine) {
        self.total += 1;
        match medicine.method {
            LinkMethod::Manual => self.manual += 1,
            LinkMethod::Exact => self.exact += 1,
            LinkMethod::Fuzzy => self.fuzzy += 1,
            LinkMethod::Composition => self.composition += 1,
            LinkMethod::Failed => self.failed += 1,
            LinkMethod::NotLinked => self.not_linked += 1,
        }
        if medicine.method.is_linked() {
            match ConfidenceBand::from_confidence(medicine.confidence.unwrap_or(1.0)) {
                ConfidenceBand::High => self.high_confidence += 1,
                ConfidenceBand::Medium => self.medium_confidence += 1,
                ConfidenceBand::Low => self.low_confidence += 1,
            }
        }
    }

    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.total += other.total;
        self.manual += other.manual;
        self.exact += other.exact;
        self.fuzzy += other.fuzzy;
        self.composition += other.composition;
        self.failed += other.failed;
        self.not_linked += other.not_linked;
        self.high_confidence += other.high_confidence;
        self.medium_confidence += other.medium_confidence;
        self.low_confidence += other.low_confidence;
        self
    }

    pub fn linked(&self) -> usize {
        self.manual + self.exact + self.fuzzy + self.composition
    }

    /// Linked share of the batch in percent (0.0 for an empty batch).
    pub fn linking_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.linked() as f64 * 100.0 / self.total as f64
        }
    }
}

impl<'a> FromIterator<&'a LinkedMedicine> for LinkingStatistics {
    fn from_iter<I: IntoIterator<Item = &'a LinkedMedicine>>(iter: I) -> Self {
        let mut stats = Self::new();
        for medicine in iter {
            stats.record(medicine);
        }
        stats
    }
}

/// Outcome of a linking batch: per-medicine results in input order plus tallies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkingReport {
    pub medicines: Vec<LinkedMedicine>,
    pub statistics: LinkingStatistics,
}

impl LinkingReport {
    pub fn new(medicines: Vec<LinkedMedicine>, statistics: LinkingStatistics) -> Self {
        Self {
            medicines,
            statistics,
        }
    }

    pub fn linked(&self) -> impl Iterator<Item = &LinkedMedicine> {
        self.medicines.iter().filter(|m| m.is_linked())
    }

    pub fn unlinked(&self) -> impl Iterator<Item = &LinkedMedicine> {
        self.medicines.iter().filter(|m| !m.is_linked())
    }
}
