//! Match candidates and results returned by the fuzzy matcher.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::MedicineId;
use crate::medicine::MedicineRecord;

/// How a candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Case-insensitive equality with a catalog brand name.
    Exact,
    /// Brand-name substring lookup scored by edit distance.
    Fuzzy,
    /// Composition (salt) lookup scored by trigram similarity.
    Composition,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Fuzzy => "fuzzy",
            Self::Composition => "composition",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scored (variant, record) pair collected during one search.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    /// The generated variation that produced this hit.
    pub source_variant: String,
    pub record: MedicineRecord,
    /// Confidence in `[0, 1]`.
    pub similarity: f64,
    /// Store-side rank (100 exact, 90 prefix, 80 substring, 70 other).
    pub db_rank_score: i32,
    /// Secondary similarity used only for ordering ties.
    pub secondary_score: f64,
    pub match_type: MatchType,
}

impl MatchCandidate {
    /// Ranking order: best candidate first.
    ///
    /// Similarity, then store rank, secondary score, weightage (missing last),
    /// shorter brand name, and finally the lower id.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .similarity
            .total_cmp(&self.similarity)
            .then_with(|| other.db_rank_score.cmp(&self.db_rank_score))
            .then_with(|| other.secondary_score.total_cmp(&self.secondary_score))
            .then_with(|| cmp_weightage_desc(self.record.weightage, other.record.weightage))
            .then_with(|| self.record.name_len().cmp(&other.record.name_len()))
            .then_with(|| self.record.id.cmp(&other.record.id))
    }

    pub fn to_alternative(&self) -> AlternativeMatch {
        AlternativeMatch {
            id: self.record.id,
            name: self.record.brand_name.clone(),
            confidence: self.similarity,
        }
    }
}

/// Descending weightage with missing values last.
pub fn cmp_weightage_desc(left: Option<f64>, right: Option<f64>) -> Ordering {
    match (left, right) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// A runner-up reported next to a successful match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeMatch {
    pub id: MedicineId,
    pub name: String,
    pub confidence: f64,
}

/// Outcome category of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// A record met the similarity threshold.
    Matched,
    /// The best record fell below the threshold and is offered as a suggestion.
    LowConfidence,
    /// No catalog record was found by any strategy.
    NotFound,
    /// The input was rejected before any lookup (blank name).
    Rejected,
}

/// Result of resolving one free-text medicine name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub status: MatchStatus,
    #[serde(rename = "match")]
    pub matched: Option<MedicineRecord>,
    pub suggestion: Option<MedicineRecord>,
    pub confidence: f64,
    pub match_type: Option<MatchType>,
    pub search_term_used: Option<String>,
    pub alternatives: Vec<AlternativeMatch>,
    pub message: String,
}

impl MatchResult {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::empty(MatchStatus::Rejected, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::empty(MatchStatus::NotFound, message)
    }

    pub fn exact(record: MedicineRecord, search_term: impl Into<String>) -> Self {
        let message = format!("Exact match: {}", record.brand_name);
        Self {
            status: MatchStatus::Matched,
            matched: Some(record),
            suggestion: None,
            confidence: 1.0,
            match_type: Some(MatchType::Exact),
            search_term_used: Some(search_term.into()),
            alternatives: Vec::new(),
            message,
        }
    }

    /// Successful ranked match with up to two runners-up.
    pub fn ranked(best: MatchCandidate, runners_up: &[MatchCandidate]) -> Self {
        let message = format!(
            "{} match: {}",
            capitalize(best.match_type.as_str()),
            best.record.brand_name
        );
        Self {
            status: MatchStatus::Matched,
            confidence: clamp_unit(best.similarity),
            match_type: Some(best.match_type),
            search_term_used: Some(best.source_variant),
            alternatives: runners_up
                .iter()
                .take(2)
                .map(MatchCandidate::to_alternative)
                .collect(),
            matched: Some(best.record),
            suggestion: None,
            message,
        }
    }

    /// Near-miss surfaced as a suggestion; never counts as success.
    pub fn low_confidence(best: MatchCandidate) -> Self {
        let message = format!(
            "Low confidence match. Suggested: {}",
            best.record.brand_name
        );
        Self {
            status: MatchStatus::LowConfidence,
            confidence: clamp_unit(best.similarity),
            match_type: Some(best.match_type),
            search_term_used: Some(best.source_variant),
            alternatives: Vec::new(),
            matched: None,
            suggestion: Some(best.record),
            message,
        }
    }

    fn empty(status: MatchStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            matched: None,
            suggestion: None,
            confidence: 0.0,
            match_type: None,
            search_term_used: None,
            alternatives: Vec::new(),
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == MatchStatus::Matched && self.matched.is_some()
    }

    pub fn matched_id(&self) -> Option<MedicineId> {
        self.matched.as_ref().map(|record| record.id)
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
