//! Error types for matching and batch linking.
//!
//! Match outcomes (not found, low confidence) are values on
//! [`rxlink_model::MatchResult`]; these errors cover infrastructure failure
//! and policy aborts only.

use rxlink_model::StoreError;
use thiserror::Error;

/// A search could not run against the catalog.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MatchError {
    /// Every catalog query issued for the search failed.
    #[error("catalog unavailable: all {failed_queries} lookups failed ({last_error})")]
    StoreUnavailable {
        failed_queries: usize,
        last_error: StoreError,
    },
}

/// A linking batch was aborted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LinkError {
    /// A medicine could not be linked while links were required.
    #[error("medicine {index} ('{name}') could not be linked: {reason}")]
    BatchAbort {
        index: usize,
        name: String,
        reason: String,
    },

    /// The catalog failed while links were required.
    #[error("catalog failure at medicine {index} ('{name}')")]
    Store {
        index: usize,
        name: String,
        #[source]
        source: MatchError,
    },
}

impl LinkError {
    /// Position of the offending medicine in the input batch.
    pub fn index(&self) -> usize {
        match self {
            Self::BatchAbort { index, .. } | Self::Store { index, .. } => *index,
        }
    }

    /// Name of the offending medicine.
    pub fn name(&self) -> &str {
        match self {
            Self::BatchAbort { name, .. } | Self::Store { name, .. } => name,
        }
    }
}

/// Invalid OCR confusion direction, e.g. `"0:Q"`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported OCR confusion '{input}' (expected one of 0:O, O:0, 1:I, I:1, 5:S, S:5)")]
pub struct ParseOcrConfusionError {
    pub input: String,
}

/// Matcher configuration out of range.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("invalid matcher setting {field} = {value}: {reason}")]
pub struct ConfigError {
    pub field: &'static str,
    pub value: String,
    pub reason: &'static str,
}
