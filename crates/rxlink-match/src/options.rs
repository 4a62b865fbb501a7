//! Search, weighting, and batch options.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::variations::OcrConfusion;

/// Per-search options.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Threshold for a successful match (default 0.7).
    pub min_similarity: f64,
    /// Upper bound on substring hits per variation (default 5).
    pub max_results: usize,
    /// Composition text used when no brand name matches.
    pub include_salt: Option<String>,
    /// Try exact name equality before fuzzy ranking (default true).
    pub prefer_exact_match: bool,
    /// Budget for each individual catalog lookup.
    pub lookup_timeout: Option<Duration>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            min_similarity: 0.7,
            max_results: 5,
            include_salt: None,
            prefer_exact_match: true,
            lookup_timeout: None,
        }
    }
}

impl SearchOptions {
    #[must_use]
    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.include_salt = Some(salt.into());
        self
    }

    #[must_use]
    pub fn with_min_similarity(mut self, min_similarity: f64) -> Self {
        self.min_similarity = min_similarity;
        self
    }
}

/// Multipliers applied to composition matches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchWeights {
    /// Applied when a composition's strength equals the requested one.
    pub strength_bonus: f64,
    /// Applied to every composition match.
    pub composition_discount: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            strength_bonus: 1.15,
            composition_discount: 0.9,
        }
    }
}

impl MatchWeights {
    /// Composition confidence, capped at 1.0.
    pub fn composition_confidence(&self, store_similarity: f64, strength_matched: bool) -> f64 {
        let bonus = if strength_matched {
            self.strength_bonus
        } else {
            1.0
        };
        (store_similarity * bonus * self.composition_discount).min(1.0)
    }
}

/// Batch linking options.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkOptions {
    pub search: SearchOptions,
    /// Abort the batch on the first medicine that cannot be linked.
    pub require_link: bool,
    /// When false, medicines without a manual id are left unlinked.
    pub auto_link: bool,
    /// Process medicines on the rayon pool.
    pub parallel: bool,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            search: SearchOptions::default(),
            require_link: false,
            auto_link: true,
            parallel: false,
        }
    }
}

/// File-backed matcher settings (TOML).
///
/// ```toml
/// min_similarity = 0.75
/// lookup_timeout_ms = 200
/// ocr_confusion = "0:O"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatcherConfig {
    pub min_similarity: f64,
    pub max_results: usize,
    pub prefer_exact_match: bool,
    pub lookup_timeout_ms: Option<u64>,
    pub strength_bonus: f64,
    pub composition_discount: f64,
    pub ocr_confusion: OcrConfusion,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        let search = SearchOptions::default();
        let weights = MatchWeights::default();
        Self {
            min_similarity: search.min_similarity,
            max_results: search.max_results,
            prefer_exact_match: search.prefer_exact_match,
            lookup_timeout_ms: None,
            strength_bonus: weights.strength_bonus,
            composition_discount: weights.composition_discount,
            ocr_confusion: OcrConfusion::default(),
        }
    }
}

impl MatcherConfig {
    /// Range checks for values read from disk or flags.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(ConfigError {
                field: "min_similarity",
                value: self.min_similarity.to_string(),
                reason: "must be between 0 and 1",
            });
        }
        if self.max_results == 0 {
            return Err(ConfigError {
                field: "max_results",
                value: self.max_results.to_string(),
                reason: "must be at least 1",
            });
        }
        for (field, value) in [
            ("strength_bonus", self.strength_bonus),
            ("composition_discount", self.composition_discount),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError {
                    field,
                    value: value.to_string(),
                    reason: "must be a positive number",
                });
            }
        }
        Ok(())
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            min_similarity: self.min_similarity,
            max_results: self.max_results,
            include_salt: None,
            prefer_exact_match: self.prefer_exact_match,
            lookup_timeout: self.lookup_timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn weights(&self) -> MatchWeights {
        MatchWeights {
            strength_bonus: self.strength_bonus,
            composition_discount: self.composition_discount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composition_confidence_is_capped() {
        let weights = MatchWeights::default();
        assert!((weights.composition_confidence(0.8, false) - 0.72).abs() < 1e-12);
        assert!((weights.composition_confidence(0.8, true) - 0.8 * 1.15 * 0.9).abs() < 1e-12);
        assert_eq!(weights.composition_confidence(1.0, true), 1.0);
    }

    #[test]
    fn default_config_matches_default_options() {
        let config = MatcherConfig::default();
        assert_eq!(config.search_options(), SearchOptions::default());
        assert_eq!(config.weights(), MatchWeights::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let config = MatcherConfig {
            min_similarity: 1.5,
            ..MatcherConfig::default()
        };
        assert_eq!(config.validate().map_err(|e| e.field), Err("min_similarity"));

        let config = MatcherConfig {
            composition_discount: 0.0,
            ..MatcherConfig::default()
        };
        assert_eq!(
            config.validate().map_err(|e| e.field),
            Err("composition_discount")
        );
    }

    #[test]
    fn config_reads_partial_toml() {
        let config: MatcherConfig = toml::from_str(
            r#"
            min_similarity = 0.75
            lookup_timeout_ms = 250
            ocr_confusion = "5:S"
            "#,
        )
        .expect("toml");
        assert_eq!(config.min_similarity, 0.75);
        assert_eq!(config.max_results, 5);
        assert_eq!(config.ocr_confusion, OcrConfusion::FIVE_TO_S);
        assert_eq!(
            config.search_options().lookup_timeout,
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn config_rejects_unknown_keys_and_confusions() {
        assert!(toml::from_str::<MatcherConfig>("threshold = 0.5").is_err());
        assert!(toml::from_str::<MatcherConfig>(r#"ocr_confusion = "7:T""#).is_err());
    }
}
