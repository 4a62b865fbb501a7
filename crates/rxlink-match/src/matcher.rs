//! Resolution of one free-text medicine name against the catalog.
//!
//! The search is a fixed cascade: exact lookups per variation, then substring
//! lookups scored by [`similarity`], then (only when nothing matched by name)
//! composition lookups on the salt text. Candidates are pooled, de-duplicated
//! by record, and ranked with [`MatchCandidate::rank_cmp`].
//!
//! Events never carry medicine names; variations are logged by position.

use std::collections::HashMap;

use rxlink_model::{
    Deadline, MatchCandidate, MatchResult, MatchType, MedicineId, ReferenceMedicineStore,
    StoreError, StoreResult,
};

use crate::error::MatchError;
use crate::options::{MatchWeights, SearchOptions};
use crate::similarity::similarity;
use crate::variations::{MIN_VARIANT_LEN, NameVariationGenerator, extract_strength};

pub const MSG_NAME_REQUIRED: &str = "Medicine name is required";
pub const MSG_NOT_FOUND: &str = "Medicine not found in catalog";

/// Fuzzy matcher over an injected catalog store.
#[derive(Debug, Clone)]
pub struct FuzzyMatcher<S> {
    store: S,
    generator: NameVariationGenerator,
    weights: MatchWeights,
}

impl<S: ReferenceMedicineStore> FuzzyMatcher<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            generator: NameVariationGenerator::default(),
            weights: MatchWeights::default(),
        }
    }

    #[must_use]
    pub fn with_generator(mut self, generator: NameVariationGenerator) -> Self {
        self.generator = generator;
        self
    }

    #[must_use]
    pub fn with_weights(mut self, weights: MatchWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn generator(&self) -> &NameVariationGenerator {
        &self.generator
    }

    pub fn weights(&self) -> MatchWeights {
        self.weights
    }

    /// Resolve `name` to a catalog record.
    ///
    /// Not-found and low-confidence outcomes are values. Store failures are
    /// treated as "no hit" for the failing query; only when every query
    /// failed does this return [`MatchError::StoreUnavailable`].
    pub fn search(&self, name: &str, options: &SearchOptions) -> Result<MatchResult, MatchError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(MatchResult::rejected(MSG_NAME_REQUIRED));
        }

        let variations = self.generator.generate(name);
        let span = tracing::info_span!(
            "search",
            variants = variations.len(),
            salt = options.include_salt.is_some()
        );
        let _guard = span.enter();

        let mut tally = QueryTally::default();

        if options.prefer_exact_match {
            for variant in variations.iter() {
                let found = tally.observe(
                    self.store
                        .find_exact_by_name(variant, deadline(options)),
                );
                if let Some(record) = found.flatten() {
                    tracing::debug!(id = %record.id, "exact match");
                    return Ok(MatchResult::exact(record, variant));
                }
            }
        }

        let mut pool = CandidatePool::default();
        for (position, variant) in variations
            .iter()
            .enumerate()
            .filter(|(_, v)| v.chars().count() >= MIN_VARIANT_LEN)
        {
            let hits = tally
                .observe(
                    self.store
                        .find_by_substring(variant, options.max_results, deadline(options)),
                )
                .unwrap_or_default();
            tracing::debug!(variant = position, hits = hits.len(), "substring lookup");
            for hit in hits {
                pool.offer(MatchCandidate {
                    source_variant: variant.to_string(),
                    similarity: similarity(name, &hit.record.brand_name),
                    db_rank_score: hit.rank_score,
                    secondary_score: similarity(variant, &hit.record.brand_name),
                    match_type: MatchType::Fuzzy,
                    record: hit.record,
                });
            }
        }

        if pool.is_empty()
            && let Some(salt) = options
                .include_salt
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
        {
            self.search_composition(salt, options, &mut pool, &mut tally);
        }

        let mut candidates = pool.into_vec();
        if candidates.is_empty() {
            if tally.all_failed() {
                return Err(tally.into_error());
            }
            tracing::debug!(queries = tally.issued, "no candidates");
            return Ok(MatchResult::not_found(MSG_NOT_FOUND));
        }

        candidates.sort_by(MatchCandidate::rank_cmp);
        let mut ranked = candidates.into_iter();
        let Some(best) = ranked.next() else {
            return Ok(MatchResult::not_found(MSG_NOT_FOUND));
        };

        if best.similarity < options.min_similarity {
            tracing::debug!(
                id = %best.record.id,
                confidence = best.similarity,
                "best candidate below threshold"
            );
            return Ok(MatchResult::low_confidence(best));
        }

        let runners_up: Vec<MatchCandidate> = ranked.take(2).collect();
        tracing::debug!(
            id = %best.record.id,
            confidence = best.similarity,
            match_type = %best.match_type,
            "matched"
        );
        Ok(MatchResult::ranked(best, &runners_up))
    }

    fn search_composition(
        &self,
        salt: &str,
        options: &SearchOptions,
        pool: &mut CandidatePool,
        tally: &mut QueryTally,
    ) {
        let extracted = extract_strength(salt);
        let strength = extracted.strength();
        let variations = self.generator.generate(&extracted.core);
        tracing::debug!(
            variants = variations.len(),
            strength = strength.is_some(),
            "composition lookup"
        );

        for variant in variations.iter() {
            let hits = tally
                .observe(self.store.find_by_composition_fuzzy(
                    variant,
                    strength.as_ref(),
                    options.max_results,
                    deadline(options),
                ))
                .unwrap_or_default();
            for hit in hits {
                let strength_matched = strength
                    .as_ref()
                    .is_some_and(|s| hit.record.has_composition_strength(&s.value, &s.unit));
                let secondary = hit
                    .record
                    .compositions
                    .iter()
                    .map(|c| similarity(variant, &c.name))
                    .fold(0.0, f64::max);
                pool.offer(MatchCandidate {
                    source_variant: variant.to_string(),
                    similarity: self
                        .weights
                        .composition_confidence(hit.similarity, strength_matched),
                    db_rank_score: hit.rank_score,
                    secondary_score: secondary,
                    match_type: MatchType::Composition,
                    record: hit.record,
                });
            }
        }
    }
}

fn deadline(options: &SearchOptions) -> Deadline {
    Deadline::from_timeout(options.lookup_timeout)
}

/// Counts issued and failed store queries for one search.
#[derive(Debug, Default)]
struct QueryTally {
    issued: usize,
    failed: usize,
    last_error: Option<StoreError>,
}

impl QueryTally {
    /// Record a query outcome; failures become `None`.
    fn observe<T>(&mut self, result: StoreResult<T>) -> Option<T> {
        self.issued += 1;
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(%error, "catalog lookup failed");
                self.failed += 1;
                self.last_error = Some(error);
                None
            }
        }
    }

    fn all_failed(&self) -> bool {
        self.issued > 0 && self.failed == self.issued
    }

    fn into_error(self) -> MatchError {
        MatchError::StoreUnavailable {
            failed_queries: self.failed,
            last_error: self
                .last_error
                .unwrap_or_else(|| StoreError::unavailable("no lookup completed")),
        }
    }
}

/// Candidates keyed by record; a record keeps its best-ranked entry.
#[derive(Debug, Default)]
struct CandidatePool {
    candidates: Vec<MatchCandidate>,
    by_id: HashMap<MedicineId, usize>,
}

impl CandidatePool {
    fn offer(&mut self, candidate: MatchCandidate) {
        match self.by_id.get(&candidate.record.id) {
            Some(&slot) => {
                if candidate.rank_cmp(&self.candidates[slot]).is_lt() {
                    self.candidates[slot] = candidate;
                }
            }
            None => {
                self.by_id
                    .insert(candidate.record.id, self.candidates.len());
                self.candidates.push(candidate);
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    fn into_vec(self) -> Vec<MatchCandidate> {
        self.candidates
    }
}
