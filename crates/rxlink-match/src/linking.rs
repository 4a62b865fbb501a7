//! Batch linking of prescription medicines to catalog records.

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use rxlink_model::{
    LinkMethod, LinkedMedicine, LinkingReport, LinkingStatistics, MatchStatus, MedicineInput,
    ReferenceMedicineStore,
};

use crate::error::LinkError;
use crate::matcher::FuzzyMatcher;
use crate::options::LinkOptions;

pub const MSG_AUTO_LINK_DISABLED: &str = "Automatic linking disabled";

/// Links a batch of medicines, one search per medicine.
#[derive(Debug, Clone)]
pub struct LinkingOrchestrator<S> {
    matcher: FuzzyMatcher<S>,
}

impl<S: ReferenceMedicineStore> LinkingOrchestrator<S> {
    pub fn new(matcher: FuzzyMatcher<S>) -> Self {
        Self { matcher }
    }

    pub fn from_store(store: S) -> Self {
        Self::new(FuzzyMatcher::new(store))
    }

    pub fn matcher(&self) -> &FuzzyMatcher<S> {
        &self.matcher
    }

    /// Link every medicine and tally the outcome.
    ///
    /// Results keep input order. With `require_link`, the first medicine (by
    /// input position) that cannot be linked aborts the batch and the
    /// medicines after it are not searched.
    pub fn process_linking(
        &self,
        medicines: &[MedicineInput],
        options: &LinkOptions,
    ) -> Result<LinkingReport, LinkError> {
        self.process_linking_with(medicines, options, |_| {})
    }

    /// Like [`Self::process_linking`], calling `on_linked` as each medicine
    /// finishes. In parallel mode calls arrive in completion order.
    pub fn process_linking_with<F>(
        &self,
        medicines: &[MedicineInput],
        options: &LinkOptions,
        on_linked: F,
    ) -> Result<LinkingReport, LinkError>
    where
        F: Fn(&LinkedMedicine) + Sync,
    {
        let span = tracing::info_span!(
            "link_batch",
            total = medicines.len(),
            parallel = options.parallel,
            require_link = options.require_link
        );
        let _guard = span.enter();

        let (linked, statistics) = if options.parallel {
            self.link_parallel(medicines, options, &on_linked)?
        } else {
            self.link_sequential(medicines, options, &on_linked)?
        };

        tracing::info!(
            total = statistics.total,
            linked = statistics.linked(),
            rate = statistics.linking_rate(),
            manual = statistics.manual,
            exact = statistics.exact,
            fuzzy = statistics.fuzzy,
            composition = statistics.composition,
            failed = statistics.failed,
            not_linked = statistics.not_linked,
            "linking complete"
        );
        Ok(LinkingReport::new(linked, statistics))
    }

    fn link_sequential(
        &self,
        medicines: &[MedicineInput],
        options: &LinkOptions,
        on_linked: &(impl Fn(&LinkedMedicine) + Sync),
    ) -> Result<(Vec<LinkedMedicine>, LinkingStatistics), LinkError> {
        let mut statistics = LinkingStatistics::new();
        let mut linked = Vec::with_capacity(medicines.len());
        for (index, input) in medicines.iter().enumerate() {
            let medicine = self.link_one(index, input, options)?;
            on_linked(&medicine);
            statistics.record(&medicine);
            linked.push(medicine);
        }
        Ok((linked, statistics))
    }

    fn link_parallel(
        &self,
        medicines: &[MedicineInput],
        options: &LinkOptions,
        on_linked: &(impl Fn(&LinkedMedicine) + Sync),
    ) -> Result<(Vec<LinkedMedicine>, LinkingStatistics), LinkError> {
        // lowest index that failed so far; later medicines are skipped
        let first_failure = AtomicUsize::new(usize::MAX);
        let outcomes: Vec<Option<Result<LinkedMedicine, LinkError>>> = medicines
            .par_iter()
            .enumerate()
            .map(|(index, input)| {
                if index > first_failure.load(Ordering::Acquire) {
                    return None;
                }
                let outcome = self.link_one(index, input, options);
                match &outcome {
                    Ok(medicine) => on_linked(medicine),
                    Err(_) => {
                        first_failure.fetch_min(index, Ordering::AcqRel);
                    }
                }
                Some(outcome)
            })
            .collect();
        // a skipped medicine always follows an error, and the lowest-index
        // error is never skipped, so the first error in input order wins
        let mut linked = Vec::with_capacity(outcomes.len());
        for outcome in outcomes.into_iter().flatten() {
            linked.push(outcome?);
        }
        let statistics = linked
            .par_iter()
            .fold(LinkingStatistics::new, |mut partial, medicine| {
                partial.record(medicine);
                partial
            })
            .reduce(LinkingStatistics::new, LinkingStatistics::merge);
        Ok((linked, statistics))
    }

    /// Link one medicine. Errors only when links are required.
    pub fn link_one(
        &self,
        index: usize,
        input: &MedicineInput,
        options: &LinkOptions,
    ) -> Result<LinkedMedicine, LinkError> {
        if let Some(id) = input.existing_id {
            return Ok(LinkedMedicine::manual(index, input.clone(), id));
        }

        let medicine = if options.auto_link {
            self.search_one(index, input, options)?
        } else {
            LinkedMedicine::unlinked(
                index,
                input.clone(),
                LinkMethod::NotLinked,
                Some(MSG_AUTO_LINK_DISABLED.to_string()),
            )
        };

        if options.require_link && !medicine.is_linked() {
            return Err(LinkError::BatchAbort {
                index,
                name: input.name.clone(),
                reason: medicine
                    .error
                    .unwrap_or_else(|| "medicine could not be linked".to_string()),
            });
        }
        Ok(medicine)
    }

    fn search_one(
        &self,
        index: usize,
        input: &MedicineInput,
        options: &LinkOptions,
    ) -> Result<LinkedMedicine, LinkError> {
        let mut search = options.search.clone();
        if input.salt.is_some() {
            search.include_salt.clone_from(&input.salt);
        }

        let result = match self.matcher.search(&input.name, &search) {
            Ok(result) => result,
            Err(source) if options.require_link => {
                return Err(LinkError::Store {
                    index,
                    name: input.name.clone(),
                    source,
                });
            }
            Err(error) => {
                tracing::warn!(index, %error, "linking skipped after catalog failure");
                return Ok(LinkedMedicine::unlinked(
                    index,
                    input.clone(),
                    LinkMethod::NotLinked,
                    Some(error.to_string()),
                ));
            }
        };

        if let (true, Some(match_type)) = (result.is_success(), result.match_type) {
            return Ok(LinkedMedicine {
                index,
                input: input.clone(),
                method: LinkMethod::from(match_type),
                medicine_id: result.matched_id(),
                record: result.matched,
                confidence: Some(result.confidence),
                search_term_used: result.search_term_used,
                alternatives: result.alternatives,
                suggestion: None,
                error: None,
            });
        }

        let method = if result.status == MatchStatus::Rejected {
            LinkMethod::NotLinked
        } else {
            LinkMethod::Failed
        };
        let mut medicine =
            LinkedMedicine::unlinked(index, input.clone(), method, Some(result.message));
        medicine.suggestion = result.suggestion;
        medicine.search_term_used = result.search_term_used;
        if result.status == MatchStatus::LowConfidence {
            medicine.confidence = Some(result.confidence);
        }
        Ok(medicine)
    }
}
