#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use rxlink_match::similarity;
use rxlink_model::{
    Composition, CompositionHit, Deadline, MedicineId, MedicineRecord, RankedRecord,
    ReferenceMedicineStore, StoreError, StoreResult, StrengthQuery,
};

pub fn id(value: i64) -> MedicineId {
    MedicineId::new(value).expect("valid id")
}

pub fn record(value: i64, name: &str) -> MedicineRecord {
    MedicineRecord::new(id(value), name)
}

pub fn record_with_salt(value: i64, name: &str, salt: &str, strength: &str) -> MedicineRecord {
    record(value, name)
        .with_composition(Composition::new(salt).with_strength(strength, "mg"))
        .expect("composition slot")
}

/// Linear-scan catalog following the store contract.
#[derive(Debug, Default)]
pub struct VecStore {
    pub records: Vec<MedicineRecord>,
    /// Substring lookups return every record when set, ranked 70 on a miss.
    pub match_everything: bool,
    pub queries: AtomicUsize,
}

impl VecStore {
    pub fn new(records: Vec<MedicineRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    pub fn match_everything(mut self) -> Self {
        self.match_everything = true;
        self
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn active(&self) -> impl Iterator<Item = &MedicineRecord> {
        self.records.iter().filter(|r| r.active)
    }
}

impl ReferenceMedicineStore for VecStore {
    fn find_exact_by_name(
        &self,
        name: &str,
        _deadline: Deadline,
    ) -> StoreResult<Option<MedicineRecord>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .active()
            .find(|r| r.brand_name.eq_ignore_ascii_case(name))
            .cloned())
    }

    fn find_by_substring(
        &self,
        fragment: &str,
        limit: usize,
        _deadline: Deadline,
    ) -> StoreResult<Vec<RankedRecord>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let needle = fragment.to_lowercase();
        let mut hits: Vec<RankedRecord> = self
            .active()
            .filter(|r| self.match_everything || r.brand_name.to_lowercase().contains(&needle))
            .map(|r| RankedRecord {
                rank_score: RankedRecord::rank_for(&r.brand_name, fragment),
                record: r.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.rank_score.cmp(&a.rank_score));
        hits.truncate(limit);
        Ok(hits)
    }

    fn find_by_composition_fuzzy(
        &self,
        fragment: &str,
        strength: Option<&StrengthQuery>,
        limit: usize,
        _deadline: Deadline,
    ) -> StoreResult<Vec<CompositionHit>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let mut hits: Vec<CompositionHit> = self
            .active()
            .filter_map(|r| {
                let best = r
                    .compositions
                    .iter()
                    .map(|c| similarity(&c.name, fragment))
                    .fold(0.0, f64::max);
                (best >= 0.3).then(|| CompositionHit {
                    rank_score: match strength {
                        Some(s) if r.has_composition_strength(&s.value, &s.unit) => {
                            CompositionHit::STRENGTH_MATCH
                        }
                        Some(_) => CompositionHit::NAME_ONLY,
                        None => CompositionHit::NO_STRENGTH,
                    },
                    similarity: best,
                    record: r.clone(),
                })
            })
            .collect();
        hits.sort_by(|a, b| b.rank_score.cmp(&a.rank_score));
        hits.truncate(limit);
        Ok(hits)
    }

    fn find_by_id(&self, id: MedicineId, _deadline: Deadline) -> StoreResult<Option<MedicineRecord>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.active().find(|r| r.id == id).cloned())
    }
}

/// Fails the test on any lookup.
#[derive(Debug, Default)]
pub struct PanickingStore;

impl ReferenceMedicineStore for PanickingStore {
    fn find_exact_by_name(&self, _: &str, _: Deadline) -> StoreResult<Option<MedicineRecord>> {
        panic!("store must not be queried")
    }

    fn find_by_substring(&self, _: &str, _: usize, _: Deadline) -> StoreResult<Vec<RankedRecord>> {
        panic!("store must not be queried")
    }

    fn find_by_composition_fuzzy(
        &self,
        _: &str,
        _: Option<&StrengthQuery>,
        _: usize,
        _: Deadline,
    ) -> StoreResult<Vec<CompositionHit>> {
        panic!("store must not be queried")
    }

    fn find_by_id(&self, _: MedicineId, _: Deadline) -> StoreResult<Option<MedicineRecord>> {
        panic!("store must not be queried")
    }
}

/// Every lookup fails with the configured error.
#[derive(Debug)]
pub struct FailingStore(pub StoreError);

impl ReferenceMedicineStore for FailingStore {
    fn find_exact_by_name(&self, _: &str, _: Deadline) -> StoreResult<Option<MedicineRecord>> {
        Err(self.0.clone())
    }

    fn find_by_substring(&self, _: &str, _: usize, _: Deadline) -> StoreResult<Vec<RankedRecord>> {
        Err(self.0.clone())
    }

    fn find_by_composition_fuzzy(
        &self,
        _: &str,
        _: Option<&StrengthQuery>,
        _: usize,
        _: Deadline,
    ) -> StoreResult<Vec<CompositionHit>> {
        Err(self.0.clone())
    }

    fn find_by_id(&self, _: MedicineId, _: Deadline) -> StoreResult<Option<MedicineRecord>> {
        Err(self.0.clone())
    }
}

/// Exact lookups fail; everything else delegates.
#[derive(Debug)]
pub struct FlakyExactStore(pub VecStore);

impl ReferenceMedicineStore for FlakyExactStore {
    fn find_exact_by_name(&self, _: &str, _: Deadline) -> StoreResult<Option<MedicineRecord>> {
        Err(StoreError::Timeout)
    }

    fn find_by_substring(
        &self,
        fragment: &str,
        limit: usize,
        deadline: Deadline,
    ) -> StoreResult<Vec<RankedRecord>> {
        self.0.find_by_substring(fragment, limit, deadline)
    }

    fn find_by_composition_fuzzy(
        &self,
        fragment: &str,
        strength: Option<&StrengthQuery>,
        limit: usize,
        deadline: Deadline,
    ) -> StoreResult<Vec<CompositionHit>> {
        self.0.find_by_composition_fuzzy(fragment, strength, limit, deadline)
    }

    fn find_by_id(&self, id: MedicineId, deadline: Deadline) -> StoreResult<Option<MedicineRecord>> {
        self.0.find_by_id(id, deadline)
    }
}
