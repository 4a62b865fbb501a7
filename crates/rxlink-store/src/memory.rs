//! In-memory catalog for CSV files and tests.

use std::collections::HashMap;

use rxlink_model::{
    CompositionHit, Deadline, MedicineId, MedicineRecord, RankedRecord, ReferenceMedicineStore,
    StoreResult, StrengthQuery, cmp_weightage_desc,
};

use crate::error::{CatalogError, Result};
use crate::trigram::{score_composition, sort_composition_hits};

/// Catalog held in memory, with a lowercase name index.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<MedicineRecord>,
    by_id: HashMap<MedicineId, usize>,
    by_name: HashMap<String, Vec<usize>>,
}

impl MemoryStore {
    /// Build a store; ids must be unique.
    pub fn from_records(records: Vec<MedicineRecord>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(records.len());
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for (slot, record) in records.iter().enumerate() {
            if by_id.insert(record.id, slot).is_some() {
                return Err(CatalogError::DuplicateId { id: record.id.get() });
            }
            by_name
                .entry(record.brand_name.to_lowercase())
                .or_default()
                .push(slot);
        }
        Ok(Self {
            records,
            by_id,
            by_name,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    pub fn records(&self) -> &[MedicineRecord] {
        &self.records
    }

    fn active(&self) -> impl Iterator<Item = &MedicineRecord> {
        self.records.iter().filter(|r| r.active)
    }
}

impl ReferenceMedicineStore for MemoryStore {
    fn find_exact_by_name(
        &self,
        name: &str,
        deadline: Deadline,
    ) -> StoreResult<Option<MedicineRecord>> {
        deadline.check()?;
        let Some(slots) = self.by_name.get(&name.trim().to_lowercase()) else {
            return Ok(None);
        };
        Ok(slots
            .iter()
            .map(|&slot| &self.records[slot])
            .filter(|r| r.active)
            .min_by(|a, b| {
                cmp_weightage_desc(a.weightage, b.weightage).then_with(|| a.id.cmp(&b.id))
            })
            .cloned())
    }

    fn find_by_substring(
        &self,
        fragment: &str,
        limit: usize,
        deadline: Deadline,
    ) -> StoreResult<Vec<RankedRecord>> {
        deadline.check()?;
        let needle = fragment.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let mut hits: Vec<RankedRecord> = self
            .active()
            .filter(|r| r.brand_name.to_lowercase().contains(&needle))
            .map(|r| RankedRecord {
                rank_score: RankedRecord::rank_for(&r.brand_name, &needle),
                record: r.clone(),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.rank_score
                .cmp(&a.rank_score)
                .then_with(|| cmp_weightage_desc(a.record.weightage, b.record.weightage))
                .then_with(|| a.record.name_len().cmp(&b.record.name_len()))
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    fn find_by_composition_fuzzy(
        &self,
        fragment: &str,
        strength: Option<&StrengthQuery>,
        limit: usize,
        deadline: Deadline,
    ) -> StoreResult<Vec<CompositionHit>> {
        deadline.check()?;
        let mut hits: Vec<CompositionHit> = self
            .active()
            .filter_map(|r| score_composition(r, fragment, strength))
            .collect();
        sort_composition_hits(&mut hits);
        hits.truncate(limit);
        Ok(hits)
    }

    fn find_by_id(&self, id: MedicineId, deadline: Deadline) -> StoreResult<Option<MedicineRecord>> {
        deadline.check()?;
        Ok(self
            .by_id
            .get(&id)
            .map(|&slot| &self.records[slot])
            .filter(|r| r.active)
            .cloned())
    }
}
