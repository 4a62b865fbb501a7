//! Reference catalog records.
//!
//! A [`MedicineRecord`] is owned by the catalog store and never modified by the
//! matching code. Compositions keep their catalog slot order, which matters for
//! composition-based matching.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::ids::MedicineId;

/// Maximum number of composition slots on a catalog record.
pub const MAX_COMPOSITIONS: usize = 5;

/// An active ingredient with its strength.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    /// Catalog id of the ingredient, when known.
    pub id: Option<i64>,
    /// Ingredient (salt) name, e.g. "Paracetamol".
    pub name: String,
    /// Strength value as stored in the catalog (e.g. "500", "2.5").
    pub strength_value: Option<String>,
    /// Strength unit (e.g. "mg", "ml").
    pub strength_unit: Option<String>,
}

impl Composition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            strength_value: None,
            strength_unit: None,
        }
    }

    #[must_use]
    pub fn with_strength(mut self, value: impl Into<String>, unit: impl Into<String>) -> Self {
        self.strength_value = Some(value.into());
        self.strength_unit = Some(unit.into());
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Renders the dose as `"500mg"` when both strength and unit are present.
    pub fn dose(&self) -> Option<String> {
        match (&self.strength_value, &self.strength_unit) {
            (Some(value), Some(unit)) if !value.is_empty() && !unit.is_empty() => {
                Some(format!("{value}{unit}"))
            }
            _ => None,
        }
    }

    /// True when this composition carries the given strength.
    ///
    /// Units compare case-insensitively. Values compare numerically when both
    /// parse (so "500" equals "500.0"), otherwise as trimmed strings.
    pub fn has_strength(&self, value: &str, unit: &str) -> bool {
        let (Some(own_value), Some(own_unit)) = (&self.strength_value, &self.strength_unit) else {
            return false;
        };
        if !own_unit.trim().eq_ignore_ascii_case(unit.trim()) {
            return false;
        }
        match (own_value.trim().parse::<f64>(), value.trim().parse::<f64>()) {
            (Ok(a), Ok(b)) => (a - b).abs() < f64::EPSILON,
            _ => own_value.trim() == value.trim(),
        }
    }
}

/// A canonical medicine in the reference catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicineRecord {
    pub id: MedicineId,
    /// Canonical display (brand) name.
    pub brand_name: String,
    pub generic_id: Option<i64>,
    /// Ordered composition slots (1 to 5 entries).
    pub compositions: Vec<Composition>,
    /// Catalog popularity rank, higher is preferred. Missing sorts last.
    pub weightage: Option<f64>,
    pub pack_size: Option<String>,
    pub manufacturer: Option<String>,
    pub price: Option<f64>,
    pub medicine_type: Option<String>,
    /// Inactive or deactivated records are never returned by store queries.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl MedicineRecord {
    pub fn new(id: MedicineId, brand_name: impl Into<String>) -> Self {
        Self {
            id,
            brand_name: brand_name.into(),
            generic_id: None,
            compositions: Vec::new(),
            weightage: None,
            pack_size: None,
            manufacturer: None,
            price: None,
            medicine_type: None,
            active: true,
        }
    }

    /// Append a composition slot.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::TooManyCompositions`] when all slots are taken.
    pub fn push_composition(&mut self, composition: Composition) -> Result<()> {
        if self.compositions.len() >= MAX_COMPOSITIONS {
            return Err(ModelError::TooManyCompositions {
                id: self.id.get(),
                count: self.compositions.len() + 1,
                max: MAX_COMPOSITIONS,
            });
        }
        self.compositions.push(composition);
        Ok(())
    }

    /// Builder form of [`Self::push_composition`] for fixtures and loaders.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::TooManyCompositions`] when all slots are taken.
    pub fn with_composition(mut self, composition: Composition) -> Result<Self> {
        self.push_composition(composition)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_weightage(mut self, weightage: f64) -> Self {
        self.weightage = Some(weightage);
        self
    }

    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Renders all compositions as `"Paracetamol 500mg + Caffeine 30mg"`.
    pub fn composition_summary(&self) -> Option<String> {
        let parts: Vec<String> = self
            .compositions
            .iter()
            .filter(|c| !c.name.trim().is_empty())
            .map(|c| match c.dose() {
                Some(dose) => format!("{} {dose}", c.name),
                None => c.name.clone(),
            })
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" + "))
        }
    }

    /// True when any composition carries the given strength.
    pub fn has_composition_strength(&self, value: &str, unit: &str) -> bool {
        self.compositions.iter().any(|c| c.has_strength(value, unit))
    }

    /// Number of characters in the brand name, used as the final tie-break.
    pub fn name_len(&self) -> usize {
        self.brand_name.chars().count()
    }
}
