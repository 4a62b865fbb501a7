use std::fmt;
use std::str::FromStr;

use crate::ModelError;

/// Primary key of a record in the reference medicine catalog.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "i64", into = "i64")]
pub struct MedicineId(i64);

impl MedicineId {
    pub fn new(value: i64) -> Result<Self, ModelError> {
        if value <= 0 {
            return Err(ModelError::InvalidMedicineId(value));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for MedicineId {
    type Error = ModelError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MedicineId> for i64 {
    fn from(id: MedicineId) -> Self {
        id.0
    }
}

impl FromStr for MedicineId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = s
            .trim()
            .parse::<i64>()
            .map_err(|_| ModelError::InvalidMedicineId(0))?;
        Self::new(parsed)
    }
}

impl fmt::Display for MedicineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
