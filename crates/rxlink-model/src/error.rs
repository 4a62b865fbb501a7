use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid medicine id: {0}")]
    InvalidMedicineId(i64),
    #[error("medicine name is required")]
    EmptyName,
    #[error("record {id} has {count} compositions (at most {max} allowed)")]
    TooManyCompositions { id: i64, count: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, ModelError>;
