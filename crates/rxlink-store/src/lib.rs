#![deny(unsafe_code)]

//! Reference medicine catalogs.
//!
//! Two [`ReferenceMedicineStore`] backends: [`MemoryStore`] for CSV catalogs
//! and tests, and [`SqliteStore`] for imported catalogs on disk. Both share
//! the trigram composition scoring in [`trigram`].

pub mod catalog;
pub mod error;
pub mod memory;
pub mod sqlite;
pub mod trigram;

use std::path::Path;

use rxlink_model::ReferenceMedicineStore;

pub use catalog::{LoadedCatalog, load_catalog_csv, parse_catalog};
pub use error::{CatalogError, Result};
pub use memory::MemoryStore;
pub use sqlite::{CatalogMeta, SqliteStore};
pub use trigram::{TRIGRAM_THRESHOLD, trigram_similarity};

/// Open a catalog by path: `.csv` files load into memory, anything else is
/// treated as an imported SQLite catalog.
pub fn open_catalog(path: &Path) -> Result<Box<dyn ReferenceMedicineStore>> {
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        let loaded = load_catalog_csv(path)?;
        Ok(Box::new(MemoryStore::from_records(loaded.records)?))
    } else {
        Ok(Box::new(SqliteStore::open_existing(path)?))
    }
}
