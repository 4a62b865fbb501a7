//! CSV catalog files.
//!
//! One row per medicine with up to five composition slots:
//!
//! ```text
//! id,brand_name,generic_id,composition1_id,composition1_name,composition1_strength,composition1_unit,...,price,manufacturer,pack_size,medicine_type,weightage,active
//! ```
//!
//! Only `id` and `brand_name` are required. Empty cells are treated as absent.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use rxlink_model::{Composition, MAX_COMPOSITIONS, MedicineId, MedicineRecord};
use sha2::{Digest, Sha256};

use crate::error::{CatalogError, Result};

/// Parsed catalog plus the fingerprint of its source file.
#[derive(Debug, Clone)]
pub struct LoadedCatalog {
    pub path: PathBuf,
    pub records: Vec<MedicineRecord>,
    /// Lowercase hex SHA-256 of the file bytes.
    pub sha256: String,
}

/// Read, fingerprint, and parse a CSV catalog.
pub fn load_catalog_csv(path: &Path) -> Result<LoadedCatalog> {
    let bytes = std::fs::read(path).map_err(|e| CatalogError::io(path, e))?;
    let sha256 = hex::encode(Sha256::digest(&bytes));
    tracing::debug!(path = %path.display(), %sha256, "read catalog file");
    let records = parse_catalog(&bytes, path)?;
    tracing::info!(path = %path.display(), records = records.len(), "loaded catalog");
    Ok(LoadedCatalog {
        path: path.to_path_buf(),
        records,
        sha256,
    })
}

/// Parse catalog CSV bytes. `path` is only used in error messages.
pub fn parse_catalog(bytes: &[u8], path: &Path) -> Result<Vec<MedicineRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| csv_error(path, &e))?
        .iter()
        .map(|h| h.trim_matches('\u{feff}').to_ascii_lowercase())
        .collect();
    for required in ["id", "brand_name"] {
        if !headers.iter().any(|h| h == required) {
            return Err(CatalogError::Csv {
                path: path.to_path_buf(),
                message: format!("missing required column '{required}'"),
            });
        }
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| csv_error(path, &e))?;
        let line = row.position().map_or(0, csv::Position::line);
        let fields: BTreeMap<&str, &str> = headers
            .iter()
            .map(String::as_str)
            .zip(row.iter())
            .filter(|(_, value)| !value.is_empty())
            .collect();
        let record = record_from_fields(&fields).map_err(|message| CatalogError::InvalidRow {
            path: path.to_path_buf(),
            line,
            message,
        })?;
        records.push(record);
    }
    Ok(records)
}

fn csv_error(path: &Path, error: &csv::Error) -> CatalogError {
    CatalogError::Csv {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}

fn record_from_fields(fields: &BTreeMap<&str, &str>) -> std::result::Result<MedicineRecord, String> {
    let raw_id = fields.get("id").ok_or("missing id")?;
    let id: MedicineId = raw_id.parse().map_err(|_| format!("invalid id '{raw_id}'"))?;
    let brand_name = fields.get("brand_name").ok_or("missing brand_name")?;

    let mut record = MedicineRecord::new(id, *brand_name);
    record.generic_id = parse_opt(fields, "generic_id")?;
    for slot in 1..=MAX_COMPOSITIONS {
        let Some(name) = fields.get(format!("composition{slot}_name").as_str()) else {
            continue;
        };
        record.compositions.push(Composition {
            id: parse_opt(fields, &format!("composition{slot}_id"))?,
            name: (*name).to_string(),
            strength_value: text(fields, &format!("composition{slot}_strength")),
            strength_unit: text(fields, &format!("composition{slot}_unit")),
        });
    }
    record.price = parse_opt(fields, "price")?;
    record.manufacturer = text(fields, "manufacturer");
    record.pack_size = text(fields, "pack_size");
    record.medicine_type = text(fields, "medicine_type");
    record.weightage = parse_opt(fields, "weightage")?;
    record.active = match fields.get("active") {
        None => true,
        Some(value) => parse_flag(value).ok_or_else(|| format!("invalid active flag '{value}'"))?,
    };
    Ok(record)
}

fn text(fields: &BTreeMap<&str, &str>, key: &str) -> Option<String> {
    fields.get(key).map(|v| (*v).to_string())
}

fn parse_opt<T: std::str::FromStr>(
    fields: &BTreeMap<&str, &str>,
    key: &str,
) -> std::result::Result<Option<T>, String> {
    fields
        .get(key)
        .map(|value| {
            value
                .parse::<T>()
                .map_err(|_| format!("invalid {key} '{value}'"))
        })
        .transpose()
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "id,brand_name,composition1_name,composition1_strength,composition1_unit,composition2_name,weightage,active\n";

    fn parse(body: &str) -> Result<Vec<MedicineRecord>> {
        parse_catalog(format!("{HEADER}{body}").as_bytes(), Path::new("test.csv"))
    }

    #[test]
    fn parses_compositions_in_slot_order() {
        let records = parse("42,Dolo Cold,Paracetamol,500,mg,Caffeine,12.5,1\n").expect("parse");
        let record = &records[0];
        assert_eq!(record.id.get(), 42);
        assert_eq!(record.compositions.len(), 2);
        assert_eq!(record.compositions[0].dose().as_deref(), Some("500mg"));
        assert_eq!(record.compositions[1].name, "Caffeine");
        assert_eq!(record.weightage, Some(12.5));
        assert!(record.active);
    }

    #[test]
    fn empty_cells_are_absent() {
        let records = parse("7,Crocin,,,,,,\n").expect("parse");
        assert!(records[0].compositions.is_empty());
        assert_eq!(records[0].weightage, None);
        assert!(records[0].active);
    }

    #[test]
    fn inactive_flag_is_read() {
        let records = parse("8,Old Brand,,,,,,no\n").expect("parse");
        assert!(!records[0].active);
    }

    #[test]
    fn invalid_rows_report_line() {
        let err = parse("7,Crocin,,,,,,\n0,Broken,,,,,,\n").expect_err("invalid id");
        match err {
            CatalogError::InvalidRow { line, message, .. } => {
                assert_eq!(line, 3);
                assert!(message.contains("invalid id"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_required_column_is_rejected() {
        let err = parse_catalog(b"id,name\n1,Dolo\n", Path::new("bad.csv")).expect_err("header");
        assert!(err.to_string().contains("brand_name"));
    }
}
