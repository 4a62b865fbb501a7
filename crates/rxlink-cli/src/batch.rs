//! Batch files for `rxlink link`: the medicine list in, the report out.
//!
//! Input is JSON, either a bare array of medicines or an object with a
//! `medicines` array:
//!
//! ```json
//! {"medicines": [{"name": "Dolo 650", "salt": "Paracetamol 650mg"}, {"name": "Pan 40", "existing_id": 17}]}
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use rxlink_model::{LinkedMedicine, LinkingReport, LinkingStatistics, MedicineInput};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
#[serde(untagged)]
enum BatchFile {
    Bare(Vec<MedicineInput>),
    Wrapped { medicines: Vec<MedicineInput> },
}

pub fn read_batch(path: &Path) -> Result<Vec<MedicineInput>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    parse_batch(BufReader::new(file)).with_context(|| format!("parse {}", path.display()))
}

pub fn parse_batch(reader: impl std::io::Read) -> Result<Vec<MedicineInput>> {
    let batch: BatchFile = serde_json::from_reader(reader)?;
    Ok(match batch {
        BatchFile::Bare(medicines) | BatchFile::Wrapped { medicines } => medicines,
    })
}

/// JSON report written by `rxlink link --output`.
#[derive(Debug, Serialize)]
pub struct ReportFile<'a> {
    /// RFC 3339 UTC timestamp.
    pub generated_at: String,
    pub source: String,
    pub catalog: String,
    pub linking_rate: f64,
    pub statistics: &'a LinkingStatistics,
    pub medicines: &'a [LinkedMedicine],
}

impl<'a> ReportFile<'a> {
    pub fn new(report: &'a LinkingReport, source: &Path, catalog: &Path) -> Self {
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            source: source.display().to_string(),
            catalog: catalog.display().to_string(),
            linking_rate: report.statistics.linking_rate(),
            statistics: &report.statistics,
            medicines: &report.medicines,
        }
    }
}

pub fn write_report(path: &Path, report: &ReportFile<'_>) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)
        .with_context(|| format!("write {}", path.display()))?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
