//! SQLite-backed catalog.
//!
//! The connection sits behind a mutex; lookups with a deadline install a
//! progress handler that interrupts the statement once the deadline passes.
//! All values reach SQL through bound parameters.
//!
//! Brand names are matched on `brand_name_folded`, filled by the registered
//! `fold_case` function so case folding agrees with the in-memory store.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::functions::FunctionFlags;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rxlink_model::{
    Composition, CompositionHit, Deadline, MAX_COMPOSITIONS, MedicineId, MedicineRecord,
    RankedRecord, ReferenceMedicineStore, StoreError, StoreResult, StrengthQuery,
};

use crate::catalog::LoadedCatalog;
use crate::error::{CatalogError, Result, store_error};
use crate::trigram::{TRIGRAM_THRESHOLD, score_composition, sort_composition_hits, trigram_similarity};

/// SQLite VM steps between deadline checks.
const PROGRESS_STEPS: i32 = 1_000;

macro_rules! medicine_columns {
    () => {
        "id, brand_name, generic_id, \
         composition1_id, composition1_name, composition1_strength, composition1_unit, \
         composition2_id, composition2_name, composition2_strength, composition2_unit, \
         composition3_id, composition3_name, composition3_strength, composition3_unit, \
         composition4_id, composition4_name, composition4_strength, composition4_unit, \
         composition5_id, composition5_name, composition5_strength, composition5_unit, \
         price, manufacturer, pack_size, medicine_type, weightage, is_active"
    };
}

const COL_FIRST_COMPOSITION: usize = 3;
const COL_PRICE: usize = COL_FIRST_COMPOSITION + 4 * MAX_COMPOSITIONS;

const SELECT_EXACT: &str = concat!(
    "SELECT ",
    medicine_columns!(),
    " FROM medicines WHERE is_active = 1 AND brand_name_folded = ?1 \
     ORDER BY weightage IS NULL, weightage DESC, id LIMIT 1"
);

const SELECT_SUBSTRING: &str = concat!(
    "SELECT ",
    medicine_columns!(),
    ", CASE WHEN brand_name_folded = ?1 THEN 100 \
       WHEN instr(brand_name_folded, ?1) = 1 THEN 90 \
       ELSE 80 END AS rank_score \
     FROM medicines WHERE is_active = 1 AND instr(brand_name_folded, ?1) > 0 \
     ORDER BY rank_score DESC, weightage IS NULL, weightage DESC, length(brand_name), id \
     LIMIT ?2"
);

const SELECT_COMPOSITION: &str = concat!(
    "SELECT ",
    medicine_columns!(),
    " FROM medicines WHERE is_active = 1 AND ( \
       trigram_similarity(composition1_name, ?1) >= ?2 \
       OR trigram_similarity(composition2_name, ?1) >= ?2 \
       OR trigram_similarity(composition3_name, ?1) >= ?2 \
       OR trigram_similarity(composition4_name, ?1) >= ?2 \
       OR trigram_similarity(composition5_name, ?1) >= ?2)"
);

const SELECT_BY_ID: &str = concat!(
    "SELECT ",
    medicine_columns!(),
    " FROM medicines WHERE id = ?1 AND is_active = 1"
);

const INSERT_MEDICINE: &str = concat!(
    "INSERT INTO medicines (",
    medicine_columns!(),
    ", brand_name_folded) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, \
     ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, \
     fold_case(?2))"
);

const UPSERT_META: &str = "INSERT INTO catalog_meta (id, source_path, source_sha256, record_count) \
     VALUES (1, ?1, ?2, ?3) \
     ON CONFLICT(id) DO UPDATE SET \
       source_path = excluded.source_path, \
       source_sha256 = excluded.source_sha256, \
       record_count = excluded.record_count, \
       imported_at = datetime('now')";

const MIGRATIONS: [(i64, &str); 3] = [
    (1, include_str!("../migrations/001_medicines.sql")),
    (2, include_str!("../migrations/002_catalog_meta.sql")),
    (3, include_str!("../migrations/003_brand_name_folded.sql")),
];

/// Provenance of the last import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogMeta {
    pub source_path: String,
    pub source_sha256: String,
    pub record_count: usize,
    pub imported_at: String,
}

/// Catalog stored in a SQLite database file.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a catalog database and bring its schema up to date.
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open a catalog that must already exist.
    pub fn open_existing(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(CatalogError::Missing {
                path: path.to_path_buf(),
            });
        }
        Self::open(path)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        register_functions(&conn)?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CatalogError::Connection {
            message: "connection mutex poisoned".to_string(),
        })
    }

    /// Replace the catalog contents in one transaction.
    pub fn import(&self, catalog: &LoadedCatalog) -> Result<usize> {
        let mut seen = HashSet::with_capacity(catalog.records.len());
        for record in &catalog.records {
            if !seen.insert(record.id) {
                return Err(CatalogError::DuplicateId { id: record.id.get() });
            }
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM medicines", [])?;
        {
            let mut insert = tx.prepare(INSERT_MEDICINE)?;
            for record in &catalog.records {
                let [s1, s2, s3, s4, s5] =
                    std::array::from_fn(|slot| slot_values(record.compositions.get(slot)));
                insert.execute(params![
                    record.id.get(),
                    record.brand_name,
                    record.generic_id,
                    s1.0, s1.1, s1.2, s1.3,
                    s2.0, s2.1, s2.2, s2.3,
                    s3.0, s3.1, s3.2, s3.3,
                    s4.0, s4.1, s4.2, s4.3,
                    s5.0, s5.1, s5.2, s5.3,
                    record.price,
                    record.manufacturer.as_deref(),
                    record.pack_size.as_deref(),
                    record.medicine_type.as_deref(),
                    record.weightage,
                    record.active,
                ])?;
            }
        }
        let count = catalog.records.len();
        tx.execute(
            UPSERT_META,
            params![
                catalog.path.display().to_string(),
                catalog.sha256,
                i64::try_from(count).unwrap_or(i64::MAX),
            ],
        )?;
        tx.commit()?;
        tracing::info!(records = count, sha256 = %catalog.sha256, "imported catalog");
        Ok(count)
    }

    /// Provenance of the last import, if any.
    pub fn metadata(&self) -> Result<Option<CatalogMeta>> {
        let conn = self.lock()?;
        let meta = conn
            .query_row(
                "SELECT source_path, source_sha256, record_count, imported_at \
                 FROM catalog_meta WHERE id = 1",
                [],
                |row| {
                    Ok(CatalogMeta {
                        source_path: row.get(0)?,
                        source_sha256: row.get(1)?,
                        record_count: usize::try_from(row.get::<_, i64>(2)?).unwrap_or(0),
                        imported_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(meta)
    }

    pub fn active_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM medicines WHERE is_active = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub fn schema_version(&self) -> Result<i64> {
        let conn = self.lock()?;
        Ok(current_version(&conn))
    }

    /// Run a lookup under the deadline, mapping failures onto [`StoreError`].
    fn query<T>(
        &self,
        deadline: Deadline,
        run: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> StoreResult<T> {
        deadline.check()?;
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::unavailable("connection mutex poisoned"))?;
        let bounded = deadline.instant().is_some();
        if bounded {
            conn.progress_handler(PROGRESS_STEPS, Some(move || deadline.is_expired()));
        }
        let result = run(&conn);
        if bounded {
            conn.progress_handler(0, None::<fn() -> bool>);
        }
        result.map_err(|error| {
            let mapped = store_error(&error);
            tracing::warn!(%error, "catalog query failed");
            mapped
        })
    }
}

impl ReferenceMedicineStore for SqliteStore {
    fn find_exact_by_name(
        &self,
        name: &str,
        deadline: Deadline,
    ) -> StoreResult<Option<MedicineRecord>> {
        self.query(deadline, |conn| {
            conn.prepare_cached(SELECT_EXACT)?
                .query_row(params![fold_case(name.trim())], record_from_row)
                .optional()
        })
    }

    fn find_by_substring(
        &self,
        fragment: &str,
        limit: usize,
        deadline: Deadline,
    ) -> StoreResult<Vec<RankedRecord>> {
        let fragment = fold_case(fragment.trim());
        if fragment.is_empty() {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query(deadline, |conn| {
            let mut stmt = conn.prepare_cached(SELECT_SUBSTRING)?;
            let rows = stmt.query_map(params![fragment, limit], |row| {
                Ok(RankedRecord {
                    record: record_from_row(row)?,
                    rank_score: row.get(COL_PRICE + 6)?,
                })
            })?;
            rows.collect()
        })
    }

    fn find_by_composition_fuzzy(
        &self,
        fragment: &str,
        strength: Option<&StrengthQuery>,
        limit: usize,
        deadline: Deadline,
    ) -> StoreResult<Vec<CompositionHit>> {
        let records: Vec<MedicineRecord> = self.query(deadline, |conn| {
            let mut stmt = conn.prepare_cached(SELECT_COMPOSITION)?;
            let rows = stmt.query_map(params![fragment, TRIGRAM_THRESHOLD], record_from_row)?;
            rows.collect()
        })?;
        let mut hits: Vec<CompositionHit> = records
            .iter()
            .filter_map(|r| score_composition(r, fragment, strength))
            .collect();
        sort_composition_hits(&mut hits);
        hits.truncate(limit);
        Ok(hits)
    }

    fn find_by_id(&self, id: MedicineId, deadline: Deadline) -> StoreResult<Option<MedicineRecord>> {
        self.query(deadline, |conn| {
            conn.prepare_cached(SELECT_BY_ID)?
                .query_row(params![id.get()], record_from_row)
                .optional()
        })
    }
}

type SlotValues<'a> = (Option<i64>, Option<&'a str>, Option<&'a str>, Option<&'a str>);

fn slot_values(composition: Option<&Composition>) -> SlotValues<'_> {
    match composition {
        Some(c) => (
            c.id,
            Some(c.name.as_str()),
            c.strength_value.as_deref(),
            c.strength_unit.as_deref(),
        ),
        None => (None, None, None, None),
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<MedicineRecord> {
    let raw_id: i64 = row.get(0)?;
    let id = MedicineId::new(raw_id)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(e)))?;
    let mut record = MedicineRecord::new(id, row.get::<_, String>(1)?);
    record.generic_id = row.get(2)?;
    for slot in 0..MAX_COMPOSITIONS {
        let base = COL_FIRST_COMPOSITION + slot * 4;
        let name: Option<String> = row.get(base + 1)?;
        let Some(name) = name.filter(|n| !n.trim().is_empty()) else {
            continue;
        };
        record.compositions.push(Composition {
            id: row.get(base)?,
            name,
            strength_value: row.get(base + 2)?,
            strength_unit: row.get(base + 3)?,
        });
    }
    record.price = row.get(COL_PRICE)?;
    record.manufacturer = row.get(COL_PRICE + 1)?;
    record.pack_size = row.get(COL_PRICE + 2)?;
    record.medicine_type = row.get(COL_PRICE + 3)?;
    record.weightage = row.get(COL_PRICE + 4)?;
    record.active = row.get(COL_PRICE + 5)?;
    Ok(record)
}

/// Unicode lowercase, as the in-memory store compares names.
fn fold_case(value: &str) -> String {
    value.to_lowercase()
}

fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|value| fold_case(&value))),
    )?;
    conn.create_scalar_function(
        "trigram_similarity",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let left: Option<String> = ctx.get(0)?;
            let right: Option<String> = ctx.get(1)?;
            Ok(match (left, right) {
                (Some(left), Some(right)) => trigram_similarity(&left, &right),
                _ => 0.0,
            })
        },
    )?;
    Ok(())
}

/// Apply pending schema migrations.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current = current_version(conn);
    for (version, sql) in MIGRATIONS {
        if version > current {
            tracing::info!("Running catalog migration v{version}");
            conn.execute_batch(sql)
                .map_err(|e| CatalogError::MigrationFailed {
                    version,
                    reason: e.to_string(),
                })?;
        }
    }
    Ok(())
}

/// Current schema version, 0 for a fresh database.
fn current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, i64>(0)
    })
    .unwrap_or(0)
}
