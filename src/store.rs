//! Persistent footprint index backed by SQLite with an R*Tree.
//!
//! Two tables, joined 1:1 by rowid and always written together:
//!
//! - `exposure(rowid, serialized_data_id BLOB UNIQUE, encoded_polygon BLOB)` — the
//!   authoritative geometry, keyed by the serialized DataId;
//! - `exposure_bbox_index(id, x_min, x_max, y_min, y_max, z_min, z_max)` —
//!   an R*Tree over each polygon's 3-D bounding box, recomputed from the
//!   polygon on every write.
//!
//! [`IndexDb::open`] is the single way to obtain a handle; it always yields
//! a connected, schema-initialized database (or a fatal error), and the
//! connection is released when the handle drops on any exit path.

use std::fmt;
use std::path::PathBuf;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde::Serialize;
use tracing::debug;

use crate::error::{FootprintError, FootprintResult};
use crate::polygon::SkyPolygon;

/// Where the index database lives.
#[derive(Debug, Clone)]
pub enum DbLocation {
    /// Single-file database on disk.
    Path(PathBuf),
    /// Private in-memory database (tests, scratch runs).
    InMemory,
}

/// Connection configuration for the footprint index.
///
/// `init_statements` are caller-supplied raw statements (pragmas, tuning
/// DDL) executed verbatim once per schema creation; a malformed statement
/// is a fatal configuration error surfaced before any exposure is stored.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub location: DbLocation,
    pub init_statements: Vec<String>,
}

impl DbConfig {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: DbLocation::Path(path.into()),
            init_statements: Vec::new(),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            location: DbLocation::InMemory,
            init_statements: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_init_statements(mut self, statements: Vec<String>) -> Self {
        self.init_statements = statements;
        self
    }
}

/// The persisted unit: an opaque caller identifier plus its footprint.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureInfo<I> {
    pub data_id: I,
    pub polygon: SkyPolygon,
}

impl<I> ExposureInfo<I> {
    pub fn new(data_id: I, polygon: SkyPolygon) -> Self {
        Self { data_id, polygon }
    }
}

/// One exposure that could not be stored.
///
/// Carries the serialized DataId bytes so the failure stays identifiable
/// even when the caller's id type is not `Clone`.
#[derive(Debug)]
pub struct StoreFailure {
    pub data_id_bytes: Vec<u8>,
    pub error: FootprintError,
}

/// Aggregate outcome of one `store` call.
///
/// Per-item integrity violations land in `failures` and never abort the
/// rest of the batch; rows committed for earlier items stay committed.
#[derive(Debug, Default)]
pub struct StoreReport {
    pub stored: usize,
    pub failures: Vec<StoreFailure>,
}

impl fmt::Display for StoreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} stored, {} failed",
            self.stored,
            self.failures.len()
        )
    }
}

/// Handle to an open footprint index database.
///
/// All store and query operations take this handle explicitly; there is no
/// global connection state. The underlying SQLite file supports a single
/// concurrent writer, so concurrent `store` calls serialize at this
/// boundary.
pub struct IndexDb {
    pub(crate) conn: Connection,
}

impl IndexDb {
    /// Opens (creating if necessary) the index described by `config`.
    ///
    /// Creates the schema idempotently and runs the configured init
    /// statements. Fatal on storage unavailability or a malformed init
    /// statement; no run should proceed past a failed open.
    pub fn open(config: &DbConfig) -> FootprintResult<Self> {
        let conn = match &config.location {
            DbLocation::Path(path) => Connection::open(path)?,
            DbLocation::InMemory => Connection::open_in_memory()?,
        };
        let db = Self { conn };
        db.create_schema(&config.init_statements)?;
        Ok(db)
    }

    /// Idempotent schema creation plus caller init statements.
    fn create_schema(&self, init_statements: &[String]) -> FootprintResult<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS exposure (
                 rowid   INTEGER PRIMARY KEY,
                 serialized_data_id BLOB NOT NULL UNIQUE,
                 encoded_polygon BLOB NOT NULL
             );
             CREATE VIRTUAL TABLE IF NOT EXISTS exposure_bbox_index USING rtree(
                 id, x_min, x_max, y_min, y_max, z_min, z_max
             );",
        )?;
        for statement in init_statements {
            self.conn
                .execute_batch(statement)
                .map_err(|e| FootprintError::init_statement(statement, e.to_string()))?;
        }
        Ok(())
    }

    /// Stores a batch of exposures.
    ///
    /// Each exposure's two rows (polygon and bbox) are written inside one
    /// transaction, so an item either lands completely or not at all.
    /// With `allow_replace` disabled, a DataId already present surfaces as
    /// a per-item [`StoreFailure`] with
    /// [`FootprintError::DuplicateDataId`]; with it enabled, the existing
    /// rowid is kept and both rows are updated in place. Items are
    /// processed in order, so a DataId appearing twice in one batch ends
    /// up with the later polygon under `allow_replace` (not a guaranteed
    /// ordering contract).
    ///
    /// # Errors
    /// Only storage-level failures (not integrity violations) abort the
    /// call.
    pub fn store<I: Serialize>(
        &mut self,
        exposures: &[ExposureInfo<I>],
        allow_replace: bool,
    ) -> FootprintResult<StoreReport> {
        let mut report = StoreReport::default();
        for exposure in exposures {
            let id_bytes = bincode::serialize(&exposure.data_id)
                .map_err(|e| FootprintError::id_codec(e.to_string()))?;
            match self.store_one(&id_bytes, &exposure.polygon, allow_replace) {
                Ok(()) => report.stored += 1,
                Err(err @ FootprintError::DuplicateDataId) => {
                    report.failures.push(StoreFailure {
                        data_id_bytes: id_bytes,
                        error: err,
                    });
                }
                Err(err) => return Err(err),
            }
        }
        debug!(stored = report.stored, failed = report.failures.len(), "store batch done");
        Ok(report)
    }

    fn store_one(
        &mut self,
        id_bytes: &[u8],
        polygon: &SkyPolygon,
        allow_replace: bool,
    ) -> FootprintResult<()> {
        let bbox = polygon.bounding_box();
        let blob = polygon.encode();
        let tx = self.conn.transaction()?;

        let existing: Option<i64> = if allow_replace {
            tx.query_row(
                "SELECT rowid FROM exposure WHERE serialized_data_id = ?1",
                params![id_bytes],
                |row| row.get(0),
            )
            .optional()?
        } else {
            None
        };

        match existing {
            Some(rowid) => {
                // Replace in place: same rowid keeps the 1:1 join intact.
                tx.execute(
                    "UPDATE exposure SET encoded_polygon = ?1 WHERE rowid = ?2",
                    params![blob, rowid],
                )?;
                tx.execute(
                    "UPDATE exposure_bbox_index
                     SET x_min = ?1, x_max = ?2, y_min = ?3, y_max = ?4, z_min = ?5, z_max = ?6
                     WHERE id = ?7",
                    params![
                        bbox.x_min, bbox.x_max, bbox.y_min, bbox.y_max, bbox.z_min, bbox.z_max,
                        rowid
                    ],
                )?;
            }
            None => {
                let inserted = tx.execute(
                    "INSERT INTO exposure (serialized_data_id, encoded_polygon) VALUES (?1, ?2)",
                    params![id_bytes, blob],
                );
                match inserted {
                    Ok(_) => {}
                    Err(err) if is_unique_violation(&err) => {
                        return Err(FootprintError::DuplicateDataId);
                    }
                    Err(err) => return Err(err.into()),
                }
                let rowid = tx.last_insert_rowid();
                tx.execute(
                    "INSERT INTO exposure_bbox_index (id, x_min, x_max, y_min, y_max, z_min, z_max)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        rowid, bbox.x_min, bbox.x_max, bbox.y_min, bbox.y_max, bbox.z_min,
                        bbox.z_max
                    ],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Number of stored exposures.
    pub fn count(&self) -> FootprintResult<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM exposure", [], |row| row.get(0))?;
        Ok(n as u64)
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
    )
}
