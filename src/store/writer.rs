//! Store file creation.
//!
//! A store is written to a hidden temp file next to the output and renamed
//! into place by [`StoreWriter::finish`]. The output path is never touched
//! before that point, so a failed build cannot leave a half-written store
//! where consumers look for one.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rusqlite::{params, Connection};

use crate::categories::ResultCategory;
use crate::dimensions::Dimensions;
use crate::error::{Result, SqliteContext, StoreError};
use crate::matrix::Matrix;
use crate::serializer::serialize;
use crate::store::schema::SCHEMA_SQL;
use crate::types::EntityKey;

/// Open bulk-write session on a temporary store file.
///
/// Dropping the writer without calling [`finish`](StoreWriter::finish)
/// commits what was written, restores durable syncing and leaves the temp
/// file in place for inspection.
pub struct StoreWriter {
    conn: Option<Connection>,
    temp_path: PathBuf,
    output: PathBuf,
}

impl StoreWriter {
    /// Create the temp store and its schema.
    ///
    /// Fails with [`StoreError::AlreadyExists`] if `output` exists.
    pub fn create(output: &Path) -> Result<Self> {
        if output.exists() {
            return Err(StoreError::AlreadyExists(output.to_path_buf()));
        }
        let basename = output
            .file_name()
            .ok_or_else(|| {
                StoreError::validation(format!("output path has no file name: {}", output.display()))
            })?
            .to_string_lossy()
            .into_owned();
        let dir = match output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, "create directory", e))?;

        let suffix = format!(".{}", basename);
        let (file, temp_path) = tempfile::Builder::new()
            .prefix(".tmp.")
            .suffix(&suffix)
            .tempfile_in(&dir)
            .map_err(|e| StoreError::io(&dir, "create temp file", e))?
            .keep()
            .map_err(|e| StoreError::io(&dir, "keep temp file", e.error))?;
        drop(file);
        debug!("Writing store to temp file {}", temp_path.display());

        let conn = Connection::open(&temp_path).sql_context("opening temp store")?;
        conn.execute_batch("PRAGMA synchronous=OFF;")
            .sql_context("disabling synchronous writes")?;
        conn.execute_batch("BEGIN;").sql_context("starting bulk transaction")?;
        conn.execute_batch(SCHEMA_SQL).sql_context("creating schema")?;

        Ok(Self {
            conn: Some(conn),
            temp_path,
            output: output.to_path_buf(),
        })
    }

    /// Path of the temp file being written.
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| StoreError::validation("store writer is closed"))
    }

    /// Write practice and date offsets.
    pub fn write_dimensions(&self, dimensions: &Dimensions) -> Result<()> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("INSERT INTO practice (offset, code) VALUES (?1, ?2)")
            .sql_context("preparing practice insert")?;
        for (offset, code) in dimensions.practices.values().iter().enumerate() {
            stmt.execute(params![offset as i64, code])
                .sql_context("inserting practice")?;
        }
        let mut stmt = conn
            .prepare("INSERT INTO date (offset, date) VALUES (?1, ?2)")
            .sql_context("preparing date insert")?;
        for (offset, date) in dimensions.dates.values().iter().enumerate() {
            stmt.execute(params![offset as i64, date])
                .sql_context("inserting date")?;
        }
        info!(
            "Wrote {} practices and {} dates",
            dimensions.practices.len(),
            dimensions.dates.len()
        );
        Ok(())
    }

    /// Insert an empty row for every result category of each test code,
    /// leaving existing rows alone. Returns the number of rows created.
    pub fn precreate_entities<I, S>(&self, test_codes: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut stmt = self
            .conn()?
            .prepare(
                "INSERT OR IGNORE INTO entity (test_code, result_category, value) \
                 VALUES (?1, ?2, NULL)",
            )
            .sql_context("preparing entity pre-create")?;
        let mut created = 0;
        for code in test_codes {
            for category in ResultCategory::ALL {
                created += stmt
                    .execute(params![code.as_ref(), category.code()])
                    .sql_context("pre-creating entity")?;
            }
        }
        Ok(created)
    }

    /// Store a matrix for an entity, replacing any previous value.
    pub fn write_entity(&self, key: &EntityKey, matrix: &Matrix) -> Result<()> {
        self.write_entity_blob(key, &serialize(matrix)?)
    }

    /// Store an already serialized matrix for an entity.
    pub fn write_entity_blob(&self, key: &EntityKey, blob: &[u8]) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO entity (test_code, result_category, value) \
                 VALUES (?1, ?2, ?3)",
                params![key.test_code, key.result_category, blob],
            )
            .sql_context("writing entity")?;
        Ok(())
    }

    /// Store a named practice statistic.
    pub fn write_statistic(&self, name: &str, matrix: &Matrix) -> Result<()> {
        let blob = serialize(matrix)?;
        self.conn()?
            .execute(
                "INSERT OR REPLACE INTO statistic (name, value) VALUES (?1, ?2)",
                params![name, blob],
            )
            .sql_context("writing statistic")?;
        Ok(())
    }

    /// Delete entities that never received a matrix. Returns rows deleted.
    pub fn prune_empty_entities(&self) -> Result<usize> {
        self.conn()?
            .execute("DELETE FROM entity WHERE value IS NULL", [])
            .sql_context("pruning empty entities")
    }

    /// Commit, compact and move the store into place.
    ///
    /// Returns the final output path.
    pub fn finish(mut self) -> Result<PathBuf> {
        let conn = self
            .conn
            .take()
            .ok_or_else(|| StoreError::validation("store writer is closed"))?;
        self.complete(conn).map_err(|e| {
            warn!(
                "Finishing the store failed; partial store left at {}",
                self.temp_path.display()
            );
            e
        })?;
        info!("Store written to {}", self.output.display());
        Ok(self.output.clone())
    }

    fn complete(&self, conn: Connection) -> Result<()> {
        conn.execute_batch("COMMIT;").sql_context("committing store")?;
        conn.execute_batch("PRAGMA synchronous=FULL;")
            .sql_context("restoring synchronous writes")?;
        // VACUUM rewrites every page, so equal content gives an equal file
        conn.execute_batch("VACUUM;").sql_context("vacuuming store")?;
        conn.close()
            .map_err(|(_, e)| StoreError::sqlite("closing store", e))?;

        if self.output.exists() {
            return Err(StoreError::AlreadyExists(self.output.clone()));
        }
        fs::rename(&self.temp_path, &self.output)
            .map_err(|e| StoreError::io(&self.output, "rename", e))
    }
}

impl Drop for StoreWriter {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        if let Err(e) = conn.execute_batch("COMMIT; PRAGMA synchronous=FULL;") {
            warn!("Failed to commit partial store: {}", e);
        }
        if let Err((_, e)) = conn.close() {
            warn!("Failed to close partial store: {}", e);
        }
        warn!(
            "Build did not complete; partial store left at {}",
            self.temp_path.display()
        );
    }
}
