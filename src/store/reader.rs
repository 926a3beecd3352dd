//! Random access to a finished store.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use crate::dimensions::{DimensionIndex, Dimensions};
use crate::error::{Dimension, Result, SqliteContext, StoreError};
use crate::matrix::Matrix;
use crate::serializer::deserialize;
use crate::store::schema::TABLES;
use crate::types::{EntityKey, Shape, Value, ValueKind};

/// Read-only view of one store file.
///
/// Each instance owns its own connection. Decoded matrices are cached per
/// entity key (and per statistic name) for the lifetime of the instance.
pub struct MatrixStore {
    conn: Connection,
    path: PathBuf,
    dimensions: Dimensions,
    entities: RefCell<HashMap<EntityKey, Rc<Matrix>>>,
    statistics: RefCell<HashMap<String, Rc<Matrix>>>,
}

impl MatrixStore {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(StoreError::io(
                path,
                "open store",
                std::io::Error::new(std::io::ErrorKind::NotFound, "no store file at this path"),
            ));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .sql_context("opening store")?;

        let practices = load_dimension(&conn, "SELECT offset, code FROM practice ORDER BY offset")?;
        let dates = load_dimension(&conn, "SELECT offset, date FROM date ORDER BY offset")?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
            dimensions: Dimensions::new(practices, dates),
            entities: RefCell::new(HashMap::new()),
            statistics: RefCell::new(HashMap::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dimensions(&self) -> &Dimensions {
        &self.dimensions
    }

    pub fn shape(&self) -> Shape {
        self.dimensions.shape()
    }

    /// Practice codes in offset order.
    pub fn practices(&self) -> &[String] {
        self.dimensions.practices.values()
    }

    /// Dates in offset order.
    pub fn dates(&self) -> &[String] {
        self.dimensions.dates.values()
    }

    fn offsets(&self, practice: &str, date: &str) -> Result<(usize, usize)> {
        let row = self
            .dimensions
            .practices
            .offset(practice)
            .ok_or_else(|| StoreError::unknown_dimension(Dimension::Practice, practice))?;
        let col = self
            .dimensions
            .dates
            .offset(date)
            .ok_or_else(|| StoreError::unknown_dimension(Dimension::Date, date))?;
        Ok((row, col))
    }

    /// Value of one cell.
    ///
    /// Unknown practices or dates are caller errors, not zeros.
    pub fn fetch(&self, key: &EntityKey, practice: &str, date: &str) -> Result<Value> {
        let (row, col) = self.offsets(practice, date)?;
        Ok(self.matrix(key)?.get(row, col))
    }

    /// Number of nonzero cells stored for an entity.
    pub fn count_nonzero(&self, key: &EntityKey) -> Result<usize> {
        Ok(self.matrix(key)?.count_nonzero())
    }

    /// The full matrix for an entity. An entity retained without data reads
    /// as all zeros.
    pub fn matrix(&self, key: &EntityKey) -> Result<Rc<Matrix>> {
        if let Some(m) = self.entities.borrow().get(key) {
            return Ok(Rc::clone(m));
        }
        let blob: Option<Option<Vec<u8>>> = self
            .conn
            .query_row(
                "SELECT value FROM entity WHERE test_code = ?1 AND result_category = ?2",
                params![key.test_code, key.result_category],
                |row| row.get(0),
            )
            .optional()
            .sql_context("loading entity")?;
        let matrix = match blob {
            None => return Err(StoreError::UnknownEntity(key.clone())),
            Some(None) => Matrix::zeros(self.shape(), ValueKind::Integer),
            Some(Some(bytes)) => self.decode(&bytes)?,
        };
        let matrix = Rc::new(matrix);
        self.entities
            .borrow_mut()
            .insert(key.clone(), Rc::clone(&matrix));
        Ok(matrix)
    }

    /// Value of a named practice statistic.
    pub fn statistic(&self, name: &str, practice: &str, date: &str) -> Result<Value> {
        let (row, col) = self.offsets(practice, date)?;
        Ok(self.statistic_matrix(name)?.get(row, col))
    }

    pub fn statistic_matrix(&self, name: &str) -> Result<Rc<Matrix>> {
        if let Some(m) = self.statistics.borrow().get(name) {
            return Ok(Rc::clone(m));
        }
        let blob: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT value FROM statistic WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .sql_context("loading statistic")?;
        let bytes = blob.ok_or_else(|| StoreError::UnknownStatistic(name.to_string()))?;
        let matrix = Rc::new(self.decode(&bytes)?);
        self.statistics
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&matrix));
        Ok(matrix)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Matrix> {
        let matrix = deserialize(bytes)?;
        if matrix.shape() != self.shape() {
            return Err(StoreError::corrupt(format!(
                "matrix shape {} does not match store shape {}",
                matrix.shape(),
                self.shape()
            )));
        }
        Ok(matrix)
    }

    /// All entity keys, sorted.
    pub fn entity_keys(&self) -> Result<Vec<EntityKey>> {
        let mut stmt = self
            .conn
            .prepare("SELECT test_code, result_category FROM entity ORDER BY test_code, result_category")
            .sql_context("listing entities")?;
        let keys = stmt
            .query_map([], |row| Ok(EntityKey::new(row.get::<_, String>(0)?, row.get(1)?)))
            .sql_context("listing entities")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .sql_context("reading entity keys")?;
        Ok(keys)
    }

    /// Number of entity rows holding no matrix.
    pub fn empty_entity_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entity WHERE value IS NULL", [], |row| row.get(0))
            .sql_context("counting empty entities")?;
        Ok(n as usize)
    }

    /// Statistic names, sorted.
    pub fn statistic_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM statistic ORDER BY name")
            .sql_context("listing statistics")?;
        let names = stmt
            .query_map([], |row| row.get(0))
            .sql_context("listing statistics")?
            .collect::<std::result::Result<Vec<String>, _>>()
            .sql_context("reading statistic names")?;
        Ok(names)
    }

    /// Text dump of every table in primary key order, blobs as hex.
    ///
    /// Two stores with equal dumps hold identical logical content.
    pub fn dump(&self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        for table in TABLES {
            let order = match table {
                "entity" => "test_code, result_category",
                "statistic" => "name",
                _ => "offset",
            };
            let mut stmt = self
                .conn
                .prepare(&format!("SELECT * FROM {} ORDER BY {}", table, order))
                .sql_context("dumping table")?;
            let columns = stmt.column_count();
            let mut rows = stmt.query([]).sql_context("dumping table")?;
            while let Some(row) = rows.next().sql_context("dumping table")? {
                let mut line = String::from(table);
                for i in 0..columns {
                    line.push('|');
                    let value = row.get_ref(i).sql_context("dumping table")?;
                    render_value(&mut line, value);
                }
                lines.push(line);
            }
        }
        Ok(lines)
    }
}

fn render_value(out: &mut String, value: rusqlite::types::ValueRef<'_>) {
    use rusqlite::types::ValueRef;
    match value {
        ValueRef::Null => out.push_str("NULL"),
        ValueRef::Integer(i) => {
            let _ = write!(out, "{}", i);
        }
        ValueRef::Real(f) => {
            let _ = write!(out, "{}", f);
        }
        ValueRef::Text(t) => out.push_str(&String::from_utf8_lossy(t)),
        ValueRef::Blob(b) => {
            for byte in b {
                let _ = write!(out, "{:02x}", byte);
            }
        }
    }
}

/// Load a dimension table, checking its offsets are dense and sorted.
fn load_dimension(conn: &Connection, sql: &str) -> Result<DimensionIndex> {
    let mut stmt = conn.prepare(sql).sql_context("loading dimension")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))
        .sql_context("loading dimension")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .sql_context("reading dimension")?;

    let index = DimensionIndex::from_values(rows.iter().map(|(_, v)| v.clone()));
    for (offset, value) in &rows {
        if index.offset(value) != Some(*offset as usize) || index.len() != rows.len() {
            return Err(StoreError::corrupt(format!(
                "dimension value '{}' has unexpected offset {}",
                value, offset
            )));
        }
    }
    Ok(index)
}
