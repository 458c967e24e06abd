//! SQLite history of file observations.
//!
//! Persists one row per scanned root (`dir`), one row per file ever seen
//! under it (`file`) and one row per observation of that file (`sample`).
//!
//! Supports:
//! - Lookup-or-insert of roots and files
//! - Appending samples inside caller-controlled batches
//! - A per-scan seen-set and eviction of files missing from it
//! - Latest-sample and growth-rate rankings (see `query`)

pub mod query;
mod schema;

use std::path::{Path, PathBuf, MAIN_SEPARATOR_STR};

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Transaction};
use serde::Serialize;

use crate::error::{Error, Result};

pub type DirId = i64;
pub type FileId = i64;

/// Which files a query or eviction applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Directory(DirId),
}

impl Scope {
    /// Bound as `?1` in scoped queries; NULL matches every directory.
    fn dir_param(self) -> Option<DirId> {
        match self {
            Scope::All => None,
            Scope::Directory(id) => Some(id),
        }
    }
}

/// One observation of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sample {
    /// Unix seconds at which the walker found the file.
    pub capture_time: i64,
    pub mode: u32,
    pub size: u64,
    /// Unix seconds.
    pub mtime: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub id: FileId,
    pub dir_id: DirId,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    pub id: DirId,
    pub path: PathBuf,
}

/// Database handle. Open once per process and pass it to whoever needs it.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| Error::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path).map_err(|source| Error::StoreOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Private store that vanishes with the handle.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::StoreOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        schema::apply_pragmas(&conn).map_err(Error::sql("apply pragmas"))?;
        schema::init_schema(&conn).map_err(Error::sql("init schema"))?;
        Ok(Store { conn })
    }

    /// Id of the scanned root at `canonical`, registering it on first use.
    pub fn resolve_directory(&self, canonical: &Path) -> Result<DirId> {
        if let Some(id) = self.find_directory(canonical)? {
            return Ok(id);
        }

        self.conn
            .prepare_cached("INSERT INTO dir (dir_path) VALUES (?1)")?
            .execute(params![path_key(canonical)])
            .map_err(Error::sql("insert dir"))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn find_directory(&self, canonical: &Path) -> Result<Option<DirId>> {
        let id = self
            .conn
            .prepare_cached("SELECT dir_id FROM dir WHERE dir_path = ?1")?
            .query_row(params![path_key(canonical)], |row| row.get(0))
            .optional()
            .map_err(Error::sql("select dir"))?;
        Ok(id)
    }

    /// All scanned roots, in registration order.
    pub fn directories(&self) -> Result<Vec<Directory>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT dir_id, dir_path FROM dir ORDER BY dir_id")?;
        let dirs = stmt
            .query_map([], |row| {
                Ok(Directory {
                    id: row.get(0)?,
                    path: path_from_key(row.get(1)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::sql("list dirs"))?;
        Ok(dirs)
    }

    /// Empty the seen-set. Called once when a scan starts.
    pub fn begin_scan(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM seen", [])
            .map_err(Error::sql("reset seen"))?;
        Ok(())
    }

    /// Open the transaction that the next batch of records is written in.
    pub fn begin_batch(&self) -> Result<Batch<'_>> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(Error::sql("begin batch"))?;
        Ok(Batch { tx, records: 0 })
    }

    /// Delete every file of `dir_id` that is not in the seen-set, together
    /// with its samples. Files at or below a `protected` path count as seen.
    ///
    /// Must only run once the seen-set for this scan is complete.
    pub fn evict_unseen(&mut self, dir_id: DirId, protected: &[PathBuf]) -> Result<usize> {
        let tx = self.conn.transaction().map_err(Error::sql("begin eviction"))?;

        {
            let mut keep = tx.prepare_cached(
                "INSERT OR IGNORE INTO seen (file_id)
                 SELECT file_id FROM file
                 WHERE dir_id = ?1
                   AND (path = ?2 OR substr(path, 1, length(?3)) = ?3)",
            )?;
            for protected_path in protected {
                let exact = path_key(protected_path);
                let mut below = exact.clone();
                below.extend_from_slice(MAIN_SEPARATOR_STR.as_bytes());
                keep.execute(params![dir_id, exact, below])
                    .map_err(Error::sql("protect subtree"))?;
            }
        }

        let evicted = tx
            .execute(
                "DELETE FROM file WHERE dir_id = ?1 AND file_id NOT IN (SELECT file_id FROM seen)",
                params![dir_id],
            )
            .map_err(Error::sql("evict unseen"))?;

        tx.commit().map_err(Error::sql("commit eviction"))?;
        Ok(evicted)
    }

    pub fn file_count(&self, scope: Scope) -> Result<u64> {
        let count: i64 = self
            .conn
            .prepare_cached("SELECT COUNT(*) FROM file WHERE (?1 IS NULL OR dir_id = ?1)")?
            .query_row(params![scope.dir_param()], |row| row.get(0))
            .map_err(Error::sql("count files"))?;
        Ok(count.max(0) as u64)
    }

    pub fn sample_count(&self, scope: Scope) -> Result<u64> {
        let count: i64 = self
            .conn
            .prepare_cached(
                "SELECT COUNT(*) FROM sample JOIN file ON file.file_id = sample.file_id
                 WHERE (?1 IS NULL OR file.dir_id = ?1)",
            )?
            .query_row(params![scope.dir_param()], |row| row.get(0))
            .map_err(Error::sql("count samples"))?;
        Ok(count.max(0) as u64)
    }

    /// Full history of one file, oldest first. Empty if the file is unknown.
    pub fn samples_for(&self, dir_id: DirId, path: &Path) -> Result<Vec<Sample>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT sample.sample_time, sample.mode, sample.size, sample.mtime
             FROM sample JOIN file ON file.file_id = sample.file_id
             WHERE file.dir_id = ?1 AND file.path = ?2
             ORDER BY sample.sample_time",
        )?;
        let samples = stmt
            .query_map(params![dir_id, path_key(path)], |row| {
                sample_from_row(row, 0)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::sql("load samples"))?;
        Ok(samples)
    }
}

/// One open write transaction. Dropping it without `commit` rolls it back.
pub struct Batch<'a> {
    tx: Transaction<'a>,
    records: usize,
}

impl Batch<'_> {
    /// Id of `path` under `dir_id`, inserting the file row if it is new.
    pub fn resolve_or_create_file(&self, dir_id: DirId, path: &Path) -> Result<FileId> {
        let path = path_key(path);
        let existing = self
            .tx
            .prepare_cached("SELECT file_id FROM file WHERE dir_id = ?1 AND path = ?2")?
            .query_row(params![dir_id, path], |row| row.get(0))
            .optional()
            .map_err(Error::sql("select file"))?;
        if let Some(id) = existing {
            return Ok(id);
        }

        self.tx
            .prepare_cached("INSERT INTO file (dir_id, path) VALUES (?1, ?2)")?
            .execute(params![dir_id, path])
            .map_err(Error::sql("insert file"))?;
        Ok(self.tx.last_insert_rowid())
    }

    /// Append one sample. A second sample for the same file and capture
    /// time is rejected with `Error::DuplicateSample`.
    pub fn record_sample(&mut self, file_id: FileId, sample: &Sample) -> Result<()> {
        let result = self
            .tx
            .prepare_cached(
                "INSERT INTO sample (file_id, sample_time, mode, size, mtime)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?
            .execute(params![
                file_id,
                sample.capture_time,
                i64::from(sample.mode),
                i64::try_from(sample.size).unwrap_or(i64::MAX),
                sample.mtime,
            ]);

        match result {
            Ok(_) => {
                self.records += 1;
                Ok(())
            }
            Err(err) if is_key_violation(&err) => Err(Error::DuplicateSample {
                file_id,
                capture_time: sample.capture_time,
            }),
            Err(source) => Err(Error::Sql {
                context: "insert sample",
                source,
            }),
        }
    }

    /// Add `file_id` to the seen-set. Repeating it is harmless.
    pub fn mark_seen(&self, file_id: FileId) -> Result<()> {
        self.tx
            .prepare_cached("INSERT OR IGNORE INTO seen (file_id) VALUES (?1)")?
            .execute(params![file_id])
            .map_err(Error::sql("mark seen"))?;
        Ok(())
    }

    /// Samples recorded in this batch so far.
    pub fn len(&self) -> usize {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit().map_err(Error::sql("commit batch"))
    }

    pub fn rollback(self) -> Result<()> {
        self.tx.rollback().map_err(Error::sql("rollback batch"))
    }
}

fn is_key_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && matches!(
                    e.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                        | rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                )
        }
        _ => false,
    }
}

/// Stored form of a path: its raw OS bytes.
pub(crate) fn path_key(path: &Path) -> Vec<u8> {
    path.as_os_str().as_encoded_bytes().to_vec()
}

#[cfg(unix)]
pub(crate) fn path_from_key(key: Vec<u8>) -> PathBuf {
    use std::os::unix::ffi::OsStringExt;
    PathBuf::from(std::ffi::OsString::from_vec(key))
}

#[cfg(not(unix))]
pub(crate) fn path_from_key(key: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&key).into_owned())
}

/// Reads (sample_time, mode, size, mtime) starting at column `at`.
pub(crate) fn sample_from_row(row: &rusqlite::Row, at: usize) -> rusqlite::Result<Sample> {
    Ok(Sample {
        capture_time: row.get(at)?,
        mode: u32::try_from(row.get::<_, i64>(at + 1)?).unwrap_or(0),
        size: row.get::<_, i64>(at + 2)?.max(0) as u64,
        mtime: row.get(at + 3)?,
    })
}
