use rusqlite::Connection;

/// Tables, indexes and views of the persistent store.
///
/// `sample` is keyed on (file_id, sample_time) so every scan appends one row
/// per file. Deleting a `file` row cascades to its samples. Paths are raw
/// OS bytes so names that are not UTF-8 stay distinct.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS dir (
    dir_id INTEGER PRIMARY KEY,
    dir_path BLOB NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS file (
    file_id INTEGER PRIMARY KEY,
    dir_id INTEGER NOT NULL,
    path BLOB NOT NULL,
    FOREIGN KEY (dir_id) REFERENCES dir(dir_id) ON UPDATE RESTRICT ON DELETE CASCADE
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_file_dir_path ON file(dir_id, path);

CREATE TABLE IF NOT EXISTS sample (
    file_id INTEGER NOT NULL,
    sample_time INTEGER NOT NULL,
    mode INTEGER NOT NULL,
    size INTEGER NOT NULL,
    mtime INTEGER NOT NULL,
    PRIMARY KEY (file_id, sample_time),
    FOREIGN KEY (file_id) REFERENCES file(file_id) ON UPDATE RESTRICT ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_sample_size ON sample(size);
CREATE INDEX IF NOT EXISTS idx_sample_mtime ON sample(mtime);

CREATE VIEW IF NOT EXISTS sample_span AS
    SELECT file_id, MIN(sample_time) AS min_time, MAX(sample_time) AS max_time
    FROM sample
    GROUP BY file_id;

CREATE VIEW IF NOT EXISTS rates AS
    SELECT span.file_id, span.min_time, span.max_time,
        CASE WHEN span.max_time > span.min_time
            THEN (latest.size - earliest.size) / CAST(span.max_time - span.min_time AS REAL)
        END AS rate
    FROM sample_span span
    JOIN sample latest ON latest.file_id = span.file_id AND latest.sample_time = span.max_time
    JOIN sample earliest ON earliest.file_id = span.file_id AND earliest.sample_time = span.min_time;
";

/// Per-connection seen-set. Lives in the temp schema so it never reaches disk
/// and disappears with the connection.
const SEEN_SET: &str = "CREATE TEMP TABLE IF NOT EXISTS seen (file_id INTEGER PRIMARY KEY);";

pub(crate) fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;",
    )
}

pub(crate) fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)?;
    conn.execute_batch(SEEN_SET)
}
