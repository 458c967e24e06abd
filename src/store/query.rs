//! Point-in-time rankings over the sample history.
//!
//! Every ranking looks at one row per file: the sample with the greatest
//! capture time. Growth rates come from the `rates` view, which spans the
//! earliest and latest sample of each file.

use rusqlite::params;

use super::{path_from_key, sample_from_row, Sample, Scope, Store, StoredFile};
use crate::error::{Error, Result};

/// Sort key for `latest_sample_ranking`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOrder {
    SizeDesc,
    MtimeAsc,
    MtimeDesc,
}

impl SampleOrder {
    fn order_by(self) -> &'static str {
        match self {
            SampleOrder::SizeDesc => "s.size DESC, f.path",
            SampleOrder::MtimeAsc => "s.mtime ASC, f.path",
            SampleOrder::MtimeDesc => "s.mtime DESC, f.path",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedFile {
    pub file: StoredFile,
    pub latest: Sample,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrowthRank {
    pub file: StoredFile,
    pub latest: Sample,
    /// Bytes per second between the first and last sample. `None` while the
    /// file has only been sampled at one instant.
    pub rate: Option<f64>,
}

const LATEST_SAMPLE: &str = "
    SELECT f.file_id, f.dir_id, f.path, s.sample_time, s.mode, s.size, s.mtime
    FROM file f
    JOIN sample_span span ON span.file_id = f.file_id
    JOIN sample s ON s.file_id = f.file_id AND s.sample_time = span.max_time
    WHERE (?1 IS NULL OR f.dir_id = ?1)";

impl Store {
    /// Up to `limit` files ordered by their most recent sample.
    pub fn latest_sample_ranking(
        &self,
        scope: Scope,
        order: SampleOrder,
        limit: usize,
    ) -> Result<Vec<RankedFile>> {
        let sql = format!("{LATEST_SAMPLE} ORDER BY {} LIMIT ?2", order.order_by());
        let mut stmt = self.conn.prepare_cached(&sql)?;

        let ranked = stmt
            .query_map(params![scope.dir_param(), sql_limit(limit)], |row| {
                Ok(RankedFile {
                    file: file_from_row(row)?,
                    latest: sample_from_row(row, 3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::sql("latest sample ranking"))?;
        Ok(ranked)
    }

    /// Up to `limit` files ordered by growth rate, fastest first. Files
    /// without a rate come after every file that has one.
    pub fn growth_rate_ranking(&self, scope: Scope, limit: usize) -> Result<Vec<GrowthRank>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT f.file_id, f.dir_id, f.path, s.sample_time, s.mode, s.size, s.mtime, r.rate
             FROM rates r
             JOIN file f ON f.file_id = r.file_id
             JOIN sample s ON s.file_id = r.file_id AND s.sample_time = r.max_time
             WHERE (?1 IS NULL OR f.dir_id = ?1)
             ORDER BY r.rate IS NULL, r.rate DESC, f.path
             LIMIT ?2",
        )?;

        let ranked = stmt
            .query_map(params![scope.dir_param(), sql_limit(limit)], |row| {
                Ok(GrowthRank {
                    file: file_from_row(row)?,
                    latest: sample_from_row(row, 3)?,
                    rate: row.get(7)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::sql("growth rate ranking"))?;
        Ok(ranked)
    }
}

fn file_from_row(row: &rusqlite::Row) -> rusqlite::Result<StoredFile> {
    Ok(StoredFile {
        id: row.get(0)?,
        dir_id: row.get(1)?,
        path: path_from_key(row.get(2)?),
    })
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
