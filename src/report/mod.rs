pub mod json;
pub mod table;

use serde::Serialize;

use crate::error::Result;
use crate::store::query::SampleOrder;
use crate::store::{Scope, Store};

/// The rankings an operator can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Ranking {
    Biggest,
    Oldest,
    Newest,
    Fastest,
}

impl Ranking {
    pub const ALL: [Ranking; 4] = [
        Ranking::Biggest,
        Ranking::Oldest,
        Ranking::Newest,
        Ranking::Fastest,
    ];

    pub fn heading(self) -> &'static str {
        match self {
            Ranking::Biggest => "BIGGEST FILES",
            Ranking::Oldest => "OLDEST FILES",
            Ranking::Newest => "NEWEST FILES",
            Ranking::Fastest => "FASTEST GROWING FILES",
        }
    }
}

/// One line of a report: a file and its most recent sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    /// Lossy for names that are not UTF-8.
    pub path: String,
    pub sampled_at: i64,
    pub mode: u32,
    pub size: u64,
    pub mtime: i64,
    /// Bytes per second; only present in growth rankings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub ranking: Ranking,
    pub entries: Vec<ReportEntry>,
}

/// Run one ranking. Returns at most `limit` entries, fewer if the store
/// holds fewer files.
pub fn query(store: &Store, scope: Scope, ranking: Ranking, limit: usize) -> Result<Report> {
    let order = match ranking {
        Ranking::Biggest => SampleOrder::SizeDesc,
        Ranking::Oldest => SampleOrder::MtimeAsc,
        Ranking::Newest => SampleOrder::MtimeDesc,
        Ranking::Fastest => {
            let entries = store
                .growth_rate_ranking(scope, limit)?
                .into_iter()
                .map(|r| ReportEntry {
                    path: r.file.path.to_string_lossy().into_owned(),
                    sampled_at: r.latest.capture_time,
                    mode: r.latest.mode,
                    size: r.latest.size,
                    mtime: r.latest.mtime,
                    rate: r.rate,
                })
                .collect();
            return Ok(Report { ranking, entries });
        }
    };

    let entries = store
        .latest_sample_ranking(scope, order, limit)?
        .into_iter()
        .map(|r| ReportEntry {
            path: r.file.path.to_string_lossy().into_owned(),
            sampled_at: r.latest.capture_time,
            mode: r.latest.mode,
            size: r.latest.size,
            mtime: r.latest.mtime,
            rate: None,
        })
        .collect();
    Ok(Report { ranking, entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Sample;
    use std::path::Path;

    fn seeded() -> Store {
        let store = Store::open_in_memory().unwrap();
        let dir = store.resolve_directory(Path::new("/r")).unwrap();
        let mut batch = store.begin_batch().unwrap();
        let observations = [
            ("/r/a", 10, 10, 5),
            ("/r/b", 10, 1000, 1),
            ("/r/c", 10, 500, 9),
            ("/r/a", 20, 30, 6),
        ];
        for (path, capture_time, size, mtime) in observations {
            let id = batch.resolve_or_create_file(dir, Path::new(path)).unwrap();
            let sample = Sample {
                capture_time,
                mode: 0o100644,
                size,
                mtime,
            };
            batch.record_sample(id, &sample).unwrap();
        }
        batch.commit().unwrap();
        store
    }

    #[test]
    fn every_ranking_respects_limit() {
        let store = seeded();
        for ranking in Ranking::ALL {
            let report = query(&store, Scope::All, ranking, 2).unwrap();
            assert_eq!(report.entries.len(), 2, "{ranking:?}");
            assert_eq!(report.ranking, ranking);
        }
    }

    #[test]
    fn fastest_puts_growing_file_first() {
        let store = seeded();
        let report = query(&store, Scope::All, Ranking::Fastest, 10).unwrap();
        assert_eq!(report.entries[0].path, "/r/a");
        assert_eq!(report.entries[0].rate, Some(2.0));
        assert_eq!(report.entries[0].size, 30);
        assert_eq!(report.entries.len(), 3);
    }

    #[test]
    fn oldest_uses_latest_mtime() {
        let store = seeded();
        let report = query(&store, Scope::All, Ranking::Oldest, 10).unwrap();
        let paths: Vec<_> = report.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/r/b", "/r/a", "/r/c"]);
        assert!(report.entries.iter().all(|e| e.rate.is_none()));
    }

    #[test]
    fn empty_store_gives_empty_report() {
        let store = Store::open_in_memory().unwrap();
        let report = query(&store, Scope::All, Ranking::Biggest, 25).unwrap();
        assert!(report.entries.is_empty());
    }
}
