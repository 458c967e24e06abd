//! Batched transaction writer.
//!
//! Drains file records from the walker and writes them in fixed-size
//! transactions. A killed process loses at most the batch in flight; a write
//! error rolls that batch back and ends the scan.

use crossbeam_channel::Receiver;
use tracing::{debug, warn};

use super::walker::FileRecord;
use crate::error::Result;
use crate::store::{Batch, DirId, Sample, Store};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriterStats {
    /// Records in committed batches.
    pub records: u64,
    pub batches: u64,
    /// Largest resident set size seen at a commit, when the platform reports one.
    pub peak_memory_bytes: Option<usize>,
}

/// Write every record from `records` under `dir_id` until the channel closes.
pub fn drain(
    store: &Store,
    dir_id: DirId,
    records: &Receiver<FileRecord>,
    batch_size: usize,
) -> Result<WriterStats> {
    let batch_size = batch_size.max(1);
    let mut stats = WriterStats::default();
    let mut batch = store.begin_batch()?;

    for record in records.iter() {
        if let Err(err) = write_record(&mut batch, dir_id, &record) {
            if let Err(rollback) = batch.rollback() {
                warn!(error = %rollback, "rollback after failed write also failed");
            }
            return Err(err);
        }

        if batch.len() >= batch_size {
            commit(batch, &mut stats)?;
            batch = store.begin_batch()?;
        }
    }

    if batch.is_empty() {
        batch.rollback()?;
    } else {
        commit(batch, &mut stats)?;
    }

    Ok(stats)
}

fn write_record(batch: &mut Batch<'_>, dir_id: DirId, record: &FileRecord) -> Result<()> {
    let file_id = batch.resolve_or_create_file(dir_id, &record.path)?;
    let sample = Sample {
        capture_time: record.captured_at,
        mode: record.stat.mode,
        size: record.stat.size,
        mtime: record.stat.mtime,
    };
    batch.record_sample(file_id, &sample)?;
    batch.mark_seen(file_id)
}

fn commit(batch: Batch<'_>, stats: &mut WriterStats) -> Result<()> {
    let size = batch.len() as u64;
    batch.commit()?;

    stats.records += size;
    stats.batches += 1;
    if let Some(usage) = memory_stats::memory_stats() {
        stats.peak_memory_bytes = Some(
            stats
                .peak_memory_bytes
                .map_or(usage.physical_mem, |peak| peak.max(usage.physical_mem)),
        );
    }

    debug!(batch = stats.batches, records = stats.records, "committed batch");
    Ok(())
}
