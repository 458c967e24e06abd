pub mod fs;
pub mod walker;
pub mod writer;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::store::{DirId, Store};
use crate::util::format_bytes;
use fs::{Clock, Filesystem};
use walker::WalkStats;
use writer::WriterStats;

pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// Where a scan is in its life. `Failed` can follow any other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Walking,
    Draining,
    Evicting,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
pub struct ScanSummary {
    pub root: PathBuf,
    pub dir_id: DirId,
    pub files_recorded: u64,
    pub batches_committed: u64,
    pub non_regular: u64,
    pub skipped: u64,
    /// Entries deleted between listing and reading.
    pub vanished: u64,
    pub evicted: usize,
    pub elapsed: Duration,
    pub peak_memory_bytes: Option<usize>,
}

/// Runs scans of one root at a time against a store.
///
/// Each scan walks the root on the calling thread while a writer thread
/// commits what it finds. Eviction only happens after the writer has
/// drained the channel and committed its last batch.
pub struct Scanner<'a> {
    store: &'a mut Store,
    fs: &'a dyn Filesystem,
    clock: &'a dyn Clock,
    batch_size: usize,
    phase: ScanPhase,
}

impl<'a> Scanner<'a> {
    pub fn new(store: &'a mut Store, fs: &'a dyn Filesystem, clock: &'a dyn Clock) -> Self {
        Scanner {
            store,
            fs,
            clock,
            batch_size: DEFAULT_BATCH_SIZE,
            phase: ScanPhase::Idle,
        }
    }

    /// Records per transaction; also the capacity of the walker/writer queue.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Phase reached by the most recent scan.
    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    /// Scan `root` completely: walk, write, then evict what was not seen.
    pub fn scan(&mut self, root: &Path) -> Result<ScanSummary> {
        let mut phase = ScanPhase::Idle;
        let outcome = self.run(root, &mut phase);

        match &outcome {
            Ok(summary) => info!(
                root = %summary.root.display(),
                files = summary.files_recorded,
                batches = summary.batches_committed,
                skipped = summary.skipped,
                vanished = summary.vanished,
                evicted = summary.evicted,
                elapsed = %humantime::format_duration(round_to_millis(summary.elapsed)),
                peak_memory = ?summary.peak_memory_bytes.map(|b| format_bytes(b as u64)),
                "scan complete"
            ),
            Err(err) => {
                error!(root = %root.display(), failed_in = ?phase, error = %err, "scan failed");
                advance(&mut phase, ScanPhase::Failed);
            }
        }

        self.phase = phase;
        outcome
    }

    fn run(&mut self, root: &Path, phase: &mut ScanPhase) -> Result<ScanSummary> {
        let started = Instant::now();

        let canonical = self
            .fs
            .canonicalize(root)
            .map_err(|source| Error::PathResolution {
                path: root.to_path_buf(),
                source,
            })?;
        let dir_id = self.store.resolve_directory(&canonical)?;
        self.store.begin_scan()?;

        advance(phase, ScanPhase::Walking);
        let (walked, written) = self.walk_and_write(&canonical, dir_id, phase)?;

        advance(phase, ScanPhase::Evicting);
        let evicted = self.store.evict_unseen(dir_id, &walked.unreadable)?;
        advance(phase, ScanPhase::Done);

        Ok(ScanSummary {
            root: canonical,
            dir_id,
            files_recorded: written.records,
            batches_committed: written.batches,
            non_regular: walked.non_regular,
            skipped: walked.skipped(),
            vanished: walked.vanished,
            evicted,
            elapsed: started.elapsed(),
            peak_memory_bytes: written.peak_memory_bytes,
        })
    }

    /// Walk on this thread, write on a scoped writer thread, and return once
    /// the writer has finished.
    fn walk_and_write(
        &mut self,
        root: &Path,
        dir_id: DirId,
        phase: &mut ScanPhase,
    ) -> Result<(WalkStats, WriterStats)> {
        let fs = self.fs;
        let clock = self.clock;
        let batch_size = self.batch_size;
        let store = &mut *self.store;
        let (tx, rx) = crossbeam_channel::bounded(batch_size);

        std::thread::scope(|s| -> Result<(WalkStats, WriterStats)> {
            let writer = std::thread::Builder::new()
                .name("batch-writer".to_string())
                .spawn_scoped(s, move || writer::drain(store, dir_id, &rx, batch_size))
                .map_err(|source| Error::Spawn { source })?;

            let walked = walker::walk(fs, clock, root, &tx);
            drop(tx);
            advance(phase, ScanPhase::Draining);

            let written = writer.join().map_err(|_| Error::WriterPanicked)?;
            // a store failure explains an interrupted walk, so it wins
            Ok((walked?, written?))
        })
    }
}

fn advance(phase: &mut ScanPhase, next: ScanPhase) {
    debug!(from = ?*phase, to = ?next, "scan phase");
    *phase = next;
}

fn round_to_millis(d: Duration) -> Duration {
    Duration::from_millis(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
