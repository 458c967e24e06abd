//! Walks one root and hands every regular file to the writer.

use std::io;
use std::path::{Path, PathBuf};

use crossbeam_channel::Sender;
use tracing::{debug, trace, warn};

use super::fs::{Clock, FileKind, FileStat, Filesystem};
use crate::error::{Error, Result};

/// One regular file found by the walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub stat: FileStat,
    /// Unix seconds at the moment the file was found.
    pub captured_at: i64,
}

#[derive(Debug, Default)]
pub struct WalkStats {
    pub files: u64,
    /// Directories, symlinks, devices and the like.
    pub non_regular: u64,
    /// Entries that could not be read. Paths below these are kept at eviction.
    pub unreadable: Vec<PathBuf>,
    /// Entries listed but gone by the time they were read. Not protected.
    pub vanished: u64,
    /// Entry errors that carried no path.
    pub anonymous_errors: u64,
    /// Set when the receiving side went away before the walk finished.
    pub interrupted: bool,
}

impl WalkStats {
    pub fn skipped(&self) -> u64 {
        self.unreadable.len() as u64 + self.anonymous_errors
    }
}

/// Walk `root` and send a record for each regular file into `sink`.
///
/// Unreadable entries are logged and skipped. Entries deleted between listing
/// and reading are only counted. Failing to read `root` itself is an error,
/// since a scan that saw nothing must not lead to eviction.
/// Returns early, with `interrupted` set, if the receiver is dropped.
pub fn walk(
    fs: &dyn Filesystem,
    clock: &dyn Clock,
    root: &Path,
    sink: &Sender<FileRecord>,
) -> Result<WalkStats> {
    let mut stats = WalkStats::default();

    for entry in fs.entries(root) {
        let path = match entry {
            Ok(path) => path,
            Err(err) if err.depth == 0 => {
                return Err(Error::PathResolution {
                    path: err.path.unwrap_or_else(|| root.to_path_buf()),
                    source: err.source,
                });
            }
            Err(err) if err.source.kind() == io::ErrorKind::NotFound => {
                debug!(path = ?err.path, "entry vanished during walk");
                stats.vanished += 1;
                continue;
            }
            Err(err) => {
                let skipped = Error::Entry {
                    path: err.path.clone().unwrap_or_default(),
                    source: err.source,
                };
                warn!(error = %skipped, "skipping entry");
                match err.path {
                    Some(path) => stats.unreadable.push(path),
                    None => stats.anonymous_errors += 1,
                }
                continue;
            }
        };

        let stat = match fs.stat(&path) {
            Ok(stat) => stat,
            Err(source) if path == root => {
                return Err(Error::PathResolution { path, source });
            }
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "entry vanished during walk");
                stats.vanished += 1;
                continue;
            }
            Err(source) => {
                let skipped = Error::Entry {
                    path: path.clone(),
                    source,
                };
                warn!(error = %skipped, "skipping entry");
                stats.unreadable.push(path);
                continue;
            }
        };

        if stat.kind != FileKind::Regular {
            stats.non_regular += 1;
            continue;
        }

        trace!(path = %path.display(), size = stat.size, "found file");
        let record = FileRecord {
            path,
            stat,
            captured_at: clock.now(),
        };
        if sink.send(record).is_err() {
            stats.interrupted = true;
            break;
        }
        stats.files += 1;
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::fs::{Entries, EntryError};
    use std::collections::HashSet;
    use std::time::{Duration, Instant};

    /// Flat fake tree: a list of entries, some of which fail to stat.
    struct FakeTree {
        entries: Vec<(PathBuf, FileKind)>,
        broken: HashSet<PathBuf>,
        unlistable: Vec<PathBuf>,
        /// Listed, then deleted before `stat`.
        gone: Vec<PathBuf>,
    }

    impl FakeTree {
        fn new(root: &str) -> Self {
            FakeTree {
                entries: vec![(PathBuf::from(root), FileKind::Directory)],
                broken: HashSet::new(),
                unlistable: Vec::new(),
                gone: Vec::new(),
            }
        }

        fn with(mut self, path: &str, kind: FileKind) -> Self {
            self.entries.push((PathBuf::from(path), kind));
            self
        }
    }

    impl Filesystem for FakeTree {
        fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
            Ok(path.to_path_buf())
        }

        fn entries<'a>(&'a self, _root: &Path) -> Entries<'a> {
            let listed = self
                .entries
                .iter()
                .map(|(p, _)| p)
                .chain(&self.gone)
                .map(|p| Ok(p.clone()));
            let failed = self.unlistable.iter().map(|p| {
                Err(EntryError {
                    path: Some(p.clone()),
                    depth: 1,
                    source: io::Error::from(io::ErrorKind::PermissionDenied),
                })
            });
            Box::new(listed.chain(failed))
        }

        fn stat(&self, path: &Path) -> io::Result<FileStat> {
            if self.broken.contains(path) {
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
            let kind = self
                .entries
                .iter()
                .find(|(p, _)| p == path)
                .map(|(_, k)| *k)
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
            Ok(FileStat {
                kind,
                mode: 0o100644,
                size: 7,
                mtime: 1,
            })
        }
    }

    struct Fixed(i64);

    impl Clock for Fixed {
        fn now(&self) -> i64 {
            self.0
        }
    }

    fn collect(fs: &dyn Filesystem, root: &str) -> (Result<WalkStats>, Vec<FileRecord>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let stats = walk(fs, &Fixed(500), Path::new(root), &tx);
        drop(tx);
        (stats, rx.into_iter().collect())
    }

    #[test]
    fn only_regular_files_are_emitted() {
        let tree = FakeTree::new("/r")
            .with("/r/a.txt", FileKind::Regular)
            .with("/r/sub", FileKind::Directory)
            .with("/r/sub/b.txt", FileKind::Regular)
            .with("/r/link", FileKind::Symlink)
            .with("/r/fifo", FileKind::Other);

        let (stats, records) = collect(&tree, "/r");
        let stats = stats.unwrap();

        assert_eq!(stats.files, 2);
        assert_eq!(stats.non_regular, 4);
        let paths: Vec<_> = records.iter().map(|r| r.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("/r/a.txt"), PathBuf::from("/r/sub/b.txt")]);
        assert!(records.iter().all(|r| r.captured_at == 500));
    }

    #[test]
    fn stat_failure_skips_only_that_entry() {
        let mut tree = FakeTree::new("/r")
            .with("/r/1", FileKind::Regular)
            .with("/r/2", FileKind::Regular)
            .with("/r/3", FileKind::Regular);
        tree.broken.insert(PathBuf::from("/r/2"));

        let (stats, records) = collect(&tree, "/r");
        let stats = stats.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(stats.unreadable, vec![PathBuf::from("/r/2")]);
        assert_eq!(stats.skipped(), 1);
    }

    #[test]
    fn listing_failure_is_recorded_not_fatal() {
        let mut tree = FakeTree::new("/r").with("/r/ok", FileKind::Regular);
        tree.unlistable.push(PathBuf::from("/r/locked"));

        let (stats, records) = collect(&tree, "/r");
        let stats = stats.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(stats.unreadable, vec![PathBuf::from("/r/locked")]);
    }

    #[test]
    fn vanished_entry_is_counted_not_protected() {
        let mut tree = FakeTree::new("/r").with("/r/kept", FileKind::Regular);
        tree.gone.push(PathBuf::from("/r/deleted"));

        let (stats, records) = collect(&tree, "/r");
        let stats = stats.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(stats.vanished, 1);
        assert!(stats.unreadable.is_empty());
        assert_eq!(stats.skipped(), 0);
    }

    #[test]
    fn unreadable_root_is_a_resolution_error() {
        let mut tree = FakeTree::new("/r").with("/r/x", FileKind::Regular);
        tree.broken.insert(PathBuf::from("/r"));

        let (stats, records) = collect(&tree, "/r");
        assert!(matches!(stats, Err(Error::PathResolution { .. })));
        assert!(records.is_empty());
    }

    #[test]
    fn full_queue_blocks_the_walker() {
        let mut tree = FakeTree::new("/r");
        for i in 0..6 {
            tree.entries
                .push((PathBuf::from(format!("/r/{i}")), FileKind::Regular));
        }
        let capacity = 2;
        let (tx, rx) = crossbeam_channel::bounded(capacity);

        std::thread::scope(|s| {
            let walker = s.spawn(|| walk(&tree, &Fixed(1), Path::new("/r"), &tx));

            let deadline = Instant::now() + Duration::from_secs(5);
            while !rx.is_full() && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(5));
            }
            std::thread::sleep(Duration::from_millis(50));

            // nothing has been received, so the walker is stuck on its third send
            assert_eq!(rx.len(), capacity);
            assert!(!walker.is_finished());

            let received: Vec<_> = (0..6).map(|_| rx.recv().unwrap()).collect();
            let stats = walker.join().unwrap().unwrap();
            assert_eq!(received.len(), 6);
            assert_eq!(stats.files, 6);
            assert!(!stats.interrupted);
        });
    }

    #[test]
    fn dropped_receiver_interrupts_walk() {
        let tree = FakeTree::new("/r")
            .with("/r/1", FileKind::Regular)
            .with("/r/2", FileKind::Regular);

        let (tx, rx) = crossbeam_channel::bounded(1);
        drop(rx);
        let stats = walk(&tree, &Fixed(1), Path::new("/r"), &tx).unwrap();

        assert!(stats.interrupted);
        assert_eq!(stats.files, 0);
    }
}
