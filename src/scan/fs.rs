//! Filesystem and clock capabilities used by the scanner.
//!
//! The scanner never touches `std::fs` directly so tests can swap in trees
//! that fail in controlled ways.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    Other,
}

/// The parts of a stat call the store keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub kind: FileKind,
    pub mode: u32,
    pub size: u64,
    /// Unix seconds.
    pub mtime: i64,
}

/// An entry the traversal could not read.
#[derive(Debug)]
pub struct EntryError {
    pub path: Option<PathBuf>,
    /// Distance from the root; 0 is the root itself.
    pub depth: usize,
    pub source: io::Error,
}

pub type Entries<'a> = Box<dyn Iterator<Item = Result<PathBuf, EntryError>> + 'a>;

pub trait Filesystem {
    /// Absolute path with every symlink resolved.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    /// Every entry below `root` (and `root` itself), depth first. A failure
    /// on one entry is reported in place and does not end the iteration.
    fn entries<'a>(&'a self, root: &Path) -> Entries<'a>;

    /// Metadata of `path` without following a final symlink.
    fn stat(&self, path: &Path) -> io::Result<FileStat>;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFilesystem;

impl Filesystem for OsFilesystem {
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }

    fn entries<'a>(&'a self, root: &Path) -> Entries<'a> {
        let walker = WalkDir::new(root).follow_links(false).into_iter();
        Box::new(walker.map(|entry| match entry {
            Ok(entry) => Ok(entry.into_path()),
            Err(err) => Err(EntryError {
                path: err.path().map(Path::to_path_buf),
                depth: err.depth(),
                source: io::Error::from(err),
            }),
        }))
    }

    fn stat(&self, path: &Path) -> io::Result<FileStat> {
        let meta = fs::symlink_metadata(path)?;
        let file_type = meta.file_type();
        let kind = if file_type.is_file() {
            FileKind::Regular
        } else if file_type.is_dir() {
            FileKind::Directory
        } else if file_type.is_symlink() {
            FileKind::Symlink
        } else {
            FileKind::Other
        };

        Ok(FileStat {
            kind,
            mode: mode_bits(&meta),
            size: meta.len(),
            mtime: meta.modified().map(unix_seconds).unwrap_or(0),
        })
    }
}

#[cfg(unix)]
fn mode_bits(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode()
}

#[cfg(not(unix))]
fn mode_bits(meta: &fs::Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

/// Seconds since the epoch, negative for earlier times.
pub fn unix_seconds(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
        Err(e) => -i64::try_from(e.duration().as_secs()).unwrap_or(i64::MAX),
    }
}

/// Source of capture times.
pub trait Clock {
    /// Current time in Unix seconds.
    fn now(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        unix_seconds(SystemTime::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn unix_seconds_handles_both_sides_of_epoch() {
        assert_eq!(unix_seconds(UNIX_EPOCH + Duration::from_secs(90)), 90);
        assert_eq!(unix_seconds(UNIX_EPOCH - Duration::from_secs(90)), -90);
    }

    #[test]
    fn os_filesystem_classifies_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("data.bin");
        fs::write(&file, vec![0u8; 42]).unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();

        let stat = OsFilesystem.stat(&file).unwrap();
        assert_eq!(stat.kind, FileKind::Regular);
        assert_eq!(stat.size, 42);
        assert!(stat.mtime > 0);

        let dir = OsFilesystem.stat(&tmp.path().join("sub")).unwrap();
        assert_eq!(dir.kind, FileKind::Directory);

        let entries: Vec<_> = OsFilesystem
            .entries(tmp.path())
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.contains(&file));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_followed() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("target.txt");
        fs::write(&target, "x").unwrap();
        let link = tmp.path().join("link.txt");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert_eq!(OsFilesystem.stat(&link).unwrap().kind, FileKind::Symlink);
    }

    #[test]
    fn missing_root_is_reported_at_depth_zero() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");

        let mut entries = OsFilesystem.entries(&missing);
        let err = entries.next().unwrap().unwrap_err();
        assert_eq!(err.depth, 0);
        assert_eq!(err.source.kind(), io::ErrorKind::NotFound);
        assert!(entries.next().is_none());
    }
}
