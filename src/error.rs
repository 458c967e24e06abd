//! Error types for filebase.
//!
//! Every failure the library can report falls into one of a few classes
//! that decide what the caller does with it:
//! - transient entry errors are logged and the walk moves on
//! - path resolution errors abort the scan of one root only
//! - store errors and duplicate samples abort the scan and are never retried

use std::path::PathBuf;

use thiserror::Error;

/// Shared `Result` alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// How an error should be treated by whoever receives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A single entry could not be read; skip it and keep walking.
    Transient,
    /// The store rejected a write or a read; abort the scan.
    StoreWrite,
    /// A scan root could not be resolved; abort that root only.
    PathResolution,
    /// A sample with the same (file, capture time) already exists.
    DuplicateKey,
    /// Bad configuration or store location; nothing was scanned.
    Setup,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read {path}: {source}")]
    Entry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot resolve scan root {path}: {source}")]
    PathResolution {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("sample for file {file_id} at {capture_time} already recorded")]
    DuplicateSample { file_id: i64, capture_time: i64 },

    #[error("SQL failure in {context}: {source}")]
    Sql {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("cannot open store at {path}: {source}")]
    StoreOpen {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("invalid configuration: {details}")]
    Config { details: String },

    #[error("IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot start batch writer: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },

    #[error("batch writer thread panicked")]
    WriterPanicked,
}

impl Error {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Entry { .. } => ErrorClass::Transient,
            Self::PathResolution { .. } => ErrorClass::PathResolution,
            Self::DuplicateSample { .. } => ErrorClass::DuplicateKey,
            Self::Sql { .. } | Self::WriterPanicked => ErrorClass::StoreWrite,
            Self::StoreOpen { .. } | Self::Config { .. } | Self::Io { .. } | Self::Spawn { .. } => {
                ErrorClass::Setup
            }
        }
    }

    pub(crate) fn sql(context: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::Sql { context, source }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(source: rusqlite::Error) -> Self {
        Self::Sql {
            context: "rusqlite",
            source,
        }
    }
}
