//! Historical inventory of file metadata.
//!
//! Each scan of a root records the size, mode and modification time of every
//! regular file beneath it, evicts files that have disappeared, and keeps the
//! history so later queries can rank files by size, age or growth.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod report;
pub mod scan;
pub mod store;
pub mod util;

pub use error::{Error, ErrorClass, Result};
