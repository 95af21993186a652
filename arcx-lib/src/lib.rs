//! Build ZIP and gzip compressed TAR archives from byte buffers, single files
//! or whole directory trees.
//!
//! ```no_run
//! use arcx_lib::{ArchiveFormat, Archiver};
//! use std::path::Path;
//!
//! # fn main() -> arcx_lib::Result<()> {
//! let mut archive = ArchiveFormat::TarGz.archiver();
//! archive.create("site")?; // writes site.tar.gz
//! archive.add("VERSION", b"1.4.2\n")?;
//! archive.add_all(Path::new("public"), true)?;
//! archive.close()?;
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub mod packaging;
pub mod walk;

pub use error::{ArchiveError, ErrorKind, Result};
pub use packaging::{ArchiveFormat, Archiver, WriterState, archive_paths};

/// Settings shared by the command line tool and anything embedding it.
///
/// Every field is optional so that partial sources (environment, config file,
/// command line) can be layered on top of each other.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub output: Option<String>,
    pub config: Option<String>,
    pub format: Option<String>,
    pub dry: Option<bool>,
    pub max_size: Option<String>,
    pub include_root: Option<bool>,
    pub paths: Option<Vec<String>>,
}
