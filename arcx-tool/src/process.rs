use std::path::PathBuf;

use anyhow::{Context, Result};
use arcx_lib::walk::{entry_name_of, walk_dir};
use arcx_lib::{ArchiveFormat, archive_paths};

/// A file that would be written, and the name it gets inside the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    pub source: PathBuf,
    pub entry_name: String,
    pub size: u64,
}

/// Computes every entry an archive of `paths` would contain, using the same
/// naming rules as the archive writers.
pub fn plan_entries(paths: &[PathBuf], include_root: bool) -> Result<Vec<PlannedEntry>> {
    let mut planned = Vec::new();

    for path in paths {
        if path.is_dir() {
            walk_dir(path, path, include_root, &mut |visit, _file| {
                planned.push(PlannedEntry {
                    source: visit.path.to_path_buf(),
                    entry_name: visit.entry_name.to_string(),
                    size: visit.metadata.len(),
                });
                Ok(())
            })
            .with_context(|| format!("walking {path:?}"))?;
        } else {
            let metadata =
                std::fs::metadata(path).with_context(|| format!("reading metadata of {path:?}"))?;
            planned.push(PlannedEntry {
                source: path.clone(),
                entry_name: entry_name_of(path)?,
                size: metadata.len(),
            });
        }
    }

    Ok(planned)
}

/// Writes the archive and returns its final path.
pub fn write_archive(
    format: ArchiveFormat,
    output: &str,
    paths: &[PathBuf],
    include_root: bool,
) -> Result<PathBuf> {
    let written = archive_paths(format, output, paths, include_root)
        .with_context(|| format!("writing {format} archive {output}"))?;
    Ok(written)
}
