//! Directory traversal and archive entry naming.
//!
//! [`walk_dir`] visits every regular file below a root directory and hands
//! each one to a write callback together with the name it should get inside
//! the archive. Names are relative to the root and use `/` as separator.

use std::fs::{self, File, Metadata};
use std::path::{Component, Path};

use crate::error::{ArchiveError, Result};

/// Computes the entry-name prefix shared by all files directly inside
/// `current_dir`.
///
/// The `root_dir` prefix is stripped from `current_dir`. With `include_root`
/// the base name of `root_dir` is put in front, so entries nest under a folder
/// named after the root. A root without a base name (`.` or `/`) adds nothing.
pub fn resolve_entry_prefix(current_dir: &Path, root_dir: &Path, include_root: bool) -> String {
    let relative = current_dir.strip_prefix(root_dir).unwrap_or(current_dir);

    let mut parts: Vec<String> = Vec::new();
    if include_root {
        if let Some(base) = root_dir.file_name() {
            parts.push(base.to_string_lossy().into_owned());
        }
    }
    parts.extend(normal_components(relative));

    parts.join("/")
}

/// Joins an entry prefix and a file name.
pub fn join_entry(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Turns a literal filesystem path into an entry name.
///
/// Root and `.` components are dropped so the entry stays relative; the rest
/// of the path is kept as is. `..` cannot be represented inside an archive and
/// is rejected.
pub fn entry_name_of(path: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                return Err(ArchiveError::encoding(
                    path.to_string_lossy(),
                    "entry names must not contain `..`",
                ));
            }
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
        }
    }

    if parts.is_empty() {
        return Err(ArchiveError::encoding(
            path.to_string_lossy(),
            "path does not name a file",
        ));
    }
    Ok(parts.join("/"))
}

fn normal_components(path: &Path) -> impl Iterator<Item = String> + '_ {
    path.components().filter_map(|c| match c {
        Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
        _ => None,
    })
}

/// A regular file found by [`walk_dir`].
#[derive(Debug)]
pub struct FileVisit<'a> {
    /// Location on disk.
    pub path: &'a Path,
    pub metadata: &'a Metadata,
    /// Name the file gets inside the archive.
    pub entry_name: &'a str,
}

/// Recursively walks `dir`, calling `write` once per regular file.
///
/// Subdirectories are visited first, depth-first, then the files of `dir`
/// itself. Children are processed in file-name order. Each file is opened
/// right before `write` is called and closed as soon as it returns, so at
/// most one input file is open at a time.
///
/// Any error, from the filesystem or from `write`, aborts the whole walk.
pub fn walk_dir<F>(dir: &Path, root_dir: &Path, include_root: bool, write: &mut F) -> Result<()>
where
    F: FnMut(&FileVisit<'_>, &mut File) -> Result<()>,
{
    // Directory entries keep the listing handle alive, so only names and
    // types are collected before recursing.
    let mut children = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| ArchiveError::filesystem(dir, e))? {
        let entry = entry.map_err(|e| ArchiveError::filesystem(dir, e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| ArchiveError::filesystem(entry.path(), e))?;
        children.push((entry.file_name(), file_type));
    }
    children.sort_by(|a, b| a.0.cmp(&b.0));

    let mut files = Vec::new();
    for (name, file_type) in children {
        let path = dir.join(&name);
        if file_type.is_dir() {
            walk_dir(&path, root_dir, include_root, write)?;
        } else if file_type.is_file() {
            files.push((name, path));
        } else {
            log::trace!("skipping {path:?}: not a regular file");
        }
    }

    let prefix = resolve_entry_prefix(dir, root_dir, include_root);
    for (name, path) in files {
        let mut file = File::open(&path).map_err(|e| ArchiveError::filesystem(&path, e))?;
        let metadata = file
            .metadata()
            .map_err(|e| ArchiveError::filesystem(&path, e))?;

        let entry_name = join_entry(&prefix, &name.to_string_lossy());
        let visit = FileVisit {
            path: &path,
            metadata: &metadata,
            entry_name: &entry_name,
        };
        write(&visit, &mut file)?;
    }

    Ok(())
}
