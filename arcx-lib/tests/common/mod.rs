//! Helpers shared by the integration tests: fixture trees and archive readers.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;

/// Entry name -> contents.
pub type Entries = BTreeMap<String, Vec<u8>>;

pub fn read_zip(path: &Path) -> Entries {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entries = Entries::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();
        entries.insert(entry.name().to_string(), contents);
    }
    entries
}

pub fn read_tar_gz(path: &Path) -> Entries {
    let mut archive = tar::Archive::new(GzDecoder::new(File::open(path).unwrap()));
    let mut entries = Entries::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let name = entry.path().unwrap().to_string_lossy().into_owned();
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();
        entries.insert(name, contents);
    }
    entries
}

/// Writes `files` (relative path, contents) below `root`.
pub fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
    for (relative, contents) in files {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
}

/// Output name inside `dir`, as the `&str` that `create` expects.
pub fn output_in(dir: &Path, name: &str) -> String {
    dir.join(name).to_str().unwrap().to_string()
}
