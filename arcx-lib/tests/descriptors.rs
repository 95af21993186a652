//! The walker must never hold more than one input file open.
//!
//! Kept in its own test binary so no other test opens descriptors while the
//! count is taken.

#![cfg(target_os = "linux")]

mod common;

use std::fs;

use arcx_lib::walk::walk_dir;
use common::write_tree;

fn open_descriptors() -> usize {
    fs::read_dir("/proc/self/fd").unwrap().count()
}

#[test]
fn test_walk_keeps_one_file_open() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("many");
    let files: Vec<(String, Vec<u8>)> = (0..64)
        .map(|i| (format!("d{}/sub{}/f{i}.txt", i % 4, i % 3), vec![b'x'; i]))
        .collect();
    let borrowed: Vec<(&str, &[u8])> = files
        .iter()
        .map(|(name, contents)| (name.as_str(), contents.as_slice()))
        .collect();
    write_tree(&root, &borrowed);

    let baseline = open_descriptors();
    let mut peak = 0;
    let mut visited = 0;
    walk_dir(&root, &root, false, &mut |_, _| {
        peak = peak.max(open_descriptors());
        visited += 1;
        Ok(())
    })
    .unwrap();

    assert_eq!(visited, files.len());
    assert!(
        peak <= baseline + 1,
        "peak {peak} descriptors, baseline {baseline}"
    );
    assert_eq!(open_descriptors(), baseline);
}
