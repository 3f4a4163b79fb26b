use crate::listing::{list_files, FileKind};
use crate::{FaultKind, InspectError};
use anyhow::Result;
use std::fs;
use tempfile::tempdir;

#[test]
fn lists_matching_files_sorted_by_name() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("000003.klog"), [0u8; 30])?;
    fs::write(dir.path().join("000001.klog"), [0u8; 10])?;
    fs::write(dir.path().join("000001.vlog"), [0u8; 99])?;
    fs::write(dir.path().join("000002.log"), [0u8; 7])?;
    fs::write(dir.path().join("MANIFEST"), b"x")?;
    fs::create_dir(dir.path().join("nested.klog"))?;

    let klogs = list_files(dir.path(), FileKind::Klog)?;
    let names: Vec<&str> = klogs.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["000001.klog", "000003.klog"]);
    assert_eq!(klogs[0].size, 10);
    assert_eq!(klogs[1].size, 30);
    assert_eq!(klogs[1].path, dir.path().join("000003.klog"));

    let wals = list_files(dir.path(), FileKind::Wal)?;
    assert_eq!(wals.len(), 1);
    assert_eq!(wals[0].name, "000002.log");
    Ok(())
}

#[test]
fn empty_directory_lists_nothing() -> Result<()> {
    let dir = tempdir()?;
    assert!(list_files(dir.path(), FileKind::Klog)?.is_empty());
    Ok(())
}

#[test]
fn missing_directory_is_an_error() {
    let dir = tempdir().unwrap();
    let err = list_files(dir.path().join("no-such-cf"), FileKind::Wal).unwrap_err();
    assert!(matches!(err, InspectError::ListDir { .. }));
    assert_eq!(err.kind(), FaultKind::IoError);
}

#[test]
fn extensions_and_labels() {
    assert_eq!(FileKind::Klog.extension(), "klog");
    assert_eq!(FileKind::Wal.extension(), "log");
    assert_eq!(FileKind::Wal.label(), "WAL files");
}
