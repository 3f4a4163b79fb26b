use std::fs;
use std::path::{Path, PathBuf};

use crate::error::InspectError;

/// Kinds of engine file found in a column family directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Klog,
    Wal,
}

impl FileKind {
    /// File name extension, without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            FileKind::Klog => "klog",
            FileKind::Wal => "log",
        }
    }

    /// Plural label used in listings.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            FileKind::Klog => "SSTables",
            FileKind::Wal => "WAL files",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Lists the regular files of `kind` directly inside `dir`, sorted by name.
///
/// # Errors
///
/// Returns [`InspectError::ListDir`] if the directory cannot be read.
pub fn list_files<P: AsRef<Path>>(dir: P, kind: FileKind) -> Result<Vec<ListedFile>, InspectError> {
    let dir = dir.as_ref();
    let list_err = |source| InspectError::ListDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(list_err)? {
        let entry = entry.map_err(list_err)?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(kind.extension()) {
            continue;
        }
        let metadata = match entry.metadata() {
            Ok(m) if m.is_file() => m,
            _ => continue,
        };
        files.push(ListedFile {
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
            size: metadata.len(),
        });
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}
