use std::io::{Read, Seek};
use std::path::Path;
use std::time::SystemTime;

use block::{BlockReader, FILE_HEADER_BYTES};
use tracing::debug;

use crate::error::InspectError;
use crate::outcome::{Inspected, Warning, WarningLog};

/// File-level facts about a block file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub block_count: u64,
    pub first_block_size: Option<u32>,
    /// For a klog this is the metadata block.
    pub last_block_size: Option<u32>,
}

impl FileInfo {
    /// Modification time in seconds since the Unix epoch.
    #[must_use]
    pub fn modified_unix(&self) -> Option<u64> {
        self.modified
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
    }
}

/// Summarizes the block file at `path` without decoding entries.
///
/// # Errors
///
/// [`InspectError::Open`] if the file cannot be opened and
/// [`InspectError::FirstBlock`] if the first block header is unusable for a
/// reason other than the file ending.
pub fn file_info<P: AsRef<Path>>(path: P) -> Result<Inspected<FileInfo>, InspectError> {
    let path = path.as_ref();
    let open_err = |source| InspectError::Open {
        path: path.to_path_buf(),
        source,
    };
    let modified = std::fs::metadata(path).map_err(open_err)?.modified().ok();
    let reader = BlockReader::open(path).map_err(open_err)?;
    file_info_reader(path, reader, modified)
}

fn file_info_reader<R: Read + Seek>(
    path: &Path,
    mut reader: BlockReader<R>,
    modified: Option<SystemTime>,
) -> Result<Inspected<FileInfo>, InspectError> {
    let mut log = WarningLog::default();
    let mut info = FileInfo {
        size: reader.len(),
        modified,
        block_count: 0,
        first_block_size: None,
        last_block_size: None,
    };
    if info.size < FILE_HEADER_BYTES {
        log.push(Warning::ShortFile { len: info.size });
        return Ok(log.finish(info));
    }
    if info.size == FILE_HEADER_BYTES {
        return Ok(log.finish(info));
    }

    match reader.read_block(FILE_HEADER_BYTES) {
        Ok(block) => info.first_block_size = Some(block.size()),
        Err(e) if e.is_truncation() => {
            log.push(Warning::TruncatedTail(e));
            return Ok(log.finish(info));
        }
        Err(source) => {
            return Err(InspectError::FirstBlock {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    let (forward, stopped) = reader.count_blocks();
    info.block_count = forward;
    if let Some(e) = stopped {
        // a zero-size block (disabled bloom filter) stops the forward walk;
        // the footers may still chain cleanly from the end
        match count_backward(&mut reader) {
            Some(n) => {
                debug!(forward, backward = n, "block count taken from footers");
                info.block_count = n;
            }
            None if e.is_truncation() => log.push(Warning::TruncatedTail(e)),
            None => log.push(Warning::Unreadable(e)),
        }
    }

    if let Ok(Some(last)) = reader.last_block_offset() {
        if let Ok(header) = reader.read_raw_header(last) {
            info.last_block_size = Some(header.size);
        }
    }

    Ok(log.finish(info))
}

/// Counts blocks by following footers from end-of-file back to the file
/// header. Returns `None` unless the chain lands exactly on offset 8.
fn count_backward<R: Read + Seek>(reader: &mut BlockReader<R>) -> Option<u64> {
    let mut end = reader.len();
    let mut count = 0;
    loop {
        match reader.prev_block_offset(end) {
            Ok(Some(start)) => {
                count += 1;
                end = start;
            }
            Ok(None) if end == FILE_HEADER_BYTES => return Some(count),
            Ok(None) | Err(_) => return None,
        }
    }
}
