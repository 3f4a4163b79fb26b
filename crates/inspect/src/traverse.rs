//! Shared klog walk used by the dump, keys and stats drivers.

use std::path::Path;

use block::FILE_HEADER_BYTES;
use sstable::{KlogEvent, KlogEvents};
use tracing::{debug, info};

use crate::error::InspectError;
use crate::outcome::{Warning, WarningLog};

/// Opens `path` and feeds its `Block`, `Entry` and `Malformed` events to
/// `visit`, turning everything else into warnings.
///
/// `large_file_bytes` enables the large-file notice.
///
/// # Errors
///
/// [`InspectError::Open`] if the file cannot be opened, and
/// [`InspectError::FirstBlock`] if the first block header is unusable for a
/// reason other than the file ending.
pub(crate) fn walk_klog<F>(
    path: &Path,
    limit: usize,
    large_file_bytes: Option<u64>,
    mut visit: F,
) -> Result<WarningLog, InspectError>
where
    F: FnMut(KlogEvent),
{
    let events = KlogEvents::open(path, limit).map_err(|source| InspectError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut log = WarningLog::default();
    let len = events.file_len();
    if len < FILE_HEADER_BYTES {
        log.push(Warning::ShortFile { len });
        return Ok(log);
    }
    if let Some(threshold) = large_file_bytes {
        if len > threshold {
            info!(path = %path.display(), size = len, "large file");
            log.push(Warning::LargeFile {
                size: len,
                threshold,
            });
        }
    }

    let mut blocks_seen = 0u64;
    for event in events {
        match event {
            KlogEvent::Block(info) => {
                blocks_seen += 1;
                if !info.checksum_ok {
                    log.push(Warning::ChecksumMismatch { offset: info.offset });
                }
                visit(KlogEvent::Block(info));
            }
            KlogEvent::Entry(_) => visit(event),
            KlogEvent::Malformed(fault) => {
                log.push(Warning::from(fault.clone()));
                visit(KlogEvent::Malformed(fault));
            }
            KlogEvent::Unreadable(e) if e.is_truncation() => {
                debug!(offset = e.offset(), "klog ends inside a block");
                log.push(Warning::TruncatedTail(e));
            }
            KlogEvent::Unreadable(e) if blocks_seen == 0 => {
                return Err(InspectError::FirstBlock {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
            KlogEvent::Unreadable(e) => log.push(Warning::Unreadable(e)),
            KlogEvent::LimitReached {
                limit,
                unread_bytes,
            } => log.push(Warning::LimitReached {
                limit,
                unread_bytes,
            }),
        }
    }
    Ok(log)
}
