use std::path::Path;

use sstable::KlogEvent;

use crate::error::InspectError;
use crate::outcome::Inspected;
use crate::traverse::walk_klog;

/// A key as handed to the [`list_keys`] visitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedKey {
    /// 1-based position in the listing.
    pub ordinal: usize,
    pub key: Vec<u8>,
    pub tombstone: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySummary {
    pub keys: usize,
    pub first: Option<Vec<u8>>,
    pub last: Option<Vec<u8>>,
}

/// Streams up to `limit` keys of the klog at `path` to `visit`, in file
/// order, and reports the first and last key seen.
///
/// # Errors
///
/// Fails only if the file cannot be opened or its first block is unusable.
pub fn list_keys<P, F>(
    path: P,
    limit: usize,
    large_file_bytes: Option<u64>,
    mut visit: F,
) -> Result<Inspected<KeySummary>, InspectError>
where
    P: AsRef<Path>,
    F: FnMut(&ListedKey),
{
    let mut summary = KeySummary::default();
    let mut last = None;

    let log = walk_klog(path.as_ref(), limit, large_file_bytes, |event| {
        if let KlogEvent::Entry(e) = event {
            summary.keys += 1;
            let listed = ListedKey {
                ordinal: summary.keys,
                tombstone: e.entry.is_tombstone(),
                key: e.entry.key,
            };
            visit(&listed);
            if summary.first.is_none() {
                summary.first = Some(listed.key.clone());
            }
            last = Some(listed.key);
        }
    })?;

    summary.last = last;
    Ok(log.finish(summary))
}
