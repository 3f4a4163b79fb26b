use std::io;
use std::path::PathBuf;

use block::BlockError;
use bloom::BloomError;
use thiserror::Error;

use crate::fault::FaultKind;

/// Failures that end an inspection without a result.
#[derive(Debug, Error)]
pub enum InspectError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The very first block of the file could not be read.
    #[error("cannot read first block of {}: {source}", path.display())]
    FirstBlock {
        path: PathBuf,
        #[source]
        source: BlockError,
    },

    #[error("cannot list {}: {source}", path.display())]
    ListDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A klog needs index, bloom and metadata blocks at its end.
    #[error("{} has {found} blocks, need at least 3 for index/bloom/metadata", path.display())]
    TooFewBlocks { path: PathBuf, found: u64 },

    #[error("cannot locate bloom filter block in {}: {source}", path.display())]
    BloomBlock {
        path: PathBuf,
        #[source]
        source: BlockError,
    },

    #[error("invalid bloom filter in {}: {source}", path.display())]
    Bloom {
        path: PathBuf,
        #[source]
        source: BloomError,
    },
}

impl InspectError {
    /// Classification of the underlying failure.
    #[must_use]
    pub fn kind(&self) -> FaultKind {
        match self {
            InspectError::Open { .. } | InspectError::ListDir { .. } => FaultKind::IoError,
            InspectError::FirstBlock { source, .. } | InspectError::BloomBlock { source, .. } => {
                FaultKind::from(source)
            }
            InspectError::TooFewBlocks { .. } => FaultKind::Truncated,
            InspectError::Bloom { .. } => FaultKind::InvalidBloomLayout,
        }
    }
}
