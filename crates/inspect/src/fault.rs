use std::fmt;

use block::BlockError;
use bloom::BloomError;
use sstable::{EntryError, EntryErrorKind, VarintError, VlogError};
use wal::WalFaultKind;

/// Coarse classification shared by every failure the tool reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// The file is shorter than a declared field requires.
    Truncated,
    /// A declared length exceeds the sanity ceiling.
    OversizeField,
    ChecksumMismatch,
    /// A LEB128 varint ran past 10 bytes.
    MalformedVarint,
    InvalidBloomLayout,
    CompanionFileMissing,
    IoError,
}

impl FaultKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FaultKind::Truncated => "truncated",
            FaultKind::OversizeField => "oversize field",
            FaultKind::ChecksumMismatch => "checksum mismatch",
            FaultKind::MalformedVarint => "malformed varint",
            FaultKind::InvalidBloomLayout => "invalid bloom layout",
            FaultKind::CompanionFileMissing => "companion file missing",
            FaultKind::IoError => "io error",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&BlockError> for FaultKind {
    fn from(e: &BlockError) -> Self {
        match e {
            BlockError::TruncatedHeader { .. } | BlockError::TruncatedPayload { .. } => {
                FaultKind::Truncated
            }
            // a footer that disagrees with its header is a bad length field
            BlockError::Oversize { .. } | BlockError::FooterMismatch { .. } => {
                FaultKind::OversizeField
            }
            BlockError::Io { .. } => FaultKind::IoError,
        }
    }
}

impl From<&EntryError> for FaultKind {
    fn from(e: &EntryError) -> Self {
        match e.kind {
            EntryErrorKind::Varint(VarintError::Malformed) => FaultKind::MalformedVarint,
            EntryErrorKind::Varint(VarintError::Incomplete { .. })
            | EntryErrorKind::Truncated { .. } => FaultKind::Truncated,
            EntryErrorKind::SequenceOverflow { .. } => FaultKind::OversizeField,
        }
    }
}

impl From<&VlogError> for FaultKind {
    fn from(e: &VlogError) -> Self {
        match e {
            VlogError::NoCompanionFile => FaultKind::CompanionFileMissing,
            VlogError::ReadFailed(inner) => FaultKind::from(inner),
            VlogError::ChecksumMismatch { .. } => FaultKind::ChecksumMismatch,
        }
    }
}

impl From<&BloomError> for FaultKind {
    fn from(_: &BloomError) -> Self {
        FaultKind::InvalidBloomLayout
    }
}

impl From<&WalFaultKind> for FaultKind {
    fn from(e: &WalFaultKind) -> Self {
        match e {
            WalFaultKind::ChecksumMismatch { .. } => FaultKind::ChecksumMismatch,
            WalFaultKind::Malformed(inner) => FaultKind::from(inner),
        }
    }
}
