//! # Inspect - offline diagnostics for engine files
//!
//! The drivers behind each `lsm-inspect` command. They tie the [`block`],
//! [`sstable`], [`wal`] and [`bloom`] crates together and turn their
//! per-block failures into a single outcome model.
//!
//! ## Architecture
//!
//! ```text
//! path
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                  INSPECT                      │
//! │                                               │
//! │ checksum.rs → raw sweep, every block          │
//! │                                               │
//! │ traverse.rs → KlogEvents → dump.rs            │
//! │                          → keys.rs            │
//! │                          → stats.rs           │
//! │                                               │
//! │ dump.rs     → WalEvents (wal dump)            │
//! │ filter.rs   → footers, backwards → bloom      │
//! │ info.rs     → headers and footers only        │
//! │ listing.rs  → directory entries               │
//! └───────────────────────────────────────────────┘
//!   |
//!   v
//! Result<Inspected<T>, InspectError>
//! ```
//!
//! ## Outcomes
//!
//! | Result                  | Meaning                                         |
//! |-------------------------|-------------------------------------------------|
//! | `Ok`, no warnings       | [`Outcome::Success`]                            |
//! | `Ok`, some warnings     | [`Outcome::Partial`]: something was skipped     |
//! | `Err(InspectError)`     | nothing could be produced; see [`InspectError::kind`] |
//!
//! Only failing to open a file, or an unusable first block, is fatal. A bad
//! entry skips the rest of its block, a bad checksum is flagged, and a
//! partial block at end-of-file is a write in progress.
//!
//! ## Example
//!
//! ```rust,no_run
//! use inspect::{stats::sstable_stats, Outcome};
//!
//! let result = sstable_stats("000017.klog").unwrap();
//! println!("{} entries", result.value.stats.entries);
//! if result.outcome() == Outcome::Partial {
//!     for w in &result.warnings {
//!         eprintln!("warning: {w}");
//!     }
//! }
//! ```

pub mod checksum;
pub mod dump;
mod error;
mod fault;
pub mod filter;
pub mod info;
pub mod keys;
pub mod listing;
mod outcome;
pub mod stats;
mod traverse;

pub use error::InspectError;
pub use fault::FaultKind;
pub use outcome::{Inspected, Outcome, Warning, MAX_WARNINGS};

#[cfg(test)]
mod tests;
