//! Text rendering of inspection results.
//!
//! Every function writes to a caller-supplied sink so that reports can be
//! checked in tests without spawning the binary.

use std::io::{self, Write};
use std::path::Path;

use bloom::BloomStats;
use inspect::checksum::{BlockFault, BlockFaultKind, SweepReport};
use inspect::dump::DumpedEntry;
use inspect::info::FileInfo;
use inspect::keys::ListedKey;
use inspect::listing::{FileKind, ListedFile};
use inspect::stats::SstableStats;
use inspect::Warning;
use sstable::Entry;
use wal::{WalEntry, WalFault, WalVerifyReport};

/// Bytes rendered as text, invalid UTF-8 replaced.
fn text(bytes: &[u8]) -> std::borrow::Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

fn write_flags<W: Write>(out: &mut W, entry: &Entry) -> io::Result<()> {
    if entry.is_tombstone() {
        write!(out, "[DEL] ")?;
    }
    if let Some(ttl) = entry.ttl {
        write!(out, "[TTL:{ttl}] ")?;
    }
    Ok(())
}

/// ` value="..."` for short values, ` value=(N bytes)` otherwise.
fn write_value<W: Write>(out: &mut W, value: &[u8], preview: usize) -> io::Result<()> {
    if value.is_empty() {
        return Ok(());
    }
    if value.len() <= preview {
        write!(out, " value=\"{}\"", text(value))
    } else {
        write!(out, " value=({} bytes)", value.len())
    }
}

// -------------------- klog dumps --------------------

pub fn dump_header<W: Write>(out: &mut W, limit: usize) -> io::Result<()> {
    writeln!(out, "SSTable Entries (limit: {limit}):")
}

/// One line of a plain dump. Externalized values are only described.
pub fn dump_line<W: Write>(out: &mut W, d: &DumpedEntry, preview: usize) -> io::Result<()> {
    write!(out, "{}) [blk:{}] ", d.ordinal, d.block_index)?;
    write_flags(out, &d.entry)?;
    if let Some(offset) = d.entry.vlog_offset() {
        write!(out, "[VLOG:{offset}] ")?;
    }
    write!(out, "seq={} key=\"{}\"", d.entry.seq, text(&d.entry.key))?;
    match d.entry.inline_value() {
        Some(value) => write_value(out, value, preview)?,
        None => write!(out, " value=(in vlog, {} bytes)", d.entry.value_len)?,
    }
    writeln!(out)
}

pub fn full_dump_header<W: Write>(
    out: &mut W,
    limit: usize,
    klog: &Path,
    vlog: Option<&Path>,
) -> io::Result<()> {
    writeln!(out, "SSTable Full Dump (limit: {limit}):")?;
    writeln!(out, "  KLog: {}", klog.display())?;
    if let Some(vlog) = vlog {
        writeln!(out, "  VLog: {}", vlog.display())?;
    }
    writeln!(out)
}

/// One line of a full dump, with checksum and value-log tags.
pub fn full_dump_line<W: Write>(out: &mut W, d: &DumpedEntry, preview: usize) -> io::Result<()> {
    write!(out, "{}) [blk:{}", d.ordinal, d.block_index)?;
    if !d.block_checksum_ok {
        write!(out, " CHECKSUM_ERR")?;
    }
    write!(out, "] ")?;
    write_flags(out, &d.entry)?;
    if let Some(offset) = d.entry.vlog_offset() {
        write!(out, "[VLOG:{offset}")?;
        if let Some(Err(e)) = &d.vlog {
            write!(out, " {}", e.tag())?;
        }
        write!(out, "] ")?;
    }
    write!(out, "seq={} key=\"{}\"", d.entry.seq, text(&d.entry.key))?;
    match d.value() {
        Some(value) => write_value(out, value, preview)?,
        None => write!(out, " value=(vlog, {} bytes, not retrieved)", d.entry.value_len)?,
    }
    writeln!(out)
}

// -------------------- keys --------------------

pub fn keys_header<W: Write>(out: &mut W, limit: usize) -> io::Result<()> {
    writeln!(out, "SSTable Keys (limit: {limit}):")
}

pub fn key_line<W: Write>(out: &mut W, k: &ListedKey) -> io::Result<()> {
    write!(out, "{}) \"{}\"", k.ordinal, text(&k.key))?;
    if k.tombstone {
        write!(out, " [DEL]")?;
    }
    writeln!(out)
}

pub fn key_range<W: Write>(out: &mut W, first: &[u8], last: &[u8]) -> io::Result<()> {
    writeln!(out, "Key Range: \"{}\" to \"{}\"", text(first), text(last))
}

// -------------------- stats / info --------------------

pub fn stats<W: Write>(out: &mut W, path: &Path, s: &SstableStats) -> io::Result<()> {
    let e = &s.stats;
    writeln!(out, "SSTable Statistics: {}", path.display())?;
    writeln!(
        out,
        "  File Size: {} bytes ({:.2} MB)",
        s.file_size,
        s.file_size as f64 / (1024.0 * 1024.0)
    )?;
    writeln!(out, "  Block Count: {}", e.blocks)?;
    writeln!(out, "  Total Entries: {}", e.entries)?;
    writeln!(out, "  Tombstones: {} ({:.1}%)", e.tombstones, e.tombstone_pct())?;
    writeln!(out, "  TTL Entries: {}", e.ttl_entries)?;
    writeln!(out, "  VLog References: {}", e.vlog_entries)?;
    writeln!(out, "  Sequence Range: {} - {}", e.min_seq(), e.max_seq)?;
    writeln!(
        out,
        "  Key Sizes: min={} max={} avg={:.1}",
        e.key_len.min(),
        e.key_len.max,
        e.avg_key_len()
    )?;
    writeln!(
        out,
        "  Value Sizes: min={} max={} avg={:.1}",
        e.value_len.min(),
        e.value_len.max,
        e.avg_value_len()
    )?;
    if e.corrupt_blocks > 0 {
        writeln!(out, "  Checksum Errors: {}", e.corrupt_blocks)?;
    }
    if e.decode_failures > 0 {
        writeln!(out, "  Decode Failures: {}", e.decode_failures)?;
    }
    Ok(())
}

/// File summary; `wal` switches to the WAL labels.
pub fn file_info<W: Write>(out: &mut W, path: &Path, info: &FileInfo, wal: bool) -> io::Result<()> {
    let modified = info
        .modified_unix()
        .map_or_else(|| "unknown".to_string(), |s| s.to_string());
    if wal {
        writeln!(out, "WAL: {}", path.display())?;
        writeln!(out, "  File Size: {} bytes", info.size)?;
        writeln!(out, "  Block Count (entries): {}", info.block_count)?;
        writeln!(out, "  Last Modified: {modified}")?;
        return Ok(());
    }
    writeln!(out, "SSTable: {}", path.display())?;
    writeln!(out, "  File Size: {} bytes", info.size)?;
    writeln!(out, "  Block Count: {}", info.block_count)?;
    writeln!(out, "  Last Modified: {modified}")?;
    if let Some(size) = info.first_block_size {
        writeln!(out, "  First Block Size: {size} bytes")?;
    }
    if let Some(size) = info.last_block_size {
        writeln!(out, "  Last Block Size (metadata): {size} bytes")?;
    }
    Ok(())
}

// -------------------- checksum sweep --------------------

pub fn sweep_header<W: Write>(out: &mut W, path: &Path, file_size: u64) -> io::Result<()> {
    writeln!(out, "Verifying checksums: {}", path.display())?;
    writeln!(out, "  File Size: {file_size} bytes")?;
    writeln!(out)
}

pub fn sweep_fault<W: Write>(out: &mut W, fault: &BlockFault) -> io::Result<()> {
    match fault.kind {
        BlockFaultKind::Mismatch { stored, computed } => {
            writeln!(
                out,
                "  Block {} @ offset {}: CHECKSUM MISMATCH",
                fault.index, fault.offset
            )?;
            writeln!(out, "    Size: {} bytes", fault.size)?;
            writeln!(out, "    Stored:   0x{stored:08X}")?;
            writeln!(out, "    Computed: 0x{computed:08X}")
        }
        BlockFaultKind::InvalidSize(size) => writeln!(
            out,
            "  Block {} @ offset {}: INVALID SIZE ({size})",
            fault.index, fault.offset
        ),
        BlockFaultKind::ReadError { expected, got } => writeln!(
            out,
            "  Block {} @ offset {}: READ ERROR (expected {expected}, got {got})",
            fault.index, fault.offset
        ),
    }
}

pub fn sweep_totals<W: Write>(out: &mut W, report: &SweepReport) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Checksum Verification Results:")?;
    writeln!(out, "  Total Blocks: {}", report.total_blocks)?;
    writeln!(out, "  Valid: {}", report.valid)?;
    writeln!(out, "  Invalid: {}", report.invalid)?;
    let status = if report.interrupted {
        "INCOMPLETE (read error)"
    } else if report.is_clean() {
        "OK"
    } else {
        "CORRUPTED"
    };
    writeln!(out, "  Status: {status}")
}

// -------------------- bloom --------------------

pub fn bloom<W: Write>(out: &mut W, path: &Path, s: &BloomStats) -> io::Result<()> {
    writeln!(out, "Bloom Filter Statistics: {}", path.display())?;
    writeln!(out, "  Serialized Size: {} bytes", s.serialized_bytes)?;
    writeln!(out, "  Filter Size (m): {} bits ({:.2} KB)", s.m, s.size_kib())?;
    writeln!(out, "  Hash Functions (k): {}", s.k)?;
    writeln!(out, "  Storage Words: {} (uint64_t)", s.size_in_words)?;
    writeln!(out, "  Bits Set: {}", s.bits_set)?;
    writeln!(out, "  Fill Ratio: {:.2}%", s.fill_ratio * 100.0)?;
    writeln!(
        out,
        "  Estimated FPR: {:.6} ({:.4}%)",
        s.estimated_fpr,
        s.estimated_fpr * 100.0
    )?;
    if s.is_saturated() {
        writeln!(out, "  Warning: High fill ratio may increase false positives")?;
    }
    Ok(())
}

// -------------------- WAL --------------------

pub fn wal_dump_header<W: Write>(out: &mut W, limit: usize) -> io::Result<()> {
    writeln!(out, "WAL Entries (limit: {limit}):")
}

pub fn wal_line<W: Write>(out: &mut W, ordinal: usize, e: &WalEntry, preview: usize) -> io::Result<()> {
    write!(out, "{ordinal}) ")?;
    if e.entry.is_tombstone() {
        write!(out, "[DELETE] ")?;
    } else {
        write!(out, "[PUT] ")?;
    }
    if let Some(ttl) = e.entry.ttl {
        write!(out, "[TTL:{ttl}] ")?;
    }
    write!(out, "seq={} key=\"{}\"", e.entry.seq, text(&e.entry.key))?;
    if let Some(value) = e.entry.inline_value() {
        write_value(out, value, preview)?;
    }
    writeln!(out)
}

pub fn wal_verify_header<W: Write>(out: &mut W, path: &Path, file_size: u64) -> io::Result<()> {
    writeln!(out, "Verifying WAL: {}", path.display())?;
    writeln!(out, "  File Size: {file_size} bytes")
}

pub fn wal_fault<W: Write>(out: &mut W, fault: &WalFault) -> io::Result<()> {
    writeln!(out, "  {fault}")
}

pub fn wal_verify_totals<W: Write>(out: &mut W, r: &WalVerifyReport) -> io::Result<()> {
    if r.valid == 0 && r.corrupted == 0 {
        return writeln!(out, "  Status: OK (empty WAL)");
    }
    writeln!(out, "  Valid Entries: {}", r.valid)?;
    writeln!(out, "  Corrupted Entries: {}", r.corrupted)?;
    if let (Some(min), Some(max)) = (r.min_seq, r.max_seq) {
        writeln!(out, "  Sequence Range: {min} - {max}")?;
    }
    if let Some(pos) = r.last_valid_offset {
        writeln!(out, "  Last Valid Position: {pos}")?;
    }
    if r.is_clean() {
        writeln!(out, "  Status: OK")
    } else {
        writeln!(
            out,
            "  Status: CORRUPTED (recovery possible up to position {})",
            r.last_valid_offset.unwrap_or(0)
        )
    }
}

// -------------------- listing / warnings --------------------

pub fn listing<W: Write>(
    out: &mut W,
    dir: &Path,
    kind: FileKind,
    files: &[ListedFile],
) -> io::Result<()> {
    writeln!(out, "{} in '{}':", kind.label(), dir.display())?;
    if files.is_empty() {
        return writeln!(out, "  (no {} found)", kind.label());
    }
    for f in files {
        writeln!(out, "  {} ({} bytes)", f.name, f.size)?;
    }
    writeln!(out, "({} {})", files.len(), kind.label())
}

pub fn warnings<W: Write>(out: &mut W, warnings: &[Warning]) -> io::Result<()> {
    for w in warnings {
        writeln!(out, "warning: {w}")?;
    }
    Ok(())
}
