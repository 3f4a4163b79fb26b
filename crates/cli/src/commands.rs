//! One function per subcommand. Each writes its report to `out`, warnings to
//! `err`, and says whether corruption was found.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use config::InspectConfig;
use inspect::dump::{dump_sstable, dump_wal, DumpOptions};
use inspect::listing::{list_files, FileKind};
use inspect::checksum::{self, SweepReport};
use inspect::{filter, info, keys, stats, Inspected};
use wal::WalReader;

use crate::report;

/// How a command ended when it produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Clean,
    /// A verification found corruption.
    Corrupted,
}

/// Output sinks plus settings shared by every command.
pub struct Ctx<'a, O: Write, E: Write> {
    pub out: &'a mut O,
    pub err: &'a mut E,
    pub config: &'a InspectConfig,
}

impl<O: Write, E: Write> Ctx<'_, O, E> {
    fn limit(&self, requested: Option<usize>) -> usize {
        requested.filter(|&n| n > 0).unwrap_or(self.config.dump_limit)
    }

    fn warn<T>(&mut self, result: &Inspected<T>) -> io::Result<()> {
        report::warnings(self.err, &result.warnings)
    }
}

/// Optional arguments of `sstable-dump-full`, once told apart.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DumpFullArgs {
    pub vlog: Option<PathBuf>,
    pub limit: Option<usize>,
    /// A value-log argument naming no file. The dump runs without one.
    pub missing_vlog: Option<PathBuf>,
}

/// Splits the optional arguments of `sstable-dump-full`. The first is a
/// value log if it names an existing regular file, the limit if it is a
/// number, and otherwise a value log that cannot be found.
pub fn dump_full_args(second: Option<&str>, third: Option<&str>) -> Result<DumpFullArgs> {
    let parse = |s: &str| {
        s.parse::<usize>()
            .with_context(|| format!("invalid limit '{s}'"))
    };
    let Some(arg) = second else {
        return Ok(DumpFullArgs::default());
    };
    if Path::new(arg).is_file() {
        return Ok(DumpFullArgs {
            vlog: Some(PathBuf::from(arg)),
            limit: third.map(parse).transpose()?,
            missing_vlog: None,
        });
    }
    if third.is_none() {
        if let Ok(limit) = arg.parse::<usize>() {
            return Ok(DumpFullArgs {
                limit: Some(limit),
                ..DumpFullArgs::default()
            });
        }
    }
    Ok(DumpFullArgs {
        vlog: None,
        limit: third.map(parse).transpose()?,
        missing_vlog: Some(PathBuf::from(arg)),
    })
}

// -------------------- SSTable commands --------------------

pub fn sstable_list<O: Write, E: Write>(ctx: &mut Ctx<'_, O, E>, dir: &Path) -> Result<Status> {
    let files = list_files(dir, FileKind::Klog)?;
    report::listing(ctx.out, dir, FileKind::Klog, &files)?;
    Ok(Status::Clean)
}

pub fn sstable_info<O: Write, E: Write>(ctx: &mut Ctx<'_, O, E>, path: &Path) -> Result<Status> {
    let result = info::file_info(path)?;
    report::file_info(ctx.out, path, &result.value, false)?;
    ctx.warn(&result)?;
    Ok(Status::Clean)
}

pub fn sstable_dump<O: Write, E: Write>(
    ctx: &mut Ctx<'_, O, E>,
    path: &Path,
    limit: Option<usize>,
) -> Result<Status> {
    let limit = ctx.limit(limit);
    let preview = ctx.config.preview_bytes;
    let options = DumpOptions::from_config(ctx.config).with_limit(limit);

    report::dump_header(ctx.out, limit)?;
    let out = &mut *ctx.out;
    let mut written = Ok(());
    let result = dump_sstable(path, &options, |entry| {
        if written.is_ok() {
            written = report::dump_line(out, &entry, preview);
        }
    })?;
    written?;

    let summary = result.value;
    if summary.blocks == 0 {
        writeln!(ctx.out, "(empty SSTable)")?;
    } else {
        writeln!(ctx.out)?;
        writeln!(
            ctx.out,
            "({} entries dumped from {} blocks)",
            summary.entries, summary.blocks
        )?;
    }
    ctx.warn(&result)?;
    Ok(Status::Clean)
}

pub fn sstable_dump_full<O: Write, E: Write>(
    ctx: &mut Ctx<'_, O, E>,
    klog: &Path,
    vlog: Option<PathBuf>,
    limit: Option<usize>,
) -> Result<Status> {
    let limit = ctx.limit(limit);
    let preview = ctx.config.preview_bytes;

    report::full_dump_header(ctx.out, limit, klog, vlog.as_deref())?;
    let options = DumpOptions::from_config(ctx.config)
        .with_limit(limit)
        .with_vlog(vlog);
    let out = &mut *ctx.out;
    let mut written = Ok(());
    let result = dump_sstable(klog, &options, |entry| {
        if written.is_ok() {
            written = report::full_dump_line(out, &entry, preview);
        }
    })?;
    written?;

    let summary = result.value;
    writeln!(ctx.out)?;
    write!(
        ctx.out,
        "({} entries from {} blocks",
        summary.entries, summary.blocks
    )?;
    if summary.checksum_errors > 0 {
        write!(ctx.out, ", {} checksum errors", summary.checksum_errors)?;
    }
    writeln!(ctx.out, ")")?;
    ctx.warn(&result)?;

    Ok(if summary.checksum_errors > 0 || result.has_faults() {
        Status::Corrupted
    } else {
        Status::Clean
    })
}

pub fn sstable_stats<O: Write, E: Write>(ctx: &mut Ctx<'_, O, E>, path: &Path) -> Result<Status> {
    let result = stats::sstable_stats(path)?;
    if result.value.stats.blocks == 0 {
        writeln!(ctx.out, "(empty SSTable)")?;
    } else {
        report::stats(ctx.out, path, &result.value)?;
    }
    ctx.warn(&result)?;
    Ok(Status::Clean)
}

pub fn sstable_keys<O: Write, E: Write>(
    ctx: &mut Ctx<'_, O, E>,
    path: &Path,
    limit: Option<usize>,
) -> Result<Status> {
    let limit = ctx.limit(limit);
    report::keys_header(ctx.out, limit)?;
    let out = &mut *ctx.out;
    let mut written = Ok(());
    let result = keys::list_keys(path, limit, Some(ctx.config.large_file_bytes), |k| {
        if written.is_ok() {
            written = report::key_line(out, k);
        }
    })?;
    written?;

    let summary = &result.value;
    writeln!(ctx.out)?;
    writeln!(ctx.out, "({} keys listed)", summary.keys)?;
    if let (Some(first), Some(last)) = (&summary.first, &summary.last) {
        report::key_range(ctx.out, first, last)?;
    }
    ctx.warn(&result)?;
    Ok(Status::Clean)
}

/// Raw checksum sweep; shared by `sstable-checksum` and `wal-checksum`.
pub fn verify_checksums<O: Write, E: Write>(ctx: &mut Ctx<'_, O, E>, path: &Path) -> Result<Status> {
    let reader = checksum::open(path)?;
    report::sweep_header(ctx.out, path, reader.len())?;
    let out = &mut *ctx.out;
    let mut written = Ok(());
    let result = checksum::sweep_reader(reader, |fault| {
        if written.is_ok() {
            written = report::sweep_fault(out, fault);
        }
    });
    written?;

    report::sweep_totals(ctx.out, &result.value)?;
    ctx.warn(&result)?;
    sweep_status(path, &result.value)
}

/// A sweep cut short by a read error verified nothing past that point, so it
/// fails the command instead of passing as clean.
pub fn sweep_status(path: &Path, report: &SweepReport) -> Result<Status> {
    if report.interrupted {
        bail!(
            "checksum sweep of {} stopped by a read error after {} blocks",
            path.display(),
            report.total_blocks
        );
    }
    Ok(if report.is_clean() {
        Status::Clean
    } else {
        Status::Corrupted
    })
}

pub fn bloom_stats<O: Write, E: Write>(ctx: &mut Ctx<'_, O, E>, path: &Path) -> Result<Status> {
    let result = filter::bloom_stats(path)?;
    match &result.value.inspection {
        bloom::BloomInspection::Disabled => {
            writeln!(ctx.out, "Bloom Filter: disabled (empty block)")?;
        }
        bloom::BloomInspection::Present(stats) => report::bloom(ctx.out, path, stats)?,
    }
    ctx.warn(&result)?;
    Ok(Status::Clean)
}

// -------------------- WAL commands --------------------

pub fn wal_list<O: Write, E: Write>(ctx: &mut Ctx<'_, O, E>, dir: &Path) -> Result<Status> {
    let files = list_files(dir, FileKind::Wal)?;
    report::listing(ctx.out, dir, FileKind::Wal, &files)?;
    Ok(Status::Clean)
}

pub fn wal_info<O: Write, E: Write>(ctx: &mut Ctx<'_, O, E>, path: &Path) -> Result<Status> {
    let result = info::file_info(path)?;
    report::file_info(ctx.out, path, &result.value, true)?;
    ctx.warn(&result)?;
    Ok(Status::Clean)
}

pub fn wal_dump<O: Write, E: Write>(
    ctx: &mut Ctx<'_, O, E>,
    path: &Path,
    limit: Option<usize>,
) -> Result<Status> {
    let limit = ctx.limit(limit);
    let preview = ctx.config.preview_bytes;

    report::wal_dump_header(ctx.out, limit)?;
    let out = &mut *ctx.out;
    let mut ordinal = 0;
    let mut written = Ok(());
    let result = dump_wal(path, limit, Some(ctx.config.large_file_bytes), |entry| {
        ordinal += 1;
        if written.is_ok() {
            written = report::wal_line(out, ordinal, &entry, preview);
        }
    })?;
    written?;

    if result.value.entries == 0 && result.value.corrupted == 0 {
        writeln!(ctx.out, "(empty WAL)")?;
    } else {
        writeln!(ctx.out)?;
        writeln!(ctx.out, "({} WAL entries dumped)", result.value.entries)?;
    }
    ctx.warn(&result)?;
    Ok(Status::Clean)
}

pub fn wal_verify<O: Write, E: Write>(ctx: &mut Ctx<'_, O, E>, path: &Path) -> Result<Status> {
    let reader =
        WalReader::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    report::wal_verify_header(ctx.out, path, reader.file_len())?;
    let out = &mut *ctx.out;
    let mut written = Ok(());
    let verified = reader.verify_with(|fault| {
        if written.is_ok() {
            written = report::wal_fault(out, fault);
        }
    });
    written?;
    report::wal_verify_totals(ctx.out, &verified)?;
    if let Some(tail) = &verified.truncated_tail {
        writeln!(ctx.err, "warning: partial block at end of file: {tail}")?;
    }
    if let Some(stop) = &verified.stopped_by {
        writeln!(ctx.err, "warning: stopped at unreadable block: {stop}")?;
    }
    Ok(if verified.is_clean() {
        Status::Clean
    } else {
        Status::Corrupted
    })
}
