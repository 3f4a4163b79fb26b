//! # lsm-inspect - offline inspection of engine files
//!
//! Reads klog, vlog and WAL files directly from disk, without opening the
//! database, and reports what it finds. Nothing is ever written.
//!
//! ## Commands
//!
//! ```text
//! sstable-list <dir>                        List klog files with sizes
//! sstable-info <klog>                       File size, block count, block sizes
//! sstable-dump <klog> [limit]               Dump entries
//! sstable-dump-full <klog> [vlog] [limit]   Dump with value-log values and checksums
//! sstable-stats <klog>                      Entry statistics
//! sstable-keys <klog> [limit]               List keys and the key range
//! sstable-checksum <file>                   Verify every block checksum
//! bloom-stats <klog>                        Bloom filter fill ratio and FPR
//! wal-list <dir>                            List WAL files with sizes
//! wal-info <wal>                            File size and entry count
//! wal-dump <wal> [limit]                    Dump WAL entries
//! wal-verify <wal>                          Count valid and corrupted entries
//! wal-checksum <wal>                        Verify every block checksum
//! ```
//!
//! ## Exit status
//!
//! ```text
//! 0   report produced, nothing wrong
//! 1   a verification found corruption
//! 2   the file could not be opened or read
//! ```
//!
//! ## Configuration
//!
//! ```text
//! LSM_INSPECT_DUMP_LIMIT     default entry limit        (default: 1000)
//! LSM_INSPECT_LARGE_FILE_MB  large-file notice above    (default: 100)
//! LSM_INSPECT_PREVIEW_BYTES  inline value preview width (default: 64)
//! LSM_INSPECT_LOG            tracing filter, on stderr  (default: "warn")
//! ```

mod commands;
mod report;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::InspectConfig;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

use commands::{Ctx, Status};

#[derive(Debug, Parser)]
#[command(name = "lsm-inspect")]
#[command(about = "Offline inspection of klog, vlog and WAL files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    SstableList {
        dir: PathBuf,
    },
    SstableInfo {
        path: PathBuf,
    },
    SstableDump {
        path: PathBuf,
        limit: Option<usize>,
    },
    /// Dump entries, resolving externalized values.
    ///
    /// The second argument is taken as a value log if it names an existing
    /// file, otherwise as the limit.
    SstableDumpFull {
        klog: PathBuf,
        vlog_or_limit: Option<String>,
        limit: Option<String>,
    },
    SstableStats {
        path: PathBuf,
    },
    SstableKeys {
        path: PathBuf,
        limit: Option<usize>,
    },
    SstableChecksum {
        path: PathBuf,
    },
    BloomStats {
        path: PathBuf,
    },
    WalList {
        dir: PathBuf,
    },
    WalInfo {
        path: PathBuf,
    },
    WalDump {
        path: PathBuf,
        limit: Option<usize>,
    },
    WalVerify {
        path: PathBuf,
    },
    WalChecksum {
        path: PathBuf,
    },
}

/// Installs the stderr subscriber. `LSM_INSPECT_LOG` takes any `EnvFilter`
/// directive.
fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run<O: Write, E: Write>(cmd: Command, ctx: &mut Ctx<'_, O, E>) -> Result<Status> {
    match cmd {
        Command::SstableList { dir } => commands::sstable_list(ctx, &dir),
        Command::SstableInfo { path } => commands::sstable_info(ctx, &path),
        Command::SstableDump { path, limit } => commands::sstable_dump(ctx, &path, limit),
        Command::SstableDumpFull {
            klog,
            vlog_or_limit,
            limit,
        } => {
            let args = commands::dump_full_args(vlog_or_limit.as_deref(), limit.as_deref())?;
            if let Some(missing) = &args.missing_vlog {
                writeln!(
                    ctx.err,
                    "warning: value log {} not found, values will not be retrieved",
                    missing.display()
                )?;
            }
            commands::sstable_dump_full(ctx, &klog, args.vlog, args.limit)
        }
        Command::SstableStats { path } => commands::sstable_stats(ctx, &path),
        Command::SstableKeys { path, limit } => commands::sstable_keys(ctx, &path, limit),
        Command::SstableChecksum { path } | Command::WalChecksum { path } => {
            commands::verify_checksums(ctx, &path)
        }
        Command::BloomStats { path } => commands::bloom_stats(ctx, &path),
        Command::WalList { dir } => commands::wal_list(ctx, &dir),
        Command::WalInfo { path } => commands::wal_info(ctx, &path),
        Command::WalDump { path, limit } => commands::wal_dump(ctx, &path, limit),
        Command::WalVerify { path } => commands::wal_verify(ctx, &path),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = InspectConfig::from_env();
    init_logging(&config.log_filter);
    debug!(command = ?cli.cmd, ?config, "starting");

    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut out = stdout.lock();
    let mut err = stderr.lock();
    let mut ctx = Ctx {
        out: &mut out,
        err: &mut err,
        config: &config,
    };

    let code = match run(cli.cmd, &mut ctx) {
        Ok(Status::Clean) => ExitCode::SUCCESS,
        Ok(Status::Corrupted) => ExitCode::from(1),
        Err(e) => {
            let _ = writeln!(ctx.err, "error: {e:#}");
            ExitCode::from(2)
        }
    };
    let _ = ctx.out.flush();
    code
}
