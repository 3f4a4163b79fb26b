//! # Config - tool settings
//!
//! Settings are read from the environment, each falling back to a default
//! when unset or unparsable:
//!
//! ```text
//! LSM_INSPECT_DUMP_LIMIT     entries printed by dump commands    (default: 1000)
//! LSM_INSPECT_LARGE_FILE_MB  size that triggers a large-file note (default: 100)
//! LSM_INSPECT_PREVIEW_BYTES  inline values shown up to this size  (default: 64)
//! LSM_INSPECT_LOG            tracing filter directive             (default: "warn")
//! ```
//!
//! Command-line arguments take precedence over all of these.

pub const DEFAULT_DUMP_LIMIT: usize = 1000;
pub const DEFAULT_LARGE_FILE_MB: u64 = 100;
pub const DEFAULT_PREVIEW_BYTES: usize = 64;
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Tunables shared by the inspection drivers and the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectConfig {
    /// Entry limit used when a command is not given one.
    pub dump_limit: usize,
    /// Files above this many bytes get a large-file warning.
    pub large_file_bytes: u64,
    /// Inline values up to this many bytes are printed; longer ones are summarized.
    pub preview_bytes: usize,
    pub log_filter: String,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            dump_limit: DEFAULT_DUMP_LIMIT,
            large_file_bytes: DEFAULT_LARGE_FILE_MB * 1024 * 1024,
            preview_bytes: DEFAULT_PREVIEW_BYTES,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl InspectConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let dump_limit = env_or("LSM_INSPECT_DUMP_LIMIT", "1000")
            .parse()
            .ok()
            .filter(|&n: &usize| n > 0)
            .unwrap_or(DEFAULT_DUMP_LIMIT);
        let large_file_mb: u64 = env_or("LSM_INSPECT_LARGE_FILE_MB", "100")
            .parse()
            .unwrap_or(DEFAULT_LARGE_FILE_MB);
        let preview_bytes = env_or("LSM_INSPECT_PREVIEW_BYTES", "64")
            .parse()
            .unwrap_or(DEFAULT_PREVIEW_BYTES);
        let log_filter = env_or("LSM_INSPECT_LOG", DEFAULT_LOG_FILTER);

        Self {
            dump_limit,
            large_file_bytes: large_file_mb.saturating_mul(1024 * 1024),
            preview_bytes,
            log_filter,
        }
    }
}
