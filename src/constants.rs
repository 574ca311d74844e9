use std::time::Duration;

pub const DEFAULT_TIME_LIMIT_MS: u64 = 5000;
pub const MIN_TIME_LIMIT_MS: u64 = 100;
pub const MAX_TIME_LIMIT_MS: u64 = 10_000;

pub const DEFAULT_MEMORY_LIMIT_MB: u64 = 256;
pub const MIN_MEMORY_LIMIT_MB: u64 = 1;
pub const MAX_MEMORY_LIMIT_MB: u64 = 512;

/// Compilation is not charged against the submission's time limit.
pub const NATIVE_COMPILE_TIME_LIMIT_MS: u64 = 10_000;
pub const CLASS_COMPILE_TIME_LIMIT_MS: u64 = 15_000;

/// Per-stream cap, in characters.
pub const OUTPUT_LIMIT_CHARS: usize = 10_000;

pub const STDOUT_TRUNCATED_MARKER: &str = "\n... (output truncated)";
pub const STDERR_TRUNCATED_MARKER: &str = "\n... (error output truncated)";

pub const TIMEOUT_ERROR: &str = "Execution timed out";
pub const OUTPUT_LIMIT_ERROR: &str = "Output limit exceeded";
pub const COMPILATION_FAILED_ERROR: &str = "Compilation failed";
pub const COMPILATION_ERROR_PREFIX: &str = "Compilation Error:\n";

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30 * 60);
pub const MAX_FILE_AGE: Duration = Duration::from_secs(60 * 60);

/// How long pipe readers may keep draining after the child is gone.
pub const DRAIN_GRACE: Duration = Duration::from_millis(200);

pub const WORKSPACE_DIR_NAME: &str = "coding-club-executor";
pub const FALLBACK_CLASS_NAME: &str = "Main";
