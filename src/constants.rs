//! Crate-wide constants
//!
//! Centralized defaults and tuning knobs for the logging core.

// =============================================================================
// Sizes
// =============================================================================

pub const KIB: i64 = 1 << 10;
pub const MIB: i64 = 1 << 20;
pub const GIB: i64 = 1 << 30;

// =============================================================================
// Configuration defaults
// =============================================================================

/// Default maximum number of async workers
pub const DEFAULT_MAX_ASYNC_EXEC: usize = 100;

/// Default async queue capacity
pub const DEFAULT_MAX_ASYNC_BUFFER: usize = 128;

/// Default file write buffer size (bytes)
pub const DEFAULT_MAX_WRITE_BUFFER: usize = 4096;

/// Default number of rotated log files
pub const DEFAULT_MAX_FILE_COUNT: usize = 5;

/// Default size limit of a single log file (bytes)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * MIB as u64;

/// Default log directory, relative to the executable
pub const DEFAULT_FILE_DIR: &str = "log";

/// File name used when the executable name cannot be resolved
pub const FALLBACK_FILE_NAME: &str = "app";

/// Default periodic flush interval
pub const DEFAULT_FLUSH_INTERVAL: &str = "3h";

/// Default retention period (0 disables expiry)
pub const DEFAULT_EXPIRE_TIME: &str = "0s";

// =============================================================================
// Async worker pool
// =============================================================================

/// Failed enqueue attempts before the producer grows the worker pool
pub const SPAWN_AFTER_RETRIES: u32 = 3;

/// Upper bound of the exponential yield backoff (2^n yields)
pub const MAX_BACKOFF_SHIFT: u32 = 6;

/// Poll timeout of an idle worker (milliseconds)
pub const IDLE_POLL_MS: u64 = 1;

/// Consecutive idle polls before a worker retires
pub const IDLE_THRESHOLD: u32 = 100;

/// Consecutive busy iterations before a worker yields its time slice
pub const BUSY_YIELD_THRESHOLD: u32 = 100;

// =============================================================================
// Pools
// =============================================================================

/// Maximum number of free buffers kept per pool
pub const BUFFER_POOL_LIMIT: usize = 1024;

/// Buffers grown past this capacity are dropped instead of pooled
pub const MAX_POOLED_CAPACITY: usize = 64 * 1024;

/// Initial capacity of a freshly allocated buffer
pub const INITIAL_BUFFER_CAPACITY: usize = 128;

// =============================================================================
// Rendering
// =============================================================================

/// Timestamp layout of the tips segment (YY.MM.DD-hh:mm:ss.mmm)
pub const TIPS_TIME_FORMAT: &str = "%y.%m.%d-%H:%M:%S%.3f";

/// Timestamp layout used in time-stamped file names (YYMMDDhhmmss)
pub const FILE_TIME_FORMAT: &str = "%y%m%d%H%M%S";

/// ANSI reset sequence closing a colored tips segment
pub const STYLE_END: &str = "\x1b[0m";
