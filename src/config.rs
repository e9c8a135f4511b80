//! Configuration management
//!
//! `Config` is the raw, user-facing form: serde-friendly, loadable from a
//! TOML or JSON file and adjustable with `with_*` builder methods. Any value
//! may be out of range. `Config::normalize` turns it into `Settings`, the
//! validated form shared read-only by every core component; invalid values
//! are silently replaced by their defaults.

use crate::constants::{
    DEFAULT_EXPIRE_TIME, DEFAULT_FILE_DIR, DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_ASYNC_BUFFER,
    DEFAULT_MAX_ASYNC_EXEC, DEFAULT_MAX_FILE_COUNT, DEFAULT_MAX_FILE_SIZE,
    DEFAULT_MAX_WRITE_BUFFER, FALLBACK_FILE_NAME,
};
use crate::error::{LogError, Result};
use crate::level::{Level, Style};
use crate::logger::Logger;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

// =============================================================================
// Callbacks
// =============================================================================

/// Payload recovered from a panic
pub type PanicPayload = Box<dyn Any + Send>;

/// Unit of work handed to an [`Executor`]
pub type Task = Box<dyn FnOnce() + Send>;

/// Receives every pushed record with its rendered message text
pub type MsgCallback = Arc<dyn Fn(Level, &str) + Send + Sync>;

/// Invoked on a detached thread after a Fatal record has been pushed
pub type FatalHandling = Arc<dyn Fn(&Logger, Option<PanicPayload>) + Send + Sync>;

/// Launch strategy for message callbacks
pub type Executor = Arc<dyn Fn(Task) + Send + Sync>;

// =============================================================================
// Raw configuration
// =============================================================================

/// Logger configuration
///
/// Numeric fields are signed so that out-of-range values coming from a file
/// can be detected and replaced by defaults.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fatal record handler (None = log, close and exit the process)
    #[serde(skip)]
    pub fatal_handling: Option<FatalHandling>,
    /// Message callback (None = disabled)
    #[serde(skip)]
    pub msg_callback: Option<MsgCallback>,
    /// Callback launch strategy (None = one detached thread per callback)
    #[serde(skip)]
    pub exec: Option<Executor>,

    /// Minimum level, 0 (VerBose) ..= 5 (Fatal)
    pub level: i64,
    /// Rendering style, 0 (Basic) ..= 2 (Detail)
    pub style: i64,
    /// Dispatch through the async worker pool instead of the caller thread
    pub enable_async: bool,
    /// Put the start time and pid in file names
    pub enable_file_time: bool,
    /// Disable the file sink
    pub disable_save: bool,
    /// Disable the console sink
    pub disable_print: bool,

    /// Maximum number of async workers (<= 0 = default)
    pub max_async_exec: i64,
    /// Async queue capacity (< 0 = default, 0 = rendezvous)
    pub max_async_buffer: i64,
    /// File write buffer size (< 0 = default, 0 = flush every write)
    pub max_write_buffer: i64,
    /// Number of rotated files (<= 0 = default)
    pub max_file_count: i64,
    /// Size limit of one file in bytes (<= 0 = default)
    pub max_file_size: i64,
    /// Log directory (empty = `log` next to the executable)
    pub file_dir: String,
    /// File name prefix (empty = executable name)
    pub file_name: String,
    /// Periodic flush interval, e.g. "3h" or "500ms" ("0s" disables)
    pub flush_interval: String,
    /// Retention period, e.g. "24h" ("0s" disables)
    pub expire_time: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fatal_handling: None,
            msg_callback: None,
            exec: None,
            level: Level::Warning as i64,
            style: Style::Brief as i64,
            enable_async: false,
            enable_file_time: false,
            disable_save: false,
            disable_print: false,
            max_async_exec: DEFAULT_MAX_ASYNC_EXEC as i64,
            max_async_buffer: DEFAULT_MAX_ASYNC_BUFFER as i64,
            max_write_buffer: DEFAULT_MAX_WRITE_BUFFER as i64,
            max_file_count: DEFAULT_MAX_FILE_COUNT as i64,
            max_file_size: DEFAULT_MAX_FILE_SIZE as i64,
            file_dir: String::new(),
            file_name: String::new(),
            flush_interval: DEFAULT_FLUSH_INTERVAL.to_string(),
            expire_time: DEFAULT_EXPIRE_TIME.to_string(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("fatal_handling", &self.fatal_handling.is_some())
            .field("msg_callback", &self.msg_callback.is_some())
            .field("exec", &self.exec.is_some())
            .field("level", &self.level)
            .field("style", &self.style)
            .field("enable_async", &self.enable_async)
            .field("enable_file_time", &self.enable_file_time)
            .field("disable_save", &self.disable_save)
            .field("disable_print", &self.disable_print)
            .field("max_async_exec", &self.max_async_exec)
            .field("max_async_buffer", &self.max_async_buffer)
            .field("max_write_buffer", &self.max_write_buffer)
            .field("max_file_count", &self.max_file_count)
            .field("max_file_size", &self.max_file_size)
            .field("file_dir", &self.file_dir)
            .field("file_name", &self.file_name)
            .field("flush_interval", &self.flush_interval)
            .field("expire_time", &self.expire_time)
            .finish()
    }
}

// === Builder ===

impl Config {
    pub fn with_fatal_handling(
        mut self,
        handling: impl Fn(&Logger, Option<PanicPayload>) + Send + Sync + 'static,
    ) -> Self {
        self.fatal_handling = Some(Arc::new(handling));
        self
    }

    pub fn with_msg_callback(mut self, callback: impl Fn(Level, &str) + Send + Sync + 'static) -> Self {
        self.msg_callback = Some(Arc::new(callback));
        self
    }

    pub fn with_exec(mut self, exec: impl Fn(Task) + Send + Sync + 'static) -> Self {
        self.exec = Some(Arc::new(exec));
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level as i64;
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style as i64;
        self
    }

    pub fn with_async(mut self, enable: bool) -> Self {
        self.enable_async = enable;
        self
    }

    pub fn with_file_time(mut self, enable: bool) -> Self {
        self.enable_file_time = enable;
        self
    }

    pub fn with_disable_save(mut self, disable: bool) -> Self {
        self.disable_save = disable;
        self
    }

    pub fn with_disable_print(mut self, disable: bool) -> Self {
        self.disable_print = disable;
        self
    }

    pub fn with_max_async_exec(mut self, max: i64) -> Self {
        self.max_async_exec = max;
        self
    }

    pub fn with_max_async_buffer(mut self, max: i64) -> Self {
        self.max_async_buffer = max;
        self
    }

    pub fn with_write_buffer_size(mut self, size: i64) -> Self {
        self.max_write_buffer = size;
        self
    }

    pub fn with_max_file_count(mut self, max: i64) -> Self {
        self.max_file_count = max;
        self
    }

    pub fn with_max_file_size(mut self, max: i64) -> Self {
        self.max_file_size = max;
        self
    }

    pub fn with_file_dir(mut self, dir: impl Into<String>) -> Self {
        self.file_dir = dir.into();
        self
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    pub fn with_flush_interval(mut self, interval: impl Into<String>) -> Self {
        self.flush_interval = interval.into();
        self
    }

    pub fn with_expire_time(mut self, expire: impl Into<String>) -> Self {
        self.expire_time = expire.into();
        self
    }
}

// =============================================================================
// Validated settings
// =============================================================================

/// Validated configuration, immutable once built
pub(crate) struct Settings {
    pub fatal_handling: FatalHandling,
    pub msg_callback: Option<MsgCallback>,
    pub exec: Executor,
    pub level: Level,
    pub style: Style,
    pub enable_async: bool,
    pub enable_file_time: bool,
    pub disable_save: bool,
    pub disable_print: bool,
    pub max_async_exec: usize,
    pub max_async_buffer: usize,
    pub max_write_buffer: usize,
    pub max_file_count: usize,
    pub max_file_size: u64,
    pub file_dir: PathBuf,
    pub file_name: String,
    pub flush_interval: Duration,
    pub expire_time: Duration,
    /// Stamped at normalization, used in time-stamped file names
    pub start_time: DateTime<Local>,
}

impl Config {
    /// Validate every field, replacing invalid values with defaults
    pub(crate) fn normalize(self) -> Settings {
        let level = Level::from_index(self.level).unwrap_or_default();
        let style = Style::from_index(self.style).unwrap_or_default();

        let flush_interval = parse_duration(&self.flush_interval).unwrap_or_else(|| {
            debug!(value = %self.flush_interval, "invalid flush interval, using default");
            parse_duration(DEFAULT_FLUSH_INTERVAL).unwrap_or_default()
        });
        let expire_time = parse_duration(&self.expire_time).unwrap_or_else(|| {
            debug!(value = %self.expire_time, "invalid expire time, expiry disabled");
            Duration::ZERO
        });

        let file_dir = if self.file_dir.is_empty() {
            default_file_dir()
        } else {
            PathBuf::from(&self.file_dir)
        };
        let file_name = if self.file_name.is_empty() {
            default_file_name()
        } else {
            self.file_name
        };

        Settings {
            fatal_handling: self.fatal_handling.unwrap_or_else(default_fatal_handling),
            msg_callback: self.msg_callback,
            exec: self.exec.unwrap_or_else(default_executor),
            level,
            style,
            enable_async: self.enable_async,
            enable_file_time: self.enable_file_time,
            disable_save: self.disable_save,
            disable_print: self.disable_print,
            max_async_exec: positive(self.max_async_exec).unwrap_or(DEFAULT_MAX_ASYNC_EXEC),
            max_async_buffer: non_negative(self.max_async_buffer)
                .unwrap_or(DEFAULT_MAX_ASYNC_BUFFER),
            max_write_buffer: non_negative(self.max_write_buffer)
                .unwrap_or(DEFAULT_MAX_WRITE_BUFFER),
            max_file_count: positive(self.max_file_count).unwrap_or(DEFAULT_MAX_FILE_COUNT),
            max_file_size: u64::try_from(self.max_file_size)
                .ok()
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_MAX_FILE_SIZE),
            file_dir,
            file_name,
            flush_interval,
            expire_time,
            start_time: Local::now(),
        }
    }
}

fn positive(value: i64) -> Option<usize> {
    usize::try_from(value).ok().filter(|v| *v > 0)
}

fn non_negative(value: i64) -> Option<usize> {
    usize::try_from(value).ok()
}

/// Parse a human readable duration ("3h", "1h 30m", "250ms", "0s")
pub(crate) fn parse_duration(text: &str) -> Option<Duration> {
    let text = text.trim();
    if text == "0" {
        return Some(Duration::ZERO);
    }
    humantime::parse_duration(text).ok()
}

fn default_file_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_FILE_DIR)
}

fn default_file_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}

fn default_executor() -> Executor {
    Arc::new(|task: Task| {
        if let Err(e) = thread::Builder::new()
            .name("oc-log-callback".to_string())
            .spawn(task)
        {
            warn!("Failed to spawn callback thread: {}", e);
        }
    })
}

fn default_fatal_handling() -> FatalHandling {
    Arc::new(|logger: &Logger, payload: Option<PanicPayload>| {
        logger.errorf(format_args!(
            "abnormal exits from panic: {}\n{}",
            panic_message(payload.as_ref()),
            Backtrace::force_capture()
        ));
        logger.close();
        std::process::exit(1);
    })
}

/// Human readable form of a recovered panic payload
pub fn panic_message(payload: Option<&PanicPayload>) -> String {
    match payload {
        None => "none".to_string(),
        Some(p) => {
            if let Some(s) = p.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = p.downcast_ref::<String>() {
                s.clone()
            } else {
                "<non-string panic payload>".to_string()
            }
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Load a configuration file
///
/// `.json` files are parsed as JSON, anything else as TOML. Missing keys keep
/// their defaults.
pub fn load(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| LogError::ConfigRead {
        path: path.to_path_buf(),
        source: Arc::new(e),
    })?;

    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let parsed = if is_json {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    } else {
        toml::from_str(&content).map_err(|e| e.to_string())
    };

    parsed.map_err(|reason| LogError::ConfigParse {
        path: path.to_path_buf(),
        reason,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Default values tests
    // =========================================================================

    #[test]
    fn test_default_config_values() {
        let config = Config::default();

        assert_eq!(config.level, Level::Warning as i64);
        assert_eq!(config.style, Style::Brief as i64);
        assert!(!config.enable_async);
        assert!(!config.disable_save);
        assert!(!config.disable_print);
        assert_eq!(config.max_async_exec, 100);
        assert_eq!(config.max_async_buffer, 128);
        assert_eq!(config.max_write_buffer, 4096);
        assert_eq!(config.max_file_count, 5);
        assert_eq!(config.max_file_size, 5 * 1024 * 1024);
        assert_eq!(config.flush_interval, "3h");
        assert_eq!(config.expire_time, "0s");
    }

    #[test]
    fn test_normalize_defaults() {
        let settings = Config::default().normalize();

        assert_eq!(settings.level, Level::Warning);
        assert_eq!(settings.style, Style::Brief);
        assert_eq!(settings.max_async_exec, DEFAULT_MAX_ASYNC_EXEC);
        assert_eq!(settings.flush_interval, Duration::from_secs(3 * 3600));
        assert_eq!(settings.expire_time, Duration::ZERO);
        assert!(settings.file_dir.ends_with(DEFAULT_FILE_DIR));
        assert!(!settings.file_name.is_empty());
        assert!(settings.msg_callback.is_none());
    }

    // =========================================================================
    // Invalid value replacement tests
    // =========================================================================

    #[test]
    fn test_normalize_replaces_invalid_values() {
        let config = Config {
            level: 42,
            style: -1,
            max_async_exec: 0,
            max_async_buffer: -5,
            max_write_buffer: -1,
            max_file_count: -3,
            max_file_size: 0,
            flush_interval: "soon".to_string(),
            expire_time: "later".to_string(),
            ..Default::default()
        };
        let settings = config.normalize();

        assert_eq!(settings.level, Level::Warning);
        assert_eq!(settings.style, Style::Brief);
        assert_eq!(settings.max_async_exec, DEFAULT_MAX_ASYNC_EXEC);
        assert_eq!(settings.max_async_buffer, DEFAULT_MAX_ASYNC_BUFFER);
        assert_eq!(settings.max_write_buffer, DEFAULT_MAX_WRITE_BUFFER);
        assert_eq!(settings.max_file_count, DEFAULT_MAX_FILE_COUNT);
        assert_eq!(settings.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(settings.flush_interval, Duration::from_secs(3 * 3600));
        assert_eq!(settings.expire_time, Duration::ZERO);
    }

    #[test]
    fn test_normalize_keeps_zero_buffers() {
        let settings = Config::default()
            .with_max_async_buffer(0)
            .with_write_buffer_size(0)
            .with_flush_interval("0s")
            .normalize();

        assert_eq!(settings.max_async_buffer, 0);
        assert_eq!(settings.max_write_buffer, 0);
        assert_eq!(settings.flush_interval, Duration::ZERO);
    }

    #[test]
    fn test_builder_chain() {
        let settings = Config::default()
            .with_level(Level::VerBose)
            .with_style(Style::Detail)
            .with_async(true)
            .with_file_dir("/tmp/oc-log")
            .with_file_name("svc")
            .with_expire_time("1h 30m")
            .with_msg_callback(|_, _| {})
            .normalize();

        assert_eq!(settings.level, Level::VerBose);
        assert_eq!(settings.style, Style::Detail);
        assert!(settings.enable_async);
        assert_eq!(settings.file_dir, PathBuf::from("/tmp/oc-log"));
        assert_eq!(settings.file_name, "svc");
        assert_eq!(settings.expire_time, Duration::from_secs(90 * 60));
        assert!(settings.msg_callback.is_some());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("0s"), Some(Duration::ZERO));
        assert_eq!(parse_duration("0"), Some(Duration::ZERO));
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("3h"), Some(Duration::from_secs(10800)));
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("fast"), None);
    }

    // =========================================================================
    // File format tests
    // =========================================================================

    #[test]
    fn test_config_partial_toml() {
        let partial = r#"
level = 1
enable_async = true
file_name = "bridge"
"#;
        let config: Config = toml::from_str(partial).unwrap();

        assert_eq!(config.level, 1);
        assert!(config.enable_async);
        assert_eq!(config.file_name, "bridge");
        // Rest should be defaults
        assert_eq!(config.max_file_count, 5);
        assert_eq!(config.flush_interval, "3h");
    }

    #[test]
    fn test_config_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.level, Level::Warning as i64);
        assert_eq!(config.max_async_buffer, 128);
    }

    #[test]
    fn test_load_json_and_toml_files() {
        let dir = tempfile::tempdir().unwrap();

        let json = dir.path().join("log.json");
        fs::write(&json, r#"{ "style": 2, "max_file_size": 1024 }"#).unwrap();
        let config = load(&json).unwrap();
        assert_eq!(config.style, 2);
        assert_eq!(config.max_file_size, 1024);

        let toml_path = dir.path().join("log.toml");
        fs::write(&toml_path, "disable_print = true\n").unwrap();
        let config = load(&toml_path).unwrap();
        assert!(config.disable_print);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = load(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(LogError::ConfigRead { .. })));

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "level = [").unwrap();
        assert!(matches!(load(&broken), Err(LogError::ConfigParse { .. })));
    }

    #[test]
    fn test_panic_message() {
        let payload: PanicPayload = Box::new("boom");
        assert_eq!(panic_message(Some(&payload)), "boom");

        let payload: PanicPayload = Box::new(String::from("bang"));
        assert_eq!(panic_message(Some(&payload)), "bang");

        assert_eq!(panic_message(None), "none");
    }
}
