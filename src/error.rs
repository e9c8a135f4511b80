//! Centralized error types for the logging core
//!
//! All errors are represented by the `LogError` enum.
//! Use `Result<T>` as shorthand for `std::result::Result<T, LogError>`.
//!
//! File sink errors are sticky: they are stored on the storage and queried,
//! never returned to a log call site. Sources are reference counted so the
//! stored error can be handed out by value.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// All logging errors
#[derive(Debug, Clone)]
pub enum LogError {
    // === Storage ===
    /// Failed to create the log directory
    CreateDir { path: PathBuf, source: Arc<io::Error> },
    /// Failed to create or open a log file
    OpenFile { path: PathBuf, source: Arc<io::Error> },
    /// Failed to query the size of an opened log file
    FileSize { path: PathBuf, source: Arc<io::Error> },
    /// Failed to write to a log file
    Write { path: PathBuf, source: Arc<io::Error> },
    /// Failed to flush or sync a log file
    Flush { path: PathBuf, source: Arc<io::Error> },

    // === Configuration ===
    /// Failed to read a configuration file
    ConfigRead { path: PathBuf, source: Arc<io::Error> },
    /// Configuration file content is malformed
    ConfigParse { path: PathBuf, reason: String },
}

impl LogError {
    pub(crate) fn create_dir(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::CreateDir {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn open_file(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::OpenFile {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn file_size(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileSize {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn flush(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Flush {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}

impl std::error::Error for LogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CreateDir { source, .. }
            | Self::OpenFile { source, .. }
            | Self::FileSize { source, .. }
            | Self::Write { source, .. }
            | Self::Flush { source, .. }
            | Self::ConfigRead { source, .. } => Some(source.as_ref()),
            Self::ConfigParse { .. } => None,
        }
    }
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateDir { path, source } => {
                write!(f, "Cannot create log directory {}: {}", path.display(), source)
            }
            Self::OpenFile { path, source } => {
                write!(f, "Cannot open log file {}: {}", path.display(), source)
            }
            Self::FileSize { path, source } => {
                write!(f, "Cannot stat log file {}: {}", path.display(), source)
            }
            Self::Write { path, source } => {
                write!(f, "Cannot write log file {}: {}", path.display(), source)
            }
            Self::Flush { path, source } => {
                write!(f, "Cannot flush log file {}: {}", path.display(), source)
            }
            Self::ConfigRead { path, .. } => write!(f, "Cannot read config: {}", path.display()),
            Self::ConfigParse { path, reason } => {
                write!(f, "Invalid config {}: {}", path.display(), reason)
            }
        }
    }
}

/// Alias for Result with LogError
pub type Result<T> = std::result::Result<T, LogError>;
