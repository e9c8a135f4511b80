//! Severity levels and rendering styles

use std::fmt;

/// Log severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Level {
    /// Variable dumps
    VerBose = 0,
    /// Detailed debugging output
    Debug = 1,
    /// Execution flow tracing
    Trace = 2,
    /// Something unexpected but recoverable
    #[default]
    Warning = 3,
    /// Non-fatal errors
    Error = 4,
    /// Fatal errors, escalated to the fatal handler
    Fatal = 5,
}

impl Level {
    pub const ALL: [Level; 6] = [
        Level::VerBose,
        Level::Debug,
        Level::Trace,
        Level::Warning,
        Level::Error,
        Level::Fatal,
    ];

    /// Level for a raw configuration value, `None` when out of range
    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Fixed-width tag rendered in the tips segment
    pub fn as_str(self) -> &'static str {
        match self {
            Level::VerBose => "VBOSE",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
            Level::Warning => "WARNG",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }

    /// ANSI sequence opening the colored tips segment on the console
    pub fn style_start(self) -> &'static str {
        match self {
            Level::VerBose | Level::Debug => "\x1b[32;2m",
            Level::Trace => "\x1b[36;2m",
            Level::Warning => "\x1b[33;2m",
            Level::Error | Level::Fatal => "\x1b[31;2m",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much context is rendered around each message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Style {
    /// Message only
    Basic = 0,
    /// Level and timestamp, then the message
    #[default]
    Brief = 1,
    /// Level, timestamp and caller file:line, then the message
    Detail = 2,
}

impl Style {
    /// Style for a raw configuration value, `None` when out of range
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Style::Basic),
            1 => Some(Style::Brief),
            2 => Some(Style::Detail),
            _ => None,
        }
    }
}
