//! Command-line interface definition using clap
//!
//! Provides structured argument parsing with automatic help generation.

use clap::{Parser, ValueEnum};
use oc_log::{Level, Style};
use std::path::PathBuf;

// =============================================================================
// CLI Definition
// =============================================================================

/// Demo of the oc-log logging core
#[derive(Parser, Debug, Default)]
#[command(name = "oc-log-demo")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose diagnostics from the logger itself
    #[arg(short, long)]
    pub verbose: bool,

    /// Config file (TOML, or JSON with a .json extension)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Minimum level written
    #[arg(long, value_enum)]
    pub level: Option<LevelArg>,

    /// Output style
    #[arg(long, value_enum)]
    pub style: Option<StyleArg>,

    /// Dispatch through the async worker pool
    #[arg(long = "async")]
    pub enable_async: bool,

    /// Don't write to stdout
    #[arg(long)]
    pub no_print: bool,

    /// Don't write log files
    #[arg(long)]
    pub no_save: bool,

    /// Directory for log files
    #[arg(long, value_name = "DIR")]
    pub dir: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelArg {
    Verbose,
    Debug,
    Trace,
    Warning,
    Error,
    Fatal,
}

impl From<LevelArg> for Level {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::Verbose => Level::VerBose,
            LevelArg::Debug => Level::Debug,
            LevelArg::Trace => Level::Trace,
            LevelArg::Warning => Level::Warning,
            LevelArg::Error => Level::Error,
            LevelArg::Fatal => Level::Fatal,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StyleArg {
    Basic,
    Brief,
    Detail,
}

impl From<StyleArg> for Style {
    fn from(arg: StyleArg) -> Self {
        match arg {
            StyleArg::Basic => Style::Basic,
            StyleArg::Brief => Style::Brief,
            StyleArg::Detail => Style::Detail,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_defaults() {
        let cli = Cli::parse_from(["oc-log-demo"]);
        assert!(!cli.verbose);
        assert!(!cli.enable_async);
        assert!(cli.level.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_parse_verbose() {
        let cli = Cli::parse_from(["oc-log-demo", "-v"]);
        assert!(cli.verbose);

        let cli = Cli::parse_from(["oc-log-demo", "--verbose"]);
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_parse_level_and_style() {
        let cli = Cli::parse_from(["oc-log-demo", "--level", "debug", "--style", "detail"]);
        assert_eq!(cli.level.map(Level::from), Some(Level::Debug));
        assert_eq!(cli.style.map(Style::from), Some(Style::Detail));
    }

    #[test]
    fn test_cli_parse_toggles() {
        let cli = Cli::parse_from(["oc-log-demo", "--async", "--no-print", "--no-save", "--dir", "out"]);
        assert!(cli.enable_async);
        assert!(cli.no_print);
        assert!(cli.no_save);
        assert_eq!(cli.dir, Some("out".to_string()));
    }

    #[test]
    fn test_cli_rejects_unknown_level() {
        assert!(Cli::try_parse_from(["oc-log-demo", "--level", "loud"]).is_err());
    }
}
