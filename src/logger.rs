//! Public logging front-end
//!
//! `Logger` is a cheap handle over one shared handler. Every clone logs to
//! the same sinks; dropping the last clone closes them.
//!
//! ```no_run
//! use oc_log::{Config, Level, Logger};
//!
//! let log = Logger::new(Config::default().with_level(Level::Debug));
//! log.debug(&[&"connected to ", &"10.0.0.1"]);
//! log.warningln(&[&"retry", &3]);
//! log.errorf(format_args!("request {} failed", 42));
//! log.close();
//! ```

use crate::config::Config;
use crate::error::LogError;
use crate::handler::{self, Handler};
use crate::level::Level;
use std::fmt::{self, Display};
use std::panic::Location;
use std::sync::Arc;

/// State behind every clone of a logger
pub(crate) struct Shared {
    handler: Box<dyn Handler>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.handler.close();
    }
}

#[derive(Clone)]
pub struct Logger {
    shared: Arc<Shared>,
}

/// Logger view that reports a call site further up the stack
///
/// Obtained from [`Logger::caller`]; `skip_layers` extra frames are skipped
/// when resolving the file and line shown by the Detail style.
pub struct Caller<'a> {
    logger: &'a Logger,
    layer: usize,
}

/// Generates the concat / line / format methods of each level
macro_rules! level_methods {
    ($($level:ident => $concat:ident, $line:ident, $format:ident;)*) => {
        $(
            #[doc = concat!("Log at ", stringify!($level), " level, arguments concatenated with no separator")]
            #[track_caller]
            pub fn $concat(&self, args: &[&dyn Display]) {
                self.handler().log(Level::$level, self.layer(), Location::caller(), args);
            }

            #[doc = concat!("Log at ", stringify!($level), " level, arguments space separated with a trailing newline")]
            #[track_caller]
            pub fn $line(&self, args: &[&dyn Display]) {
                self.handler().logln(Level::$level, self.layer(), Location::caller(), args);
            }

            #[doc = concat!("Log at ", stringify!($level), " level from `format_args!`")]
            #[track_caller]
            pub fn $format(&self, args: fmt::Arguments<'_>) {
                self.handler().logf(Level::$level, self.layer(), Location::caller(), args);
            }
        )*
    };
}

macro_rules! all_levels {
    () => {
        level_methods! {
            VerBose => verbose, verboseln, verbosef;
            Debug => debug, debugln, debugf;
            Trace => trace, traceln, tracef;
            Warning => warning, warningln, warningf;
            Error => error, errorln, errorf;
            Fatal => fatal, fatalln, fatalf;
        }
    };
}

impl Logger {
    pub fn new(config: Config) -> Self {
        let settings = config.normalize();
        let shared = Arc::new_cyclic(|owner| Shared {
            handler: handler::build(settings, owner.clone()),
        });
        Self { shared }
    }

    /// Handle over an existing shared state, used for fatal escalation
    pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// View that skips `skip_layers` extra frames when locating the call site
    pub fn caller(&self, skip_layers: usize) -> Caller<'_> {
        Caller {
            logger: self,
            layer: skip_layers,
        }
    }

    /// Drain pending records and release the sinks
    ///
    /// Safe to call any number of times; records logged afterwards are
    /// dropped.
    pub fn close(&self) {
        self.shared.handler.close();
    }

    /// Push buffered output to the console and file
    pub fn flush(&self) {
        self.shared.handler.flush();
    }

    /// Last error hit by the file sink, if any
    pub fn last_error(&self) -> Option<LogError> {
        self.shared.handler.last_error()
    }

    /// Whether log records currently reach a file
    ///
    /// False when saving is disabled, after `close`, or when the file could
    /// not be opened (see [`Logger::last_error`]).
    pub fn is_valid(&self) -> bool {
        self.shared.handler.is_valid()
    }

    /// Live async workers; always 0 for a synchronous logger
    pub fn active_workers(&self) -> usize {
        self.shared.handler.active_workers()
    }

    fn handler(&self) -> &dyn Handler {
        self.shared.handler.as_ref()
    }

    fn layer(&self) -> usize {
        0
    }

    all_levels!();
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("active_workers", &self.active_workers())
            .finish()
    }
}

impl Caller<'_> {
    fn handler(&self) -> &dyn Handler {
        self.logger.handler()
    }

    fn layer(&self) -> usize {
        self.layer
    }

    all_levels!();
}
