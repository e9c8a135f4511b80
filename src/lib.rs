//! oc-log - structured logging core
//!
//! Records are filtered by level, rendered in one of three styles and fanned
//! out to the console, a rotating log file and an optional callback. A logger
//! dispatches either on the calling thread or through an elastic pool of
//! worker threads fed by a bounded queue.
//!
//! Modules:
//! - `config` - `Config` builder, defaults and TOML/JSON loading
//! - `level` - severities and output styles
//! - `logger` - the `Logger` front-end and its `Caller` view
//! - `storage` - size-rotating, expiring file sink
//! - `diagnostics` - `tracing` setup for the crate's own events

pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod error;
pub mod level;
pub mod logger;

mod handler;
mod message;
mod pool;
mod pusher;
mod storage;

pub use config::{load, panic_message, Config, Executor, FatalHandling, MsgCallback, PanicPayload, Task};
pub use constants::{GIB, KIB, MIB};
pub use diagnostics::init_tracing;
pub use error::{LogError, Result};
pub use level::{Level, Style};
pub use logger::{Caller, Logger};
