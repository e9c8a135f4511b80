//! Dispatch strategies
//!
//! A logger owns exactly one handler, picked at construction:
//! - `SyncHandler` - builds and pushes on the calling thread
//! - `AsyncHandler` - builds on the calling thread, pushes from an elastic
//!   pool of worker threads fed by a bounded queue

mod asynchronous;
mod sync;
mod timer;
mod wait_group;

pub(crate) use asynchronous::AsyncHandler;
pub(crate) use sync::SyncHandler;

use crate::config::Settings;
use crate::error::LogError;
use crate::level::Level;
use crate::logger::Shared;
use crate::message::{Payload, Site};
use std::fmt::{self, Display};
use std::sync::{Arc, Weak};

pub(crate) trait Handler: Send + Sync {
    /// Force buffered output to the sinks
    fn flush(&self);

    /// Drain pending records and release the sinks
    fn close(&self);

    /// Filter, build and dispatch one record
    fn emit(&self, level: Level, layer: usize, site: Site, payload: Payload<'_>);

    /// Sticky error of the file sink
    fn last_error(&self) -> Option<LogError>;

    /// Whether the file sink has an open file
    fn is_valid(&self) -> bool;

    /// Number of live async workers
    fn active_workers(&self) -> usize {
        0
    }

    fn log(&self, level: Level, layer: usize, site: Site, args: &[&dyn Display]) {
        self.emit(level, layer, site, Payload::Concat(args));
    }

    fn logln(&self, level: Level, layer: usize, site: Site, args: &[&dyn Display]) {
        self.emit(level, layer, site, Payload::Line(args));
    }

    fn logf(&self, level: Level, layer: usize, site: Site, args: fmt::Arguments<'_>) {
        self.emit(level, layer, site, Payload::Format(args));
    }
}

/// Build the handler selected by the settings
pub(crate) fn build(settings: Settings, owner: Weak<Shared>) -> Box<dyn Handler> {
    let settings = Arc::new(settings);
    if settings.enable_async {
        Box::new(AsyncHandler::new(settings, owner))
    } else {
        Box::new(SyncHandler::new(settings, owner))
    }
}
