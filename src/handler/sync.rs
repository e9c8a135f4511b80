//! Synchronous handler
//!
//! The caller thread filters, builds and pushes the record and returns once
//! every sink has it. The only background activity is the flush timer.

use super::timer::FlushTimer;
use super::Handler;
use crate::config::Settings;
use crate::error::LogError;
use crate::level::Level;
use crate::logger::Shared;
use crate::message::{Message, Payload, Site};
use crate::pusher::Pusher;
use std::sync::{Arc, Weak};

pub(crate) struct SyncHandler {
    settings: Arc<Settings>,
    pusher: Arc<Pusher>,
    timer: FlushTimer,
}

impl SyncHandler {
    pub fn new(settings: Arc<Settings>, owner: Weak<Shared>) -> Self {
        let pusher = Arc::new(Pusher::new(settings.clone(), owner));

        let ticking = pusher.clone();
        let timer = FlushTimer::start(settings.flush_interval, move || ticking.flush());

        Self {
            settings,
            pusher,
            timer,
        }
    }
}

impl Handler for SyncHandler {
    fn flush(&self) {
        self.pusher.flush();
    }

    fn close(&self) {
        self.timer.stop();
        self.pusher.close();
    }

    fn emit(&self, level: Level, layer: usize, site: Site, payload: Payload<'_>) {
        if level < self.settings.level {
            return;
        }

        let mut m = Message::default();
        self.pusher.assign(&mut m, level, layer, site);
        m.write_text(payload);
        self.pusher.push(&mut m);
    }

    fn last_error(&self) -> Option<LogError> {
        self.pusher.last_error()
    }

    fn is_valid(&self) -> bool {
        self.pusher.is_valid()
    }
}
