//! Message pusher
//!
//! Owns the sinks and the buffer pools. `assign` prepares a message for the
//! configured style, `push` renders it to every enabled sink, hands the text
//! to the message callback and gives the buffers back to the pool.
//!
//! Each sink has its own lock and receives all segments of a record under a
//! single acquisition, so records never interleave within a sink.

use crate::config::{PanicPayload, Settings};
use crate::constants::{BUFFER_POOL_LIMIT, STYLE_END};
use crate::error::LogError;
use crate::level::{Level, Style};
use crate::logger::{Logger, Shared};
use crate::message::{Message, Site};
use crate::pool::{new_buffer, BufferPool, Pool};
use crate::storage::Storage;
use parking_lot::Mutex;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use tracing::{error, warn};

/// Console output handle
pub(crate) type Console = Box<dyn Write + Send>;

pub(crate) struct Pusher {
    settings: Arc<Settings>,
    console: Option<Mutex<Console>>,
    storage: Option<Storage>,
    closed: AtomicBool,
    buffers: BufferPool,
    messages: Pool<Box<Message>>,
    /// Logger handed to the fatal handler
    owner: Weak<Shared>,
}

impl Pusher {
    pub fn new(settings: Arc<Settings>, owner: Weak<Shared>) -> Self {
        let console: Option<Console> = if settings.disable_print {
            None
        } else {
            Some(Box::new(io::stdout()))
        };
        Self::with_console(settings, owner, console)
    }

    pub fn with_console(settings: Arc<Settings>, owner: Weak<Shared>, console: Option<Console>) -> Self {
        let storage = (!settings.disable_save).then(|| Storage::open(settings.clone()));

        Self {
            settings,
            console: console.map(Mutex::new),
            storage,
            closed: AtomicBool::new(false),
            buffers: BufferPool::new(BUFFER_POOL_LIMIT, new_buffer),
            messages: Pool::new(BUFFER_POOL_LIMIT, || Box::default()),
            owner,
        }
    }

    // === Envelopes ===

    /// Take a message envelope from the pool
    pub fn get(&self) -> Box<Message> {
        self.messages.get()
    }

    /// Return a pushed message envelope to the pool
    pub fn put(&self, m: Box<Message>) {
        self.messages.put(m);
    }

    /// Recycle an envelope that will never be pushed
    pub fn discard(&self, mut m: Box<Message>) {
        self.release(&mut m);
        self.messages.put(m);
    }

    /// Pre-allocate message envelopes
    pub fn prefill(&self, count: usize) {
        self.messages.prefill(count);
    }

    // === Build ===

    /// Attach the buffers needed by the configured style and fill the
    /// tips/stack segments
    pub fn assign(&self, m: &mut Message, level: Level, layer: usize, site: Site) {
        m.level = level;
        m.text = Some(self.buffers.get());

        match self.settings.style {
            Style::Basic => {}
            Style::Brief => {
                m.tips = Some(self.buffers.get());
                m.fill_brief();
            }
            Style::Detail => {
                m.tips = Some(self.buffers.get());
                m.stack = Some(self.buffers.get());
                m.fill_detail(site, layer);
            }
        }
    }

    // === Fanout ===

    /// Render a message to every sink, then recycle its buffers
    ///
    /// A Fatal message escalates to the fatal handler afterwards, with the
    /// payload of any panic raised while fanning it out.
    pub fn push(&self, m: &mut Message) {
        if self.closed.load(Ordering::Acquire) {
            self.release(m);
            return;
        }

        if m.level == Level::Fatal {
            let payload = panic::catch_unwind(AssertUnwindSafe(|| self.fan_out(m))).err();
            self.release(m);
            self.escalate(payload);
        } else {
            self.fan_out(m);
            self.release(m);
        }
    }

    fn fan_out(&self, m: &Message) {
        let style = self.settings.style;

        if let Some(console) = &self.console {
            let parts = render(style, m, true);
            let mut out = console.lock();
            for part in parts.as_slice() {
                if out.write_all(part).is_err() {
                    break;
                }
            }
        }

        if let Some(storage) = &self.storage {
            storage.write_parts(render(style, m, false).as_slice());
        }

        if let Some(callback) = &self.settings.msg_callback {
            let callback = callback.clone();
            let level = m.level;
            let text = String::from_utf8_lossy(Message::segment(&m.text)).into_owned();
            (self.settings.exec)(Box::new(move || callback(level, &text)));
        }
    }

    /// Clear every buffer of the message and return it to the pool
    fn release(&self, m: &mut Message) {
        for buf in [m.tips.take(), m.stack.take(), m.text.take()]
            .into_iter()
            .flatten()
        {
            self.buffers.put(buf);
        }
    }

    fn escalate(&self, payload: Option<PanicPayload>) {
        let Some(shared) = self.owner.upgrade() else {
            warn!("Fatal record pushed without an owning logger");
            return;
        };
        let logger = Logger::from_shared(shared);
        let handling = self.settings.fatal_handling.clone();

        if let Err(e) = thread::Builder::new()
            .name("oc-log-fatal".to_string())
            .spawn(move || handling(&logger, payload))
        {
            error!("Failed to spawn fatal handler: {}", e);
        }
    }

    // === Lifecycle ===

    pub fn flush(&self) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        if let Some(console) = &self.console {
            let _ = console.lock().flush();
        }
        if let Some(storage) = &self.storage {
            storage.flush();
        }
    }

    /// Close the file sink; later pushes are dropped
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(console) = &self.console {
            let _ = console.lock().flush();
        }
        if let Some(storage) = &self.storage {
            storage.close();
        }
    }

    pub fn last_error(&self) -> Option<LogError> {
        self.storage.as_ref().and_then(Storage::error)
    }

    pub fn is_valid(&self) -> bool {
        self.storage.as_ref().is_some_and(Storage::is_valid)
    }
}

// =============================================================================
// Rendering
// =============================================================================

const EMPTY: &[u8] = &[];

/// Segments of one rendered record
struct Parts<'a> {
    items: [&'a [u8]; 7],
    len: usize,
}

impl<'a> Parts<'a> {
    fn new() -> Self {
        Self {
            items: [EMPTY; 7],
            len: 0,
        }
    }

    fn push(&mut self, part: &'a [u8]) {
        self.items[self.len] = part;
        self.len += 1;
    }

    fn as_slice(&self) -> &[&'a [u8]] {
        &self.items[..self.len]
    }
}

/// `[start]TIPS[end] [STACK] TEXT`, the color sequences only on the console
fn render(style: Style, m: &Message, colored: bool) -> Parts<'_> {
    let mut parts = Parts::new();

    if style >= Style::Brief {
        if colored {
            parts.push(m.level.style_start().as_bytes());
        }
        parts.push(Message::segment(&m.tips));
        if colored {
            parts.push(STYLE_END.as_bytes());
        }
        parts.push(b" ");
    }
    if style == Style::Detail {
        parts.push(Message::segment(&m.stack));
        parts.push(b" ");
    }
    parts.push(Message::segment(&m.text));

    parts
}
