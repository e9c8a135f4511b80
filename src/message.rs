//! Message envelope and builder
//!
//! A message owns up to three segment buffers taken from the pusher's pool:
//! - `tips`  - level tag and timestamp (Brief and Detail)
//! - `stack` - caller `[file:line]` (Detail only)
//! - `text`  - the formatted payload (every style)

use crate::constants::TIPS_TIME_FORMAT;
use crate::level::Level;
use crate::pool::Recycle;
use bytes::BytesMut;
use chrono::Local;
use std::backtrace::Backtrace;
use std::fmt::{self, Display, Write};
use std::panic::Location;
use std::path::Path;

/// Call site captured through `#[track_caller]`
pub(crate) type Site = &'static Location<'static>;

/// The three call forms of a log method
#[derive(Clone, Copy)]
pub(crate) enum Payload<'a> {
    /// Items concatenated as-is, with no separator between any two items
    /// whatever their type; use `Line` for space separated output
    Concat(&'a [&'a dyn Display]),
    /// Items joined by spaces, followed by a newline
    Line(&'a [&'a dyn Display]),
    /// Pre-formatted arguments
    Format(fmt::Arguments<'a>),
}

impl Payload<'_> {
    pub fn write_to(&self, buf: &mut BytesMut) {
        match self {
            Payload::Concat(items) => {
                for item in items.iter() {
                    let _ = write!(buf, "{}", item);
                }
            }
            Payload::Line(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        buf.extend_from_slice(b" ");
                    }
                    let _ = write!(buf, "{}", item);
                }
                buf.extend_from_slice(b"\n");
            }
            Payload::Format(args) => {
                let _ = buf.write_fmt(*args);
            }
        }
    }
}

/// Log message envelope
#[derive(Default)]
pub(crate) struct Message {
    pub level: Level,
    pub tips: Option<BytesMut>,
    pub stack: Option<BytesMut>,
    pub text: Option<BytesMut>,
}

impl Recycle for Message {
    fn recycle(&mut self) -> bool {
        self.level = Level::default();
        self.tips = None;
        self.stack = None;
        self.text = None;
        true
    }
}

impl Message {
    /// Fill the tips segment: `TAG|YY.MM.DD-hh:mm:ss.mmm`
    pub fn fill_brief(&mut self) {
        if let Some(tips) = self.tips.as_mut() {
            tips.extend_from_slice(self.level.as_str().as_bytes());
            tips.extend_from_slice(b"|");
            let _ = write!(tips, "{}", Local::now().format(TIPS_TIME_FORMAT));
        }
    }

    /// Fill the tips and stack segments
    pub fn fill_detail(&mut self, site: Site, layer: usize) {
        self.fill_brief();
        if let Some(stack) = self.stack.as_mut() {
            let (file, line) = resolve_site(site, layer);
            let _ = write!(stack, "[{}:{}]", file, line);
        }
    }

    pub fn write_text(&mut self, payload: Payload<'_>) {
        if let Some(text) = self.text.as_mut() {
            payload.write_to(text);
        }
    }

    pub fn segment(buf: &Option<BytesMut>) -> &[u8] {
        buf.as_deref().unwrap_or_default()
    }
}

/// Resolve the reported `(file stem, line)` for a call site
///
/// Layer 0 is the site itself. Higher layers walk outward through a captured
/// backtrace starting at the frame that matches the site; when the frames
/// cannot be resolved the site is reported.
fn resolve_site(site: Site, layer: usize) -> (String, u32) {
    if layer > 0 {
        if let Some((file, line)) = outer_frame(site, layer) {
            return (file_stem(&file), line);
        }
    }
    (file_stem(site.file()), site.line())
}

fn outer_frame(site: Site, layer: usize) -> Option<(String, u32)> {
    let trace = Backtrace::force_capture().to_string();
    let frames: Vec<(&str, u32)> = trace.lines().filter_map(parse_frame).collect();

    let pos = frames
        .iter()
        .position(|(file, line)| *line == site.line() && Path::new(file).ends_with(site.file()))?;

    frames
        .get(pos + layer)
        .map(|(file, line)| (file.to_string(), *line))
}

/// Parse a backtrace location line: `at <path>:<line>:<column>`
fn parse_frame(line: &str) -> Option<(&str, u32)> {
    let location = line.trim_start().strip_prefix("at ")?;
    let mut parts = location.rsplitn(3, ':');
    let _column = parts.next()?;
    let line = parts.next()?.parse().ok()?;
    let file = parts.next()?;
    Some((file, line))
}

fn file_stem(file: &str) -> String {
    Path::new(file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "???".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(level: Level, tips: bool, stack: bool) -> Message {
        Message {
            level,
            tips: tips.then(BytesMut::new),
            stack: stack.then(BytesMut::new),
            text: Some(BytesMut::new()),
        }
    }

    fn text(buf: &Option<BytesMut>) -> String {
        String::from_utf8_lossy(Message::segment(buf)).into_owned()
    }

    #[test]
    fn test_payload_concat() {
        let mut m = message(Level::Debug, false, false);
        m.write_text(Payload::Concat(&[&"a=", &1, &", b=", &true]));
        assert_eq!(text(&m.text), "a=1, b=true");
    }

    #[test]
    fn test_payload_concat_never_inserts_spaces() {
        let mut m = message(Level::Debug, false, false);
        m.write_text(Payload::Concat(&[&1, &2, &"x", &3.5]));
        assert_eq!(text(&m.text), "12x3.5");
    }

    #[test]
    fn test_payload_line() {
        let mut m = message(Level::Debug, false, false);
        m.write_text(Payload::Line(&[&"count", &3]));
        assert_eq!(text(&m.text), "count 3\n");
    }

    #[test]
    fn test_payload_format() {
        let mut m = message(Level::Debug, false, false);
        m.write_text(Payload::Format(format_args!("{}-{:03}", "id", 7)));
        assert_eq!(text(&m.text), "id-007");
    }

    #[test]
    fn test_fill_brief() {
        let mut m = message(Level::Warning, true, false);
        m.fill_brief();
        let tips = text(&m.tips);

        // WARNG|YY.MM.DD-hh:mm:ss.mmm
        assert!(tips.starts_with("WARNG|"));
        assert_eq!(tips.len(), 6 + 21);
        assert_eq!(&tips[8..9], ".");
        assert_eq!(&tips[14..15], "-");
    }

    #[test]
    fn test_fill_detail_uses_site() {
        let mut m = message(Level::Error, true, true);
        let site = Location::caller();
        m.fill_detail(site, 0);

        assert_eq!(text(&m.stack), format!("[message:{}]", site.line()));
        assert!(text(&m.tips).starts_with("ERROR|"));
    }

    #[test]
    fn test_unresolvable_layer_falls_back_to_site() {
        let mut m = message(Level::Error, true, true);
        let site = Location::caller();
        m.fill_detail(site, 10_000);

        assert_eq!(text(&m.stack), format!("[message:{}]", site.line()));
    }

    #[test]
    fn test_parse_frame() {
        assert_eq!(
            parse_frame("             at ./src/main.rs:42:9"),
            Some(("./src/main.rs", 42))
        );
        assert_eq!(
            parse_frame("  at C:\\work\\src\\lib.rs:7:1"),
            Some(("C:\\work\\src\\lib.rs", 7))
        );
        assert_eq!(parse_frame("   3: oc_log::logger::Logger::debug"), None);
    }

    #[test]
    fn test_recycle_releases_buffers() {
        let mut m = message(Level::Fatal, true, true);
        assert!(m.recycle());
        assert!(m.tips.is_none() && m.stack.is_none() && m.text.is_none());
        assert_eq!(m.level, Level::default());
    }
}
