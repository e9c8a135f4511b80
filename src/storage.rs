//! Rotating file sink
//!
//! Files are named `<name>[_<YYMMDDhhmmss>_<pid>][(<seq>)].log`. A write that
//! would push the current file past `max_file_size` is split: the part that
//! fits goes to the current file, the file is rotated and the remainder goes
//! to the next one. The sequence number wraps modulo `max_file_count`.
//!
//! Failures never reach the log call site. The last one is kept as a sticky
//! error; a file that cannot be opened leaves the sink inactive and later
//! writes are dropped.

use crate::config::Settings;
use crate::constants::FILE_TIME_FORMAT;
use crate::error::{LogError, Result};
use parking_lot::Mutex;
use regex::Regex;
use std::fmt::Write as _;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

pub(crate) struct Storage {
    settings: Arc<Settings>,
    state: Mutex<FileState>,
}

struct FileState {
    out: Option<BufWriter<File>>,
    path: PathBuf,
    err: Option<LogError>,
    file_num: usize,
    file_size: u64,
}

impl Storage {
    /// Open (or append to) the first log file
    pub fn open(settings: Arc<Settings>) -> Self {
        if !settings.expire_time.is_zero() {
            clean_expired_files(&settings.file_dir, &settings.file_name, settings.expire_time);
        }

        let mut state = FileState {
            out: None,
            path: file_path(&settings, 0),
            err: None,
            file_num: 0,
            file_size: 0,
        };
        if let Err(e) = state.open(&settings, false) {
            state.fail(e);
        }

        Self {
            settings,
            state: Mutex::new(state),
        }
    }

    /// Append bytes, rotating as needed
    #[cfg(test)]
    pub fn write(&self, bytes: &[u8]) {
        self.write_parts(&[bytes]);
    }

    /// Append several segments as one record
    ///
    /// The segments are written under a single lock acquisition so records
    /// from concurrent pushers never interleave.
    pub fn write_parts(&self, parts: &[&[u8]]) {
        let mut state = self.state.lock();
        if state.out.is_none() {
            return;
        }

        for part in parts {
            state.write_bytes(&self.settings, part);
        }

        if self.settings.max_write_buffer == 0 {
            state.flush_buffer();
        }
    }

    /// Flush buffered bytes and sync them to disk
    pub fn flush(&self) {
        let mut state = self.state.lock();
        state.flush_buffer();
        let synced = state.out.as_ref().map(|out| out.get_ref().sync_data());
        if let Some(Err(e)) = synced {
            let path = state.path.clone();
            state.fail(LogError::flush(path, e));
        }
    }

    /// Flush and release the file handle
    pub fn close(&self) {
        self.state.lock().close_file();
    }

    /// Last error recorded by the sink
    pub fn error(&self) -> Option<LogError> {
        self.state.lock().err.clone()
    }

    /// Whether a file is currently open
    pub fn is_valid(&self) -> bool {
        self.state.lock().out.is_some()
    }
}

impl FileState {
    fn open(&mut self, settings: &Settings, fresh: bool) -> Result<()> {
        let path = file_path(settings, self.file_num);

        fs::create_dir_all(&settings.file_dir)
            .map_err(|e| LogError::create_dir(&settings.file_dir, e))?;

        let (file, size) = if fresh {
            let file = open_truncate(&path).map_err(|e| LogError::open_file(&path, e))?;
            (file, 0)
        } else {
            let file = open_append(&path).map_err(|e| LogError::open_file(&path, e))?;
            let size = file
                .metadata()
                .map_err(|e| LogError::file_size(&path, e))?
                .len();
            (file, size)
        };

        self.out = Some(BufWriter::with_capacity(settings.max_write_buffer, file));
        self.file_size = size;
        self.path = path;
        Ok(())
    }

    fn write_bytes(&mut self, settings: &Settings, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            if self.out.is_none() {
                return;
            }

            let available = settings.max_file_size.saturating_sub(self.file_size);
            if (bytes.len() as u64) < available {
                self.put(bytes);
                return;
            }

            let (head, rest) = bytes.split_at(available as usize);
            self.put(head);
            bytes = rest;
            self.rotate(settings);
        }
    }

    fn put(&mut self, bytes: &[u8]) {
        let Some(out) = self.out.as_mut() else {
            return;
        };
        if let Err(e) = out.write_all(bytes) {
            let path = self.path.clone();
            self.fail(LogError::write(path, e));
            return;
        }
        self.file_size += bytes.len() as u64;
    }

    fn rotate(&mut self, settings: &Settings) {
        self.close_file();
        self.file_num = (self.file_num + 1) % settings.max_file_count;

        if !settings.expire_time.is_zero() {
            clean_expired_files(&settings.file_dir, &settings.file_name, settings.expire_time);
        }

        match self.open(settings, true) {
            Ok(()) => debug!(file = %self.path.display(), "rotated log file"),
            Err(e) => self.fail(e),
        }
    }

    fn flush_buffer(&mut self) {
        let Some(out) = self.out.as_mut() else {
            return;
        };
        if let Err(e) = out.flush() {
            let path = self.path.clone();
            self.fail(LogError::flush(path, e));
        }
    }

    fn close_file(&mut self) {
        self.flush_buffer();
        self.out = None;
    }

    fn fail(&mut self, err: LogError) {
        warn!("{}", err);
        self.err = Some(err);
    }
}

/// Path of the log file with sequence number `num`
pub(crate) fn file_path(settings: &Settings, num: usize) -> PathBuf {
    let mut name = settings.file_name.clone();
    if settings.enable_file_time {
        let _ = write!(
            name,
            "_{}_{}",
            settings.start_time.format(FILE_TIME_FORMAT),
            std::process::id()
        );
    }
    if num > 0 {
        let _ = write!(name, "({})", num);
    }
    name.push_str(".log");
    settings.file_dir.join(name)
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn open_truncate(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
}

/// Remove log files of `name` in `dir` last modified before `now - expire`
///
/// Returns the number of removed files.
pub(crate) fn clean_expired_files(dir: &Path, name: &str, expire: Duration) -> usize {
    if expire.is_zero() {
        return 0;
    }
    let Some(deadline) = SystemTime::now().checked_sub(expire) else {
        return 0;
    };
    let Ok(pattern) = Regex::new(&format!(r"^{}.*\.log$", regex::escape(name))) else {
        return 0;
    };
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.filter_map(|e| e.ok()) {
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if !meta.is_file() || !pattern.is_match(&entry.file_name().to_string_lossy()) {
            continue;
        }
        let expired = meta.modified().map(|t| t < deadline).unwrap_or(false);
        if !expired {
            continue;
        }

        let path = entry.path();
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(file = %path.display(), "removed expired log file");
                removed += 1;
            }
            Err(e) => debug!(file = %path.display(), "cannot remove expired log file: {}", e),
        }
    }
    removed
}
