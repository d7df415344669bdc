//! An in-memory log storage, with a fixed size for records.

use alloc::{boxed::Box, collections::vec_deque::VecDeque, format, string::String};
use core::{cell::RefCell, fmt::Display};
use embassy_time::Instant;

const DISCARD_ERROR: &str = "log discarded: too large for storage";

/// Handle to the node's log. Cheap to copy into every task.
///
/// Not usable from interrupt context: records are kept behind a `RefCell`.
#[derive(Clone, Copy)]
pub struct SharedLogger {
    inner: &'static RefCell<LogStorage>,
}

pub fn init(capacity: usize) -> SharedLogger {
    // Ensure we have enough space to store the error about not having enough space.
    if capacity < DISCARD_ERROR.len() {
        panic!("minimum log storage capacity is {}", DISCARD_ERROR.len());
    }

    let storage = LogStorage::with_capacity(capacity);
    SharedLogger {
        inner: Box::leak(Box::new(RefCell::new(storage))),
    }
}

struct LogStorage {
    // Newest first.
    records: VecDeque<Record>,
    // In characters.
    utilization: usize,
    capacity: usize,
    // Records below this level are not stored.
    threshold: Level,
    // If enabled, prints new records over esp_println.
    #[cfg_attr(not(feature = "esp"), allow(dead_code))]
    print: bool,
}

#[derive(Clone, Debug)]
pub struct Record {
    pub instant: Instant,
    pub level: Level,
    pub text: String,
}

impl Display for Record {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let timestamp = format_milliseconds_to_hms(self.instant.as_millis());
        write!(f, "[{}] {}: {}", timestamp, self.level, self.text)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Display for Level {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Level::Trace => write!(f, "TRCE"),
            Level::Debug => write!(f, "DEBG"),
            Level::Info => write!(f, "INFO"),
            Level::Warn => write!(f, "WARN"),
            Level::Error => write!(f, "ERRO"),
        }
    }
}

impl LogStorage {
    fn with_capacity(capacity: usize) -> Self {
        LogStorage {
            records: VecDeque::new(),
            utilization: 0,
            capacity,
            threshold: Level::Debug,
            print: false,
        }
    }

    fn add_record(&mut self, level: Level, text: impl Into<String>) {
        if level < self.threshold {
            return;
        }

        let text: String = text.into();

        // Can't fit this record in storage. Log a warning.
        if text.len() > self.capacity {
            self.add_record(Level::Warn, DISCARD_ERROR);
            return;
        }

        // Evict the oldest records until the new one fits.
        while (self.capacity - self.utilization) < text.len() {
            match self.records.pop_back() {
                Some(removed) => self.utilization -= removed.text.len(),
                None => break,
            }
        }

        self.utilization += text.len();

        let new_record = Record {
            instant: Instant::now(),
            level,
            text,
        };

        #[cfg(feature = "esp")]
        if self.print {
            esp_println::println!("{new_record}");
        }

        self.records.push_front(new_record);
    }

    fn clear(&mut self) {
        self.utilization = 0;
        self.records.clear();
    }
}

impl SharedLogger {
    /// Mirrors new records to the serial console. Only effective on firmware builds.
    pub fn enable_print(&self) {
        self.inner.borrow_mut().print = true;
    }

    pub fn set_threshold(&self, level: Level) {
        self.inner.borrow_mut().threshold = level;
    }

    pub fn trace(&self, text: impl Into<String>) {
        self.inner.borrow_mut().add_record(Level::Trace, text);
    }
    pub fn debug(&self, text: impl Into<String>) {
        self.inner.borrow_mut().add_record(Level::Debug, text);
    }
    pub fn info(&self, text: impl Into<String>) {
        self.inner.borrow_mut().add_record(Level::Info, text);
    }
    pub fn warn(&self, text: impl Into<String>) {
        self.inner.borrow_mut().add_record(Level::Warn, text);
    }
    pub fn error(&self, text: impl Into<String>) {
        self.inner.borrow_mut().add_record(Level::Error, text);
    }
    pub fn clear(&self) {
        self.inner.borrow_mut().clear();
    }
    pub fn records(&self) -> core::cell::Ref<'_, VecDeque<Record>> {
        core::cell::Ref::map(self.inner.borrow(), |storage| &storage.records)
    }

    /// Whether any stored record at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.records()
            .iter()
            .any(|record| record.level == level && record.text.contains(needle))
    }
}

/// Formats a u64 millisecond value into "HHHHH:MM:SS.xxx" string.
#[inline]
pub fn format_milliseconds_to_hms(total_ms: u64) -> String {
    let millis_part = total_ms % 1000;
    let total_seconds = total_ms / 1000;

    let seconds_part = total_seconds % 60;
    let total_minutes = total_seconds / 60;

    let minutes_part = total_minutes % 60;
    let hours_part = total_minutes / 60;

    format!(
        "{:05}:{:02}:{:02}.{:03}",
        hours_part, minutes_part, seconds_part, millis_part
    )
}
