use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, OnceLock};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        write!(f, "{}", label)
    }
}

impl LogLevel {
    fn rank(self) -> u8 {
        match self {
            LogLevel::Error => 0,
            LogLevel::Warn => 1,
            LogLevel::Info => 2,
            LogLevel::Debug => 3,
        }
    }
}

type Sink = Box<dyn Fn(LogLevel, &str) + Send + Sync + 'static>;

fn default_sink(level: LogLevel, message: &str) {
    eprintln!("[{}] {}", level, message);
}

fn sink_cell() -> &'static Mutex<Sink> {
    static SINK: OnceLock<Mutex<Sink>> = OnceLock::new();
    SINK.get_or_init(|| Mutex::new(Box::new(default_sink)))
}

fn max_level_cell() -> &'static AtomicU8 {
    static MAX_LEVEL: OnceLock<AtomicU8> = OnceLock::new();
    MAX_LEVEL.get_or_init(|| AtomicU8::new(LogLevel::Debug.rank()))
}

pub fn set_sink(sink: impl Fn(LogLevel, &str) + Send + Sync + 'static) {
    let mut guard = match sink_cell().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *guard = Box::new(sink);
}

/// Messages less severe than `level` are dropped before reaching the sink.
pub fn set_max_level(level: LogLevel) {
    max_level_cell().store(level.rank(), Ordering::Relaxed);
}

pub fn log(level: LogLevel, message: impl AsRef<str>) {
    if level.rank() > max_level_cell().load(Ordering::Relaxed) {
        return;
    }
    let guard = match sink_cell().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    (guard)(level, message.as_ref());
}

pub fn error(message: impl AsRef<str>) {
    log(LogLevel::Error, message);
}

pub fn warn(message: impl AsRef<str>) {
    log(LogLevel::Warn, message);
}

pub fn info(message: impl AsRef<str>) {
    log(LogLevel::Info, message);
}

pub fn debug(message: impl AsRef<str>) {
    log(LogLevel::Debug, message);
}
