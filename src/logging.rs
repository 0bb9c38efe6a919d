//! Logging
//!
//! Module-tagged log macros backed by a timestamped log file in the cache
//! directory. Warnings and errors are mirrored to stderr; in verbose mode
//! every line is.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use once_cell::sync::OnceCell;

use crate::config;
use crate::utils::get_cache_dir;

static VERBOSE: AtomicBool = AtomicBool::new(false);
static LOG_FILE: OnceCell<Mutex<File>> = OnceCell::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Path of the session log file
pub fn log_file_path() -> PathBuf {
    get_cache_dir(config::app::NAME)
        .join(config::logging::DIR)
        .join(format!("{}.log", config::app::NAME))
}

/// Open the log file. Logging still works on stderr if this fails.
pub fn init() {
    let path = log_file_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            let _ = LOG_FILE.set(Mutex::new(file));
        }
        Err(e) => {
            eprintln!("Failed to open log file {}: {}", path.display(), e);
        }
    }
}

/// Switch between DEBUG (verbose) and INFO
pub fn set_log_level(verbose: bool) {
    VERBOSE.store(verbose, Ordering::SeqCst);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

fn format_line(level: Level, module: &str, message: &str) -> String {
    format!(
        "[{}] [{}] [{}] {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        level,
        module,
        message
    )
}

#[doc(hidden)]
pub fn write(level: Level, module: &str, message: &str) {
    let verbose = is_verbose();
    if level == Level::Debug && !verbose {
        return;
    }

    let line = format_line(level, module, message);

    if let Some(file) = LOG_FILE.get() {
        if let Ok(mut file) = file.lock() {
            let _ = writeln!(file, "{}", line);
        }
    }

    if verbose || level >= Level::Warn {
        eprintln!("{}", line);
    }
}

#[macro_export]
macro_rules! log_debug {
    ($module:expr, $($arg:tt)*) => {
        $crate::logging::write($crate::logging::Level::Debug, $module, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($module:expr, $($arg:tt)*) => {
        $crate::logging::write($crate::logging::Level::Info, $module, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($module:expr, $($arg:tt)*) => {
        $crate::logging::write($crate::logging::Level::Warn, $module, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($module:expr, $($arg:tt)*) => {
        $crate::logging::write($crate::logging::Level::Error, $module, &format!($($arg)*))
    };
}
