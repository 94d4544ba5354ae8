//! Rolling file logs for the `userdir` process.
//!
//! Logging is optional: the binary only calls [`init_logging`] when a log
//! directory is configured. Records stay metadata-only (ids, counts,
//! durations). Panic payloads are the one place operator text can leak in,
//! so the panic hook redacts email addresses before logging them.

use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, LogSpecification, Logger, LoggerHandle,
    Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use std::any::Any;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

const LOG_BASENAME: &str = "userdir";
const ROTATE_AT_BYTES: u64 = 4 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 3;
const PANIC_SUMMARY_MAX_CHARS: usize = 120;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();

// Looser than the record grammar: anything address-shaped gets masked.
static EMAIL_LIKE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\s@<>]+@[^\s@<>]+").expect("valid email redaction regex"));

struct ActiveLogger {
    level: LevelFilter,
    dir: PathBuf,
    _handle: LoggerHandle,
}

#[derive(Debug)]
pub enum LoggingError {
    UnknownLevel(String),
    CreateDir { dir: PathBuf, source: io::Error },
    Backend(FlexiLoggerError),
    /// Logging already runs with a different level or directory.
    Reconfigure {
        active_level: LevelFilter,
        active_dir: PathBuf,
    },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownLevel(value) => write!(
                f,
                "unknown log level `{value}` (use off, error, warn, info, debug or trace)"
            ),
            Self::CreateDir { dir, source } => {
                write!(f, "cannot create log directory {}: {source}", dir.display())
            }
            Self::Backend(err) => write!(f, "log backend failed to start: {err}"),
            Self::Reconfigure {
                active_level,
                active_dir,
            } => write!(
                f,
                "logging is already active at level {active_level} in {}",
                active_dir.display()
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

/// Starts rolling file logs under `dir` at `level`.
///
/// A second call with the same level and directory is a no-op; any other
/// combination fails with `LoggingError::Reconfigure`.
pub fn init_logging(level: &str, dir: impl AsRef<Path>) -> Result<(), LoggingError> {
    let level = parse_level(level)?;
    let dir = dir.as_ref();

    let active = ACTIVE.get_or_try_init(|| start(level, dir))?;
    if active.level != level || active.dir.as_path() != dir {
        return Err(LoggingError::Reconfigure {
            active_level: active.level,
            active_dir: active.dir.clone(),
        });
    }
    Ok(())
}

/// `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn parse_level(value: &str) -> Result<LevelFilter, LoggingError> {
    value
        .trim()
        .parse::<LevelFilter>()
        .map_err(|_| LoggingError::UnknownLevel(value.trim().to_string()))
}

fn start(level: LevelFilter, dir: &Path) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
        dir: dir.to_path_buf(),
        source,
    })?;

    let handle = Logger::with(LogSpecification::builder().default(level).build())
        .log_to_file(FileSpec::default().directory(dir).basename(LOG_BASENAME))
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(LoggingError::Backend)?;

    install_panic_hook();
    info!(
        "event=logging_start module=core status=ok level={level} version={}",
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveLogger {
        level,
        dir: dir.to_path_buf(),
        _handle: handle,
    })
}

// Only reached from `start`, which the OnceCell runs at most once.
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        error!(
            "event=panic module=core status=error location={location} payload={}",
            panic_summary(info.payload())
        );
        previous(info);
    }));
}

/// Single-line, length-capped panic text with email addresses masked.
fn panic_summary(payload: &(dyn Any + Send)) -> String {
    let text = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string payload>");

    let redacted = EMAIL_LIKE_RE.replace_all(text, "<email>");
    let single_line = redacted.replace(['\r', '\n'], " ");
    if single_line.chars().count() <= PANIC_SUMMARY_MAX_CHARS {
        return single_line;
    }
    let mut capped: String = single_line.chars().take(PANIC_SUMMARY_MAX_CHARS).collect();
    capped.push_str("...");
    capped
}
