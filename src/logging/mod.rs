//! Logging infrastructure - structured tracing for object lifecycles
//!
//! Uses `tracing` for structured, contextual events:
//! - Level and filter taken from the environment or `RuntimeConfig`
//! - Zero-cost when no subscriber is installed
//! - Optional JSON formatting and a non-blocking log file

use once_cell::sync::OnceCell;
use std::io;
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

pub use tracing::{debug, error, info, trace, warn};

/// Global logging state
static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Keeps the file writer flushing for the life of the process
static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default log level
    pub level: Level,
    /// Enable file logging
    pub file_output: bool,
    /// Log file path (if file_output enabled)
    pub log_path: Option<String>,
    /// Enable JSON format (vs human-readable)
    pub json_format: bool,
    /// Show span events (enter/exit)
    pub show_spans: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            file_output: false,
            log_path: None,
            json_format: false,
            show_spans: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // REFCORE_LOG_LEVEL: trace, debug, info, warn, error
        if let Ok(level_str) = std::env::var("REFCORE_LOG_LEVEL") {
            config.level = parse_level(&level_str);
        }

        // REFCORE_LOG_FILE: path to log file
        if let Ok(path) = std::env::var("REFCORE_LOG_FILE") {
            config.file_output = true;
            config.log_path = Some(path);
        }

        config.json_format = std::env::var("REFCORE_LOG_JSON").is_ok();
        config.show_spans = std::env::var("REFCORE_LOG_SPANS").is_ok();

        config
    }

    /// Minimal logging for hot benchmarks
    pub fn quiet() -> Self {
        Self {
            level: Level::ERROR,
            ..Self::default()
        }
    }

    /// Verbose logging including every reference and allocation event
    pub fn verbose() -> Self {
        Self {
            level: Level::TRACE,
            show_spans: true,
            ..Self::default()
        }
    }
}

/// Map a textual level, falling back to INFO
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize logging with default configuration
pub fn init() {
    init_with_config(LogConfig::from_env());
}

/// Initialize logging with custom configuration
///
/// Only the first call installs a subscriber. If the host application has
/// already installed one, it is left in place.
pub fn init_with_config(config: LogConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("refcore={}", config.level.as_str().to_lowercase()))
        });

        let span_events = if config.show_spans {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let plain_layer = (!config.json_format).then(|| {
            fmt::layer()
                .with_writer(io::stderr)
                .with_span_events(span_events.clone())
                .with_target(true)
                .with_thread_ids(cfg!(debug_assertions))
                .with_line_number(cfg!(debug_assertions))
        });

        let json_layer = config.json_format.then(|| {
            fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_span_events(span_events.clone())
        });

        let file_layer = config
            .log_path
            .as_deref()
            .filter(|_| config.file_output)
            .and_then(open_log_file)
            .map(|(writer, guard)| {
                let _ = FILE_GUARD.set(guard);
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_span_events(span_events)
            });

        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(plain_layer)
            .with(json_layer)
            .with(file_layer)
            .try_init();
    });
}

fn open_log_file(path: &str) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let path = Path::new(path);
    let file_name = path.file_name()?.to_string_lossy().into_owned();
    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    match RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)
    {
        Ok(appender) => Some(tracing_appender::non_blocking(appender)),
        Err(err) => {
            eprintln!("refcore: cannot open log file {}: {}", path.display(), err);
            None
        }
    }
}

/// Check if logging is initialized
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

// ============================================================================
// Lifecycle events
// ============================================================================

/// Log object construction through a heap
#[inline]
pub fn log_object_created(class: &str, heap: &str, address: *const ()) {
    trace!(
        event = "object_created",
        class = class,
        heap = heap,
        address = ?address,
        "Object created"
    );
}

/// Log object destruction when its last reference is released
#[inline]
pub fn log_object_destroyed(class: &str, address: *const ()) {
    trace!(
        event = "object_destroyed",
        class = class,
        address = ?address,
        "Object destroyed"
    );
}

/// Log class registration
pub fn log_class_registered(name: &str, version: &str, unique_id: u32) {
    debug!(
        event = "class_registered",
        class = name,
        version = version,
        unique_id = unique_id,
        "Class registered"
    );
}

/// Log eviction of a class shadowed by a newer registration
pub fn log_class_evicted(name: &str, version: &str) {
    info!(
        event = "class_evicted",
        class = name,
        version = version,
        "Class replaced by newer registration"
    );
}

/// Log successful dynamic library load
pub fn log_library_loaded(library: &str, path: &Path) {
    info!(
        event = "library_loaded",
        library = library,
        path = %path.display(),
        "Dynamic library loaded"
    );
}

/// Log that no candidate file for a library could be opened
pub fn log_library_failed(library: &str, error: &str) {
    warn!(
        event = "library_failed",
        library = library,
        error = error,
        "Dynamic library could not be loaded"
    );
}

/// Log a container lock that could not be acquired in time
pub fn log_lock_timeout(container: &str, timeout_ms: u128) {
    error!(
        event = "lock_timeout",
        container = container,
        timeout_ms = timeout_ms as u64,
        "Container lock timed out"
    );
}

/// Log runtime initialization
pub fn log_runtime_init() {
    info!(event = "runtime_init", "refcore runtime initializing");
}
