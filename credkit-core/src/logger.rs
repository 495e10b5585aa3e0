use std::sync::{Arc, OnceLock};

/// Receives log messages from the bridge.
///
/// Implemented by the host and installed once with [`set_logger`]. Messages never contain
/// challenges, passwords or tokens.
///
/// ## Swift
///
/// ```swift
/// final class CredKitLogger: CredKit.Logger {
///     func log(level: CredKit.LogLevel, message: String) {
///         os_log("%{public}@", log: .credentials, type: level.osLogType, message)
///     }
/// }
///
/// CredKit.setLogger(logger: CredKitLogger()) // once, at launch
/// ```
///
/// ## Kotlin
///
/// ```kotlin
/// setLogger(object : Logger {
///     override fun log(level: LogLevel, message: String) = Log.println(level.priority, "CredKit", message)
/// })
/// ```
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Logs `message` at `level`.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum LogLevel {
    /// Very detailed diagnostics.
    Trace,
    /// Ceremony internals useful while debugging an integration.
    Debug,
    /// Ceremony lifecycle: started, completed, failed.
    Info,
    /// Ignored or dropped signals and options.
    Warn,
    /// Failures the host should look at.
    Error,
}

/// `log::Log` implementation forwarding to the host's [`Logger`].
struct ForeignLogger;

impl log::Log for ForeignLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let from_credkit = record
            .module_path()
            .is_some_and(|module_path| module_path.starts_with("credkit"));
        let verbose = matches!(record.level(), log::Level::Debug | log::Level::Trace);

        // Dependencies only get to report info and above.
        if verbose && !from_credkit {
            return;
        }

        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(log_level(record.level()), record.args().to_string());
        } else {
            eprintln!("Logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

const fn log_level(level: log::Level) -> LogLevel {
    match level {
        log::Level::Error => LogLevel::Error,
        log::Level::Warn => LogLevel::Warn,
        log::Level::Info => LogLevel::Info,
        log::Level::Debug => LogLevel::Debug,
        log::Level::Trace => LogLevel::Trace,
    }
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Installs the host logger. Only the first call has an effect.
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("Logger already set");
        return;
    }

    if let Err(e) = init_logger() {
        eprintln!("Failed to set logger: {e}");
    }
}

/// Registers [`ForeignLogger`] with the `log` facade.
///
/// # Errors
///
/// Returns `log::SetLoggerError` if another `log` implementation is already installed.
fn init_logger() -> Result<(), log::SetLoggerError> {
    static LOGGER: ForeignLogger = ForeignLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}
