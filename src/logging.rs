/// Structured logging for the sounding service
///
/// Provides context-rich logging with sonde serial / site identifiers,
/// timestamps, and severity levels. Supports both console output
/// and file-based logging for long-running live sessions.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Historical batch fetch from the SondeHub REST API.
    SondeHub,
    /// Live push feed.
    Live,
    /// Normalization, phase detection and convection estimation.
    Pipeline,
    Config,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::SondeHub => write!(f, "SONDEHUB"),
            DataSource::Live => write!(f, "LIVE"),
            DataSource::Pipeline => write!(f, "PIPE"),
            DataSource::Config => write!(f, "CFG"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - sonde not found, flight out of range, feed noise
    Expected,
    /// Unexpected failure - indicates service degradation or an API change
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        if let Ok(mut guard) = LOGGER.lock() {
            *guard = Some(logger);
        }
    }

    fn log(&self, level: LogLevel, source: &DataSource, context: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let context_part = context.map(|s| format!(" [{}]", s)).unwrap_or_default();
        let log_entry = format!(
            "{} {} {}{}: {}",
            timestamp, level, source, context_part, message
        );

        // Console output goes to stderr; stdout carries the rendered sounding
        if self.console_timestamps {
            eprintln!("{}", log_entry);
        } else {
            match level {
                LogLevel::Error => eprintln!("   ✗ {}{}: {}", source, context_part, message),
                LogLevel::Warning => eprintln!("   ⚠ {}{}: {}", source, context_part, message),
                LogLevel::Info => eprintln!("   {}", message),
                LogLevel::Debug => {} // Skip debug in non-timestamp mode
            }
        }

        // File output
        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn emit(level: LogLevel, source: DataSource, context: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, &source, context, message);
        }
    }
}

/// Log a general informational message
pub fn info(source: DataSource, context: Option<&str>, message: &str) {
    emit(LogLevel::Info, source, context, message);
}

/// Log a warning message
pub fn warn(source: DataSource, context: Option<&str>, message: &str) {
    emit(LogLevel::Warning, source, context, message);
}

/// Log an error message
pub fn error(source: DataSource, context: Option<&str>, message: &str) {
    emit(LogLevel::Error, source, context, message);
}

/// Log a debug message
pub fn debug(source: DataSource, context: Option<&str>, message: &str) {
    emit(LogLevel::Debug, source, context, message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a SondeHub REST failure based on the error text
pub fn classify_sondehub_failure(_serial: &str, error_message: &str) -> FailureType {
    if error_message.contains("No frames available") || error_message.contains("HTTP error: 404")
    {
        // Sonde outside the requested window, or serial typed wrong
        FailureType::Expected
    } else if error_message.contains("HTTP") || error_message.contains("timed out") {
        FailureType::Unexpected
    } else if error_message.contains("Parse error") {
        // Parse errors suggest API changes
        FailureType::Unexpected
    } else {
        FailureType::Unknown
    }
}

/// Classify a live feed failure
pub fn classify_live_failure(_serial: &str, error_message: &str) -> FailureType {
    if error_message.contains("Parse error") {
        // Decoders occasionally upload truncated or oddly typed packets
        FailureType::Expected
    } else if error_message.contains("connection") || error_message.contains("timeout") {
        FailureType::Unexpected
    } else {
        FailureType::Unknown
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

fn log_classified(source: DataSource, context: &str, operation: &str, error_msg: &str, kind: FailureType) {
    let message = format!("{} failed [{}]: {}", operation, kind, error_msg);
    match kind {
        FailureType::Expected => warn(source, Some(context), &message),
        FailureType::Unexpected => error(source, Some(context), &message),
        FailureType::Unknown => warn(source, Some(context), &message),
    }
}

/// Log a SondeHub REST failure with automatic classification
pub fn log_sondehub_failure(serial: &str, operation: &str, err: &dyn std::error::Error) {
    let error_msg = err.to_string();
    let failure_type = classify_sondehub_failure(serial, &error_msg);
    log_classified(DataSource::SondeHub, serial, operation, &error_msg, failure_type);
}

/// Log a live feed failure with classification
pub fn log_live_failure(serial: &str, operation: &str, err: &dyn std::error::Error) {
    let error_msg = err.to_string();
    let failure_type = classify_live_failure(serial, &error_msg);
    log_classified(DataSource::Live, serial, operation, &error_msg, failure_type);
}

// ---------------------------------------------------------------------------
// History Summary Logging
// ---------------------------------------------------------------------------

/// Log the outcome of a history load
pub fn log_history_summary(serial: &str, stored: usize, total: usize) {
    if stored > 0 {
        let message = format!("History loaded ({} PTU frames of {} received)", stored, total);
        info(DataSource::SondeHub, Some(serial), &message);
    } else if total > 0 {
        warn(DataSource::SondeHub, Some(serial), "No PTU frames to plot for this sonde");
    } else {
        error(DataSource::SondeHub, Some(serial), "History request returned no frames");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_sondehub_failure_classification() {
        let missing = "No frames available for sonde: T1234567";
        assert_eq!(classify_sondehub_failure("T1234567", missing), FailureType::Expected);

        let http_error = "HTTP error: 500";
        assert_eq!(classify_sondehub_failure("T1234567", http_error), FailureType::Unexpected);

        assert_eq!(classify_sondehub_failure("T1234567", "???"), FailureType::Unknown);
    }

    #[test]
    fn test_data_source_labels() {
        assert_eq!(DataSource::Config.to_string(), "CFG");
        assert_ne!(DataSource::Config.to_string(), DataSource::System.to_string());
    }

    #[test]
    fn test_live_parse_errors_are_expected() {
        let parse = "Parse error: expected value at line 1 column 1";
        assert_eq!(classify_live_failure("T1234567", parse), FailureType::Expected);
    }
}
