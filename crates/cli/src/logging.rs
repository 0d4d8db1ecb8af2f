//! Logging setup for the binary.
//!
//! Level: `--log-level`, else `VALUTA_LOG`, else `warn`; `-v` raises a
//! default level to `debug`. Format: `--json-logs` or `VALUTA_LOG_FORMAT=json`.
//! `VALUTA_LOG_FILE` sends logs to a daily-rotated file instead of stderr.
//! User actions on `valuta_hub::actions` are always kept at `info`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

const LOG_LEVEL_ENV: &str = "VALUTA_LOG";
const LOG_FORMAT_ENV: &str = "VALUTA_LOG_FORMAT";
const LOG_FILE_ENV: &str = "VALUTA_LOG_FILE";
const ACTION_TARGET: &str = "valuta_hub::actions";
const MAX_LOG_FILES: usize = 30;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    pub fn from_arg(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "human" | "text" => Some(Self::Human),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Log level from CLI argument or environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    pub fn from_arg(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "verbose" | "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" | "critical" => Some(Self::Error),
            _ => None,
        }
    }

    pub const fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn parse_log_level_from_env() -> Option<LogLevel> {
    non_empty_env(LOG_LEVEL_ENV).and_then(|v| LogLevel::from_arg(&v))
}

pub fn parse_log_format_from_env() -> Option<LogFormat> {
    non_empty_env(LOG_FORMAT_ENV).and_then(|v| LogFormat::from_arg(&v))
}

pub fn parse_log_file_from_env() -> Option<PathBuf> {
    non_empty_env(LOG_FILE_ENV).map(PathBuf::from)
}

/// Pick the effective level: explicit flag wins, `-v` only lifts the default.
pub fn resolve_level(flag: Option<&str>, env: Option<LogLevel>, verbose: bool) -> LogLevel {
    let explicit = flag.and_then(LogLevel::from_arg).or(env);
    match explicit {
        Some(level) => level,
        None if verbose => LogLevel::Debug,
        None => LogLevel::default(),
    }
}

/// Filter directive covering both crates of the workspace.
/// Quieter levels than `info` still let the action log through.
pub fn filter_directive(level: LogLevel) -> String {
    let filter = level.as_filter();
    match level {
        LogLevel::Warn | LogLevel::Error => {
            format!("valuta_hub={filter},valuta_hub_core={filter},{ACTION_TARGET}=info")
        }
        _ => format!("valuta_hub={filter},valuta_hub_core={filter}"),
    }
}

/// Daily-rotated appender for `path`, keeping the last 30 files.
/// Missing parent directories are created.
pub fn file_appender(path: &Path) -> Result<RollingFileAppender, String> {
    let prefix = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format!("'{}' does not name a file", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| format!("cannot create {}: {e}", dir.display()))?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
        .map_err(|e| format!("cannot open {}: {e}", path.display()))
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(level: LogLevel, format: LogFormat, log_file: Option<PathBuf>) {
    let appender = log_file.and_then(|path| match file_appender(&path) {
        Ok(appender) => Some(appender),
        Err(e) => {
            eprintln!("warning: {LOG_FILE_ENV}: {e}; logging to stderr");
            None
        }
    });
    let writer = match appender {
        Some(appender) => BoxMakeWriter::new(appender),
        None => BoxMakeWriter::new(std::io::stderr),
    };
    let filter = EnvFilter::try_new(filter_directive(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    match format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_writer(writer)
                .try_init()
                .ok();
        }
        LogFormat::Human => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_target(true)
                .without_time()
                .try_init()
                .ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parsing_accepts_aliases() {
        assert_eq!(LogLevel::from_arg("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_arg("verbose"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_arg("loud"), None);
    }

    #[test]
    fn verbose_only_lifts_the_default() {
        assert_eq!(resolve_level(None, None, false), LogLevel::Warn);
        assert_eq!(resolve_level(None, None, true), LogLevel::Debug);
        assert_eq!(resolve_level(Some("error"), None, true), LogLevel::Error);
        assert_eq!(resolve_level(None, Some(LogLevel::Info), true), LogLevel::Info);
    }

    #[test]
    fn directive_covers_the_action_target() {
        // valuta_hub::actions is matched by the valuta_hub prefix
        assert_eq!(
            filter_directive(LogLevel::Info),
            "valuta_hub=info,valuta_hub_core=info"
        );
    }

    #[test]
    fn actions_stay_visible_at_the_default_level() {
        let directive = filter_directive(LogLevel::default());
        assert!(directive.starts_with("valuta_hub=warn,"));
        assert!(directive.ends_with(",valuta_hub::actions=info"));
        assert!(filter_directive(LogLevel::Error).contains("valuta_hub::actions=info"));
        assert!(!filter_directive(LogLevel::Debug).contains("actions"));
        assert!(EnvFilter::try_new(directive).is_ok());
    }

    #[test]
    fn file_appender_creates_missing_directories() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("nested").join("actions.log");
        let mut appender = file_appender(&path).unwrap();
        writeln!(appender, "hello").unwrap();
        appender.flush().unwrap();

        let written: Vec<_> = fs::read_dir(dir.path().join("logs").join("nested"))
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert!(written.iter().any(|name| name.starts_with("actions.log")));
    }

    #[test]
    fn file_appender_reports_unusable_paths() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("taken");
        fs::write(&blocker, "not a directory").unwrap();
        assert!(file_appender(&blocker.join("app.log")).is_err());
    }
}
