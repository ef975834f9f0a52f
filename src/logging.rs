//! Tracing setup: a compact stdout layer plus an appending file layer.
//!
//! `RAGLINE_LOG_FILE` names the log file; without it logs land in `logs/ragline.log` relative to
//! the working directory. `RUST_LOG` filters both layers and defaults to `info`.
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_VAR: &str = "RAGLINE_LOG_FILE";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "ragline.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// File the log layer appends to, split the way the appender opens it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDestination {
    /// Directory created before the file is opened.
    pub directory: PathBuf,
    /// File name inside `directory`.
    pub file_name: String,
}

impl Default for LogDestination {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_LOG_DIR),
            file_name: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

impl LogDestination {
    /// Resolve the destination from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve the destination through `lookup`.
    ///
    /// A blank value falls back to the default. A value naming only a directory (trailing
    /// separator) keeps the default file name inside it.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(raw) = lookup(LOG_FILE_VAR)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
        else {
            return Self::default();
        };

        if raw.ends_with('/') || raw.ends_with(std::path::MAIN_SEPARATOR) {
            return Self {
                directory: PathBuf::from(raw),
                file_name: DEFAULT_LOG_FILE.to_string(),
            };
        }

        let path = Path::new(&raw);
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self {
            directory,
            file_name,
        }
    }

    /// Full path of the log file.
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }

    fn open(&self) -> io::Result<NonBlocking> {
        std::fs::create_dir_all(&self.directory)?;
        let appender = tracing_appender::rolling::never(&self.directory, &self.file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        Ok(writer)
    }
}

/// Install the global subscriber.
///
/// When the log file cannot be prepared the failure is printed to stderr and only the stdout
/// layer is installed.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).compact());

    let destination = LogDestination::from_env();
    match destination.open() {
        Ok(writer) => registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_ansi(false)
                    .compact(),
            )
            .init(),
        Err(err) => {
            eprintln!(
                "Failed to prepare log file {}: {err}",
                destination.path().display()
            );
            registry.init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(value: Option<&str>) -> LogDestination {
        LogDestination::from_lookup(|key| {
            assert_eq!(key, LOG_FILE_VAR);
            value.map(str::to_string)
        })
    }

    #[test]
    fn unset_or_blank_uses_the_default_file() {
        for value in [None, Some(""), Some("   ")] {
            let destination = resolve(value);
            assert_eq!(destination, LogDestination::default());
            assert_eq!(destination.path(), Path::new("logs").join("ragline.log"));
        }
    }

    #[test]
    fn explicit_file_is_split_into_directory_and_name() {
        let destination = resolve(Some("/var/log/ragline/run.log"));
        assert_eq!(destination.directory, PathBuf::from("/var/log/ragline"));
        assert_eq!(destination.file_name, "run.log");
    }

    #[test]
    fn bare_file_name_lands_in_the_working_directory() {
        let destination = resolve(Some("ragline-debug.log"));
        assert_eq!(destination.directory, PathBuf::from("."));
        assert_eq!(destination.file_name, "ragline-debug.log");
    }

    #[test]
    fn directory_value_keeps_the_default_file_name() {
        let destination = resolve(Some("results/logs/"));
        assert_eq!(destination.directory, PathBuf::from("results/logs/"));
        assert_eq!(destination.file_name, "ragline.log");
    }

    #[test]
    fn open_creates_missing_directories() {
        let root = tempfile::tempdir().expect("tempdir");
        let destination = LogDestination {
            directory: root.path().join("nested").join("logs"),
            file_name: "ragline.log".into(),
        };

        destination.open().expect("open");

        assert!(destination.directory.is_dir());
        assert!(destination.path().exists());
    }
}
