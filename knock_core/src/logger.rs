use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use knock_traits::LineSink;

/// Appends newline-terminated lines to a text file.
pub struct FileLogger {
    path: PathBuf,
}

impl FileLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> std::io::Result<std::fs::File> {
        OpenOptions::new().create(true).append(true).open(&self.path)
    }
}

impl LineSink for FileLogger {
    fn log_line(&mut self, text: &str) -> std::io::Result<()> {
        let mut file = self.open()?;
        writeln!(file, "{text}")
    }
}

/// Operator console on stdout.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl LineSink for StdoutSink {
    fn log_line(&mut self, text: &str) -> std::io::Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{text}")
    }
}

/// Whether the knock log is active for this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggingState {
    pub enabled: bool,
}

/// Knock log collaborator. Decided once at start-up and never rechecked.
pub struct KnockLog {
    sink: Option<Box<dyn LineSink>>,
    label: String,
}

impl KnockLog {
    pub fn disabled() -> Self {
        Self {
            sink: None,
            label: String::new(),
        }
    }

    /// Use an already available sink.
    pub fn enabled(sink: impl LineSink + 'static, label: impl Into<String>) -> Self {
        Self {
            sink: Some(Box::new(sink)),
            label: label.into(),
        }
    }

    /// Try to open `path` for appending. On failure logging stays off for the
    /// whole session and a single diagnostic goes to `console`.
    pub fn open_checked(path: &Path, console: &mut dyn LineSink) -> Self {
        let logger = FileLogger::new(path);
        match logger.open() {
            Ok(_) => {
                tracing::info!(path = %path.display(), "knock log enabled");
                Self::enabled(logger, path.display().to_string())
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "knock log storage unavailable");
                let msg = format!(
                    "Log storage unavailable ({}): {e}; logging disabled",
                    path.display()
                );
                if let Err(err) = console.log_line(&msg) {
                    tracing::warn!(error = %err, "console write failed");
                }
                Self::disabled()
            }
        }
    }

    pub fn state(&self) -> LoggingState {
        LoggingState {
            enabled: self.sink.is_some(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Append one line. `None` when logging is disabled.
    pub fn append(&mut self, text: &str) -> Option<std::io::Result<()>> {
        self.sink.as_mut().map(|s| s.log_line(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Lines(Vec<String>);
    impl LineSink for Lines {
        fn log_line(&mut self, text: &str) -> std::io::Result<()> {
            self.0.push(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn opening_creates_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knock.log");
        let mut console = Lines::default();
        let mut log = KnockLog::open_checked(&path, &mut console);
        assert!(log.state().enabled);
        assert!(console.0.is_empty());
        log.append("Channel 1: 10% - Channel 2: 20%").unwrap().unwrap();
        log.append("Channel 1: 11% - Channel 2: 21%").unwrap().unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "Channel 1: 10% - Channel 2: 20%\nChannel 1: 11% - Channel 2: 21%\n"
        );
    }

    #[test]
    fn unavailable_storage_disables_and_reports_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("knock.log");
        let mut console = Lines::default();
        let mut log = KnockLog::open_checked(&path, &mut console);
        assert_eq!(log.state(), LoggingState { enabled: false });
        assert_eq!(console.0.len(), 1);
        assert!(console.0[0].contains("logging disabled"));
        assert!(log.append("SPU KNOCK LEVEL: 5%").is_none());
        assert!(!path.exists());
    }

    struct BrokenConsole(u32);
    impl LineSink for BrokenConsole {
        fn log_line(&mut self, _text: &str) -> std::io::Result<()> {
            self.0 += 1;
            Err(std::io::Error::other("console gone"))
        }
    }

    #[test]
    fn unavailable_storage_survives_a_broken_console() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("knock.log");
        let mut console = BrokenConsole(0);
        let log = KnockLog::open_checked(&path, &mut console);
        assert!(!log.state().enabled);
        assert_eq!(console.0, 1);
    }
}
