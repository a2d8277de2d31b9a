//! Request/response logging capability handed to the client.

use std::sync::{Arc, Mutex};

/// Sink for the client's request and response trace lines.
#[cfg_attr(test, mockall::automock)]
pub trait Logger: Send + Sync {
    fn log(&self, line: &str);
}

/// Forwards every line to the `log` facade at debug level.
///
/// The `n8nc` binary installs `env_logger`, which writes to standard error;
/// run with `RUST_LOG=n8n_client=debug` to see the traffic.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogLogger;

impl Logger for LogLogger {
    fn log(&self, line: &str) {
        log::debug!(target: "n8n_client::http", "{}", line);
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryLogger {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines recorded so far.
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Logger for MemoryLogger {
    fn log(&self, line: &str) {
        let mut lines = match self.lines.lock() {
            Ok(lines) => lines,
            Err(poisoned) => poisoned.into_inner(),
        };
        lines.push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_logger_records_lines_in_order() {
        let logger = MemoryLogger::new();
        logger.log("first");
        logger.log("second");

        assert_eq!(logger.lines(), vec!["first", "second"]);
    }

    #[test]
    fn test_memory_logger_clones_share_storage() {
        let logger = MemoryLogger::new();
        let handle: Arc<dyn Logger> = Arc::new(logger.clone());

        handle.log("through the trait object");

        assert_eq!(logger.lines(), vec!["through the trait object"]);
    }

    #[test]
    fn test_mock_logger_receives_line() {
        let mut logger = MockLogger::new();
        logger
            .expect_log()
            .withf(|line| line.starts_with("--> GET"))
            .times(1)
            .return_const(());

        logger.log("--> GET https://n8n.example.com/api/v1/workflows (attempt 1/4)");
    }

    #[test]
    fn test_log_logger_does_not_panic_without_backend() {
        LogLogger.log("no logger installed");
    }
}
