//! CLI error type and exit code mapping.

use crate::error::{ConfigError, HistoryError, ReportError, SchemaError, TransportError};

/// Exit code when every case passed.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code when at least one case failed.
pub const EXIT_TESTS_FAILED: i32 = 1;
/// Exit code when Ctrl-C stopped the run early.
pub const EXIT_ABORTED: i32 = 130;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// One or more descriptor files are malformed; nothing was sent.
    #[error("{} invalid descriptor(s)", .0.len())]
    Schema(Vec<SchemaError>),

    #[error("failed to set up HTTP client: {0}")]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Report(#[from] ReportError),

    #[error("history error: {0}")]
    History(#[from] HistoryError),

    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SchemaError> for CliError {
    fn from(err: SchemaError) -> Self {
        Self::Schema(vec![err])
    }
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                  |
    /// |------|------------------------------------------|
    /// | 1    | Internal error (client setup, reporting) |
    /// | 2    | Configuration or descriptor schema error |
    /// | 3    | History database error                   |
    /// | 10   | IO error                                 |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Schema(_) => 2,
            Self::History(_) => 3,
            Self::Io(_) => 10,
            Self::Transport(_) | Self::Report(_) | Self::JsonSerialize(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_errors_exit_with_2() {
        let err = CliError::from(SchemaError::new("a.json", "uri must not be empty"));
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "1 invalid descriptor(s)");
    }

    #[test]
    fn config_errors_exit_with_2() {
        let err = CliError::from(ConfigError::Invalid("concurrency must be at least 1".into()));
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("configuration error"));
    }

    #[test]
    fn io_errors_exit_with_10() {
        let err = CliError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.exit_code(), 10);
    }

    #[test]
    fn already_finalized_is_an_internal_error() {
        let err = CliError::from(ReportError::AlreadyFinalized);
        assert_eq!(err.exit_code(), 1);
    }
}
