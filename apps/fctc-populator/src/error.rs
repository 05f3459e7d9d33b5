//! Populator error type and exit codes

use std::path::PathBuf;
use std::process::ExitCode;

use fctc_core::{ConfigError, FctcError};
use fctc_oracle::OracleError;
use thiserror::Error;

/// Exit code after a cancelled run (128 + SIGINT)
pub const EXIT_CANCELLED: u8 = 130;

/// Exit code when no action was requested
pub const EXIT_NO_ACTION: u8 = 2;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] FctcError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Cannot read query file {}: {source}", .path.display())]
    QueryFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable {0} holding the API key is not set")]
    MissingApiKey(String),

    #[error("Item '{0}' is not a known, user requested item")]
    NotRequested(String),
}

impl AppError {
    /// Process status for this error: 130 when cancelled, 1 otherwise
    pub fn status(&self) -> u8 {
        match self {
            AppError::Core(err) if err.is_cancelled() => EXIT_CANCELLED,
            _ => 1,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::from(FctcError::Cancelled).status(), EXIT_CANCELLED);
        assert_eq!(AppError::from(FctcError::Corrupted { names: vec![] }).status(), 1);
        assert_eq!(AppError::MissingApiKey("OPENAI_API_KEY".into()).status(), 1);
    }
}
