//! The oracle contract

use crate::types::OracleError;

/// A free-text question answerer.
///
/// Calls are blocking and sequential; implementations decide how (or whether)
/// to reach the network. Failures are returned as-is, callers do not retry.
pub trait Oracle: Send + Sync {
    /// Answer a single prompt
    fn query(&self, prompt: &str) -> Result<String, OracleError>;
}

impl<F> Oracle for F
where
    F: Fn(&str) -> Result<String, OracleError> + Send + Sync,
{
    fn query(&self, prompt: &str) -> Result<String, OracleError> {
        self(prompt)
    }
}
