//! A scripted oracle for offline runs and tests
//!
//! Answers come from a responder closure; every prompt is recorded so callers
//! can check how many round-trips a piece of code really made.

use std::sync::{Arc, Mutex};

use crate::oracle::Oracle;
use crate::types::OracleError;

type Responder = dyn Fn(&str) -> Result<String, OracleError> + Send + Sync;

/// Oracle whose answers are produced by a closure.
///
/// Clones share the same responder and call log.
#[derive(Clone)]
pub struct ScriptedOracle {
    responder: Arc<Responder>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl std::fmt::Debug for ScriptedOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedOracle")
            .field("calls", &self.call_count())
            .finish()
    }
}

impl ScriptedOracle {
    /// Create an oracle from a fallible responder
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<String, OracleError> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create an oracle that always answers with the responder's text
    pub fn answering<F>(responder: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self::new(move |prompt| Ok(responder(prompt)))
    }

    /// Create an oracle that fails every call as unavailable
    pub fn unavailable() -> Self {
        Self::new(|_| {
            Err(OracleError::Unavailable {
                message: "scripted oracle is offline".to_string(),
            })
        })
    }

    /// All prompts received so far, in order
    pub fn calls(&self) -> Vec<String> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of prompts received so far
    pub fn call_count(&self) -> usize {
        self.calls().len()
    }

    /// Prompts containing the given text
    pub fn calls_containing(&self, needle: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.contains(needle))
            .collect()
    }
}

impl Oracle for ScriptedOracle {
    fn query(&self, prompt: &str) -> Result<String, OracleError> {
        match self.calls.lock() {
            Ok(mut calls) => calls.push(prompt.to_string()),
            Err(poisoned) => poisoned.into_inner().push(prompt.to_string()),
        }
        (self.responder)(prompt)
    }
}
