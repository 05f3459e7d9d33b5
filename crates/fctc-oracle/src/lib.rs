//! FCTC Oracle - free-text question answering for the From Caves To Cars populator
//!
//! The populator treats its language model as an *oracle*: a prompt goes in,
//! prose comes out, and nothing else about the exchange is assumed. This crate
//! provides that contract and its implementations.
//!
//! # Oracles
//!
//! - [`LlmOracle`]: sends each prompt as one user message through the
//!   graniet/llm library (OpenAI, Groq, Mistral, DeepSeek, xAI)
//! - [`ScriptedOracle`]: answers from a closure and records every prompt, for
//!   offline runs and tests
//! - any `Fn(&str) -> Result<String, OracleError>` closure
//!
//! # Architecture
//!
//! All operations are blocking (synchronous). The LLM bridge drives the async
//! client on a lazily created tokio runtime, available through [`runtime`] so a
//! binary can share it for signal handling.

pub mod oracle;
pub mod provider;
pub mod scripted;
pub mod types;

pub use oracle::Oracle;
pub use provider::{get_provider, get_providers, runtime, LlmOracle};
pub use scripted::ScriptedOracle;
pub use types::*;
