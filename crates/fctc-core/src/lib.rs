//! FCTC Core - populating the From Caves To Cars knowledge graph
//!
//! Starting from a requested item, the engine asks a free-text oracle how the
//! item is made, parses the answers, and records each step with its tools and
//! raw materials. Dependencies are decomposed in turn until every branch ends
//! in a natural item that is not itself part of a larger one.
//!
//! - **Normalize**: tolerant parsing of list-shaped oracle answers
//! - **Cache**: write-through memo of every prompt, batched list queries, knowledge base
//! - **Tools**: canonical tool vocabulary built from oracle equivalence questions
//! - **Graph**: the item database with its status machine and cycle repair
//! - **Engine**: resumable depth-first decomposition with checkpoints
//! - **Enrich**: optional descriptions and image lookups
//! - **Tree**: read-only report of what an item needs
//!
//! # Persistence
//!
//! ```text
//! fctc.db.json        items keyed by name
//! openai.cache.json   raw / list / kb answers
//! tooldict.json       tool aliases and known tools
//! ```
//!
//! Every file is rewritten whole after each completed item, so an interrupted
//! run resumes from the last checkpoint.

pub mod cache;
pub mod config;
pub mod engine;
pub mod enrich;
pub mod error;
pub mod graph;
pub mod item;
pub mod normalize;
pub mod persist;
pub mod tools;
pub mod tree;

pub use cache::{KbValue, QueryCache};
pub use config::{ConfigError, EngineConfig, FctcConfig, OracleConfig, StorageConfig};
pub use engine::{CancelFlag, Engine, EngineOptions, RepairMode, RunRequest, RunSummary};
pub use enrich::{Enricher, OracleDescriber};
pub use error::{FctcError, Result};
pub use graph::{DependencyCounts, ItemGraph};
pub use item::{ItemNode, ItemStatus, Step};
pub use tools::ToolCanonicalizer;
pub use tree::{ItemTree, RowKind, TreeCounts, TreeRow};

/// Returns the version of fctc-core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
