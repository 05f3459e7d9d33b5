//! Tool name canonicalization
//!
//! Oracle answers name the same tool many ways ("hammer", "mallet", "stone
//! hammer"). The canonicalizer keeps a vocabulary of established tool names
//! and maps each new name onto it by asking the oracle, in batches, whether
//! the new tool serves the same purpose as a known one.
//!
//! Equivalence is asked once per tool name and reused for every step.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cache::QueryCache;
use crate::error::Result;
use crate::normalize::{join_quoted, normalize_quotes};
use crate::persist;

/// Default number of known tools offered per equivalence question
pub const DEFAULT_TOOL_BATCH_SIZE: usize = 30;

/// Sentinel appended to every batch, meaning "no match"
const NO_MATCH: &str = "None";

/// The persisted tool file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolData {
    /// Raw tool name → canonical name
    #[serde(alias = "TOOLDICT", default)]
    pub map: BTreeMap<String, String>,
    /// Established vocabulary
    #[serde(rename = "knownSet", alias = "KNOWNTOOLS", default)]
    pub known: BTreeSet<String>,
}

/// Outcome of checking one equivalence reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Equivalence {
    /// The tool is another name for this known tool
    Same(String),
    /// The oracle found no equivalent in this batch
    NoMatch,
    /// The reply could not be trusted
    Malformed(String),
}

/// Maps tool names onto a canonical vocabulary
#[derive(Debug, Clone)]
pub struct ToolCanonicalizer {
    data: ToolData,
    path: Option<PathBuf>,
    batch_size: usize,
}

impl ToolCanonicalizer {
    /// An empty, non-persisting vocabulary
    pub fn new() -> Self {
        Self {
            data: ToolData::default(),
            path: None,
            batch_size: DEFAULT_TOOL_BATCH_SIZE,
        }
    }

    /// Load the tool file, starting empty when it does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = if path.exists() {
            persist::read_json(&path)?
        } else {
            tracing::info!("No saved tool data at {}", path.display());
            ToolData::default()
        };
        Ok(Self {
            data,
            path: Some(path),
            batch_size: DEFAULT_TOOL_BATCH_SIZE,
        })
    }

    /// Set the number of known tools per question (at least one)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn data(&self) -> &ToolData {
        &self.data
    }

    /// Whether the name is already a key, a canonical value, or a known tool
    pub fn is_resolved(&self, tool: &str) -> bool {
        self.data.map.contains_key(tool)
            || self.data.known.contains(tool)
            || self.data.map.values().any(|v| v == tool)
    }

    /// The canonical name for `tool`, or the name itself
    pub fn resolve<'a>(&'a self, tool: &'a str) -> &'a str {
        self.data.map.get(tool).map(String::as_str).unwrap_or(tool)
    }

    fn register(&mut self, tool: &str) {
        self.data.map.insert(tool.to_string(), tool.to_string());
        self.data.known.insert(tool.to_string());
    }

    /// Map every unresolved candidate onto the vocabulary.
    ///
    /// With an empty vocabulary every candidate becomes canonical. Otherwise
    /// each candidate is compared against the vocabulary batch by batch and
    /// self-registers when nothing matches.
    pub fn standardize<S: AsRef<str>>(&mut self, cache: &mut QueryCache, candidates: &[S]) -> Result<()> {
        let mut unchecked: Vec<String> = Vec::new();
        for tool in candidates {
            let tool = tool.as_ref();
            if self.is_resolved(tool) || unchecked.iter().any(|t| t == tool) {
                tracing::trace!("{} is already a known tool", tool);
                continue;
            }
            unchecked.push(tool.to_string());
        }

        if unchecked.is_empty() {
            return Ok(());
        }

        if self.data.known.is_empty() {
            for tool in &unchecked {
                self.register(tool);
            }
            return Ok(());
        }

        for tool in &unchecked {
            let known: Vec<String> = self.data.known.iter().cloned().collect();
            let mut matched = None;

            for chunk in known.chunks(self.batch_size) {
                let mut batch: Vec<&str> = chunk.iter().map(String::as_str).collect();
                batch.push(NO_MATCH);

                let reply = cache.query(&equivalence_prompt(tool, &batch))?;
                match self.check_reply(tool, &reply) {
                    Equivalence::Same(canonical) => {
                        matched = Some(canonical);
                        break;
                    }
                    Equivalence::NoMatch => {}
                    Equivalence::Malformed(reason) => {
                        tracing::warn!("Ignoring equivalence reply for {}: {}", tool, reason);
                    }
                }
            }

            match matched {
                Some(canonical) => {
                    tracing::debug!("Substitute {} for {}", canonical, tool);
                    self.data.map.insert(tool.clone(), canonical);
                }
                None => self.register(tool),
            }
        }

        Ok(())
    }

    /// Judge one equivalence reply for `tool`.
    ///
    /// Only a single line of the form `"<tool>" "<known tool>"` is a match.
    pub fn check_reply(&self, tool: &str, reply: &str) -> Equivalence {
        let lines: Vec<&str> = reply.lines().filter(|l| !l.trim().is_empty()).collect();
        let line = match lines.as_slice() {
            [] => return Equivalence::NoMatch,
            [line] => normalize_quotes(line.trim()),
            _ => return Equivalence::Malformed(format!("{} lines returned", lines.len())),
        };

        let parts: Vec<&str> = line.split('"').collect();
        if parts.len() != 5 {
            return Equivalence::Malformed(format!("'{}' doesn't have 4 quotes", line));
        }
        if !parts[0].is_empty() || !parts[4].is_empty() || parts[2] != " " {
            return Equivalence::Malformed(format!("'{}' is malformed", line));
        }
        if parts[1] != tool {
            return Equivalence::Malformed(format!("'{}' names {} instead of {}", line, parts[1], tool));
        }

        let target = parts[3];
        if target == NO_MATCH {
            return Equivalence::NoMatch;
        }
        if !self.data.known.contains(target) {
            return Equivalence::Malformed(format!("{} is not a known tool", target));
        }
        Equivalence::Same(target.to_string())
    }

    /// Rewrite the tool file
    pub fn save(&self) -> Result<()> {
        if let Some(path) = &self.path {
            persist::write_json(path, &self.data)?;
        }
        Ok(())
    }
}

impl Default for ToolCanonicalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// The equivalence question for one tool against a batch of known tools
pub fn equivalence_prompt(tool: &str, batch: &[&str]) -> String {
    format!(
        "Suppose I have the following tool: \"{tool}\".  This tool name is a single item, even if it contains spaces.  \
Does this tool serve the same purpose as any of the following tools: {}? \
If so, output original tool name and the replaced tool from the tool list, if needed.  \
If you do not have a match, produce no output.   \
For example, if the tool is \"hammer\"  and the tool list is \"a mallet\", \"a screwdriver\", and \"None\", \
you would reply: \"hammer\" \"a mallet\" Always include the double quotes around the items.",
        join_quoted(batch, "and")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use fctc_oracle::ScriptedOracle;

    fn cache_answering<F>(f: F) -> (QueryCache, ScriptedOracle)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        let oracle = ScriptedOracle::answering(f);
        (QueryCache::in_memory(Box::new(oracle.clone())), oracle)
    }

    #[test]
    fn test_empty_vocabulary_self_registers() {
        let (mut cache, oracle) = cache_answering(|_| String::new());
        let mut tools = ToolCanonicalizer::new();
        tools.standardize(&mut cache, &["hammer", "chisel"]).unwrap();
        assert_eq!(oracle.call_count(), 0);
        assert_eq!(tools.resolve("hammer"), "hammer");
        assert!(tools.data().known.contains("chisel"));
    }

    #[test]
    fn test_match_maps_to_known() {
        let (mut cache, _) = cache_answering(|_| "\"mallet\" \"hammer\"".to_string());
        let mut tools = ToolCanonicalizer::new();
        tools.standardize(&mut cache, &["hammer"]).unwrap();
        tools.standardize(&mut cache, &["mallet"]).unwrap();
        assert_eq!(tools.resolve("mallet"), "hammer");
        assert!(!tools.data().known.contains("mallet"));
    }

    #[test]
    fn test_resolved_candidates_skip_oracle() {
        let (mut cache, oracle) = cache_answering(|_| "\"mallet\" \"hammer\"".to_string());
        let mut tools = ToolCanonicalizer::new();
        tools.standardize(&mut cache, &["hammer"]).unwrap();
        tools.standardize(&mut cache, &["mallet"]).unwrap();
        tools.standardize(&mut cache, &["mallet", "hammer"]).unwrap();
        assert_eq!(oracle.call_count(), 1);
    }

    #[test]
    fn test_batches_include_none_sentinel() {
        let (mut cache, oracle) = cache_answering(|_| String::new());
        let mut tools = ToolCanonicalizer::new().with_batch_size(2);
        tools.standardize(&mut cache, &["a", "b", "c"]).unwrap();
        tools.standardize(&mut cache, &["d"]).unwrap();

        let calls = oracle.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].contains("\"a\", \"b\", and \"None\""));
        assert!(calls[1].contains("\"c\" and \"None\""));
        assert!(tools.data().known.contains("d"));
    }

    #[test]
    fn test_check_reply() {
        let mut tools = ToolCanonicalizer::new();
        tools.register("hammer");

        assert_eq!(tools.check_reply("mallet", "\"mallet\" \"hammer\""), Equivalence::Same("hammer".into()));
        assert_eq!(tools.check_reply("mallet", ""), Equivalence::NoMatch);
        assert_eq!(tools.check_reply("mallet", "\"mallet\" \"None\""), Equivalence::NoMatch);
        assert!(matches!(tools.check_reply("mallet", "\"mallet\" \"anvil\""), Equivalence::Malformed(_)));
        assert!(matches!(tools.check_reply("mallet", "\"rock\" \"hammer\""), Equivalence::Malformed(_)));
        assert!(matches!(tools.check_reply("mallet", "mallet hammer"), Equivalence::Malformed(_)));
        assert!(matches!(tools.check_reply("mallet", "\"mallet\"  \"hammer\""), Equivalence::Malformed(_)));
        assert!(matches!(
            tools.check_reply("mallet", "\"mallet\" \"hammer\"\n\"mallet\" \"hammer\""),
            Equivalence::Malformed(_)
        ));
        assert_eq!(
            tools.check_reply("mallet", "\u{201c}mallet\u{201d} \u{201c}hammer\u{201d}"),
            Equivalence::Same("hammer".into())
        );
    }

    #[test]
    fn test_save_and_legacy_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tooldict.json");
        std::fs::write(
            &path,
            r#"{"TOOLDICT": {"mallet": "hammer", "hammer": "hammer"}, "KNOWNTOOLS": ["hammer"]}"#,
        )
        .unwrap();

        let tools = ToolCanonicalizer::open(&path).unwrap();
        assert_eq!(tools.resolve("mallet"), "hammer");
        tools.save().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"knownSet\""));
        let reopened = ToolCanonicalizer::open(&path).unwrap();
        assert_eq!(reopened.data(), tools.data());
    }
}
