//! Oracle query cache
//!
//! Memoizes oracle calls at two granularities:
//!
//! - `raw`: exact prompt → response
//! - `list`: item → (list question → matching response lines)
//!
//! and derives a typed knowledge base (`kb`) from the per-item answers.
//! The cache is write-through: every new oracle answer is persisted before
//! the call returns.

pub mod knowledge;

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use fctc_oracle::Oracle;
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};
use crate::normalize::{join_quoted, normalize_quotes};
use crate::persist;

pub use knowledge::KbValue;

/// Default number of items per batched list query
pub const DEFAULT_LIST_BATCH_SIZE: usize = 20;

/// Per-item answers: item → (question → lines)
pub type ListAnswers = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Knowledge base: key → (item → value)
pub type KnowledgeBase = BTreeMap<String, BTreeMap<String, KbValue>>;

/// The persisted cache document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheData {
    pub raw: BTreeMap<String, String>,
    pub list: ListAnswers,
    pub kb: KnowledgeBase,
}

/// Memoizing front for an [`Oracle`]
pub struct QueryCache {
    oracle: Box<dyn Oracle>,
    data: CacheData,
    path: Option<PathBuf>,
    batch_size: usize,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("path", &self.path)
            .field("raw", &self.data.raw.len())
            .field("list", &self.data.list.len())
            .field("kb", &self.data.kb.len())
            .finish()
    }
}

impl QueryCache {
    /// Open a cache file, starting empty when it does not exist yet
    pub fn open(path: impl Into<PathBuf>, oracle: Box<dyn Oracle>) -> Result<Self> {
        let path = path.into();
        let data = if path.exists() {
            persist::read_json(&path)?
        } else {
            tracing::info!("No query cache at {}, starting empty", path.display());
            CacheData::default()
        };
        Ok(Self {
            oracle,
            data,
            path: Some(path),
            batch_size: DEFAULT_LIST_BATCH_SIZE,
        })
    }

    /// A cache that never touches disk
    pub fn in_memory(oracle: Box<dyn Oracle>) -> Self {
        Self {
            oracle,
            data: CacheData::default(),
            path: None,
            batch_size: DEFAULT_LIST_BATCH_SIZE,
        }
    }

    /// Set the number of items per list query (at least one)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn data(&self) -> &CacheData {
        &self.data
    }

    /// Values recorded under a knowledge-base key
    pub fn knowledge(&self, shortname: &str) -> Option<&BTreeMap<String, KbValue>> {
        self.data.kb.get(shortname)
    }

    /// Rewrite the cache file
    pub fn save(&self) -> Result<()> {
        if let Some(path) = &self.path {
            persist::write_json(path, &self.data)?;
        }
        Ok(())
    }

    /// Answer a prompt, consulting the oracle only on a cache miss
    pub fn query(&mut self, text: &str) -> Result<String> {
        if let Some(answer) = self.data.raw.get(text) {
            return Ok(answer.clone());
        }

        let answer = self.oracle.query(text)?;
        self.data.raw.insert(text.to_string(), answer.clone());
        self.save()?;
        Ok(answer)
    }

    /// Ask a list question about many items, batching the uncached ones.
    ///
    /// Each batch is sent as `query "a", "b", and "c"` followed by `suffix`
    /// on its own line. The returned map has an entry for every distinct
    /// item, holding the response lines that mention it.
    pub fn query_list<S: AsRef<str>>(
        &mut self,
        query: &str,
        items: &[S],
        suffix: &str,
    ) -> Result<BTreeMap<String, Vec<String>>> {
        let mut result = BTreeMap::new();
        let mut pending: Vec<String> = Vec::new();
        let mut seen = HashSet::new();

        for item in items {
            let item = item.as_ref();
            if !seen.insert(item) {
                continue;
            }
            match self.data.list.get(item).and_then(|q| q.get(query)) {
                Some(lines) => {
                    result.insert(item.to_string(), lines.clone());
                }
                None => pending.push(item.to_string()),
            }
        }

        for batch in pending.chunks(self.batch_size) {
            let prompt = if suffix.is_empty() {
                format!("{} {}", query, join_quoted(batch, "and"))
            } else {
                format!("{} {}\n{}", query, join_quoted(batch, "and"), suffix)
            };
            tracing::debug!("List query over {} items: {}", batch.len(), query);

            let answer = match self.data.raw.get(&prompt) {
                Some(answer) => answer.clone(),
                None => {
                    let answer = self.oracle.query(&prompt)?;
                    self.data.raw.insert(prompt, answer.clone());
                    answer
                }
            };

            for item in batch {
                let lines = lines_mentioning(item, &answer);
                self.data
                    .list
                    .entry(item.clone())
                    .or_default()
                    .insert(query.to_string(), lines.clone());
                result.insert(item.clone(), lines);
            }
            self.save()?;
        }

        Ok(result)
    }

    /// Derive typed values for `shortname` from answers to `query`.
    ///
    /// Only items with exactly one recorded line contribute. Fails when no
    /// item (within `subset`, if given) was ever asked `query`.
    pub fn extract_knowledge<S: AsRef<str>>(
        &mut self,
        shortname: &str,
        query: &str,
        subset: Option<&[S]>,
    ) -> Result<()> {
        let allowed: Option<HashSet<&str>> =
            subset.map(|items| items.iter().map(|s| s.as_ref()).collect());

        let mut asked = false;
        let mut raw_values = Vec::new();
        for (item, answers) in &self.data.list {
            if let Some(allowed) = &allowed {
                if !allowed.contains(item.as_str()) {
                    continue;
                }
            }
            let Some(lines) = answers.get(query) else {
                continue;
            };
            asked = true;
            match lines.as_slice() {
                [line] => raw_values.push((
                    item.clone(),
                    knowledge::value_after_item(item, line).to_string(),
                )),
                _ => tracing::debug!(
                    "Skipping '{}' for {}: {} answer lines",
                    item,
                    shortname,
                    lines.len()
                ),
            }
        }

        if !asked {
            return Err(CacheError::UnknownQuery(query.to_string()).into());
        }

        // Unify over everything stored under the key so it keeps one type
        let entry = self.data.kb.entry(shortname.to_string()).or_default();
        let mut merged: BTreeMap<String, String> = entry
            .iter()
            .map(|(item, value)| (item.clone(), value.to_string()))
            .collect();
        merged.extend(raw_values);
        let merged: Vec<(String, String)> = merged.into_iter().collect();
        *entry = knowledge::unify(&merged).into_iter().collect();
        Ok(())
    }

    /// [`query_list`](Self::query_list) then
    /// [`extract_knowledge`](Self::extract_knowledge) over the same items
    pub fn query_into_knowledge<S: AsRef<str>>(
        &mut self,
        shortname: &str,
        query: &str,
        items: &[S],
        suffix: &str,
    ) -> Result<BTreeMap<String, Vec<String>>> {
        let result = self.query_list(query, items, suffix)?;
        if !result.is_empty() {
            self.extract_knowledge(shortname, query, Some(items))?;
        }
        Ok(result)
    }

    /// Clear one knowledge-base key, or the whole knowledge base
    pub fn flush_knowledge(&mut self, shortname: Option<&str>) -> Result<()> {
        match shortname {
            None => self.data.kb.clear(),
            Some(key) => {
                if self.data.kb.remove(key).is_none() {
                    return Err(CacheError::UnknownKnowledgeKey(key.to_string()).into());
                }
            }
        }
        Ok(())
    }
}

/// Response lines that answer for `item`, trimmed and stripped of quotes.
///
/// A line counts when it mentions the item without any quotes, or when the
/// item is the only quoted text and the line starts with it.
pub fn lines_mentioning(item: &str, response: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for line in response.lines() {
        let line = normalize_quotes(line);
        if !line.contains(item) {
            continue;
        }

        let quotes = line.matches('"').count();
        if quotes != 0 {
            if quotes != 2 {
                continue;
            }
            let parts: Vec<&str> = line.split('"').collect();
            if !parts[0].is_empty() || parts[1] != item {
                continue;
            }
        }

        lines.push(line.trim().replace('"', ""));
    }
    lines
}
