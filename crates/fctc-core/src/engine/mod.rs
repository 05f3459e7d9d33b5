//! Decomposition engine
//!
//! Drives an item from a bare name to a complete tree of steps, tools and
//! raw materials:
//!
//! 1. classify the item (natural? part of a larger item?)
//! 2. base items are complete immediately
//! 3. otherwise estimate its age, ask for its steps, and per step ask for the
//!    tools (canonicalized) and then the raw materials
//! 4. classify every newly seen dependency and expand the composite ones
//! 5. mark referenced tools, complete the item, checkpoint
//!
//! Expansion runs on an explicit work stack, so arbitrarily deep trees do not
//! grow the call stack. Each item is `InProgress` while its dependencies are
//! being expanded; meeting an `InProgress` item again means a cycle (or a
//! diamond still in flight) and the reference is not followed.

pub mod age;
mod cancel;
pub mod prompts;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use fctc_oracle::Oracle;

use crate::cache::QueryCache;
use crate::config::{EngineConfig, FctcConfig};
use crate::enrich::{image_search_term, Enricher, OracleDescriber};
use crate::error::{FctcError, Result};
use crate::graph::ItemGraph;
use crate::item::{ItemStatus, Step};
use crate::normalize::{is_useless, parse_true_false, simple_list, DEFAULT_OPTIONAL_MARKER};
use crate::tools::ToolCanonicalizer;

pub use age::{is_younger, parse_year};
pub use cancel::CancelFlag;

/// Engine behavior switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Query each dependency's own age instead of inheriting the parent's
    pub primitive_age_for_all: bool,
    /// Substring marking optional list entries
    pub optional_marker: String,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            primitive_age_for_all: false,
            optional_marker: DEFAULT_OPTIONAL_MARKER.to_string(),
        }
    }
}

impl From<&EngineConfig> for EngineOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            primitive_age_for_all: config.primitive_age_for_all,
            optional_marker: config.optional_marker.clone(),
        }
    }
}

/// How much of an existing graph to redo before the requested roots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepairMode {
    /// Refuse to run on a graph with unfinished items
    #[default]
    None,
    /// Re-decompose only the unfinished items
    Incomplete,
    /// Re-decompose every item
    All,
}

impl RepairMode {
    /// `-r` → Incomplete, `-rr` (or more) → All
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => RepairMode::None,
            1 => RepairMode::Incomplete,
            _ => RepairMode::All,
        }
    }
}

/// One populator run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Items the user asked for, in order
    pub roots: Vec<String>,
    pub repair: RepairMode,
    /// Proceed even when the graph holds unfinished items
    pub ignore_corruption: bool,
}

/// What a finished run did
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unfinished items found at startup
    pub incomplete_at_start: usize,
    /// Items re-decomposed by repair or rebuild
    pub repaired: usize,
    /// Requested roots decomposed
    pub roots: usize,
    /// Items in the graph afterwards
    pub items: usize,
}

enum Frame {
    Enter {
        name: String,
        age: Option<String>,
        depth: usize,
    },
    Finish {
        name: String,
        tools: Vec<String>,
        depth: usize,
    },
}

/// Owns every store a run touches and drives decomposition
pub struct Engine {
    graph: ItemGraph,
    cache: QueryCache,
    tools: ToolCanonicalizer,
    options: EngineOptions,
    enricher: Option<Box<dyn Enricher>>,
    cancel: CancelFlag,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("graph", &self.graph.len())
            .field("cache", &self.cache)
            .field("options", &self.options)
            .field("enricher", &self.enricher.is_some())
            .finish()
    }
}

impl Engine {
    pub fn new(graph: ItemGraph, cache: QueryCache, tools: ToolCanonicalizer, options: EngineOptions) -> Self {
        Self {
            graph,
            cache,
            tools,
            options,
            enricher: None,
            cancel: CancelFlag::new(),
        }
    }

    /// Open the three stores named by `config` and wire them to `oracle`
    pub fn from_config(config: &FctcConfig, oracle: Box<dyn Oracle>) -> Result<Self> {
        config.validate()?;
        let storage = &config.storage;
        let graph = ItemGraph::open(storage.item_db_path(), true)?;
        let cache = QueryCache::open(storage.cache_path(), oracle)?
            .with_batch_size(config.engine.list_batch_size);
        let tools = ToolCanonicalizer::open(storage.tool_path())?
            .with_batch_size(config.engine.tool_batch_size);

        let mut engine = Self::new(graph, cache, tools, EngineOptions::from(&config.engine));
        if config.engine.describe {
            engine = engine.with_enricher(Box::new(OracleDescriber));
        }
        Ok(engine)
    }

    pub fn with_enricher(mut self, enricher: Box<dyn Enricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn graph(&self) -> &ItemGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut ItemGraph {
        &mut self.graph
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn tools(&self) -> &ToolCanonicalizer {
        &self.tools
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Startup check, optional repair, every root, then a final checkpoint.
    ///
    /// The final checkpoint is written even when a root fails.
    pub fn run(&mut self, request: &RunRequest) -> Result<RunSummary> {
        let incomplete = self.graph.incomplete();
        if !incomplete.is_empty() {
            tracing::warn!(
                "The item graph contains {} incomplete items and is likely corrupted",
                incomplete.len()
            );
            if request.repair == RepairMode::None && !request.ignore_corruption {
                return Err(FctcError::Corrupted { names: incomplete });
            }
        }

        let mut summary = RunSummary {
            incomplete_at_start: incomplete.len(),
            ..RunSummary::default()
        };

        let outcome = self.run_inner(request, incomplete, &mut summary);
        let saved = self.save_all();
        summary.items = self.graph.len();

        outcome?;
        saved?;
        if self.cancel.is_cancelled() {
            return Err(FctcError::Cancelled);
        }
        Ok(summary)
    }

    fn run_inner(&mut self, request: &RunRequest, incomplete: Vec<String>, summary: &mut RunSummary) -> Result<()> {
        let to_repair = match request.repair {
            RepairMode::None => Vec::new(),
            RepairMode::Incomplete => {
                tracing::info!("Rebuilding {} items", incomplete.len());
                for name in &incomplete {
                    let node = self.graph.require_mut(name)?;
                    if node.status == ItemStatus::InProgress {
                        node.transition_to(ItemStatus::NeedToProcess)?;
                    }
                }
                incomplete
            }
            RepairMode::All => {
                tracing::info!("Rebuilding ALL {} items", self.graph.len());
                for node in self.graph.items_mut() {
                    node.transition_to(ItemStatus::NeedToProcess)?;
                }
                self.graph.filter(|_| true)
            }
        };

        for name in &to_repair {
            tracing::info!("Repairing {}", name);
            self.decompose(name, None)?;
            summary.repaired += 1;
        }

        for root in &request.roots {
            tracing::info!("Main query: {}", root);
            self.decompose(root, Some(true))?;
            summary.roots += 1;
        }

        Ok(())
    }

    /// Decompose one item.
    ///
    /// `user_requested` overwrites the node's flag when given; `None` leaves
    /// an existing flag alone.
    pub fn decompose(&mut self, name: &str, user_requested: Option<bool>) -> Result<()> {
        if let Some(node) = self.graph.get_mut(name) {
            match node.status {
                ItemStatus::Complete => {
                    if let Some(flag) = user_requested {
                        node.user_requested = flag;
                    }
                    tracing::debug!("Already know about {}, skipping", name);
                    return Ok(());
                }
                ItemStatus::InProgress => {
                    tracing::warn!("{} is already in progress, skipping", name);
                    return Ok(());
                }
                ItemStatus::Unprocessed | ItemStatus::NeedToProcess => {}
            }
        }

        let node = self.graph.get_or_create(name);
        node.transition_to(ItemStatus::NeedToProcess)?;
        if let Some(flag) = user_requested {
            node.user_requested = flag;
        }
        let classified = node.is_classified();

        if !classified {
            self.classify(&[name.to_string()])?;
        }

        let is_base = self
            .graph
            .get(name)
            .map(|node| node.is_base_item())
            .unwrap_or(false);
        if is_base {
            tracing::info!("{} occurs in nature and doesn't need to be processed", name);
            self.graph.require_mut(name)?.transition_to(ItemStatus::Complete)?;
            self.describe_item(name);
            return self.checkpoint();
        }

        let age = self.cache.query(&prompts::age_prompt(name))?.trim().to_string();
        self.graph.require_mut(name)?.estimated_age = Some(age.clone());

        self.expand(name, Some(age))
    }

    /// Ask both classification questions for `names` and record the answers
    fn classify(&mut self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }

        let part = self
            .cache
            .query_list(prompts::PART_QUERY, names, prompts::PART_SUFFIX)?;
        let natural = self
            .cache
            .query_list(prompts::NATURAL_QUERY, names, prompts::NATURAL_SUFFIX)?;

        for name in names {
            let part_lines = part.get(name).ok_or_else(|| {
                FctcError::Invariant(format!("{} isn't part of a larger item or not", name))
            })?;
            let natural_lines = natural
                .get(name)
                .ok_or_else(|| FctcError::Invariant(format!("{} isn't natural or not", name)))?;

            let node = self.graph.require_mut(name)?;
            node.is_part_of_larger = parse_true_false(part_lines);
            node.is_natural = parse_true_false(natural_lines);
            if node.is_part_of_larger.is_none() {
                tracing::debug!("{} omitted from is_part_of_a_larger_item", name);
            }
            if node.is_natural.is_none() {
                tracing::debug!("{} omitted from is_natural", name);
            }
        }

        self.cache
            .extract_knowledge(prompts::PART_KB_KEY, prompts::PART_QUERY, Some(names))?;
        self.cache
            .extract_knowledge(prompts::NATURAL_KB_KEY, prompts::NATURAL_QUERY, Some(names))?;
        Ok(())
    }

    fn expand(&mut self, root: &str, age: Option<String>) -> Result<()> {
        let mut stack = vec![Frame::Enter {
            name: root.to_string(),
            age,
            depth: 0,
        }];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter { name, age, depth } => self.enter(&name, age, depth, &mut stack)?,
                Frame::Finish { name, tools, depth } => self.finish(&name, &tools, depth)?,
            }
        }
        Ok(())
    }

    /// Query the steps of `name` and schedule its new dependencies
    fn enter(&mut self, name: &str, age: Option<String>, depth: usize, stack: &mut Vec<Frame>) -> Result<()> {
        let status = self.graph.get(name).map(|node| node.status);
        if status != Some(ItemStatus::NeedToProcess) {
            tracing::debug!("Already know about {} with status {:?}, skipping", name, status);
            self.describe_item(name);
            return Ok(());
        }
        self.graph.require_mut(name)?.transition_to(ItemStatus::InProgress)?;

        match &age {
            Some(age) => tracing::info!(depth, "Processing {} ({})", name, age),
            None => tracing::info!(depth, "Processing {} (no time restrictions)", name),
        }

        let marker = self.options.optional_marker.clone();
        let age_ref = age.as_deref();

        let answer = self.cache.query(&prompts::steps_prompt(name, age_ref))?;
        let labels = simple_list(&answer, &marker);

        let mut steps = Vec::with_capacity(labels.len());
        let mut discovered: Vec<String> = Vec::new();
        let mut all_tools: Vec<String> = Vec::new();

        for label in labels {
            tracing::debug!(depth, "Step: {}", label);

            let answer = self.cache.query(&prompts::tools_prompt(&label, name, age_ref))?;
            let mut tools = simple_list(&answer, &marker);
            tools.retain(|tool| !is_useless(tool));

            self.tools.standardize(&mut self.cache, &tools)?;
            let resolved: Vec<String> = tools
                .iter()
                .map(|tool| self.tools.resolve(tool).to_string())
                .collect();
            for (raw, canonical) in tools.iter().zip(&resolved) {
                if raw != canonical {
                    tracing::debug!(depth, "Substitute {} for {}", canonical, raw);
                }
            }

            let answer = self.cache.query(&prompts::materials_prompt(
                &resolved.join(" and "),
                &label,
                name,
                age_ref,
            ))?;
            let mut materials = simple_list(&answer, &marker);
            materials.retain(|material| !is_useless(material));
            tracing::debug!(depth, "Tools: {:?} Raw materials: {:?}", resolved, materials);

            for dependency in resolved.iter().chain(materials.iter()) {
                if !discovered.contains(dependency) {
                    discovered.push(dependency.clone());
                }
            }
            all_tools.extend(resolved.iter().cloned());
            steps.push(Step::new(label, resolved, materials));
        }

        self.graph.require_mut(name)?.steps = Some(steps);
        self.describe_steps(name);

        let mut to_classify = Vec::new();
        let mut fresh = HashSet::new();
        for dependency in &discovered {
            match self.graph.get(dependency).map(|node| (node.status, node.is_classified())) {
                Some((ItemStatus::Complete, _)) | Some((ItemStatus::InProgress, _)) => {
                    tracing::debug!(depth, "{} is known or in progress, skipping", dependency);
                }
                Some((_, classified)) => {
                    self.graph
                        .require_mut(dependency)?
                        .transition_to(ItemStatus::NeedToProcess)?;
                    if !classified {
                        to_classify.push(dependency.clone());
                    }
                }
                None => {
                    let node = self.graph.get_or_create(dependency);
                    node.user_requested = false;
                    fresh.insert(dependency.clone());
                    to_classify.push(dependency.clone());
                }
            }
        }
        self.classify(&to_classify)?;

        let mut pending = Vec::new();
        for dependency in &discovered {
            let Some(node) = self.graph.get_mut(dependency) else {
                continue;
            };
            if node.status != ItemStatus::NeedToProcess {
                continue;
            }
            if node.is_base_item() {
                node.transition_to(ItemStatus::Complete)?;
                tracing::debug!(depth, "{} is a base item", dependency);
                self.describe_item(dependency);
            } else {
                pending.push(dependency.clone());
            }
        }

        if pending.is_empty() {
            tracing::debug!(depth, "No items to make for {}", name);
        } else {
            tracing::debug!(depth, "Items to make for {}: {:?} ({} new)", name, pending, fresh.len());
        }

        stack.push(Frame::Finish {
            name: name.to_string(),
            tools: all_tools,
            depth,
        });
        for dependency in pending.into_iter().rev() {
            let child_age = if self.options.primitive_age_for_all {
                self.dependency_age(&dependency, age_ref)?
            } else {
                age.clone()
            };
            stack.push(Frame::Enter {
                name: dependency,
                age: child_age,
                depth: depth + 1,
            });
        }

        Ok(())
    }

    /// The age a dependency is decomposed under in primitive-age mode.
    ///
    /// The dependency's own estimate is stored on it and used only when it is
    /// strictly older than the parent's; otherwise the parent's age stands.
    fn dependency_age(&mut self, name: &str, parent_age: Option<&str>) -> Result<Option<String>> {
        let own = self.cache.query(&prompts::age_prompt(name))?.trim().to_string();
        self.graph.require_mut(name)?.estimated_age = Some(own.clone());

        let Some(parent) = parent_age else {
            return Ok(Some(own));
        };
        match is_younger(parent, &own) {
            Ok(false) => Ok(Some(own)),
            Ok(true) => {
                tracing::debug!("{} ({}) is younger than {}, using {}", name, own, parent, parent);
                Ok(Some(parent.to_string()))
            }
            Err(e) => {
                tracing::debug!("Cannot compare ages for {}: {}, using {}", name, e, parent);
                Ok(Some(parent.to_string()))
            }
        }
    }

    fn finish(&mut self, name: &str, tools: &[String], depth: usize) -> Result<()> {
        for tool in tools {
            if let Some(node) = self.graph.get_mut(tool) {
                node.is_tool = true;
            }
        }
        self.describe_item(name);
        self.graph.require_mut(name)?.transition_to(ItemStatus::Complete)?;
        tracing::info!(depth, "Finished processing {}", name);
        self.checkpoint()
    }

    fn describe_item(&mut self, name: &str) {
        let Some(enricher) = &self.enricher else {
            return;
        };
        let Some(node) = self.graph.get(name) else {
            return;
        };
        let needs_description = node.description.is_empty();
        let needs_image = !node.extra.contains_key("image");

        if needs_description {
            match enricher.describe_item(&mut self.cache, name) {
                Ok(Some(text)) => {
                    if let Some(node) = self.graph.get_mut(name) {
                        node.description = text;
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Could not describe {}: {}", name, e),
            }
        }

        if needs_image {
            match enricher.search_images(&image_search_term(name)) {
                Ok(images) if !images.is_empty() => {
                    if let Some(node) = self.graph.get_mut(name) {
                        node.extra
                            .insert("image".to_string(), serde_json::Value::Array(images));
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Image search failed for {}: {}", name, e),
            }
        }
    }

    fn describe_steps(&mut self, name: &str) {
        let Some(enricher) = &self.enricher else {
            return;
        };
        let steps: Vec<Step> = match self.graph.get(name) {
            Some(node) => node.steps().to_vec(),
            None => return,
        };

        for (index, step) in steps.iter().enumerate() {
            if !step.needs_description() {
                continue;
            }
            match enricher.describe_step(&mut self.cache, name, step) {
                Ok(Some(text)) => {
                    if let Some(target) = self
                        .graph
                        .get_mut(name)
                        .and_then(|node| node.steps.as_mut())
                        .and_then(|steps| steps.get_mut(index))
                    {
                        target.description = Some(text);
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Could not describe step '{}' of {}: {}", step.label, name, e),
            }
        }
    }

    /// Persist the graph, the query cache and the tool vocabulary
    pub fn save_all(&self) -> Result<()> {
        self.graph.save()?;
        self.cache.save()?;
        self.tools.save()?;
        Ok(())
    }

    /// Save everything, then honor a pending cancellation
    pub fn checkpoint(&mut self) -> Result<()> {
        self.save_all()?;
        if self.cancel.is_cancelled() {
            tracing::warn!("Cancellation requested, stopping after checkpoint");
            return Err(FctcError::Cancelled);
        }
        Ok(())
    }
}
