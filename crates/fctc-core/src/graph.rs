//! Persistent item graph
//!
//! The graph is one JSON object keyed by item name. Each node carries a
//! `typename` discriminator; `"GenericItem"` nodes are decoded into
//! [`ItemNode`]s and anything else is kept verbatim and written back untouched.
//!
//! The store only loads, saves and answers queries. All status changes are
//! made by the engine.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{GraphError, Result};
use crate::item::{ItemNode, ItemStatus};
use crate::persist;

/// Discriminator of nodes this version understands
pub const GENERIC_ITEM: &str = "GenericItem";

/// Tool and raw-material tallies for one item's full dependency tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyCounts {
    pub unique_tools: usize,
    pub total_tools: usize,
    pub unique_raw_materials: usize,
    pub total_raw_materials: usize,
}

#[derive(Serialize)]
struct TaggedNode<'a> {
    typename: &'static str,
    #[serde(flatten)]
    node: &'a ItemNode,
}

/// Name-keyed item store
#[derive(Debug, Clone, Default)]
pub struct ItemGraph {
    items: BTreeMap<String, ItemNode>,
    /// Nodes with an unknown discriminator, kept as read
    passthrough: BTreeMap<String, Value>,
    path: Option<PathBuf>,
}

impl ItemGraph {
    /// An empty graph that is never written to disk
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a graph file.
    ///
    /// A missing file is created empty when `create_if_needed`, otherwise it is
    /// an error.
    pub fn open(path: impl Into<PathBuf>, create_if_needed: bool) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            let mut graph = Self::from_json(&std::fs::read_to_string(&path)?)?;
            graph.path = Some(path);
            return Ok(graph);
        }

        if !create_if_needed {
            return Err(GraphError::MissingDatabase(path.display().to_string()).into());
        }

        let graph = Self {
            path: Some(path),
            ..Self::default()
        };
        graph.save()?;
        Ok(graph)
    }

    /// Decode a persisted graph document
    pub fn from_json(text: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(text)?;
        let Value::Object(entries) = document else {
            return Err(GraphError::Malformed("top level is not an object".to_string()).into());
        };

        let mut graph = Self::default();
        for (name, value) in entries {
            match value {
                Value::Object(mut fields)
                    if fields.get("typename").and_then(Value::as_str) == Some(GENERIC_ITEM) =>
                {
                    fields.remove("typename");
                    let node: ItemNode = serde_json::from_value(Value::Object(fields))
                        .map_err(|e| GraphError::Malformed(format!("{}: {}", name, e)))?;
                    graph.items.insert(name, node);
                }
                other => {
                    tracing::debug!("Keeping untyped node {} as-is", name);
                    graph.passthrough.insert(name, other);
                }
            }
        }
        Ok(graph)
    }

    /// Encode the graph, known nodes and passthrough nodes alike
    pub fn to_document(&self) -> Result<Map<String, Value>> {
        let mut document = Map::new();
        for (name, value) in &self.passthrough {
            document.insert(name.clone(), value.clone());
        }
        for (name, node) in &self.items {
            let tagged = TaggedNode {
                typename: GENERIC_ITEM,
                node,
            };
            document.insert(name.clone(), serde_json::to_value(tagged)?);
        }
        Ok(document)
    }

    /// The persisted text of the graph
    pub fn to_json(&self) -> Result<String> {
        Ok(persist::to_pretty_json(&self.to_document()?)?)
    }

    /// Rewrite the graph file
    pub fn save(&self) -> Result<()> {
        if let Some(path) = &self.path {
            persist::write_json(path, &self.to_document()?)?;
        }
        Ok(())
    }

    /// Re-read the graph file, discarding in-memory changes
    pub fn load(&mut self) -> Result<()> {
        if let Some(path) = self.path.clone() {
            let mut loaded = Self::from_json(&std::fs::read_to_string(&path)?)?;
            loaded.path = Some(path);
            *self = loaded;
        }
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ItemNode> {
        self.items.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ItemNode> {
        self.items.get_mut(name)
    }

    /// Like [`get_mut`](Self::get_mut), failing for unknown names
    pub fn require_mut(&mut self, name: &str) -> Result<&mut ItemNode> {
        self.items
            .get_mut(name)
            .ok_or_else(|| GraphError::NotFound(name.to_string()).into())
    }

    /// Fetch a node, creating it when absent
    pub fn get_or_create(&mut self, name: &str) -> &mut ItemNode {
        self.items
            .entry(name.to_string())
            .or_insert_with(|| ItemNode::new(name))
    }

    /// Replace or add a node
    pub fn insert(&mut self, node: ItemNode) {
        self.items.insert(node.name.clone(), node);
    }

    pub fn items(&self) -> impl Iterator<Item = &ItemNode> {
        self.items.values()
    }

    pub fn items_mut(&mut self) -> impl Iterator<Item = &mut ItemNode> {
        self.items.values_mut()
    }

    /// Nodes kept verbatim because their discriminator is unknown
    pub fn passthrough(&self) -> &BTreeMap<String, Value> {
        &self.passthrough
    }

    /// Names of all nodes matching `predicate`
    pub fn filter<F>(&self, predicate: F) -> Vec<String>
    where
        F: Fn(&ItemNode) -> bool,
    {
        self.items
            .values()
            .filter(|node| predicate(node))
            .map(|node| node.name.clone())
            .collect()
    }

    /// Names of nodes left unfinished by an earlier run
    pub fn incomplete(&self) -> Vec<String> {
        self.filter(|node| node.status != ItemStatus::Complete)
    }

    /// Names of user-requested items
    pub fn requested(&self) -> Vec<String> {
        self.filter(|node| node.user_requested)
    }

    /// Count tools and raw materials needed to make `name`, transitively.
    ///
    /// Breadth-first with separate queues; tools are drained before raw
    /// materials. Each reference adds to the total; the first sighting of a
    /// name in a category adds to the unique count and expands its own steps.
    pub fn dependency_counts(&self, name: &str) -> DependencyCounts {
        let mut counts = DependencyCounts::default();
        let mut seen_tools = HashSet::new();
        let mut seen_materials = HashSet::new();

        let (tools, materials) = self.dependencies_of(name);
        let mut tools: VecDeque<String> = tools.into();
        let mut materials: VecDeque<String> = materials.into();

        loop {
            if let Some(tool) = tools.pop_front() {
                counts.total_tools += 1;
                if seen_tools.insert(tool.clone()) {
                    counts.unique_tools += 1;
                    let (t, m) = self.dependencies_of(&tool);
                    tools.extend(t);
                    materials.extend(m);
                }
            } else if let Some(material) = materials.pop_front() {
                counts.total_raw_materials += 1;
                if seen_materials.insert(material.clone()) {
                    counts.unique_raw_materials += 1;
                    let (t, m) = self.dependencies_of(&material);
                    tools.extend(t);
                    materials.extend(m);
                }
            } else {
                break;
            }
        }

        counts
    }

    fn dependencies_of(&self, name: &str) -> (Vec<String>, Vec<String>) {
        self.items
            .get(name)
            .map(ItemNode::dependencies)
            .unwrap_or_default()
    }

    /// Remove step references that lead back to an ancestor.
    ///
    /// Walks depth-first from every user-requested item. Each visit carries
    /// its own copy of the path that led to it; a tool or raw material already
    /// on that path is dropped from the step. Returns the number of references
    /// removed. Running it twice removes nothing the second time.
    pub fn repair_cycles(&mut self) -> usize {
        let mut removed = 0;

        for root in self.requested() {
            let mut stack: Vec<(String, Vec<String>)> = vec![(root, Vec::new())];

            while let Some((name, ancestors)) = stack.pop() {
                let mut path = ancestors;
                if !path.contains(&name) {
                    path.push(name.clone());
                }

                let Some(node) = self.items.get_mut(&name) else {
                    continue;
                };
                let Some(steps) = node.steps.as_mut() else {
                    continue;
                };

                let mut children = Vec::new();
                for step in steps.iter_mut() {
                    for list in [&mut step.tools, &mut step.raw_materials] {
                        let before = list.len();
                        list.retain(|child| !path.contains(child));
                        if list.len() != before {
                            tracing::debug!(
                                "Removed {} cyclic reference(s) from {}",
                                before - list.len(),
                                name
                            );
                        }
                        removed += before - list.len();
                        children.extend(list.iter().cloned());
                    }
                }

                for child in children.into_iter().rev() {
                    stack.push((child, path.clone()));
                }
            }
        }

        removed
    }

    /// Every name any step refers to
    pub fn referenced_names(&self) -> BTreeSet<String> {
        self.items
            .values()
            .flat_map(|node| node.steps().iter().flat_map(|s| s.references().cloned()))
            .collect()
    }
}
