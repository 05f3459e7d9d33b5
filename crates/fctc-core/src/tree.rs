//! Tree report of a requested item
//!
//! Lays out an item's steps, and under each step its raw materials and tools,
//! all the way down. A name already shown elsewhere in the same report is marked
//! as seen and not expanded again.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::graph::ItemGraph;
use crate::item::Step;

/// What a report row shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowKind {
    Step,
    RawMaterial,
    Tool,
}

/// One line of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeRow {
    /// Indentation made of `"│   "` and `"    "` segments
    pub prefix: String,
    /// `"├── "` or `"└── "`
    pub connector: &'static str,
    pub kind: RowKind,
    pub label: String,
    /// Shown earlier in this report, so not expanded here
    pub seen: bool,
}

impl TreeRow {
    /// The row without colors
    pub fn to_plain(&self) -> String {
        let seen = if self.seen { " (seen)" } else { "" };
        format!("{}{}{}{}", self.prefix, self.connector, self.label, seen)
    }
}

/// Report tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeCounts {
    pub steps: usize,
    pub tools: usize,
    pub raw_materials: usize,
    pub duplicates: usize,
}

impl std::fmt::Display for TreeCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "steps: {}, tools: {}, raw materials: {}, duplicates: {}",
            self.steps, self.tools, self.raw_materials, self.duplicates
        )
    }
}

/// The full report for one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "'de: 'static"))]
pub struct ItemTree {
    pub root: String,
    pub rows: Vec<TreeRow>,
    pub counts: TreeCounts,
}

impl ItemTree {
    /// Build the report for `root`
    pub fn build(graph: &ItemGraph, root: &str) -> Result<Self> {
        if !graph.contains(root) {
            return Err(GraphError::NotFound(root.to_string()).into());
        }

        let mut builder = Builder {
            graph,
            seen: HashSet::new(),
            rows: Vec::new(),
            counts: TreeCounts::default(),
        };
        builder.build(root);

        Ok(Self {
            root: root.to_string(),
            rows: builder.rows,
            counts: builder.counts,
        })
    }

    /// The report without colors, one row per line
    pub fn to_plain(&self) -> String {
        self.rows
            .iter()
            .map(TreeRow::to_plain)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

struct Builder<'a> {
    graph: &'a ItemGraph,
    seen: HashSet<String>,
    rows: Vec<TreeRow>,
    counts: TreeCounts,
}

/// Pending report work, popped in display order
enum Work<'a> {
    Item {
        name: &'a str,
        prefix: String,
    },
    Step {
        step: &'a Step,
        prefix: String,
        connector: &'static str,
        extension: &'static str,
    },
    Entry {
        kind: RowKind,
        name: &'a str,
        prefix: String,
        connector: &'static str,
        extension: &'static str,
    },
}

fn layout(index: usize, count: usize) -> (&'static str, &'static str) {
    if index + 1 == count {
        ("└── ", "    ")
    } else {
        ("├── ", "│   ")
    }
}

impl<'a> Builder<'a> {
    fn build(&mut self, root: &'a str) {
        let mut stack = vec![Work::Item {
            name: root,
            prefix: String::new(),
        }];

        while let Some(work) = stack.pop() {
            match work {
                Work::Item { name, prefix } => self.item(name, prefix, &mut stack),
                Work::Step {
                    step,
                    prefix,
                    connector,
                    extension,
                } => {
                    self.rows.push(TreeRow {
                        prefix: prefix.clone(),
                        connector,
                        kind: RowKind::Step,
                        label: step.label.clone(),
                        seen: false,
                    });
                    self.counts.steps += 1;
                    self.step(step, format!("{}{}", prefix, extension), &mut stack);
                }
                Work::Entry {
                    kind,
                    name,
                    prefix,
                    connector,
                    extension,
                } => {
                    let seen = self.seen.contains(name);
                    if seen {
                        self.counts.duplicates += 1;
                    }
                    match kind {
                        RowKind::RawMaterial => self.counts.raw_materials += 1,
                        _ => self.counts.tools += 1,
                    }
                    self.rows.push(TreeRow {
                        prefix: prefix.clone(),
                        connector,
                        kind,
                        label: name.to_string(),
                        seen,
                    });
                    if !seen {
                        stack.push(Work::Item {
                            name,
                            prefix: format!("{}{}", prefix, extension),
                        });
                    }
                }
            }
        }
    }

    fn item(&mut self, name: &'a str, prefix: String, stack: &mut Vec<Work<'a>>) {
        self.seen.insert(name.to_string());
        let graph = self.graph;
        let Some(node) = graph.get(name) else {
            return;
        };

        let steps = node.steps();
        for (index, step) in steps.iter().enumerate().rev() {
            let (connector, extension) = layout(index, steps.len());
            stack.push(Work::Step {
                step,
                prefix: prefix.clone(),
                connector,
                extension,
            });
        }
    }

    /// Raw materials first, then tools
    fn step(&self, step: &'a Step, prefix: String, stack: &mut Vec<Work<'a>>) {
        let entries: Vec<(RowKind, &'a String)> = step
            .raw_materials
            .iter()
            .map(|m| (RowKind::RawMaterial, m))
            .chain(step.tools.iter().map(|t| (RowKind::Tool, t)))
            .collect();

        let count = entries.len();
        for (index, (kind, name)) in entries.into_iter().enumerate().rev() {
            let (connector, extension) = layout(index, count);
            stack.push(Work::Entry {
                kind,
                name: name.as_str(),
                prefix: prefix.clone(),
                connector,
                extension,
            });
        }
    }
}
