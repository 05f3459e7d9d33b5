//! Item nodes and construction steps

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ItemStatus;
use crate::error::GraphError;

/// One construction step of a composite item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Step name as returned by the oracle
    #[serde(rename = "step")]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Canonical tool names, in order
    #[serde(default)]
    pub tools: Vec<String>,
    /// Raw material names, in order
    #[serde(default)]
    pub raw_materials: Vec<String>,
    /// Fields this version does not model
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Step {
    pub fn new(label: impl Into<String>, tools: Vec<String>, raw_materials: Vec<String>) -> Self {
        Self {
            label: label.into(),
            description: None,
            tools,
            raw_materials,
            extra: BTreeMap::new(),
        }
    }

    /// Tools then raw materials, in order
    pub fn references(&self) -> impl Iterator<Item = &String> {
        self.tools.iter().chain(self.raw_materials.iter())
    }

    /// Whether the step still needs a description
    pub fn needs_description(&self) -> bool {
        self.description.as_deref().map_or(true, str::is_empty)
    }
}

/// A node of the item graph: an item, tool or raw material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemNode {
    pub name: String,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_tool: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_natural: Option<bool>,
    #[serde(
        rename = "is_part_of_a_larger_item",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub is_part_of_larger: Option<bool>,
    /// Free-form year, e.g. "4000 BCE"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_age: Option<String>,
    #[serde(default)]
    pub user_requested: bool,
    /// Present only on composite items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<Step>>,
    /// Open-ended metadata such as image search results
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ItemNode {
    /// A fresh node waiting to be decomposed
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: ItemStatus::NeedToProcess,
            description: String::new(),
            is_tool: false,
            is_natural: None,
            is_part_of_larger: None,
            estimated_age: None,
            user_requested: false,
            steps: None,
            extra: BTreeMap::new(),
        }
    }

    /// Natural and not part of something larger; omitted answers count as no
    pub fn is_base_item(&self) -> bool {
        self.is_natural == Some(true) && self.is_part_of_larger != Some(true)
    }

    /// Whether at least one classification question has been answered
    pub fn is_classified(&self) -> bool {
        self.is_natural.is_some() || self.is_part_of_larger.is_some()
    }

    /// Move to `target`, refusing changes the lifecycle does not allow.
    /// Staying in the same status is a no-op.
    pub fn transition_to(&mut self, target: ItemStatus) -> Result<(), GraphError> {
        if self.status == target {
            return Ok(());
        }
        if !self.status.can_transition_to(&target) {
            return Err(GraphError::InvalidTransition {
                item: self.name.clone(),
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }
        self.status = target;
        Ok(())
    }

    /// The item's steps, empty for base items
    pub fn steps(&self) -> &[Step] {
        self.steps.as_deref().unwrap_or(&[])
    }

    /// (tools, raw materials) referenced by all steps, in order
    pub fn dependencies(&self) -> (Vec<String>, Vec<String>) {
        let mut tools = Vec::new();
        let mut raw_materials = Vec::new();
        for step in self.steps() {
            tools.extend(step.tools.iter().cloned());
            raw_materials.extend(step.raw_materials.iter().cloned());
        }
        (tools, raw_materials)
    }
}
