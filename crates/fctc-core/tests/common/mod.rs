//! A small scripted world for engine integration tests
//!
//! The oracle recognises each prompt family by its opening words and answers
//! from a fixed table, the way a well-behaved model would.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use fctc_core::engine::prompts;
use fctc_core::{Engine, EngineOptions, ItemGraph, QueryCache, ToolCanonicalizer};
use fctc_oracle::ScriptedOracle;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref QUOTED: Regex = Regex::new(r#""([^"]*)""#).unwrap();
    static ref AGE: Regex = Regex::new(r#"^Roughly what year was the first human made "([^"]+)""#).unwrap();
    static ref STEPS: Regex = Regex::new(r#"make or acquire a primitive "([^"]+)""#).unwrap();
    static ref TOOLS: Regex = Regex::new(r#"^For the step "([^"]+)" needed to make "([^"]+)""#).unwrap();
    static ref MATERIALS: Regex =
        Regex::new(r#"^When using tool "([^"]*)" with step "([^"]+)" needed to make "([^"]+)""#).unwrap();
    static ref EQUIVALENCE: Regex = Regex::new(r#"^Suppose I have the following tool: "([^"]+)""#).unwrap();
}

/// One step of a recipe: label, tools, raw materials
pub type Recipe = (&'static str, &'static [&'static str], &'static [&'static str]);

pub fn recipe(
    label: &'static str,
    tools: &'static [&'static str],
    materials: &'static [&'static str],
) -> Recipe {
    (label, tools, materials)
}

#[derive(Debug, Clone, Default)]
pub struct World {
    pub natural: BTreeSet<String>,
    pub parts: BTreeSet<String>,
    pub ages: BTreeMap<String, String>,
    pub recipes: BTreeMap<String, Vec<Recipe>>,
    /// tool -> the known tool the oracle calls equivalent
    pub equivalent: BTreeMap<String, String>,
}

impl World {
    /// knife needs a hammer, iron and wood; the hammer needs stone and wood
    pub fn knife() -> Self {
        let mut world = World::default();
        for name in ["iron", "wood", "stone"] {
            world.natural.insert(name.to_string());
        }
        world.ages.insert("knife".into(), "1000 BCE".into());
        world.ages.insert("hammer".into(), "3000 BCE".into());
        world.recipes.insert(
            "knife".into(),
            vec![
                recipe("forge blade", &["hammer"], &["iron"]),
                recipe("attach handle", &[], &["wood"]),
            ],
        );
        world
            .recipes
            .insert("hammer".into(), vec![recipe("bind head", &[], &["stone", "wood"])]);
        world
    }

    pub fn answer(&self, prompt: &str) -> String {
        let first_line = prompt.lines().next().unwrap_or("");

        if prompt.starts_with(prompts::NATURAL_QUERY) {
            return self.true_false(first_line, &self.natural);
        }
        if prompt.starts_with(prompts::PART_QUERY) {
            return self.true_false(first_line, &self.parts);
        }
        if let Some(caps) = AGE.captures(prompt) {
            return self
                .ages
                .get(&caps[1])
                .cloned()
                .unwrap_or_else(|| "2000 BCE".to_string());
        }
        if let Some(caps) = TOOLS.captures(prompt) {
            return self.recipe(&caps[2], &caps[1]).map(|r| r.1.join("\n")).unwrap_or_default();
        }
        if let Some(caps) = MATERIALS.captures(prompt) {
            return self.recipe(&caps[3], &caps[2]).map(|r| r.2.join("\n")).unwrap_or_default();
        }
        if let Some(caps) = EQUIVALENCE.captures(prompt) {
            return match self.equivalent.get(&caps[1]) {
                Some(known) => format!("\"{}\" \"{}\"", &caps[1], known),
                None => String::new(),
            };
        }
        if let Some(caps) = STEPS.captures(prompt) {
            return self
                .recipes
                .get(&caps[1])
                .map(|steps| {
                    steps
                        .iter()
                        .enumerate()
                        .map(|(i, step)| format!("{}. {}", i + 1, step.0))
                        .collect::<Vec<_>>()
                        .join("\n")
                })
                .unwrap_or_default();
        }
        String::new()
    }

    fn recipe(&self, item: &str, step: &str) -> Option<&Recipe> {
        self.recipes.get(item)?.iter().find(|r| r.0 == step)
    }

    fn true_false(&self, first_line: &str, members: &BTreeSet<String>) -> String {
        QUOTED
            .captures_iter(first_line)
            .map(|caps| {
                let name = &caps[1];
                let flag = if members.contains(name) { "True" } else { "False" };
                format!("\"{}\" {}", name, flag)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn oracle(self) -> ScriptedOracle {
        let world = Arc::new(self);
        ScriptedOracle::answering(move |prompt| world.answer(prompt))
    }
}

/// An in-memory engine wired to `oracle`
pub fn engine(oracle: &ScriptedOracle, options: EngineOptions) -> Engine {
    Engine::new(
        ItemGraph::new(),
        QueryCache::in_memory(Box::new(oracle.clone())),
        ToolCanonicalizer::new(),
        options,
    )
}
