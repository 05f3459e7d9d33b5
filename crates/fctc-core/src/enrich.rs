//! Enrichment hooks
//!
//! Optional extras for the game front end: prose descriptions of items and
//! steps, and image metadata. The engine calls these when an enricher is
//! configured; failures are logged and never stop a run.

use serde_json::Value;

use crate::cache::QueryCache;
use crate::error::Result;
use crate::item::Step;
use crate::normalize::join_quoted;

/// Target length of an item description, in words
pub const DESCRIPTION_LENGTH: usize = 70;

/// Extra words allowed per tool or raw material in a step description
pub const DESCRIPTION_PER_ITEM_LENGTH: usize = 20;

/// Source of descriptions and images
pub trait Enricher {
    /// Describe an item; `None` leaves the description unset
    fn describe_item(&self, cache: &mut QueryCache, item: &str) -> Result<Option<String>>;

    /// Describe one step of making `item`
    fn describe_step(&self, cache: &mut QueryCache, item: &str, step: &Step) -> Result<Option<String>>;

    /// Image results for a search term
    fn search_images(&self, _term: &str) -> Result<Vec<Value>> {
        Ok(Vec::new())
    }
}

/// The search term used for an item's images
pub fn image_search_term(item: &str) -> String {
    if item.contains("primitive") {
        item.to_string()
    } else {
        format!("primitive {}", item)
    }
}

/// Describes items and steps by asking the oracle through the query cache
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDescriber;

impl OracleDescriber {
    pub fn item_prompt(item: &str) -> String {
        format!(
            "Please provide a description of how the following item would appear in nature to a primitive human.   \
Do not describe potential uses for this.  Use the present tense and do not use the name in the description.  \
Your description should be about {} words.   The item is {}",
            DESCRIPTION_LENGTH, item
        )
    }

    pub fn step_prompt(item: &str, step: &Step) -> String {
        let mut prompt = format!(
            "Please provide a description of how a primitive human that is making {} would do \"{}\".  ",
            item, step.label
        );
        if !step.tools.is_empty() {
            prompt.push_str(&format!("  The tools used are {}.  ", join_quoted(&step.tools, "and")));
        }
        if !step.raw_materials.is_empty() {
            prompt.push_str(&format!(
                "  The raw materials used are {}.  ",
                join_quoted(&step.raw_materials, "and")
            ));
        }
        let length = DESCRIPTION_LENGTH
            + (step.tools.len() + step.raw_materials.len()) * DESCRIPTION_PER_ITEM_LENGTH;
        prompt.push_str(&format!(
            "Use the present tense and do not use the word {} in the description.  \
Your description should be about {} words.",
            item, length
        ));
        prompt
    }
}

/// Refusals become placeholder text instead of errors
fn refusal_guard(answer: String, placeholder: impl FnOnce() -> String) -> String {
    if answer.to_lowercase().contains("sorry") {
        placeholder()
    } else {
        answer
    }
}

impl Enricher for OracleDescriber {
    fn describe_item(&self, cache: &mut QueryCache, item: &str) -> Result<Option<String>> {
        let answer = cache.query(&Self::item_prompt(item))?;
        Ok(Some(refusal_guard(answer, || {
            format!("Unfortunately, the model refused to describe: {}", item)
        })))
    }

    fn describe_step(&self, cache: &mut QueryCache, item: &str, step: &Step) -> Result<Option<String>> {
        let answer = cache.query(&Self::step_prompt(item, step))?;
        Ok(Some(refusal_guard(answer, || {
            format!("Unfortunately, the model refused to describe step \"{}\" of {}", step.label, item)
        })))
    }
}
