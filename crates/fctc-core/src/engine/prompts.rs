//! Oracle prompts used while decomposing items
//!
//! Prompt text is part of the cache key: changing a prompt invalidates every
//! answer cached under the old wording.

/// Classification question: natural items
pub const NATURAL_QUERY: &str = "Which of the following are natural items?";

pub const NATURAL_SUFFIX: &str = "Please list one item per line and respond with True or False for each item.   \
If the item is not a natural item, please list it. For example:\n\"car port\" False\n\"wood\" True";

/// Classification question: parts of larger items
pub const PART_QUERY: &str = "Which of the following are parts of a larger item?";

pub const PART_SUFFIX: &str = "Please list one item per line and respond with True or False for each item.   \
If the item is not a part of a larger item, please list it. For example:\n\"car door\" True\n\"branch\" True\n\"wood\" False";

/// Knowledge-base key for natural-item answers
pub const NATURAL_KB_KEY: &str = "is_natural";

/// Knowledge-base key for part-of-a-larger-item answers
pub const PART_KB_KEY: &str = "is_part_of_a_larger_item";

/// Sentence restricting answers to what existed at `age`
pub fn age_statement(age: Option<&str>) -> String {
    match age {
        Some(age) if !age.is_empty() => format!(
            "Ensure everything existed at {}, but ideally as old as is possible.",
            age
        ),
        _ => String::new(),
    }
}

pub fn age_prompt(item: &str) -> String {
    format!(
        "Roughly what year was the first human made \"{}\" created?   Only list a year and do not list a range.  \
Use the year according to the Gregorian calendar and append AD or BCE.  For example: \n4000 BCE",
        item
    )
}

pub fn steps_prompt(item: &str, age: Option<&str>) -> String {
    format!(
        "What are the steps needed for a human to directly make or acquire a primitive \"{}\" - meaning the item absolutely cannot be made without this step?   \
give a complete list.   Do not list any raw materials, tools/equipment, energy sources, knowledge/skills, or time requirements.   \
Do not list any optional steps.   Use the bare minimum steps necessary.   Avoid adjectives unless necessary.   \
State the name of a step simply, without using any parenthesis or dashes.   \
Use the simplest set of steps possible, as this item could have been made using the most primitive tools possible. {} \
The output should list the step number (in order) and then the step name, with each step on a new line.",
        item,
        age_statement(age)
    )
}

pub fn tools_prompt(step: &str, item: &str, age: Option<&str>) -> String {
    format!(
        "For the step \"{}\" needed to make \"{}\", what are the simplest tools or equipment absolutely required to perform the step, \
meaning the step cannot be done at all without them? Do not include tools that are merely helpful or make the process easier. \
Only list tools that are strictly necessary. Exclude raw materials, energy sources, knowledge/skills, and time. {} \
If the step can be done entirely without tools, do not list anything.  Succinctly, list each tool alone on a separate line.  \
Do not use adjectives or explain the purpose of a tool.",
        step,
        item,
        age_statement(age)
    )
}

pub fn materials_prompt(tools: &str, step: &str, item: &str, age: Option<&str>) -> String {
    format!(
        "When using tool \"{}\" with step \"{}\" needed to make \"{}\", what raw materials are needed?   Give a complete list.   \
Do not list any tools/equipment, energy sources, knowledge/skills, or time requirements.   Do not list any optional raw materials. \
Use the bare minimum raw materials, if any.  Avoid adjectives unless needed.  \
State the name of each raw material simply, without using any parenthesis or dashes.  \
Each raw material should be the simplest item one could use to make this, as would have been used the first time this raw material was used. {} \
The output should list each raw material on a separate line.  Do not list raw materials used in other steps.  \
For example, if asked \"when using tool Knife with step Slice Bread needed to make a sandwich\", you might reply: \"Bread\"",
        tools,
        step,
        item,
        age_statement(age)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_statement() {
        assert_eq!(age_statement(None), "");
        assert_eq!(age_statement(Some("")), "");
        assert!(age_statement(Some("3000 BCE")).contains("existed at 3000 BCE"));
    }

    #[test]
    fn test_prompts_quote_their_subjects() {
        assert!(steps_prompt("knife", None).contains("make or acquire a primitive \"knife\""));
        assert!(tools_prompt("forge", "knife", None).contains("For the step \"forge\" needed to make \"knife\""));
        assert!(materials_prompt("hammer and anvil", "forge", "knife", Some("800 BCE"))
            .contains("When using tool \"hammer and anvil\" with step \"forge\" needed to make \"knife\""));
        assert!(age_prompt("knife").contains("first human made \"knife\" created?"));
    }
}
