//! Oracle response normalization
//!
//! Pure functions turning oracle prose into lists, booleans and typed values.
//! Nothing here talks to the oracle or touches disk.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::FormatError;

/// Default substring that marks a list entry as optional
pub const DEFAULT_OPTIONAL_MARKER: &str = "(optional)";

/// Words that, as a whole word, make an answer useless
const REFUSAL_WORDS: &[&str] = &[
    "none", "no", "omit", "omitted", "empty", "null", "n/a", "nothing", "vacant", "blank",
    "missing", "void", "excluded", "sorry", "help",
];

lazy_static! {
    /// Leading bullets and ordinals: "- ", "* ", "1. ", "2) ", "3: "
    static ref LIST_MARKER: Regex = Regex::new(r"^[\s\-*•]*(?:\d+\s*[.):]\s*)?").unwrap();

    /// An ordered list line: "<N>. <content>"
    static ref ORDERED_LINE: Regex = Regex::new(r"^\s*(\d+)\s*\.(.*)$").unwrap();
}

/// One list entry after OR splitting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    /// No alternatives were offered
    Single(String),
    /// Ordered alternatives, any one of which would do
    AnyOf(Vec<String>),
}

impl Choice {
    /// The simplified choice: the first alternative
    pub fn first(&self) -> &str {
        match self {
            Choice::Single(s) => s,
            Choice::AnyOf(options) => options.first().map(String::as_str).unwrap_or(""),
        }
    }
}

/// Replace typographic double quotes with ASCII ones
pub fn normalize_quotes(text: &str) -> String {
    text.replace(['\u{201c}', '\u{201d}'], "\"")
}

/// Split text into list entries, removing bullets and ordinals.
///
/// Entries are trimmed and lowercased; empty lines are dropped.
pub fn sanitize_list(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| LIST_MARKER.replace(line, "").trim().to_lowercase())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Drop entries containing `marker`
pub fn remove_optional(list: Vec<String>, marker: &str) -> Vec<String> {
    list.into_iter().filter(|s| !s.contains(marker)).collect()
}

/// Comma split, then split each piece on `separator`.
///
/// A piece left starting with the conjunction as a whole word ("or harry"
/// from "tom, dick, or harry") loses it and moves to the end of its group.
/// Words that merely begin with the same letters ("ore", "andiron") are kept.
fn split_on_conjunction(entry: &str, separator: &str) -> Vec<String> {
    let bare = separator.trim();
    let leading = format!("{} ", bare);
    let mut pieces = Vec::new();
    for part in entry.split(',') {
        let mut split: Vec<String> = part.trim().split(separator).map(|s| s.trim().to_string()).collect();
        let mut stray = Vec::new();
        split.retain(|s| {
            if s == bare {
                return false;
            }
            match s.strip_prefix(leading.as_str()) {
                Some(rest) => {
                    stray.push(rest.trim().to_string());
                    false
                }
                None => true,
            }
        });
        split.extend(stray);
        pieces.extend(split);
    }
    pieces.retain(|s| !s.is_empty());
    pieces
}

/// Turn each entry into a [`Choice`]; entries naming alternatives become `AnyOf`
pub fn split_or(list: &[String]) -> Vec<Choice> {
    list.iter()
        .map(|entry| {
            let mut pieces = split_on_conjunction(entry, " or ");
            match pieces.len() {
                0 => Choice::Single(entry.trim().to_string()),
                1 => Choice::Single(pieces.remove(0)),
                _ => Choice::AnyOf(pieces),
            }
        })
        .collect()
}

/// Keep the first candidate of every alternative set
pub fn first_choice(choices: &[Choice]) -> Vec<String> {
    choices.iter().map(|c| c.first().to_string()).collect()
}

/// Split entries joined with " and " into separate top-level entries
pub fn flatten_and(list: Vec<String>) -> Vec<String> {
    let mut result = Vec::with_capacity(list.len());
    for entry in list {
        if entry.contains(" and ") {
            result.extend(split_on_conjunction(&entry, " and "));
        } else {
            result.push(entry);
        }
    }
    result
}

/// Whether an answer amounts to a refusal or "nothing".
///
/// Everything but letters and whitespace is discarded before matching whole
/// words, so "(None)" counts while "nonesuch" does not.
pub fn is_useless(text: &str) -> bool {
    let filtered: String = text
        .chars()
        .filter(|c| c.is_alphabetic() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    filtered.split_whitespace().any(|w| REFUSAL_WORDS.contains(&w))
}

/// The whole list pipeline used while decomposing items.
///
/// sanitize, drop optional entries, collapse OR sets to their first choice,
/// flatten AND entries; a lone useless entry yields an empty list.
pub fn simple_list(text: &str, optional_marker: &str) -> Vec<String> {
    let sanitized = sanitize_list(text);
    let required = remove_optional(sanitized, optional_marker);
    let chosen = first_choice(&split_or(&required));
    let flat = flatten_and(chosen);
    if flat.len() == 1 && is_useless(&flat[0]) {
        return Vec::new();
    }
    flat
}

/// Parse a strictly numbered list ("1. a", "2. b", ...)
pub fn parse_ordered_list(text: &str) -> Result<Vec<String>, FormatError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(FormatError::OrderedList {
            line: String::new(),
            reason: "empty response".to_string(),
        });
    }

    let mut results = Vec::new();
    for (index, line) in trimmed.lines().enumerate() {
        let caps = ORDERED_LINE
            .captures(line)
            .ok_or_else(|| FormatError::OrderedList {
                line: line.to_string(),
                reason: "line is not numbered".to_string(),
            })?;
        let number: usize = caps[1].parse().map_err(|_| FormatError::OrderedList {
            line: line.to_string(),
            reason: "invalid number".to_string(),
        })?;
        if number != index + 1 {
            return Err(FormatError::OrderedList {
                line: line.to_string(),
                reason: format!("expected {}, found {}", index + 1, number),
            });
        }
        results.push(caps[2].trim().to_string());
    }
    Ok(results)
}

/// Read a True/False answer from the lines recorded for one item.
///
/// Looks at the final token of the first line; anything else is omitted.
pub fn parse_true_false(lines: &[String]) -> Option<bool> {
    let last = lines.first()?.split_whitespace().last()?;
    match last {
        "True" => Some(true),
        "False" => Some(false),
        _ => None,
    }
}

/// Quote and join: `"a"`, `"a" and "b"`, `"a", "b", and "c"`
pub fn join_quoted<S: AsRef<str>>(items: &[S], combiner: &str) -> String {
    match items {
        [] => String::new(),
        [only] => format!("\"{}\"", only.as_ref()),
        [first, second] => format!("\"{}\" {} \"{}\"", first.as_ref(), combiner, second.as_ref()),
        [init @ .., last] => {
            let head: Vec<String> = init.iter().map(|s| format!("\"{}\"", s.as_ref())).collect();
            format!("{}, {} \"{}\"", head.join(", "), combiner, last.as_ref())
        }
    }
}
