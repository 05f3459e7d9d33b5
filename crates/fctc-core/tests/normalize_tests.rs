//! Oracle answer parsing tests
//!
//! Cases collected from real model replies, plus property-based checks.

use fctc_core::cache::lines_mentioning;
use fctc_core::engine::{is_younger, parse_year};
use fctc_core::normalize::{
    is_useless, join_quoted, parse_true_false, sanitize_list, simple_list, DEFAULT_OPTIONAL_MARKER,
};
use proptest::prelude::*;
use rstest::rstest;

// === Refusals ===

#[rstest]
#[case("None", true)]
#[case("N/A", false)]
#[case("No tools are required.", true)]
#[case("Nothing", true)]
#[case("I'm sorry, but I cannot answer that.", true)]
#[case("(omitted)", true)]
#[case("flint", false)]
#[case("anvil", false)]
#[case("nonexistent", false)]
fn test_is_useless_cases(#[case] text: &str, #[case] expected: bool) {
    assert_eq!(is_useless(text), expected, "is_useless({:?})", text);
}

// === List pipeline ===

#[rstest]
#[case("1. Hammer\n2. Anvil", &["hammer", "anvil"])]
#[case("- Bow drill (optional)\n- Tinder", &["tinder"])]
#[case("Stone or bone needle", &["stone"])]
#[case("Clay and water", &["clay", "water"])]
#[case("None", &[])]
#[case("", &[])]
#[case("• Flint\n• Wood, bark, or grass", &["flint", "wood"])]
#[case("1. Ore\n2. Wood", &["ore", "wood"])]
#[case("Orange ochre", &["orange ochre"])]
#[case("organic clay", &["organic clay"])]
#[case("orchid or reed", &["orchid"])]
#[case("tongs and andiron", &["tongs", "andiron"])]
fn test_simple_list_cases(#[case] text: &str, #[case] expected: &[&str]) {
    assert_eq!(simple_list(text, DEFAULT_OPTIONAL_MARKER), expected);
}

#[test]
fn test_simple_list_keeps_refusal_among_others() {
    let list = simple_list("hammer\nnone", DEFAULT_OPTIONAL_MARKER);
    assert_eq!(list, vec!["hammer", "none"]);
}

// === Classification replies ===

#[test]
fn test_classification_reply_lines() {
    let reply = "\u{201c}wood\u{201d} True\n\"car port\" False\n\"wood stove\" False";
    assert_eq!(lines_mentioning("wood", reply), vec!["wood True"]);
    assert_eq!(lines_mentioning("car port", reply), vec!["car port False"]);
    assert_eq!(
        parse_true_false(&lines_mentioning("wood", reply)),
        Some(true)
    );
}

#[test]
fn test_unquoted_reply_lines() {
    let reply = "iron False\niron ore True";
    assert_eq!(lines_mentioning("iron", reply), vec!["iron False", "iron ore True"]);
}

// === Years ===

#[rstest]
#[case("4000 BCE", -4000)]
#[case("3500 BC", -3500)]
#[case("1,450 AD", 1450)]
#[case("100 CE", 100)]
#[case("1903", 1903)]
fn test_parse_year_cases(#[case] text: &str, #[case] expected: i64) {
    assert_eq!(parse_year(text).unwrap(), expected);
}

// === Properties ===

proptest! {
    #[test]
    fn test_sanitized_entries_are_clean(text in "[A-Za-z0-9 .\\-*\n]{0,80}") {
        for entry in sanitize_list(&text) {
            prop_assert!(!entry.is_empty());
            prop_assert_eq!(entry.trim(), entry.as_str());
            prop_assert_eq!(entry.to_lowercase(), entry.clone());
        }
    }

    #[test]
    fn test_optional_entries_never_survive(entries in prop::collection::vec("[a-z]{1,10}", 1..6)) {
        let text = entries
            .iter()
            .map(|e| format!("{} (optional)", e))
            .collect::<Vec<_>>()
            .join("\n");
        prop_assert!(simple_list(&text, DEFAULT_OPTIONAL_MARKER).is_empty());
    }

    #[test]
    fn test_each_quoted_item_gets_one_line(
        names in prop::collection::btree_set("[a-z]{3,8}", 1..8),
    ) {
        let names: Vec<String> = names.into_iter().collect();
        let reply = names
            .iter()
            .map(|n| format!("\"{}\" True", n))
            .collect::<Vec<_>>()
            .join("\n");
        for name in &names {
            prop_assert_eq!(lines_mentioning(name, &reply), vec![format!("{} True", name)]);
        }
    }

    #[test]
    fn test_is_younger_is_total(a in -9000i64..2100, b in -9000i64..2100) {
        let render = |y: i64| if y < 0 { format!("{} BCE", -y) } else { format!("{} AD", y) };
        let (a, b) = (render(a), render(b));
        prop_assert!(is_younger(&a, &b).unwrap() || is_younger(&b, &a).unwrap());
    }

    #[test]
    fn test_single_words_pass_through(word in "(or|and|Or|And|OR|AND)?[A-Za-z]{1,10}") {
        prop_assume!(!is_useless(&word));
        prop_assert_eq!(simple_list(&word, DEFAULT_OPTIONAL_MARKER), vec![word.to_lowercase()]);
    }

    #[test]
    fn test_join_quoted_quotes_every_item(items in prop::collection::vec("[a-z]{1,6}", 1..6)) {
        let joined = join_quoted(&items, "and");
        prop_assert_eq!(joined.matches('"').count(), items.len() * 2);
    }
}
