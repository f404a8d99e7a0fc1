//! Fuzz target for category-name pattern matching.
//!
//! Run with: cargo +nightly fuzz run fuzz_pattern_match
//!
//! The first byte splits the input into a pattern and a category name.

#![no_main]

use libfuzzer_sys::fuzz_target;
use logrules_core::rule::pattern_matches;
use logrules_core::{Rule, RuleCollection, RuleSet, ThresholdLevels};

fuzz_target!(|data: &[u8]| {
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let split = split as usize % (rest.len() + 1);
    let (Ok(pattern), Ok(name)) = (
        std::str::from_utf8(&rest[..split]),
        std::str::from_utf8(&rest[split..]),
    ) else {
        return;
    };

    let matched = pattern_matches(pattern, name);

    // Without metacharacters a pattern is a plain name.
    if !pattern.contains(['*', '\\']) {
        assert_eq!(matched, pattern == name);
    }
    // Every name matches itself when used as a pattern, unless it contains
    // metacharacters.
    if !name.contains(['*', '\\']) {
        assert!(pattern_matches(name, name));
        assert!(pattern_matches(&format!("{name}*"), name));
    }

    let mut rules = RuleSet::new();
    let _ = rules.add_rule(Rule::new(pattern, ThresholdLevels::OFF));
    assert_eq!(rules.relevant_rules(name).contains(0), matched);
});
