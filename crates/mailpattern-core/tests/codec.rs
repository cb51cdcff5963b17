//! Integration tests for pattern persistence and rendering.

#![allow(clippy::unwrap_used)]

use std::time::{Duration, Instant};

use mailpattern_core::{
    CaseSensitivity, Combinator, ComparisonFunction as F, ConfigCodec, ConfigFile, ConfigGroup,
    FieldReference, LoadWarning, Rule, RuleSet, codec,
};
use proptest::prelude::*;

const FIELDS: [&str; 10] = [
    "Subject",
    "From",
    "To",
    "X-Custom",
    "<size>",
    "<status>",
    "<body>",
    "<recipients>",
    "<tag>",
    "<age in days>",
];

fn case_strategy() -> impl Strategy<Value = CaseSensitivity> {
    prop_oneof![
        Just(CaseSensitivity::Default),
        Just(CaseSensitivity::Sensitive),
        Just(CaseSensitivity::Insensitive),
    ]
}

fn rule_strategy(operand: &'static str) -> impl Strategy<Value = Rule> {
    (
        proptest::sample::select(FIELDS.to_vec()),
        proptest::sample::select(F::ALL.to_vec()),
        operand,
        any::<bool>(),
        case_strategy(),
    )
        .prop_map(|(field, function, operand, negated, case)| {
            let mut rule = Rule::new(field, function, operand).with_case(case);
            rule.set_negated(negated);
            rule
        })
}

fn pattern_strategy(operand: &'static str) -> impl Strategy<Value = RuleSet> {
    (
        "[A-Za-z][A-Za-z0-9 ]{0,11}",
        prop_oneof![
            Just(Combinator::And),
            Just(Combinator::Or),
            Just(Combinator::All)
        ],
        proptest::collection::vec(rule_strategy(operand), 0..6),
    )
        .prop_map(|(name, combinator, rules)| {
            let mut pattern = RuleSet::new(name).with_combinator(combinator);
            pattern.extend(rules);
            pattern
        })
}

proptest! {
    #[test]
    fn save_then_load_gives_same_pattern(pattern in pattern_strategy("\\PC{0,12}")) {
        let codec = ConfigCodec::new();
        let group = codec.save(&pattern);
        let (loaded, report) = codec.load_with_report(Some(&group));
        prop_assert!(report.is_clean());
        prop_assert_eq!(&loaded, &pattern);
        prop_assert_eq!(codec.save(&loaded), group);
    }

    #[test]
    fn query_string_round_trips(pattern in pattern_strategy("\\PC{0,12}")) {
        let text = pattern.to_query_string();
        let parsed = RuleSet::from_query_string(pattern.name(), &text).unwrap();
        prop_assert_eq!(parsed, pattern);
    }

    #[test]
    fn config_file_text_round_trips(pattern in pattern_strategy("[ -~]{0,12}")) {
        let codec = ConfigCodec::new();
        let mut file = ConfigFile::new();
        codec.save_to_file(&pattern, &mut file, "Search Rule 1");
        let reparsed = ConfigFile::parse(&file.to_string()).unwrap();
        let (loaded, report) = codec.load_named(&reparsed, "Search Rule 1");
        prop_assert!(report.is_clean());
        prop_assert_eq!(loaded, pattern);
    }
}

#[test]
fn legacy_layout_is_imported() {
    let file = ConfigFile::parse(
        "\
[Old Search]
name=Old search
operator=or
rules=2
fieldA=From
funcA=contains
contentsA=example.com
fieldB=<size>
funcB=greater
contentsB=5000
",
    )
    .unwrap();

    let (pattern, report) = ConfigCodec::new().load_named(&file, "Old Search");
    assert!(report.legacy);
    assert!(report.is_clean());
    assert_eq!(pattern.name(), "Old search");
    assert_eq!(pattern.combinator(), Combinator::Or);
    assert_eq!(
        pattern.rules(),
        &[
            Rule::new("From", F::Contains, "example.com"),
            Rule::new(FieldReference::Size, F::Greater, "5000"),
        ]
    );

    let saved = codec::save(&pattern);
    assert_eq!(saved.get("rules-count"), Some("2"));
    assert_eq!(saved.get("rule-1-func"), Some("greater"));
    assert!(!saved.contains_key("fieldA"));
}

#[test]
fn legacy_layout_without_count() {
    let mut group = ConfigGroup::new("g");
    group.set("fieldA", "Subject");
    group.set("contentsA", "hello");
    group.set("fieldB", "To");
    group.set("funcB", "equals");
    group.set("contentsB", "me@example.com");

    let (pattern, report) = ConfigCodec::new().load_with_report(Some(&group));
    assert!(report.legacy);
    assert_eq!(pattern.len(), 2);
    assert_eq!(pattern.rules()[0].function(), F::Contains);
}

#[test]
fn unknown_function_keeps_raw_identifier() {
    let mut group = ConfigGroup::new("g");
    group.set("rules-count", "1");
    group.set("rule-0-field", "Subject");
    group.set("rule-0-func", "fuzzy-match");
    group.set("rule-0-value", "hello");
    group.set("rule-0-negate", "false");

    let codec = ConfigCodec::new();
    let (pattern, report) = codec.load_with_report(Some(&group));
    assert_eq!(
        report.warnings,
        vec![LoadWarning::FunctionFallback {
            index: 0,
            raw: "fuzzy-match".into()
        }]
    );
    assert_eq!(report.dropped_rules(), 0);
    assert_eq!(pattern.rules()[0].function(), F::Contains);

    let mut saved = codec.save(&pattern);
    saved.remove("operator");
    saved.remove("name");
    group.remove("name");
    assert_eq!(saved.iter().collect::<Vec<_>>(), group.iter().collect::<Vec<_>>());
}

#[test]
fn dropped_rules_are_reported() {
    let mut group = ConfigGroup::new("g");
    group.set("rules-count", "2");
    group.set("rule-0-field", "<status>");
    group.set("rule-0-func", "fuzzy-match");
    group.set("rule-1-field", "Subject");
    group.set("rule-1-value", "kept");

    let (pattern, report) = ConfigCodec::new().load_with_report(Some(&group));
    assert_eq!(pattern.len(), 1);
    assert_eq!(report.dropped_rules(), 1);
    assert!(matches!(
        report.warnings[0],
        LoadWarning::RuleDropped { index: 0, .. }
    ));
}

#[test]
fn huge_rule_count_is_bounded_by_present_rules() {
    let mut group = ConfigGroup::new("g");
    group.set("rules-count", usize::MAX.to_string());
    group.set("rule-0-field", "Subject");
    group.set("rule-0-value", "invoice");

    let started = Instant::now();
    let (pattern, report) = ConfigCodec::new().load_with_report(Some(&group));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(pattern.rules(), &[Rule::new("Subject", F::Contains, "invoice")]);
    assert_eq!(
        report.warnings,
        vec![LoadWarning::RuleCountTooLarge {
            stored: usize::MAX,
            present: 1
        }]
    );
    assert_eq!(report.dropped_rules(), 0);
}

#[test]
fn non_numeric_legacy_count_uses_lettered_rules() {
    let file = ConfigFile::parse(
        "\
[Old]
rules=abc
fieldA=Subject
contentsA=hello
fieldB=From
funcB=equals
contentsB=me@example.com
",
    )
    .unwrap();

    let (pattern, report) = ConfigCodec::new().load_named(&file, "Old");
    assert!(report.legacy);
    assert_eq!(report.warnings, vec![LoadWarning::InvalidRuleCount("abc".into())]);
    assert_eq!(
        pattern.rules(),
        &[
            Rule::new("Subject", F::Contains, "hello"),
            Rule::new("From", F::Equals, "me@example.com"),
        ]
    );
}

#[test]
fn set_function_replaces_preserved_identifier() {
    let mut group = ConfigGroup::new("g");
    group.set("rules-count", "1");
    group.set("rule-0-field", "Subject");
    group.set("rule-0-func", "fuzzy-match");
    group.set("rule-0-value", "hello");

    let codec = ConfigCodec::new();
    let mut pattern = codec.load(&group);
    assert_eq!(pattern.rules()[0].raw_function(), Some("fuzzy-match"));

    pattern.rules_mut()[0].set_function(F::Equals);
    assert_eq!(pattern.rules()[0].raw_function(), None);
    let saved = codec.save(&pattern);
    assert_eq!(saved.get("rule-0-func"), Some("equals"));
}

#[test]
fn awkward_group_names_survive_the_file_format() {
    let pattern = RuleSet::new("p").with_rule(Rule::new("Subject", F::Contains, "x"));
    let codec = ConfigCodec::new();
    let name = "weird]\nname [2]";
    let mut file = ConfigFile::new();
    codec.save_to_file(&pattern, &mut file, name);

    let reparsed = ConfigFile::parse(&file.to_string()).unwrap();
    assert_eq!(reparsed.group_names().collect::<Vec<_>>(), vec![name]);
    let (loaded, report) = codec.load_named(&reparsed, name);
    assert!(report.is_clean());
    assert_eq!(loaded, pattern);
}

#[test]
fn sieve_rendering() {
    let pattern = RuleSet::new("sieve")
        .with_combinator(Combinator::Or)
        .with_rule(Rule::new("Subject", F::Contains, "[list]"))
        .with_rule(Rule::new("<size>", F::Less, "2048"))
        .with_rule(Rule::new("<status>", F::Contains, "Important"))
        .with_rule(Rule::new("From", F::Equals, "boss@example.com").with_case(CaseSensitivity::Insensitive));

    assert_eq!(
        pattern.to_sieve(),
        "anyof(header :contains \"Subject\" \"[list]\", size :under 2048, \
         header :is \"From\" \"boss@example.com\")"
    );
    assert_eq!(
        pattern.render_human_readable(),
        "Subject contains \"[list]\" or size is less than \"2048\" or \
         status contains \"Important\" or From equals \"boss@example.com\" (ignoring case)"
    );
}
