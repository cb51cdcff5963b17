//! Persistence of patterns in key-value configuration groups.
//!
//! A pattern is stored in one group:
//!
//! ```text
//! [Search Rule 1]
//! name=Invoices
//! operator=and
//! rules-count=2
//! rule-0-field=Subject
//! rule-0-func=contains
//! rule-0-value=invoice
//! rule-0-negate=false
//! rule-1-field=<size>
//! rule-1-func=greater
//! rule-1-value=100000
//! rule-1-negate=true
//! rule-1-case=insensitive
//! ```
//!
//! Loading never fails. Problems are collected in a [`LoadReport`] and
//! logged, and the affected rules fall back or are dropped.

mod group;
pub(crate) mod query;
pub(crate) mod render;

pub use group::{ConfigFile, ConfigGroup};

use thiserror::Error;

use crate::field::FieldReference;
use crate::function::ComparisonFunction;
use crate::pattern::{Combinator, EmptyPolicy, RuleSet};
use crate::rule::{CaseSensitivity, Rule};
use crate::settings::EngineSettings;

/// Key holding the pattern name.
pub const KEY_NAME: &str = "name";
/// Key holding the combinator.
pub const KEY_OPERATOR: &str = "operator";
/// Key holding the number of rules.
pub const KEY_RULES_COUNT: &str = "rules-count";
/// Rule count key of the legacy layout.
pub const KEY_LEGACY_RULES: &str = "rules";

/// Legacy rules are lettered `A` to `Z`.
const LEGACY_MAX_RULES: usize = 26;

/// Builds the key of one rule attribute, e.g. `rule-3-func`.
#[must_use]
pub fn rule_key(index: usize, suffix: &str) -> String {
    format!("rule-{index}-{suffix}")
}

fn legacy_key(prefix: &str, index: usize) -> Option<String> {
    let letter = u8::try_from(index)
        .ok()
        .filter(|i| usize::from(*i) < LEGACY_MAX_RULES)
        .map(|i| char::from(b'A' + i))?;
    Some(format!("{prefix}{letter}"))
}

fn is_legacy_rule_key(key: &str) -> bool {
    ["field", "func", "contents"].iter().any(|prefix| {
        key.strip_prefix(prefix)
            .is_some_and(|rest| rest.len() == 1 && rest.as_bytes()[0].is_ascii_uppercase())
    })
}

/// A problem found while loading a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadWarning {
    /// The group does not exist.
    #[error("Pattern group is missing")]
    MissingGroup,

    /// The rule count is not a number.
    #[error("Invalid rule count: {0:?}")]
    InvalidRuleCount(String),

    /// The rule count is larger than the rules present in the group.
    #[error("Rule count {stored} exceeds the {present} rules present")]
    RuleCountTooLarge {
        /// Count written in the group.
        stored: usize,
        /// Rules actually found.
        present: usize,
    },

    /// The operator is not and, or, or all.
    #[error("Unknown operator {0:?}, using and")]
    UnknownOperator(String),

    /// An unknown function was replaced by `contains`.
    #[error("Rule {index}: unknown function {raw:?}, using contains")]
    FunctionFallback {
        /// Rule position.
        index: usize,
        /// The persisted identifier.
        raw: String,
    },

    /// A rule could not be loaded.
    #[error("Rule {index} dropped: {reason}")]
    RuleDropped {
        /// Rule position.
        index: usize,
        /// Why the rule was dropped.
        reason: String,
    },

    /// More rules than the configured limit.
    #[error("{found} rules exceed the limit of {limit}")]
    TooManyRules {
        /// Rules stored in the group.
        found: usize,
        /// Configured maximum.
        limit: usize,
    },
}

/// What happened while loading a pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Problems in the order they were found.
    pub warnings: Vec<LoadWarning>,
    /// Whether the group used the legacy lettered layout.
    pub legacy: bool,
}

impl LoadReport {
    /// Returns true if nothing was wrong.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Number of stored rules that did not make it into the pattern.
    #[must_use]
    pub fn dropped_rules(&self) -> usize {
        self.warnings
            .iter()
            .map(|warning| match warning {
                LoadWarning::RuleDropped { .. } => 1,
                LoadWarning::TooManyRules { found, limit } => found - limit,
                _ => 0,
            })
            .sum()
    }

    fn warn(&mut self, warning: LoadWarning) {
        tracing::warn!(%warning, "Pattern load problem");
        self.warnings.push(warning);
    }
}

/// Converts between configuration groups and patterns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigCodec {
    max_rules: Option<usize>,
    empty_policy: EmptyPolicy,
}

impl ConfigCodec {
    /// Creates a codec without rule limit and with the default empty policy.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_rules: None,
            empty_policy: EmptyPolicy::MatchAll,
        }
    }

    /// Creates a codec from engine settings.
    #[must_use]
    pub const fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            max_rules: settings.max_rules,
            empty_policy: settings.empty_policy,
        }
    }

    /// Limits the number of rules loaded per pattern.
    #[must_use]
    pub const fn with_max_rules(mut self, max_rules: usize) -> Self {
        self.max_rules = Some(max_rules);
        self
    }

    /// Sets the empty policy given to loaded patterns.
    #[must_use]
    pub const fn with_empty_policy(mut self, policy: EmptyPolicy) -> Self {
        self.empty_policy = policy;
        self
    }

    /// Loads a pattern, discarding the report.
    #[must_use]
    pub fn load(&self, group: &ConfigGroup) -> RuleSet {
        self.load_with_report(Some(group)).0
    }

    /// Loads the named group of a file.
    #[must_use]
    pub fn load_named(&self, file: &ConfigFile, name: &str) -> (RuleSet, LoadReport) {
        self.load_with_report(file.group(name))
    }

    /// Loads a pattern and reports what had to be repaired. A missing group
    /// gives an empty pattern.
    #[must_use]
    pub fn load_with_report(&self, group: Option<&ConfigGroup>) -> (RuleSet, LoadReport) {
        let mut report = LoadReport::default();
        let mut pattern = RuleSet::default().with_empty_policy(self.empty_policy);

        let Some(group) = group else {
            report.warn(LoadWarning::MissingGroup);
            return (pattern, report);
        };

        pattern.set_name(group.get(KEY_NAME).unwrap_or(group.name()));

        if let Some(operator) = group.get(KEY_OPERATOR) {
            match Combinator::parse(operator) {
                Some(combinator) => pattern.set_combinator(combinator),
                None => report.warn(LoadWarning::UnknownOperator(operator.to_string())),
            }
        }

        let layout = if group.contains_key(KEY_RULES_COUNT) {
            Layout::Current
        } else if group.contains_key(KEY_LEGACY_RULES) || group.contains_key("fieldA") {
            report.legacy = true;
            Layout::Legacy
        } else {
            Layout::Current
        };

        let mut count = layout.rule_count(group, &mut report);
        if let Some(limit) = self.max_rules.filter(|limit| count > *limit) {
            report.warn(LoadWarning::TooManyRules { found: count, limit });
            count = limit;
        }

        for index in 0..count {
            match layout.read_rule(group, index, &mut report) {
                Ok(rule) => pattern.add_rule(rule),
                Err(reason) => report.warn(LoadWarning::RuleDropped { index, reason }),
            }
        }

        tracing::debug!(
            pattern = pattern.name(),
            rules = pattern.len(),
            legacy = report.legacy,
            "Loaded pattern"
        );
        (pattern, report)
    }

    /// Saves a pattern into a new group named after it.
    #[must_use]
    pub fn save(&self, pattern: &RuleSet) -> ConfigGroup {
        let mut group = ConfigGroup::new(pattern.name());
        self.save_into(pattern, &mut group);
        group
    }

    /// Saves a pattern into an existing group, removing rule keys left over
    /// from a previous, longer pattern or from the legacy layout.
    pub fn save_into(&self, pattern: &RuleSet, group: &mut ConfigGroup) {
        group.retain(|key| {
            !key.starts_with("rule-") && key != KEY_LEGACY_RULES && !is_legacy_rule_key(key)
        });

        group.set(KEY_NAME, pattern.name());
        group.set(KEY_OPERATOR, pattern.combinator().as_str());
        group.set(KEY_RULES_COUNT, pattern.len().to_string());

        for (index, rule) in pattern.rules().iter().enumerate() {
            group.set(rule_key(index, "field"), rule.field().as_str());
            group.set(
                rule_key(index, "func"),
                rule.raw_function().unwrap_or(rule.function().id()),
            );
            group.set(rule_key(index, "value"), rule.operand());
            group.set(rule_key(index, "negate"), rule.is_negated().to_string());
            if let Some(case) = rule.case().as_str() {
                group.set(rule_key(index, "case"), case);
            }
        }
    }

    /// Describes a pattern in plain words.
    #[must_use]
    pub fn render_human_readable(&self, pattern: &RuleSet) -> String {
        render::human_readable(pattern)
    }

    /// Renders a pattern as a sieve test expression.
    #[must_use]
    pub fn render_sieve(&self, pattern: &RuleSet) -> String {
        render::sieve(pattern)
    }

    /// Saves a pattern into the named group of a file, creating the group
    /// if needed.
    pub fn save_to_file(&self, pattern: &RuleSet, file: &mut ConfigFile, name: &str) {
        if let Some(group) = file.group_mut(name) {
            self.save_into(pattern, group);
        } else {
            let mut group = ConfigGroup::new(name);
            self.save_into(pattern, &mut group);
            file.insert_group(group);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Layout {
    Current,
    Legacy,
}

impl Layout {
    fn rule_count(self, group: &ConfigGroup, report: &mut LoadReport) -> usize {
        let key = match self {
            Self::Current => KEY_RULES_COUNT,
            Self::Legacy => KEY_LEGACY_RULES,
        };
        let present = self.present_count(group);
        match group.get(key) {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(stored) if stored > present => {
                    report.warn(LoadWarning::RuleCountTooLarge { stored, present });
                    present
                }
                Ok(stored) => stored,
                Err(_) => {
                    report.warn(LoadWarning::InvalidRuleCount(raw.to_string()));
                    present
                }
            },
            None => match self {
                Self::Current => 0,
                Self::Legacy => (0..LEGACY_MAX_RULES)
                    .take_while(|i| legacy_key("field", *i).is_some_and(|k| group.contains_key(&k)))
                    .count(),
            },
        }
    }

    /// One past the highest rule index that has any key in the group.
    fn present_count(self, group: &ConfigGroup) -> usize {
        group
            .iter()
            .filter_map(|(key, _)| self.key_index(key))
            .map(|index| index + 1)
            .max()
            .unwrap_or(0)
    }

    fn key_index(self, key: &str) -> Option<usize> {
        match self {
            Self::Current => key.strip_prefix("rule-")?.split_once('-')?.0.parse().ok(),
            Self::Legacy => key
                .bytes()
                .last()
                .filter(|_| is_legacy_rule_key(key))
                .map(|letter| usize::from(letter - b'A')),
        }
    }

    fn keys(self, index: usize) -> Option<RuleKeys> {
        match self {
            Self::Current => Some(RuleKeys {
                field: rule_key(index, "field"),
                func: rule_key(index, "func"),
                value: rule_key(index, "value"),
                negate: Some(rule_key(index, "negate")),
                case: Some(rule_key(index, "case")),
            }),
            Self::Legacy => Some(RuleKeys {
                field: legacy_key("field", index)?,
                func: legacy_key("func", index)?,
                value: legacy_key("contents", index)?,
                negate: None,
                case: None,
            }),
        }
    }

    fn read_rule(
        self,
        group: &ConfigGroup,
        index: usize,
        report: &mut LoadReport,
    ) -> Result<Rule, String> {
        let keys = self
            .keys(index)
            .ok_or_else(|| "beyond the legacy rule limit".to_string())?;

        let field = group
            .get(&keys.field)
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| "missing field".to_string())?;

        let mut raw_function = None;
        let function = match group.get(&keys.func) {
            None => ComparisonFunction::Contains,
            Some(raw) => match ComparisonFunction::from_id(raw) {
                Some(function) => function,
                None => {
                    let field_ref = FieldReference::parse(field);
                    if !field_ref.is_textual() {
                        return Err(format!("unknown function {raw:?} on {field}"));
                    }
                    report.warn(LoadWarning::FunctionFallback {
                        index,
                        raw: raw.to_string(),
                    });
                    raw_function = Some(raw.to_string());
                    ComparisonFunction::Contains
                }
            },
        };

        let mut rule = Rule::new(field, function, group.get(&keys.value).unwrap_or_default());
        rule.set_raw_function(raw_function);
        if let Some(key) = &keys.negate {
            rule.set_negated(group.read_bool(key).unwrap_or(false));
        }
        if let Some(case) = keys.case.as_deref().and_then(|key| group.get(key)) {
            rule.set_case(CaseSensitivity::parse(case));
        }
        Ok(rule)
    }
}

struct RuleKeys {
    field: String,
    func: String,
    value: String,
    negate: Option<String>,
    case: Option<String>,
}

/// Loads a pattern with the default codec.
#[must_use]
pub fn load(group: &ConfigGroup) -> RuleSet {
    ConfigCodec::new().load(group)
}

/// Saves a pattern with the default codec.
#[must_use]
pub fn save(pattern: &RuleSet) -> ConfigGroup {
    ConfigCodec::new().save(pattern)
}
