//! Search patterns: ordered rules combined with AND or OR.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::{query, render};
use crate::evaluator::{EvalContext, EvaluationResult, Evaluator};
use crate::field::RequiredPart;
use crate::message::MessageSource;
use crate::rule::Rule;
use crate::{Error, Result};

/// How the results of the rules are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    /// Every rule must match.
    #[default]
    And,
    /// At least one rule must match.
    Or,
    /// Every message matches; the rules are kept but not consulted.
    All,
}

impl Combinator {
    /// Persisted identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::All => "all",
        }
    }

    /// Parses a persisted identifier (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Combinator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::UnknownCombinator(s.to_string()))
    }
}

/// Verdict of a rule set without rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyPolicy {
    /// An empty set matches every message.
    #[default]
    MatchAll,
    /// An empty set matches nothing.
    MatchNone,
}

impl EmptyPolicy {
    /// The verdict this policy gives.
    #[must_use]
    pub const fn matches(self) -> bool {
        matches!(self, Self::MatchAll)
    }
}

/// A named search pattern.
///
/// Rules are evaluated in insertion order, so putting cheap rules first
/// pays off when the combinator short-circuits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    name: String,
    #[serde(default)]
    rules: Vec<Rule>,
    #[serde(default)]
    combinator: Combinator,
    #[serde(default)]
    empty_policy: EmptyPolicy,
}

impl RuleSet {
    /// Creates an empty AND pattern.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the pattern with another combinator.
    #[must_use]
    pub const fn with_combinator(mut self, combinator: Combinator) -> Self {
        self.combinator = combinator;
        self
    }

    /// Returns the pattern with another empty policy.
    #[must_use]
    pub const fn with_empty_policy(mut self, policy: EmptyPolicy) -> Self {
        self.empty_policy = policy;
        self
    }

    /// Returns the pattern with a rule appended.
    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Pattern name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the pattern.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The combinator.
    #[must_use]
    pub const fn combinator(&self) -> Combinator {
        self.combinator
    }

    /// Sets the combinator.
    pub const fn set_combinator(&mut self, combinator: Combinator) {
        self.combinator = combinator;
    }

    /// The empty policy.
    #[must_use]
    pub const fn empty_policy(&self) -> EmptyPolicy {
        self.empty_policy
    }

    /// Sets the empty policy.
    pub const fn set_empty_policy(&mut self, policy: EmptyPolicy) {
        self.empty_policy = policy;
    }

    /// The rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Mutable access to the rules.
    pub fn rules_mut(&mut self) -> &mut [Rule] {
        &mut self.rules
    }

    /// Appends a rule.
    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Inserts a rule at `index`, or appends it if `index` is past the end.
    pub fn insert_rule(&mut self, index: usize, rule: Rule) {
        let index = index.min(self.rules.len());
        self.rules.insert(index, rule);
    }

    /// Removes and returns the rule at `index`.
    pub fn remove_rule(&mut self, index: usize) -> Option<Rule> {
        (index < self.rules.len()).then(|| self.rules.remove(index))
    }

    /// Removes every rule.
    pub fn clear(&mut self) {
        self.rules.clear();
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if there are no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Removes rules that carry no condition. Returns how many were removed.
    pub fn purify(&mut self) -> usize {
        let before = self.rules.len();
        self.rules.retain(|rule| !rule.is_empty());
        let removed = before - self.rules.len();
        if removed > 0 {
            tracing::debug!(pattern = %self.name, removed, "Removed empty rules");
        }
        removed
    }

    /// The largest part of a message any rule needs.
    #[must_use]
    pub fn required_part(&self) -> RequiredPart {
        self.rules
            .iter()
            .map(Rule::required_part)
            .max()
            .unwrap_or(RequiredPart::Envelope)
    }

    /// Evaluates the pattern against a message.
    pub fn evaluate<M>(&self, message: &M, ctx: &EvalContext<'_>) -> bool
    where
        M: MessageSource + ?Sized,
    {
        Evaluator::run(self, message, ctx).matched
    }

    /// Evaluates the pattern and returns the per-rule trace as well.
    pub fn run<M>(&self, message: &M, ctx: &EvalContext<'_>) -> EvaluationResult
    where
        M: MessageSource + ?Sized,
    {
        Evaluator::run(self, message, ctx)
    }

    /// Returns the messages the pattern matches, in input order.
    pub fn filter<'m, M>(&self, messages: &'m [M], ctx: &EvalContext<'_>) -> Vec<&'m M>
    where
        M: MessageSource,
    {
        messages
            .iter()
            .filter(|message| self.evaluate(*message, ctx))
            .collect()
    }

    /// Serializes the rules and combinator as a query string.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        query::render(self)
    }

    /// Parses a query string produced by [`RuleSet::to_query_string`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] with the byte position of the first
    /// offending token.
    pub fn from_query_string(name: impl Into<String>, text: &str) -> Result<Self> {
        let mut pattern = query::parse(text)?;
        pattern.set_name(name);
        Ok(pattern)
    }

    /// Describes the pattern in plain words.
    #[must_use]
    pub fn render_human_readable(&self) -> String {
        render::human_readable(self)
    }

    /// Renders the pattern as a sieve test. Rules sieve cannot express are
    /// skipped.
    #[must_use]
    pub fn to_sieve(&self) -> String {
        render::sieve(self)
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_human_readable())
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<T: IntoIterator<Item = Rule>>(iter: T) -> Self {
        Self {
            rules: iter.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl Extend<Rule> for RuleSet {
    fn extend<T: IntoIterator<Item = Rule>>(&mut self, iter: T) {
        self.rules.extend(iter);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::field::FieldReference;
    use crate::function::ComparisonFunction as F;
    use crate::message::MailItem;

    fn pattern() -> RuleSet {
        RuleSet::new("test")
            .with_rule(Rule::new("Subject", F::Contains, "report"))
            .with_rule(Rule::new("<size>", F::Greater, "10"))
    }

    #[test]
    fn combinator_names() {
        assert_eq!("OR".parse::<Combinator>().unwrap(), Combinator::Or);
        assert_eq!(Combinator::All.to_string(), "all");
        assert!("xor".parse::<Combinator>().is_err());
    }

    #[test]
    fn rule_editing_keeps_order() {
        let mut pattern = pattern();
        pattern.insert_rule(0, Rule::new("From", F::Equals, "a@b"));
        pattern.insert_rule(99, Rule::new("To", F::Equals, "c@d"));
        let fields: Vec<_> = pattern.rules().iter().map(|r| r.field().as_str()).collect();
        assert_eq!(fields, vec!["From", "Subject", "<size>", "To"]);

        let removed = pattern.remove_rule(1).unwrap();
        assert_eq!(removed.field(), &FieldReference::header("Subject"));
        assert!(pattern.remove_rule(10).is_none());
        assert_eq!(pattern.len(), 3);
    }

    #[test]
    fn purify_removes_empty_rules() {
        let mut pattern = pattern();
        pattern.add_rule(Rule::new("Subject", F::Contains, ""));
        pattern.add_rule(Rule::new("", F::Contains, "x"));
        pattern.add_rule(Rule::unary("<status>", F::HasAttachment));
        assert_eq!(pattern.purify(), 2);
        assert_eq!(pattern.len(), 3);
    }

    #[test]
    fn required_part_is_maximum() {
        let mut pattern = pattern();
        assert_eq!(pattern.required_part(), RequiredPart::Envelope);
        pattern.add_rule(Rule::new("X-Mailer", F::Contains, "mutt"));
        assert_eq!(pattern.required_part(), RequiredPart::Header);
        pattern.add_rule(Rule::new("<body>", F::Contains, "hello"));
        assert_eq!(pattern.required_part(), RequiredPart::CompleteMessage);
        assert_eq!(RuleSet::default().required_part(), RequiredPart::Envelope);
    }

    #[test]
    fn empty_policy_decides_empty_sets() {
        let item = MailItem::parse("Subject: x\n\n").unwrap();
        let ctx = EvalContext::new();
        for combinator in [Combinator::And, Combinator::Or] {
            let empty = RuleSet::new("empty").with_combinator(combinator);
            assert!(empty.evaluate(&item, &ctx));
            let strict = empty.with_empty_policy(EmptyPolicy::MatchNone);
            assert!(!strict.evaluate(&item, &ctx));
        }
    }

    #[test]
    fn filter_selects_matching_messages() {
        let items = [
            MailItem::parse("Subject: weekly report\n\nlong enough body").unwrap(),
            MailItem::parse("Subject: lunch\n\nlong enough body").unwrap(),
        ];
        let matched = pattern().filter(&items, &EvalContext::new());
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].message().subject(), Some("weekly report"));
    }

    #[test]
    fn serde_json_keeps_rules() {
        let pattern = pattern().with_combinator(Combinator::Or);
        let json = serde_json::to_string(&pattern).unwrap();
        let back: RuleSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pattern);
    }
}
