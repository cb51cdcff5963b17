//! Human-readable and sieve renderings of a pattern.

use crate::field::FieldReference;
use crate::function::{ComparisonFunction, ValueDomain};
use crate::pattern::{Combinator, RuleSet};
use crate::rule::Rule;

/// Describes the pattern in plain words, rules joined by "and" or "or".
pub fn human_readable(pattern: &RuleSet) -> String {
    if pattern.combinator() == Combinator::All {
        return "all messages".to_string();
    }
    if pattern.is_empty() {
        return if pattern.empty_policy().matches() {
            "any message".to_string()
        } else {
            "no message".to_string()
        };
    }
    let separator = match pattern.combinator() {
        Combinator::Or => " or ",
        _ => " and ",
    };
    pattern
        .rules()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

/// Renders the pattern as a sieve test expression.
///
/// Rules on fields sieve has no test for (status, tags, dates, address
/// book) are skipped. A pattern with nothing left to test renders as its
/// empty-set verdict.
pub fn sieve(pattern: &RuleSet) -> String {
    if pattern.combinator() == Combinator::All {
        return "true".to_string();
    }

    let tests: Vec<String> = pattern
        .rules()
        .iter()
        .enumerate()
        .filter_map(|(index, rule)| {
            let test = sieve_test(rule);
            if test.is_none() {
                tracing::debug!(pattern = pattern.name(), index, rule = %rule, "Rule has no sieve equivalent");
            }
            test
        })
        .collect();

    match tests.as_slice() {
        [] => pattern.empty_policy().matches().to_string(),
        [single] => single.clone(),
        _ => {
            let op = if pattern.combinator() == Combinator::Or {
                "anyof"
            } else {
                "allof"
            };
            format!("{op}({})", tests.join(", "))
        }
    }
}

fn sieve_test(rule: &Rule) -> Option<String> {
    let function = rule.function();
    let positive = function.positive();
    let test = match function.domain() {
        ValueDomain::String => string_test(rule, positive)?,
        ValueDomain::Numeric => size_test(rule, positive)?,
        ValueDomain::Address | ValueDomain::None => return None,
    };
    if function.is_negative() == rule.is_negated() {
        Some(test)
    } else {
        Some(format!("not {test}"))
    }
}

fn string_test(rule: &Rule, function: ComparisonFunction) -> Option<String> {
    let operand = rule.operand();
    let (match_type, key) = match function {
        ComparisonFunction::Contains => (":contains", operand.to_string()),
        ComparisonFunction::Equals => (":is", operand.to_string()),
        ComparisonFunction::Regexp => (":regex", operand.to_string()),
        ComparisonFunction::StartWith => (":matches", format!("{}*", escape_wildcards(operand))),
        ComparisonFunction::EndWith => (":matches", format!("*{}", escape_wildcards(operand))),
        _ => return None,
    };
    let comparator = if rule.is_case_sensitive() {
        " :comparator \"i;octet\""
    } else {
        ""
    };

    let subject = match rule.field() {
        FieldReference::Header(name) => quote(name),
        FieldReference::Recipients => "[\"To\", \"Cc\", \"Bcc\"]".to_string(),
        FieldReference::Body => {
            return Some(format!("body :text{comparator} {match_type} {}", quote(&key)));
        }
        _ => return None,
    };
    Some(format!(
        "header{comparator} {match_type} {subject} {}",
        quote(&key)
    ))
}

fn size_test(rule: &Rule, function: ComparisonFunction) -> Option<String> {
    if rule.field() != &FieldReference::Size {
        return None;
    }
    let limit: u64 = rule.operand().trim().parse().ok()?;
    let test = match function {
        ComparisonFunction::Greater => format!("size :over {limit}"),
        ComparisonFunction::Less => format!("size :under {limit}"),
        ComparisonFunction::GreaterOrEqual => format!("not size :under {limit}"),
        ComparisonFunction::LessOrEqual => format!("not size :over {limit}"),
        _ => return None,
    };
    Some(test)
}

fn escape_wildcards(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '*' | '?' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::ComparisonFunction as F;
    use crate::pattern::EmptyPolicy;

    #[test]
    fn human_readable_joins_rules() {
        let pattern = RuleSet::new("p")
            .with_combinator(Combinator::Or)
            .with_rule(Rule::new("Subject", F::Contains, "foo"))
            .with_rule(Rule::unary("<status>", F::HasAttachment));
        assert_eq!(
            human_readable(&pattern),
            "Subject contains \"foo\" or status has an attachment"
        );
        assert_eq!(human_readable(&RuleSet::new("e")), "any message");
        assert_eq!(
            human_readable(&RuleSet::new("e").with_combinator(Combinator::All)),
            "all messages"
        );
    }

    #[test]
    fn sieve_combines_expressible_rules() {
        let pattern = RuleSet::new("p")
            .with_rule(Rule::new("Subject", F::Contains, "report"))
            .with_rule(Rule::new("<size>", F::Greater, "1000"))
            .with_rule(Rule::new("From", F::NotEqual, "boss@example.com"))
            .with_rule(Rule::unary("From", F::IsInAddressBook))
            .with_rule(Rule::new("<body>", F::Regexp, "^hi").negated());
        assert_eq!(
            sieve(&pattern),
            "allof(header :contains \"Subject\" \"report\", size :over 1000, \
             not header :comparator \"i;octet\" :is \"From\" \"boss@example.com\", \
             not body :text :regex \"^hi\")"
        );
    }

    #[test]
    fn sieve_prefix_and_suffix_use_wildcards() {
        let pattern = RuleSet::new("p")
            .with_combinator(Combinator::Or)
            .with_rule(Rule::new("Subject", F::StartWith, "[list*]"))
            .with_rule(Rule::new("<recipients>", F::EndWith, "@example.com"));
        assert_eq!(
            sieve(&pattern),
            "anyof(header :matches \"Subject\" \"[list\\\\*]*\", \
             header :matches [\"To\", \"Cc\", \"Bcc\"] \"*@example.com\")"
        );
    }

    #[test]
    fn sieve_inclusive_size_and_negative_functions() {
        let ge = RuleSet::new("p").with_rule(Rule::new("<size>", F::GreaterOrEqual, "10"));
        assert_eq!(sieve(&ge), "not size :under 10");
        let double = RuleSet::new("p").with_rule(Rule::new("Subject", F::ContainsNot, "x").negated());
        assert_eq!(sieve(&double), "header :contains \"Subject\" \"x\"");
        let bad = RuleSet::new("p").with_rule(Rule::new("<size>", F::Greater, "big"));
        assert_eq!(sieve(&bad), "true");
    }

    #[test]
    fn sieve_without_tests_uses_empty_policy() {
        let only_status = RuleSet::new("p")
            .with_rule(Rule::new("<status>", F::Contains, "Important"))
            .with_empty_policy(EmptyPolicy::MatchNone);
        assert_eq!(sieve(&only_status), "false");
        assert_eq!(sieve(&RuleSet::new("e")), "true");
    }
}
