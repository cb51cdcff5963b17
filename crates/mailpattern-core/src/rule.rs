//! A single search rule: one predicate on one message field.

use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, NaiveDate};
use mailpattern_mime::address;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::contacts::AddressBook;
use crate::field::{FieldReference, FieldValue, RequiredPart};
use crate::function::{Arity, ComparisonFunction, ValueDomain};
use crate::status::Status;

static STATUS_FIELD: FieldReference = FieldReference::Status;

/// Case handling for string comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseSensitivity {
    /// Use the function's convention: only equality is case-sensitive.
    #[default]
    Default,
    /// Compare exactly.
    Sensitive,
    /// Ignore case.
    Insensitive,
}

impl CaseSensitivity {
    /// Persisted name; `None` for the default.
    #[must_use]
    pub const fn as_str(self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::Sensitive => Some("sensitive"),
            Self::Insensitive => Some("insensitive"),
        }
    }

    /// Parses a persisted name, falling back to the default.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "sensitive" | "s" | "true" => Self::Sensitive,
            "insensitive" | "i" | "false" => Self::Insensitive,
            _ => Self::Default,
        }
    }
}

/// One predicate of a search pattern.
///
/// Evaluating a rule never fails. An operand that cannot be interpreted for
/// the function (an invalid regular expression, a non-numeric size, a
/// missing address book) makes the rule not match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    field: FieldReference,
    function: ComparisonFunction,
    #[serde(default)]
    operand: String,
    #[serde(default)]
    negated: bool,
    #[serde(default)]
    case: CaseSensitivity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    raw_function: Option<String>,
    #[serde(skip)]
    regex: OnceLock<Option<Regex>>,
}

impl Rule {
    /// Creates a rule.
    #[must_use]
    pub fn new(
        field: impl Into<FieldReference>,
        function: ComparisonFunction,
        operand: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            function,
            operand: operand.into(),
            negated: false,
            case: CaseSensitivity::Default,
            raw_function: None,
            regex: OnceLock::new(),
        }
    }

    /// Creates a rule without operand (attachment and address-book checks).
    #[must_use]
    pub fn unary(field: impl Into<FieldReference>, function: ComparisonFunction) -> Self {
        Self::new(field, function, String::new())
    }

    /// Returns the rule with its result inverted.
    #[must_use]
    pub const fn negated(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    /// Returns the rule with explicit case handling.
    #[must_use]
    pub fn with_case(mut self, case: CaseSensitivity) -> Self {
        self.set_case(case);
        self
    }

    /// The inspected field.
    #[must_use]
    pub const fn field(&self) -> &FieldReference {
        &self.field
    }

    /// The comparison function.
    #[must_use]
    pub const fn function(&self) -> ComparisonFunction {
        self.function
    }

    /// The operand.
    #[must_use]
    pub fn operand(&self) -> &str {
        &self.operand
    }

    /// Whether the result is inverted.
    #[must_use]
    pub const fn is_negated(&self) -> bool {
        self.negated
    }

    /// Explicit case handling.
    #[must_use]
    pub const fn case(&self) -> CaseSensitivity {
        self.case
    }

    /// The persisted function identifier this rule was loaded from, when it
    /// was not recognized and the rule fell back to `contains`.
    #[must_use]
    pub fn raw_function(&self) -> Option<&str> {
        self.raw_function.as_deref()
    }

    /// Sets the field.
    pub fn set_field(&mut self, field: impl Into<FieldReference>) {
        self.field = field.into();
    }

    /// Sets the function. Clears any preserved raw identifier.
    pub fn set_function(&mut self, function: ComparisonFunction) {
        self.function = function;
        self.raw_function = None;
        self.regex = OnceLock::new();
    }

    /// Sets the operand.
    pub fn set_operand(&mut self, operand: impl Into<String>) {
        self.operand = operand.into();
        self.regex = OnceLock::new();
    }

    /// Sets negation.
    pub const fn set_negated(&mut self, negated: bool) {
        self.negated = negated;
    }

    /// Sets case handling.
    pub fn set_case(&mut self, case: CaseSensitivity) {
        self.case = case;
        self.regex = OnceLock::new();
    }

    pub(crate) fn set_raw_function(&mut self, raw: Option<String>) {
        self.raw_function = raw;
    }

    /// Whether string comparisons of this rule are case-sensitive.
    #[must_use]
    pub fn is_case_sensitive(&self) -> bool {
        match self.case {
            CaseSensitivity::Default => self.function.default_case_sensitive(),
            CaseSensitivity::Sensitive => true,
            CaseSensitivity::Insensitive => false,
        }
    }

    /// Returns true if the rule carries no condition: an empty field name,
    /// or a binary function with an empty operand.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        if self.field.as_str().trim().is_empty() {
            return true;
        }
        self.function.arity() == Arity::Binary && self.operand.trim().is_empty()
    }

    /// The field the evaluator must resolve. Attachment checks always
    /// inspect the status, whatever field they were stored with.
    #[must_use]
    pub fn effective_field(&self) -> &FieldReference {
        if self.function.domain() == ValueDomain::None {
            &STATUS_FIELD
        } else {
            &self.field
        }
    }

    /// How much of the message this rule needs.
    #[must_use]
    pub fn required_part(&self) -> RequiredPart {
        self.effective_field().required_part()
    }

    /// Applies the rule to a resolved field value.
    ///
    /// Address functions consult `address_book`; without one they do not
    /// match. A malformed operand never matches, regardless of negation.
    #[must_use]
    pub fn matches(&self, value: &FieldValue, address_book: Option<&dyn AddressBook>) -> bool {
        let Some(hit) = self.test_positive(value, address_book) else {
            return false;
        };
        (hit != self.function.is_negative()) != self.negated
    }

    /// Evaluates the positive counterpart of the function. `None` means the
    /// operand or the value could not be interpreted.
    fn test_positive(&self, value: &FieldValue, book: Option<&dyn AddressBook>) -> Option<bool> {
        let function = self.function.positive();
        match function.domain() {
            ValueDomain::None => match value {
                FieldValue::Status(flags) => Some(flags.contains(Status::HasAttachment)),
                _ => None,
            },
            ValueDomain::Numeric => self.compare(value).map(|ordering| match function {
                ComparisonFunction::Greater => ordering == Ordering::Greater,
                ComparisonFunction::Less => ordering == Ordering::Less,
                ComparisonFunction::GreaterOrEqual => ordering != Ordering::Less,
                _ => ordering != Ordering::Greater,
            }),
            ValueDomain::Address => self.test_address(function, value, book?),
            ValueDomain::String => self.test_string(function, value),
        }
    }

    fn test_string(&self, function: ComparisonFunction, value: &FieldValue) -> Option<bool> {
        match value {
            FieldValue::Status(flags) => {
                let status = Status::parse(&self.operand)?;
                Some(flags.contains(status))
            }
            FieldValue::Date(date) if function == ComparisonFunction::Equals => {
                self.compare_date(date).map(|o| o == Ordering::Equal)
            }
            FieldValue::List(items) => {
                let mut any = false;
                for item in items {
                    any |= self.test_text(function, item)?;
                }
                Some(any)
            }
            _ => self.test_text(function, &value.as_text()),
        }
    }

    fn test_text(&self, function: ComparisonFunction, text: &str) -> Option<bool> {
        if function == ComparisonFunction::Regexp {
            return self.regex().map(|re| re.is_match(text));
        }

        let (text, operand) = if self.is_case_sensitive() {
            (text.to_string(), self.operand.clone())
        } else {
            (text.to_lowercase(), self.operand.to_lowercase())
        };

        match function {
            ComparisonFunction::Contains => Some(text.contains(&operand)),
            ComparisonFunction::Equals => Some(text == operand),
            ComparisonFunction::StartWith => Some(text.starts_with(&operand)),
            ComparisonFunction::EndWith => Some(text.ends_with(&operand)),
            _ => None,
        }
    }

    fn test_address(
        &self,
        function: ComparisonFunction,
        value: &FieldValue,
        book: &dyn AddressBook,
    ) -> Option<bool> {
        let addresses = address::extract(&value.as_text());
        if function == ComparisonFunction::IsInCategory {
            let category = self.operand.trim();
            if category.is_empty() {
                return None;
            }
            return Some(addresses.iter().any(|a| book.in_category(a, category)));
        }
        Some(addresses.iter().any(|a| book.contains_address(a)))
    }

    /// Orders the field value relative to the operand.
    fn compare(&self, value: &FieldValue) -> Option<Ordering> {
        if let FieldValue::Date(date) = value {
            return self.compare_date(date);
        }
        let lhs = value.as_number()?;
        let rhs: i64 = self.operand.trim().parse().ok()?;
        Some(lhs.cmp(&rhs))
    }

    /// Dates compare by calendar day against `YYYY-MM-DD` operands and by
    /// instant against RFC 3339 operands.
    fn compare_date(&self, date: &DateTime<FixedOffset>) -> Option<Ordering> {
        let operand = self.operand.trim();
        if let Ok(day) = NaiveDate::parse_from_str(operand, "%Y-%m-%d") {
            return Some(date.date_naive().cmp(&day));
        }
        DateTime::parse_from_rfc3339(operand)
            .ok()
            .map(|instant| date.cmp(&instant))
    }

    fn regex(&self) -> Option<&Regex> {
        self.regex
            .get_or_init(|| {
                RegexBuilder::new(&self.operand)
                    .case_insensitive(!self.is_case_sensitive())
                    .build()
                    .inspect_err(|e| {
                        tracing::debug!(pattern = %self.operand, error = %e, "Invalid regular expression");
                    })
                    .ok()
            })
            .as_ref()
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field
            && self.function == other.function
            && self.operand == other.operand
            && self.negated == other.negated
            && self.case == other.case
            && self.raw_function == other.raw_function
    }
}

impl Eq for Rule {}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            f.write_str("not (")?;
        }
        write!(f, "{} {}", self.field.display_name(), self.function.label())?;
        if self.function.arity() == Arity::Binary {
            write!(f, " \"{}\"", self.operand)?;
        }
        match self.case {
            CaseSensitivity::Default => {}
            CaseSensitivity::Sensitive => f.write_str(" (case-sensitive)")?,
            CaseSensitivity::Insensitive => f.write_str(" (ignoring case)")?,
        }
        if self.negated {
            f.write_str(")")?;
        }
        Ok(())
    }
}
