//! Comparison functions and their descriptor table.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Number of operands a function takes besides the field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Tests the message alone (attachment checks).
    Unary,
    /// Compares the field value against the rule operand.
    Binary,
}

/// What kind of operand a function expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueDomain {
    /// Free text or a regular expression.
    String,
    /// A signed integer or a date.
    Numeric,
    /// Mail addresses checked against the address book; the operand is a
    /// category name for the category functions.
    Address,
    /// No operand.
    None,
}

/// A predicate applied between a resolved field value and a rule operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComparisonFunction {
    /// Field contains the operand.
    Contains,
    /// Field does not contain the operand.
    ContainsNot,
    /// Field equals the operand.
    Equals,
    /// Field differs from the operand.
    NotEqual,
    /// Field matches the operand as a regular expression.
    Regexp,
    /// Field does not match the operand as a regular expression.
    NotRegexp,
    /// Field starts with the operand.
    StartWith,
    /// Field does not start with the operand.
    NotStartWith,
    /// Field ends with the operand.
    EndWith,
    /// Field does not end with the operand.
    NotEndWith,
    /// Field is greater than the operand.
    Greater,
    /// Field is less than or equal to the operand.
    LessOrEqual,
    /// Field is less than the operand.
    Less,
    /// Field is greater than or equal to the operand.
    GreaterOrEqual,
    /// An address in the field is in the address book.
    #[serde(rename = "is-in-addressbook")]
    IsInAddressBook,
    /// No address in the field is in the address book.
    #[serde(rename = "is-not-in-addressbook")]
    IsNotInAddressBook,
    /// An address in the field belongs to the operand category.
    IsInCategory,
    /// No address in the field belongs to the operand category.
    IsNotInCategory,
    /// The message has an attachment.
    HasAttachment,
    /// The message has no attachment.
    HasNoAttachment,
}

/// Static description of a comparison function.
#[derive(Debug)]
pub struct FunctionInfo {
    /// The function described.
    pub function: ComparisonFunction,
    /// Persisted identifier.
    pub id: &'static str,
    /// Phrase used in human-readable renderings.
    pub label: &'static str,
    /// Operand count.
    pub arity: Arity,
    /// Operand domain.
    pub domain: ValueDomain,
    /// The positive function this one inverts, or itself.
    pub positive: ComparisonFunction,
}

const fn info(
    function: ComparisonFunction,
    id: &'static str,
    label: &'static str,
    arity: Arity,
    domain: ValueDomain,
    positive: ComparisonFunction,
) -> FunctionInfo {
    FunctionInfo {
        function,
        id,
        label,
        arity,
        domain,
        positive,
    }
}

use Arity::{Binary, Unary};
use ComparisonFunction as F;

// Indexed by discriminant; `table_matches_discriminants` checks the order.
#[rustfmt::skip]
static TABLE: [FunctionInfo; 20] = [
    info(F::Contains, "contains", "contains", Binary, ValueDomain::String, F::Contains),
    info(F::ContainsNot, "contains-not", "does not contain", Binary, ValueDomain::String, F::Contains),
    info(F::Equals, "equals", "equals", Binary, ValueDomain::String, F::Equals),
    info(F::NotEqual, "not-equal", "does not equal", Binary, ValueDomain::String, F::Equals),
    info(F::Regexp, "regexp", "matches regular expression", Binary, ValueDomain::String, F::Regexp),
    info(F::NotRegexp, "not-regexp", "does not match regular expression", Binary, ValueDomain::String, F::Regexp),
    info(F::StartWith, "start-with", "starts with", Binary, ValueDomain::String, F::StartWith),
    info(F::NotStartWith, "not-start-with", "does not start with", Binary, ValueDomain::String, F::StartWith),
    info(F::EndWith, "end-with", "ends with", Binary, ValueDomain::String, F::EndWith),
    info(F::NotEndWith, "not-end-with", "does not end with", Binary, ValueDomain::String, F::EndWith),
    info(F::Greater, "greater", "is greater than", Binary, ValueDomain::Numeric, F::Greater),
    info(F::LessOrEqual, "less-or-equal", "is less than or equal to", Binary, ValueDomain::Numeric, F::LessOrEqual),
    info(F::Less, "less", "is less than", Binary, ValueDomain::Numeric, F::Less),
    info(F::GreaterOrEqual, "greater-or-equal", "is greater than or equal to", Binary, ValueDomain::Numeric, F::GreaterOrEqual),
    info(F::IsInAddressBook, "is-in-addressbook", "is in address book", Unary, ValueDomain::Address, F::IsInAddressBook),
    info(F::IsNotInAddressBook, "is-not-in-addressbook", "is not in address book", Unary, ValueDomain::Address, F::IsInAddressBook),
    info(F::IsInCategory, "is-in-category", "is in category", Binary, ValueDomain::Address, F::IsInCategory),
    info(F::IsNotInCategory, "is-not-in-category", "is not in category", Binary, ValueDomain::Address, F::IsInCategory),
    info(F::HasAttachment, "has-attachment", "has an attachment", Unary, ValueDomain::None, F::HasAttachment),
    info(F::HasNoAttachment, "has-no-attachment", "has no attachment", Unary, ValueDomain::None, F::HasAttachment),
];

impl ComparisonFunction {
    /// Every function, in table order.
    pub const ALL: [Self; 20] = [
        Self::Contains,
        Self::ContainsNot,
        Self::Equals,
        Self::NotEqual,
        Self::Regexp,
        Self::NotRegexp,
        Self::StartWith,
        Self::NotStartWith,
        Self::EndWith,
        Self::NotEndWith,
        Self::Greater,
        Self::LessOrEqual,
        Self::Less,
        Self::GreaterOrEqual,
        Self::IsInAddressBook,
        Self::IsNotInAddressBook,
        Self::IsInCategory,
        Self::IsNotInCategory,
        Self::HasAttachment,
        Self::HasNoAttachment,
    ];

    /// Returns the descriptor for this function.
    #[must_use]
    pub fn info(self) -> &'static FunctionInfo {
        &TABLE[self as usize]
    }

    /// Persisted identifier.
    #[must_use]
    pub fn id(self) -> &'static str {
        self.info().id
    }

    /// Phrase used in human-readable renderings.
    #[must_use]
    pub fn label(self) -> &'static str {
        self.info().label
    }

    /// Operand count.
    #[must_use]
    pub fn arity(self) -> Arity {
        self.info().arity
    }

    /// Operand domain.
    #[must_use]
    pub fn domain(self) -> ValueDomain {
        self.info().domain
    }

    /// The positive counterpart (`ContainsNot` -> `Contains`); positive
    /// functions return themselves.
    #[must_use]
    pub fn positive(self) -> Self {
        self.info().positive
    }

    /// Returns true for functions that invert a positive counterpart.
    #[must_use]
    pub fn is_negative(self) -> bool {
        self.positive() != self
    }

    /// Whether string comparison is case-sensitive when the rule does not
    /// say otherwise. Only equality is.
    #[must_use]
    pub fn default_case_sensitive(self) -> bool {
        self.positive() == Self::Equals
    }

    /// Looks up a persisted identifier.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim();
        TABLE
            .iter()
            .find(|info| info.id.eq_ignore_ascii_case(id))
            .map(|info| info.function)
    }
}

impl fmt::Display for ComparisonFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl std::str::FromStr for ComparisonFunction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s).ok_or_else(|| Error::UnknownFunction(s.to_string()))
    }
}
