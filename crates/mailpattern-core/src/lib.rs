//! # mailpattern-core
//!
//! Search and filter pattern engine for mail.
//!
//! This crate provides:
//! - **Rules** - one predicate on one message field (contains, regexp,
//!   numeric comparison, address-book membership, status bits)
//! - **Rule sets** - ordered rules combined with AND or OR
//! - **Evaluation** - short-circuit matching with an optional per-rule trace
//! - **Persistence** - key-value config groups, a query string format, and
//!   human-readable and sieve renderings
//!
//! ## Example
//!
//! ```
//! use mailpattern_core::{ComparisonFunction, EvalContext, MailItem, Rule, RuleSet};
//!
//! let pattern = RuleSet::new("Invoices")
//!     .with_rule(Rule::new("Subject", ComparisonFunction::Contains, "invoice"))
//!     .with_rule(Rule::new("<size>", ComparisonFunction::Greater, "10"));
//!
//! let item = MailItem::parse("Subject: Invoice #42\n\nPlease find attached.").unwrap();
//! assert!(pattern.evaluate(&item, &EvalContext::new()));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod contacts;
mod error;
pub mod evaluator;
pub mod field;
pub mod function;
pub mod message;
pub mod pattern;
pub mod rule;
pub mod settings;
pub mod status;

pub use codec::{ConfigCodec, ConfigFile, ConfigGroup, LoadReport, LoadWarning};
pub use contacts::{AddressBook, Contact, ContactList};
pub use error::{Error, Result};
pub use evaluator::{
    EvalContext, EvaluationResult, Evaluator, FilterLog, LogSink, RuleOutcome,
};
pub use field::{FieldReference, FieldValue, RequiredPart};
pub use function::{Arity, ComparisonFunction, ValueDomain};
pub use message::{MailItem, MessageSource};
pub use pattern::{Combinator, EmptyPolicy, RuleSet};
pub use rule::{CaseSensitivity, Rule};
pub use settings::EngineSettings;
pub use status::{Status, StatusFlags};
