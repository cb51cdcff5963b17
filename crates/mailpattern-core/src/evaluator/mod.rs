//! Evaluation of rule sets against messages.
//!
//! The [`Evaluator`] resolves each rule's field against a
//! [`MessageSource`], applies the rule and folds the results with the rule
//! set's combinator. It keeps no state between calls, so one rule set can
//! be evaluated against many messages, from several threads, as long as
//! nothing mutates it meanwhile.
//!
//! # Example
//!
//! ```ignore
//! use mailpattern_core::{EvalContext, Evaluator, FilterLog, MailItem, RuleSet};
//!
//! let log = FilterLog::default();
//! let ctx = EvalContext::new().with_address_book(&contacts).with_log_sink(&log);
//! let result = Evaluator::run(&pattern, &MailItem::parse(raw)?, &ctx);
//! for outcome in &result.trace {
//!     println!("{}: {}", outcome.rule, outcome.matched);
//! }
//! ```

mod log;

pub use log::{DEFAULT_LOG_MAX_BYTES, FilterLog, LogSink};

use chrono::{DateTime, Utc};

use crate::contacts::AddressBook;
use crate::field::{FieldReference, FieldValue};
use crate::function::ComparisonFunction;
use crate::message::MessageSource;
use crate::pattern::{Combinator, RuleSet};
use crate::status::Status;

/// Longest resolved value copied into a trace entry, in characters.
const TRACE_VALUE_CHARS: usize = 80;

/// Per-call evaluation inputs besides the message.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    address_book: Option<&'a dyn AddressBook>,
    log_sink: Option<&'a dyn LogSink>,
    now: DateTime<Utc>,
}

impl<'a> EvalContext<'a> {
    /// Creates a context without address book or log, using the current time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            address_book: None,
            log_sink: None,
            now: Utc::now(),
        }
    }

    /// Supplies the address-book oracle.
    #[must_use]
    pub fn with_address_book(mut self, book: &'a dyn AddressBook) -> Self {
        self.address_book = Some(book);
        self
    }

    /// Supplies a log sink and enables the trace.
    #[must_use]
    pub fn with_log_sink(mut self, sink: &'a dyn LogSink) -> Self {
        self.log_sink = Some(sink);
        self
    }

    /// Sets the reference time for age computations.
    #[must_use]
    pub const fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// The address-book oracle, if any.
    #[must_use]
    pub fn address_book(&self) -> Option<&'a dyn AddressBook> {
        self.address_book
    }

    /// The log sink, if any.
    #[must_use]
    pub fn log_sink(&self) -> Option<&'a dyn LogSink> {
        self.log_sink
    }

    /// The reference time.
    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

impl Default for EvalContext<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EvalContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalContext")
            .field("address_book", &self.address_book.is_some())
            .field("log_sink", &self.log_sink.is_some())
            .field("now", &self.now)
            .finish()
    }
}

/// Outcome of one rule within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    /// Position of the rule in its set.
    pub index: usize,
    /// Human-readable rule text.
    pub rule: String,
    /// Field that was resolved.
    pub field: FieldReference,
    /// Function that was applied.
    pub function: ComparisonFunction,
    /// Resolved value, shortened for display.
    pub value: String,
    /// Whether the rule matched.
    pub matched: bool,
}

/// Result of evaluating a rule set against one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationResult {
    /// Final verdict.
    pub matched: bool,
    /// Per-rule outcomes in evaluation order. Only filled when the context
    /// carries a log sink; rules skipped by short-circuiting are absent.
    pub trace: Vec<RuleOutcome>,
}

/// Stateless rule-set evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl Evaluator {
    /// Resolves a field reference against a message.
    ///
    /// Never fails: absent headers resolve to empty text, unavailable
    /// properties and unknown fields to [`FieldValue::Empty`].
    pub fn resolve_field<M>(message: &M, field: &FieldReference, now: DateTime<Utc>) -> FieldValue
    where
        M: MessageSource + ?Sized,
    {
        let value = match field {
            FieldReference::Header(name) => {
                FieldValue::Text(message.header(name).unwrap_or_default())
            }
            FieldReference::Message => {
                let mut text = message.header_block();
                text.push('\n');
                text.push_str(&message.body().unwrap_or_default());
                FieldValue::Text(text)
            }
            FieldReference::Body => FieldValue::Text(message.body().unwrap_or_default()),
            FieldReference::AnyHeader => FieldValue::Text(message.header_block()),
            FieldReference::Recipients => {
                let recipients: Vec<_> = ["To", "Cc", "Bcc"]
                    .iter()
                    .filter_map(|name| message.header(name))
                    .collect();
                FieldValue::Text(recipients.join(", "))
            }
            FieldReference::Size => message
                .size()
                .and_then(|size| i64::try_from(size).ok())
                .map_or(FieldValue::Empty, FieldValue::Number),
            FieldReference::AgeInDays => message.date().map_or(FieldValue::Empty, |date| {
                FieldValue::Number(now.signed_duration_since(date).num_days())
            }),
            FieldReference::Date => message.date().map_or(FieldValue::Empty, FieldValue::Date),
            FieldReference::Status => {
                let mut flags = message.status();
                if message.has_attachment() {
                    flags.insert(Status::HasAttachment);
                } else {
                    flags.remove(Status::HasAttachment);
                }
                FieldValue::Status(flags)
            }
            FieldReference::Tag => FieldValue::List(message.tags()),
            FieldReference::Unknown(name) => {
                tracing::debug!(field = %name, "Unknown field resolves to empty value");
                FieldValue::Empty
            }
        };
        tracing::trace!(%field, ?value, "Resolved field");
        value
    }

    /// Evaluates a rule set against a message.
    ///
    /// AND stops at the first rule that fails, OR at the first rule that
    /// matches, in insertion order. An empty set follows the set's
    /// [`EmptyPolicy`](crate::EmptyPolicy); the ALL combinator matches
    /// without looking at the rules.
    pub fn run<M>(pattern: &RuleSet, message: &M, ctx: &EvalContext<'_>) -> EvaluationResult
    where
        M: MessageSource + ?Sized,
    {
        let sink = ctx.log_sink();
        let mut trace = Vec::new();

        let matched = match pattern.combinator() {
            Combinator::All => true,
            _ if pattern.is_empty() => pattern.empty_policy().matches(),
            combinator => {
                let stop_on = combinator == Combinator::Or;
                let mut verdict = !stop_on;
                for (index, rule) in pattern.rules().iter().enumerate() {
                    let field = rule.effective_field();
                    let value = Self::resolve_field(message, field, ctx.now());
                    let matched = rule.matches(&value, ctx.address_book());

                    tracing::debug!(
                        pattern = pattern.name(),
                        index,
                        rule = %rule,
                        matched,
                        "Evaluated rule"
                    );

                    if let Some(sink) = sink {
                        let shown = shorten(&value.as_text());
                        sink.log(&format!(
                            "{}: {rule} on \"{shown}\" -> {}",
                            index + 1,
                            if matched { "match" } else { "no match" }
                        ));
                        trace.push(RuleOutcome {
                            index,
                            rule: rule.to_string(),
                            field: field.clone(),
                            function: rule.function(),
                            value: shown,
                            matched,
                        });
                    }

                    if matched == stop_on {
                        verdict = stop_on;
                        break;
                    }
                }
                verdict
            }
        };

        if let Some(sink) = sink {
            sink.log(&format!(
                "Pattern \"{}\" {}",
                pattern.name(),
                if matched { "matched" } else { "did not match" }
            ));
        }

        EvaluationResult { matched, trace }
    }

    /// Evaluates one rule set against each message, in order.
    pub fn run_batch<'m, M, I>(pattern: &RuleSet, messages: I, ctx: &EvalContext<'_>) -> Vec<bool>
    where
        M: MessageSource + ?Sized + 'm,
        I: IntoIterator<Item = &'m M>,
    {
        messages
            .into_iter()
            .map(|message| Self::run(pattern, message, ctx).matched)
            .collect()
    }
}

fn shorten(text: &str) -> String {
    let single_line = text.replace(['\r', '\n'], " ");
    if single_line.chars().count() <= TRACE_VALUE_CHARS {
        return single_line;
    }
    let mut short: String = single_line.chars().take(TRACE_VALUE_CHARS).collect();
    short.push_str("...");
    short
}
