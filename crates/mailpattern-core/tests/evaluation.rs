//! Integration tests for pattern evaluation.
//!
//! These tests run rule sets against parsed messages and against a mock
//! message that counts how often it is asked for fields.

#![allow(clippy::unwrap_used)]

use std::cell::Cell;

use mailpattern_core::{
    ComparisonFunction as F, Combinator, Contact, ContactList, EvalContext, Evaluator, FilterLog,
    MailItem, MessageSource, Rule, RuleSet, Status, StatusFlags,
};

const PLAIN: &str = "\
From: Alice Example <alice@example.com>
To: bob@example.org, carol@example.net
Subject: Quarterly report
Date: Tue, 14 May 2024 09:30:00 +0200

Numbers attached in the next mail.
";

const WITH_ATTACHMENT: &str = "\
From: mallory@evil.test
To: bob@example.org
Subject: Invoice
Content-Type: multipart/mixed; boundary=\"XYZ\"

--XYZ
Content-Type: text/plain

Please pay.
--XYZ
Content-Type: application/pdf
Content-Disposition: attachment; filename=\"invoice.pdf\"

JVBERi0xLjQK
--XYZ--
";

/// Message whose every lookup is counted.
struct CountingMessage {
    subject: &'static str,
    calls: Cell<usize>,
}

impl CountingMessage {
    fn new(subject: &'static str) -> Self {
        Self {
            subject,
            calls: Cell::new(0),
        }
    }
}

impl MessageSource for CountingMessage {
    fn header(&self, name: &str) -> Option<String> {
        self.calls.set(self.calls.get() + 1);
        name.eq_ignore_ascii_case("subject")
            .then(|| self.subject.to_string())
    }

    fn size(&self) -> Option<u64> {
        self.calls.set(self.calls.get() + 1);
        Some(100)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("mailpattern_core=debug")
        .with_test_writer()
        .try_init();
}

fn contacts() -> ContactList {
    [
        Contact::new("alice@example.com", "Alice").with_category("Work"),
        Contact::new("dave@example.com", "Dave"),
    ]
    .into_iter()
    .collect()
}

#[test]
fn and_stops_after_first_failing_rule() {
    let message = CountingMessage::new("hello");
    let pattern = RuleSet::new("and")
        .with_rule(Rule::new("Subject", F::Equals, "goodbye"))
        .with_rule(Rule::new("Subject", F::Contains, "hell"))
        .with_rule(Rule::new("<size>", F::Greater, "10"));

    assert!(!pattern.evaluate(&message, &EvalContext::new()));
    assert_eq!(message.calls.get(), 1);
}

#[test]
fn or_stops_after_first_matching_rule() {
    let message = CountingMessage::new("hello");
    let pattern = RuleSet::new("or")
        .with_combinator(Combinator::Or)
        .with_rule(Rule::new("<size>", F::Less, "1000"))
        .with_rule(Rule::new("Subject", F::Contains, "hell"));

    assert!(pattern.evaluate(&message, &EvalContext::new()));
    assert_eq!(message.calls.get(), 1);
}

#[test]
fn empty_pattern_matches_everything() {
    let item = MailItem::parse(PLAIN).unwrap();
    for combinator in [Combinator::And, Combinator::Or] {
        let pattern = RuleSet::new("empty").with_combinator(combinator);
        assert!(pattern.evaluate(&item, &EvalContext::new()));
    }
}

#[test]
fn parsed_message_end_to_end() {
    init_tracing();
    let item = MailItem::parse(PLAIN)
        .unwrap()
        .with_status(StatusFlags::new().with(Status::Read).with(Status::Important))
        .with_tags(["finance"]);
    let book = contacts();
    let now = chrono::DateTime::parse_from_rfc3339("2024-05-24T12:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let ctx = EvalContext::new().with_address_book(&book).with_now(now);

    let pattern = RuleSet::new("report")
        .with_rule(Rule::new("subject", F::StartWith, "quarterly"))
        .with_rule(Rule::unary("From", F::IsInAddressBook))
        .with_rule(Rule::new("From", F::IsInCategory, "work"))
        .with_rule(Rule::new("<recipients>", F::Contains, "carol@"))
        .with_rule(Rule::new("<age in days>", F::GreaterOrEqual, "10"))
        .with_rule(Rule::new("<date>", F::Equals, "2024-05-14"))
        .with_rule(Rule::new("<status>", F::Contains, "important"))
        .with_rule(Rule::new("<status>", F::ContainsNot, "unread"))
        .with_rule(Rule::new("<tag>", F::Equals, "finance"))
        .with_rule(Rule::new("<body>", F::Regexp, r"next\s+mail"))
        .with_rule(Rule::unary("<status>", F::HasNoAttachment))
        .with_rule(Rule::new("X-Spam-Flag", F::ContainsNot, "yes"));

    assert!(pattern.evaluate(&item, &ctx));
}

#[test]
fn or_trace_records_rules_in_order() {
    let item = MailItem::parse(WITH_ATTACHMENT).unwrap();
    let book = contacts();
    let log = FilterLog::default();
    let ctx = EvalContext::new()
        .with_address_book(&book)
        .with_log_sink(&log);

    let pattern = RuleSet::new("suspicious")
        .with_combinator(Combinator::Or)
        .with_rule(Rule::unary("From", F::IsInAddressBook))
        .with_rule(Rule::unary("<status>", F::HasAttachment));

    let result = Evaluator::run(&pattern, &item, &ctx);
    assert!(result.matched);
    let outcomes: Vec<_> = result
        .trace
        .iter()
        .map(|o| (o.index, o.function, o.matched))
        .collect();
    assert_eq!(
        outcomes,
        vec![(0, F::IsInAddressBook, false), (1, F::HasAttachment, true)]
    );
    assert_eq!(result.trace[0].value, "mallory@evil.test");

    let entries = log.entries();
    assert_eq!(entries.len(), 3);
    assert!(entries[0].starts_with("1: From is in address book"));
    assert_eq!(entries[2], "Pattern \"suspicious\" matched");
}

#[test]
fn no_trace_without_log_sink() {
    let item = MailItem::parse(WITH_ATTACHMENT).unwrap();
    let pattern = RuleSet::new("p").with_rule(Rule::new("Subject", F::Contains, "invoice"));
    let result = pattern.run(&item, &EvalContext::new());
    assert!(result.matched);
    assert!(result.trace.is_empty());
}

#[test]
fn encoded_subject_and_body_are_searchable() {
    let item = MailItem::parse(
        "\
From: =?UTF-8?Q?Jos=C3=A9?= <jose@example.com>
Subject: =?UTF-8?B?SW52b2ljZSA0Mg==?=
Content-Transfer-Encoding: base64

aW52b2ljZQ==
",
    )
    .unwrap();
    let ctx = EvalContext::new();

    let subject = RuleSet::new("s").with_rule(Rule::new("Subject", F::Contains, "invoice"));
    assert!(subject.evaluate(&item, &ctx));
    let body = RuleSet::new("b").with_rule(Rule::new("<body>", F::Contains, "invoice"));
    assert!(body.evaluate(&item, &ctx));
    let from = RuleSet::new("f").with_rule(Rule::new("From", F::StartWith, "José"));
    assert!(from.evaluate(&item, &ctx));
}

#[test]
fn size_comparisons() {
    let item = MailItem::parse(PLAIN).unwrap();
    let ctx = EvalContext::new();
    let size = i64::try_from(item.size().unwrap()).unwrap();

    let bigger = RuleSet::new("big").with_rule(Rule::new("<size>", F::Greater, (size - 1).to_string()));
    assert!(bigger.evaluate(&item, &ctx));
    let exact = RuleSet::new("big").with_rule(Rule::new("<size>", F::Greater, size.to_string()));
    assert!(!exact.evaluate(&item, &ctx));
    let malformed = RuleSet::new("bad").with_rule(Rule::new("<size>", F::Greater, "ten"));
    assert!(!malformed.evaluate(&item, &ctx));
    assert!(!malformed.clone().with_rule(Rule::new("Subject", F::Contains, "")).evaluate(&item, &ctx));
}

#[test]
fn batch_over_many_messages() {
    let items = [
        MailItem::parse(PLAIN).unwrap(),
        MailItem::parse(WITH_ATTACHMENT).unwrap(),
    ];
    let pattern = RuleSet::new("attachments").with_rule(Rule::unary("<status>", F::HasAttachment));
    let ctx = EvalContext::new();
    assert_eq!(Evaluator::run_batch(&pattern, &items, &ctx), vec![false, true]);
    let matched = pattern.filter(&items, &ctx);
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].message().subject(), Some("Invoice"));
}

#[test]
fn patterns_are_shared_across_threads() {
    let pattern = RuleSet::new("threads").with_rule(Rule::new("Subject", F::Regexp, "^Quarterly"));
    let item = MailItem::parse(PLAIN).unwrap();
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| assert!(pattern.evaluate(&item, &EvalContext::new())));
        }
    });
}
