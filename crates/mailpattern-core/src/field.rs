//! Field references and resolved field values.

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::status::StatusFlags;

/// Headers available from a message envelope without fetching the full header block.
const ENVELOPE_HEADERS: [&str; 10] = [
    "from",
    "to",
    "cc",
    "bcc",
    "subject",
    "date",
    "reply-to",
    "sender",
    "message-id",
    "in-reply-to",
];

/// The part of a message a rule inspects.
///
/// Persisted as a string: the special fields use angle-bracket names
/// (`<size>`, `<status>`, ...), anything else is a header name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldReference {
    /// A named header such as `From` or `Subject`.
    Header(String),
    /// The complete message: header block and body.
    Message,
    /// The body text.
    Body,
    /// Every header line.
    AnyHeader,
    /// To, Cc and Bcc together.
    Recipients,
    /// Message size in bytes.
    Size,
    /// Whole days since the message date.
    AgeInDays,
    /// The message date.
    Date,
    /// Status bits.
    Status,
    /// Tag names.
    Tag,
    /// An angle-bracket name this engine does not know. Resolves to empty.
    Unknown(String),
}

impl FieldReference {
    /// Creates a header reference.
    #[must_use]
    pub fn header(name: impl Into<String>) -> Self {
        Self::Header(name.into())
    }

    /// Parses a persisted field name.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "<message>" => Self::Message,
            "<body>" => Self::Body,
            "<any header>" => Self::AnyHeader,
            "<recipients>" => Self::Recipients,
            "<size>" => Self::Size,
            "<age in days>" => Self::AgeInDays,
            "<date>" => Self::Date,
            "<status>" => Self::Status,
            "<tag>" => Self::Tag,
            _ if s.starts_with('<') && s.ends_with('>') => Self::Unknown(s.to_string()),
            _ => Self::Header(s.to_string()),
        }
    }

    /// Persisted name of the field.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Header(name) | Self::Unknown(name) => name,
            Self::Message => "<message>",
            Self::Body => "<body>",
            Self::AnyHeader => "<any header>",
            Self::Recipients => "<recipients>",
            Self::Size => "<size>",
            Self::AgeInDays => "<age in days>",
            Self::Date => "<date>",
            Self::Status => "<status>",
            Self::Tag => "<tag>",
        }
    }

    /// Name used in human-readable renderings.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::Header(name) | Self::Unknown(name) => name,
            Self::Message => "message",
            Self::Body => "body",
            Self::AnyHeader => "any header",
            Self::Recipients => "recipients",
            Self::Size => "size",
            Self::AgeInDays => "age in days",
            Self::Date => "date",
            Self::Status => "status",
            Self::Tag => "tag",
        }
    }

    /// Returns true if the field resolves to text, so that string
    /// comparison is a meaningful fallback for it.
    #[must_use]
    pub const fn is_textual(&self) -> bool {
        matches!(
            self,
            Self::Header(_)
                | Self::Message
                | Self::Body
                | Self::AnyHeader
                | Self::Recipients
                | Self::Tag
                | Self::Unknown(_)
        )
    }

    /// How much of the message must be available to resolve this field.
    #[must_use]
    pub fn required_part(&self) -> RequiredPart {
        match self {
            Self::Message | Self::Body => RequiredPart::CompleteMessage,
            Self::AnyHeader => RequiredPart::Header,
            Self::Header(name) => {
                if ENVELOPE_HEADERS
                    .iter()
                    .any(|h| h.eq_ignore_ascii_case(name))
                {
                    RequiredPart::Envelope
                } else {
                    RequiredPart::Header
                }
            }
            Self::Recipients
            | Self::Size
            | Self::AgeInDays
            | Self::Date
            | Self::Status
            | Self::Tag
            | Self::Unknown(_) => RequiredPart::Envelope,
        }
    }
}

impl fmt::Display for FieldReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for FieldReference {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&str> for FieldReference {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<FieldReference> for String {
    fn from(field: FieldReference) -> Self {
        field.as_str().to_string()
    }
}

/// How much of a message a rule needs, ordered from cheapest to most expensive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequiredPart {
    /// Envelope data: common headers, size, date, flags.
    Envelope,
    /// The full header block.
    Header,
    /// Headers and body.
    CompleteMessage,
}

/// A field resolved against a concrete message.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Text content (headers, body).
    Text(String),
    /// Integer quantity (bytes, days).
    Number(i64),
    /// A point in time.
    Date(DateTime<FixedOffset>),
    /// Status bits.
    Status(StatusFlags),
    /// Several text values (tags).
    List(Vec<String>),
    /// Nothing could be resolved.
    Empty,
}

impl FieldValue {
    /// Returns the value as text. Lists are joined with `", "`.
    #[must_use]
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s) => Cow::Borrowed(s),
            Self::Number(n) => Cow::Owned(n.to_string()),
            Self::Date(d) => Cow::Owned(d.to_rfc2822()),
            Self::Status(flags) => Cow::Owned(flags.to_string()),
            Self::List(items) => Cow::Owned(items.join(", ")),
            Self::Empty => Cow::Borrowed(""),
        }
    }

    /// Returns the value as an integer if it is one or parses as one.
    #[must_use]
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}
