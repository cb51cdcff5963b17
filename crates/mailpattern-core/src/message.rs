//! The message-like input the evaluator inspects.

use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset};
use mailpattern_mime::Message;
use mailpattern_mime::encoding::decode_rfc2047;

use crate::Result;
use crate::status::StatusFlags;

/// A message as seen by the pattern engine.
///
/// Only [`MessageSource::header`] is required; the other accessors default
/// to "not available", which makes rules on those fields resolve to empty
/// values instead of failing.
pub trait MessageSource {
    /// All values of the named header joined with `", "`, looked up
    /// case-insensitively, with encoded words decoded. `None` if the header
    /// is absent.
    fn header(&self, name: &str) -> Option<String>;

    /// The complete header block, one `Name: value` line per header.
    fn header_block(&self) -> String {
        String::new()
    }

    /// The body text, transfer decoding removed.
    fn body(&self) -> Option<String> {
        None
    }

    /// Size of the message in bytes.
    fn size(&self) -> Option<u64> {
        None
    }

    /// The message date.
    fn date(&self) -> Option<DateTime<FixedOffset>> {
        None
    }

    /// Stored status bits.
    fn status(&self) -> StatusFlags {
        StatusFlags::new()
    }

    /// Whether the message carries an attachment, derived from its structure.
    fn has_attachment(&self) -> bool {
        false
    }

    /// Tag names attached to the message.
    fn tags(&self) -> Vec<String> {
        Vec::new()
    }
}

/// A parsed message together with the mail store's metadata for it.
#[derive(Debug, Clone)]
pub struct MailItem {
    message: Message,
    status: StatusFlags,
    tags: Vec<String>,
}

impl MailItem {
    /// Wraps a parsed message with empty status and no tags.
    #[must_use]
    pub const fn new(message: Message) -> Self {
        Self {
            message,
            status: StatusFlags::new(),
            tags: Vec::new(),
        }
    }

    /// Parses a raw RFC 5322 message.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be parsed.
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(Self::new(Message::parse(raw)?))
    }

    /// Sets the status bits.
    #[must_use]
    pub const fn with_status(mut self, status: StatusFlags) -> Self {
        self.status = status;
        self
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// The underlying parsed message.
    #[must_use]
    pub const fn message(&self) -> &Message {
        &self.message
    }
}

impl MessageSource for MailItem {
    fn header(&self, name: &str) -> Option<String> {
        let values: Vec<_> = self
            .message
            .headers
            .get_all(name)
            .into_iter()
            .map(decode_rfc2047)
            .collect();
        (!values.is_empty()).then(|| values.join(", "))
    }

    fn header_block(&self) -> String {
        let mut block = String::new();
        for (name, value) in self.message.headers.iter() {
            let _ = writeln!(block, "{name}: {}", decode_rfc2047(value));
        }
        block
    }

    fn body(&self) -> Option<String> {
        Some(self.message.body_text().into_owned())
    }

    fn size(&self) -> Option<u64> {
        Some(self.message.size())
    }

    fn date(&self) -> Option<DateTime<FixedOffset>> {
        self.message.date()
    }

    fn status(&self) -> StatusFlags {
        self.status
    }

    fn has_attachment(&self) -> bool {
        self.message.has_attachment()
    }

    fn tags(&self) -> Vec<String> {
        self.tags.clone()
    }
}
