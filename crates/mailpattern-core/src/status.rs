//! Message status bits.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A single message status bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Status {
    /// Message has been read.
    Read,
    /// Message has not been read. Always the inverse of [`Status::Read`].
    Unread,
    /// Message is marked important.
    Important,
    /// Message is marked as an action item.
    ToAct,
    /// Message has been replied to.
    Replied,
    /// Message has been forwarded.
    Forwarded,
    /// Message is queued for sending.
    Queued,
    /// Message has been sent.
    Sent,
    /// Message is marked for deletion.
    Deleted,
    /// Thread is watched.
    Watched,
    /// Thread is ignored.
    Ignored,
    /// Message is classified as spam.
    Spam,
    /// Message is classified as not spam.
    Ham,
    /// Message carries an attachment.
    HasAttachment,
    /// Message is encrypted.
    Encrypted,
    /// Message is signed.
    Signed,
}

impl Status {
    /// Every status, in persisted order.
    pub const ALL: [Self; 16] = [
        Self::Read,
        Self::Unread,
        Self::Important,
        Self::ToAct,
        Self::Replied,
        Self::Forwarded,
        Self::Queued,
        Self::Sent,
        Self::Deleted,
        Self::Watched,
        Self::Ignored,
        Self::Spam,
        Self::Ham,
        Self::HasAttachment,
        Self::Encrypted,
        Self::Signed,
    ];

    /// Persisted name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "Read",
            Self::Unread => "Unread",
            Self::Important => "Important",
            Self::ToAct => "ToAct",
            Self::Replied => "Replied",
            Self::Forwarded => "Forwarded",
            Self::Queued => "Queued",
            Self::Sent => "Sent",
            Self::Deleted => "Deleted",
            Self::Watched => "Watched",
            Self::Ignored => "Ignored",
            Self::Spam => "Spam",
            Self::Ham => "Ham",
            Self::HasAttachment => "HasAttachment",
            Self::Encrypted => "Encrypted",
            Self::Signed => "Signed",
        }
    }

    /// Parses a status name, case-insensitively.
    ///
    /// Accepts the legacy names `new`, `flagged`, `answered` and
    /// `has attachment` used by older filter configurations.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "new" => return Some(Self::Unread),
            "flagged" => return Some(Self::Important),
            "answered" => return Some(Self::Replied),
            "has attachment" | "attachment" => return Some(Self::HasAttachment),
            "action item" => return Some(Self::ToAct),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(&lower))
    }

    const fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| Error::UnknownStatus(s.to_string()))
    }
}

/// Set of status bits carried by a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusFlags {
    bits: u32,
}

impl StatusFlags {
    /// Creates an empty set (an unread message with no other bits).
    #[must_use]
    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    /// Returns a copy with `status` set.
    #[must_use]
    pub const fn with(mut self, status: Status) -> Self {
        match status {
            Status::Unread => self.bits &= !Status::Read.bit(),
            _ => self.bits |= status.bit(),
        }
        self
    }

    /// Sets a status bit.
    pub const fn insert(&mut self, status: Status) {
        *self = self.with(status);
    }

    /// Clears a status bit.
    pub const fn remove(&mut self, status: Status) {
        match status {
            Status::Unread => self.bits |= Status::Read.bit(),
            _ => self.bits &= !status.bit(),
        }
    }

    /// Returns true if the status bit is set.
    #[must_use]
    pub const fn contains(&self, status: Status) -> bool {
        match status {
            Status::Unread => self.bits & Status::Read.bit() == 0,
            _ => self.bits & status.bit() != 0,
        }
    }

    /// Returns an iterator over the set bits, including the derived `Unread`.
    pub fn iter(&self) -> impl Iterator<Item = Status> + '_ {
        Status::ALL.into_iter().filter(|s| self.contains(*s))
    }
}

impl FromIterator<Status> for StatusFlags {
    fn from_iter<T: IntoIterator<Item = Status>>(iter: T) -> Self {
        iter.into_iter().fold(Self::new(), Self::with)
    }
}

impl fmt::Display for StatusFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.iter().map(Status::as_str).collect();
        f.write_str(&names.join(", "))
    }
}
