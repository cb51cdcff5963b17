//! # mailpattern-mime
//!
//! Message parsing for the `mailpattern` filter engine.
//!
//! ## Features
//!
//! - **Headers**: ordered, case-insensitive header map with RFC 5322 unfolding
//! - **Content types**: `type/subtype; key=value` parsing
//! - **Messages**: header/body split, raw size, multipart and attachment detection
//! - **Encoding**: base64 and quoted-printable bodies, RFC 2047 encoded words
//! - **Addresses**: mail address extraction from address lists
//! - **Dates**: RFC 2822 date parsing
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailpattern_mime::Message;
//!
//! let raw = "From: Alice <alice@example.com>\r\n\
//!            Subject: Quarterly report\r\n\
//!            \r\n\
//!            See attached.";
//!
//! let message = Message::parse(raw)?;
//! assert_eq!(message.subject(), Some("Quarterly report"));
//! assert_eq!(message.size(), raw.len() as u64);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod header;
mod message;

pub mod address;
pub mod date;
pub mod encoding;

pub use content_type::{ContentDisposition, ContentType};
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Message, Part};
