//! Message structure and parsing.

use std::borrow::Cow;

use chrono::{DateTime, FixedOffset};

use crate::content_type::{ContentDisposition, ContentType};
use crate::date;
use crate::encoding;
use crate::error::{Error, Result};
use crate::header::Headers;

/// MIME body part.
#[derive(Debug, Clone, Default)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Raw part body (no transfer decoding applied).
    pub body: String,
    /// Nested parts when this part is itself multipart.
    pub parts: Vec<Part>,
}

impl Part {
    /// Gets the content type, defaulting to `text/plain`.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        content_type_of(&self.headers)
    }

    /// Returns true if this part, or any nested part, is an attachment.
    #[must_use]
    pub fn has_attachment(&self) -> bool {
        is_attachment(&self.headers) || self.parts.iter().any(Self::has_attachment)
    }

    /// Returns the body with its transfer encoding removed.
    #[must_use]
    pub fn decoded_body(&self) -> Cow<'_, str> {
        decode_body(&self.headers, &self.body)
    }

    fn first_text(&self, sub_type: &str) -> Option<&Self> {
        if self.parts.is_empty() {
            let ct = self.content_type();
            return (ct.is_text() && ct.sub_type == sub_type && !is_attachment(&self.headers))
                .then_some(self);
        }
        self.parts.iter().find_map(|p| p.first_text(sub_type))
    }
}

/// A parsed message.
#[derive(Debug, Clone)]
pub struct Message {
    /// Top-level headers.
    pub headers: Headers,
    /// Raw body text following the header block.
    pub body: String,
    /// Body parts for multipart messages (empty for single-part messages).
    pub parts: Vec<Part>,
    size: u64,
}

impl Message {
    /// Creates a single-part message from headers and a body.
    #[must_use]
    pub fn new(headers: Headers, body: impl Into<String>) -> Self {
        let body = body.into();
        let size = (headers.to_string().len() + 1 + body.len()) as u64;
        Self {
            headers,
            body,
            parts: Vec::new(),
            size,
        }
    }

    /// Parses a raw RFC 5322 message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Empty`] for blank input. A multipart message without
    /// a boundary parameter is read as a single-part message.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(Error::Empty);
        }

        let (head, body) = split_head_body(raw);
        let headers = Headers::parse(head);
        let parts = parse_parts(&headers, body)?;

        Ok(Self {
            headers,
            body: body.to_string(),
            parts,
            size: raw.len() as u64,
        })
    }

    /// Size of the raw message in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Gets the content type, defaulting to `text/plain`.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        content_type_of(&self.headers)
    }

    /// Checks if this is a multipart message.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        !self.parts.is_empty()
    }

    /// Gets the From header.
    #[must_use]
    pub fn from(&self) -> Option<&str> {
        self.headers.get("from")
    }

    /// Gets the Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.headers.get("subject")
    }

    /// Parses the Date header.
    #[must_use]
    pub fn date(&self) -> Option<DateTime<FixedOffset>> {
        self.headers.get("date").and_then(|d| date::parse(d).ok())
    }

    /// Returns true if any body part is an attachment.
    #[must_use]
    pub fn has_attachment(&self) -> bool {
        self.parts.iter().any(Part::has_attachment)
    }

    /// Returns the text that search rules should see as the body.
    ///
    /// For multipart messages this is the first `text/plain` part, falling
    /// back to the first `text/html` part. Single-part messages use the whole
    /// body. Base64 and quoted-printable content is decoded.
    #[must_use]
    pub fn body_text(&self) -> Cow<'_, str> {
        if self.parts.is_empty() {
            return decode_body(&self.headers, &self.body);
        }
        self.parts
            .iter()
            .find_map(|p| p.first_text("plain"))
            .or_else(|| self.parts.iter().find_map(|p| p.first_text("html")))
            .map_or(Cow::Borrowed(""), Part::decoded_body)
    }
}

fn decode_body<'a>(headers: &Headers, body: &'a str) -> Cow<'a, str> {
    let ct = content_type_of(headers);
    encoding::decode_body(
        body,
        headers.get("content-transfer-encoding"),
        ct.charset(),
    )
}

fn content_type_of(headers: &Headers) -> ContentType {
    headers
        .get("content-type")
        .and_then(|v| ContentType::parse(v).ok())
        .unwrap_or_else(ContentType::text_plain)
}

fn is_attachment(headers: &Headers) -> bool {
    let disposition = headers
        .get("content-disposition")
        .map(ContentDisposition::parse);
    if disposition.as_ref().is_some_and(ContentDisposition::is_attachment) {
        return true;
    }
    if disposition
        .as_ref()
        .and_then(ContentDisposition::filename)
        .is_some()
    {
        return true;
    }
    let ct = content_type_of(headers);
    !ct.is_multipart() && ct.name().is_some()
}

fn split_head_body(raw: &str) -> (&str, &str) {
    let crlf = raw.find("\r\n\r\n").map(|i| (i, 4));
    let lf = raw.find("\n\n").map(|i| (i, 2));
    let split = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };

    match split {
        Some((index, len)) => (&raw[..index], &raw[index + len..]),
        None => (raw, ""),
    }
}

fn parse_parts(headers: &Headers, body: &str) -> Result<Vec<Part>> {
    let ct = content_type_of(headers);
    if !ct.is_multipart() {
        return Ok(Vec::new());
    }
    let Some(boundary) = ct.boundary() else {
        return Ok(Vec::new());
    };
    let delimiter = format!("--{boundary}");
    let closing = format!("--{boundary}--");

    let mut sections: Vec<Vec<&str>> = Vec::new();
    let mut current: Option<Vec<&str>> = None;

    for line in body.lines() {
        let trimmed = line.trim_end();
        if trimmed == closing {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            break;
        }
        if trimmed == delimiter {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            current = Some(Vec::new());
            continue;
        }
        if let Some(section) = current.as_mut() {
            section.push(line);
        }
    }
    if let Some(section) = current {
        sections.push(section);
    }

    sections
        .into_iter()
        .map(|lines| {
            let text = lines.join("\n");
            let (head, body) = split_head_body(&text);
            // A part starting with a blank line has no headers.
            let (head, body) = if text.starts_with('\n') {
                ("", text.trim_start_matches('\n'))
            } else {
                (head, body)
            };
            let headers = Headers::parse(head);
            let parts = parse_parts(&headers, body)?;
            Ok(Part {
                headers,
                body: body.to_string(),
                parts,
            })
        })
        .collect()
}
