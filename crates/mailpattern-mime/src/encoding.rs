//! Transfer and header decoding.
//!
//! Bodies are decoded according to their Content-Transfer-Encoding (base64,
//! quoted-printable) and header values according to RFC 2047 encoded words.
//! Matching code never sees a decoding error: anything that cannot be
//! decoded is returned as it was stored.

use std::borrow::Cow;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Error, Result};

/// Decodes base64 data, ignoring line breaks and other whitespace.
///
/// # Errors
///
/// Returns an error if the input is not valid base64.
pub fn decode_base64(input: &str) -> Result<Vec<u8>> {
    let compact: String = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}

/// Decodes quoted-printable data, including soft line breaks.
///
/// # Errors
///
/// Returns an error for an `=` that is not followed by two hex digits or a
/// line break.
pub fn decode_quoted_printable(input: &str) -> Result<Vec<u8>> {
    decode_qp(input.as_bytes(), false)
}

fn decode_qp(input: &[u8], underscore_is_space: bool) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        match input[i] {
            b'=' => {
                let rest = &input[i + 1..];
                if rest.starts_with(b"\r\n") {
                    i += 3;
                } else if rest.starts_with(b"\n") || rest.is_empty() {
                    i += 2;
                } else {
                    let byte = match rest {
                        [hi, lo, ..] => hex_value(*hi)
                            .zip(hex_value(*lo))
                            .map(|(hi, lo)| (hi << 4) | lo),
                        _ => None,
                    }
                    .ok_or_else(|| Error::InvalidEncoding(format!("bad escape at byte {i}")))?;
                    out.push(byte);
                    i += 3;
                }
            }
            b'_' if underscore_is_space => {
                out.push(b' ');
                i += 1;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    Ok(out)
}

const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Converts decoded bytes to text.
///
/// ISO-8859-1 maps bytes straight to code points. Every other charset is
/// read as UTF-8, replacing invalid sequences.
#[must_use]
pub fn decode_charset(bytes: &[u8], charset: Option<&str>) -> String {
    let charset = charset.map(|c| c.trim().to_ascii_lowercase());
    match charset.as_deref() {
        Some("iso-8859-1" | "iso8859-1" | "latin1" | "latin-1") => {
            bytes.iter().copied().map(char::from).collect()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Decodes a body according to its transfer encoding and charset.
///
/// `7bit`, `8bit`, `binary`, unknown encodings and bodies that fail to
/// decode are returned unchanged.
#[must_use]
pub fn decode_body<'a>(
    body: &'a str,
    transfer_encoding: Option<&str>,
    charset: Option<&str>,
) -> Cow<'a, str> {
    let encoding = transfer_encoding.map(|e| e.trim().to_ascii_lowercase());
    let decoded = match encoding.as_deref() {
        Some("base64") => decode_base64(body),
        Some("quoted-printable") => decode_quoted_printable(body),
        _ => return Cow::Borrowed(body),
    };
    decoded.map_or(Cow::Borrowed(body), |bytes| {
        Cow::Owned(decode_charset(&bytes, charset))
    })
}

/// Decodes the RFC 2047 encoded words in a header value.
///
/// Encoded words may appear anywhere in the value. Whitespace between two
/// adjacent encoded words is removed. Malformed words are kept verbatim.
#[must_use]
pub fn decode_rfc2047(value: &str) -> Cow<'_, str> {
    if !value.contains("=?") {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    let mut after_word = false;
    while let Some(start) = rest.find("=?") {
        let (before, candidate) = rest.split_at(start);
        if let Some((decoded, len)) = decode_encoded_word(candidate) {
            if !after_word || !before.chars().all(char::is_whitespace) {
                out.push_str(before);
            }
            out.push_str(&decoded);
            rest = &candidate[len..];
            after_word = true;
        } else {
            out.push_str(before);
            out.push_str("=?");
            rest = &candidate[2..];
            after_word = false;
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Decodes one `=?charset?B|Q?text?=` word at the start of `word`, returning
/// the text and the number of bytes consumed.
fn decode_encoded_word(word: &str) -> Option<(String, usize)> {
    let inner = word.strip_prefix("=?")?;
    let (charset, rest) = inner.split_once('?')?;
    let (encoding, rest) = rest.split_once('?')?;
    let end = rest.find("?=")?;
    let text = &rest[..end];
    if charset.is_empty() || charset.contains(char::is_whitespace) {
        return None;
    }
    if text.contains(char::is_whitespace) {
        return None;
    }

    let bytes = match encoding {
        "B" | "b" => decode_base64(text).ok()?,
        "Q" | "q" => decode_qp(text.as_bytes(), true).ok()?,
        _ => return None,
    };
    let consumed = 2 + charset.len() + 1 + encoding.len() + 1 + end + 2;
    // RFC 2231 allows a language after the charset: `utf-8*en`.
    let charset = charset.split('*').next().unwrap_or(charset);
    Some((decode_charset(&bytes, Some(charset)), consumed))
}
