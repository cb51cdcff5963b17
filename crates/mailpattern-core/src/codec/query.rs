//! Machine query string format.
//!
//! ```text
//! and("Subject" contains "report", not "<size>" greater "100000", "<status>" has-attachment)
//! ```
//!
//! A rule is an optional `not`, the quoted field name, the function
//! identifier with an optional `/i` or `/s` case suffix, and the quoted
//! operand. Quoted strings escape `"` and `\` with a backslash. Whitespace
//! between tokens is ignored.

use crate::function::{Arity, ComparisonFunction};
use crate::pattern::{Combinator, RuleSet};
use crate::rule::{CaseSensitivity, Rule};
use crate::{Error, Result};

/// Renders the rules and combinator of a pattern.
pub fn render(pattern: &RuleSet) -> String {
    let rules: Vec<String> = pattern.rules().iter().map(render_rule).collect();
    format!("{}({})", pattern.combinator(), rules.join(", "))
}

fn render_rule(rule: &Rule) -> String {
    let mut out = String::new();
    if rule.is_negated() {
        out.push_str("not ");
    }
    push_quoted(&mut out, rule.field().as_str());
    out.push(' ');
    out.push_str(rule.function().id());
    match rule.case() {
        CaseSensitivity::Default => {}
        CaseSensitivity::Sensitive => out.push_str("/s"),
        CaseSensitivity::Insensitive => out.push_str("/i"),
    }
    if rule.function().arity() == Arity::Binary || !rule.operand().is_empty() {
        out.push(' ');
        push_quoted(&mut out, rule.operand());
    }
    out
}

fn push_quoted(out: &mut String, value: &str) {
    out.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}

/// Parses a query string into an unnamed pattern.
pub fn parse(text: &str) -> Result<RuleSet> {
    let mut lexer = Lexer::new(text.as_bytes());

    let combinator = match lexer.next_token()? {
        Token::Word(word) => Combinator::parse(word)
            .ok_or_else(|| lexer.error(&format!("Unknown combinator: {word}")))?,
        token => return Err(lexer.error(&format!("Expected combinator, got {token:?}"))),
    };
    lexer.expect(&Token::LParen)?;

    let mut pattern = RuleSet::default().with_combinator(combinator);

    let mut token = lexer.next_token()?;
    if token != Token::RParen {
        loop {
            pattern.add_rule(parse_rule(&mut lexer, token)?);
            match lexer.next_token()? {
                Token::Comma => token = lexer.next_token()?,
                Token::RParen => break,
                other => {
                    return Err(lexer.error(&format!("Expected ',' or ')', got {other:?}")));
                }
            }
        }
    }

    match lexer.next_token()? {
        Token::Eof => Ok(pattern),
        token => Err(lexer.error(&format!("Trailing input: {token:?}"))),
    }
}

fn parse_rule(lexer: &mut Lexer<'_>, first: Token<'_>) -> Result<Rule> {
    let (negated, field) = match first {
        Token::Word(word) if word.eq_ignore_ascii_case("not") => match lexer.next_token()? {
            Token::Quoted(field) => (true, field),
            token => return Err(lexer.error(&format!("Expected field, got {token:?}"))),
        },
        Token::Quoted(field) => (false, field),
        token => return Err(lexer.error(&format!("Expected rule, got {token:?}"))),
    };

    let (function, case) = match lexer.next_token()? {
        Token::Word(word) => {
            let (id, suffix) = word.split_once('/').unwrap_or((word, ""));
            let function = ComparisonFunction::from_id(id)
                .ok_or_else(|| lexer.error(&format!("Unknown comparison function: {id}")))?;
            let case = match suffix {
                "" => CaseSensitivity::Default,
                "s" => CaseSensitivity::Sensitive,
                "i" => CaseSensitivity::Insensitive,
                _ => return Err(lexer.error(&format!("Unknown case suffix: /{suffix}"))),
            };
            (function, case)
        }
        token => return Err(lexer.error(&format!("Expected function, got {token:?}"))),
    };

    let operand = if let Some(Token::Quoted(operand)) = lexer.peek_token()? {
        lexer.next_token()?;
        operand
    } else if function.arity() == Arity::Binary {
        return Err(lexer.error(&format!("Function {function} requires an operand")));
    } else {
        String::new()
    };

    let mut rule = Rule::new(field, function, operand).with_case(case);
    rule.set_negated(negated);
    Ok(rule)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    /// Combinator, `not` or function identifier.
    Word(&'a str),
    Quoted(String),
    LParen,
    RParen,
    Comma,
    Eof,
}

struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek_token(&mut self) -> Result<Option<Token<'a>>> {
        let saved = self.pos;
        let token = self.next_token();
        self.pos = saved;
        token.map(Some)
    }

    fn next_token(&mut self) -> Result<Token<'a>> {
        self.skip_whitespace();
        let Some(byte) = self.peek() else {
            return Ok(Token::Eof);
        };

        match byte {
            b'(' => {
                self.advance();
                Ok(Token::LParen)
            }
            b')' => {
                self.advance();
                Ok(Token::RParen)
            }
            b',' => {
                self.advance();
                Ok(Token::Comma)
            }
            b'"' => self.read_quoted(),
            _ if is_word_char(byte) => self.read_word(),
            _ => Err(self.error(&format!("Unexpected character: {:?}", char::from(byte)))),
        }
    }

    fn read_quoted(&mut self) -> Result<Token<'a>> {
        let start = self.pos;
        self.advance();

        let mut bytes = Vec::new();
        loop {
            match self.advance() {
                Some(b'"') => break,
                Some(b'\\') => match self.advance() {
                    Some(c @ (b'"' | b'\\')) => bytes.push(c),
                    Some(c) => {
                        return Err(self.error(&format!("Invalid escape: \\{}", char::from(c))));
                    }
                    None => return Err(self.error("Unexpected end in quoted string")),
                },
                Some(c) => bytes.push(c),
                None => {
                    self.pos = start;
                    return Err(self.error("Unterminated quoted string"));
                }
            }
        }

        String::from_utf8(bytes)
            .map(Token::Quoted)
            .map_err(|_| self.error("Invalid UTF-8 in quoted string"))
    }

    fn read_word(&mut self) -> Result<Token<'a>> {
        let start = self.pos;
        while self.peek().is_some_and(is_word_char) {
            self.pos += 1;
        }
        std::str::from_utf8(&self.input[start..self.pos])
            .map(Token::Word)
            .map_err(|_| self.error("Invalid UTF-8 in identifier"))
    }

    fn expect(&mut self, expected: &Token<'_>) -> Result<()> {
        let token = self.next_token()?;
        if &token == expected {
            Ok(())
        } else {
            Err(self.error(&format!("Expected {expected:?}, got {token:?}")))
        }
    }

    fn error(&self, message: &str) -> Error {
        Error::Query {
            position: self.pos,
            message: message.to_string(),
        }
    }
}

const fn is_word_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'/' | b'_')
}
