//! Tolerant parser for a JSON document that is still being written.
//!
//! The input is always a prefix of a valid document. Whatever has fully or
//! partially arrived is returned as a [`Value`]: open strings are closed, open
//! containers are closed, and members whose value has not started yet are
//! dropped. Numbers and literals are only kept once they are unambiguous.

use serde_json::{Map, Number, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct PartialJsonError {
    pub offset: usize,
    pub message: String,
}

/// Parse a possibly truncated JSON document.
///
/// Returns `Ok(None)` while no value has started (empty or whitespace input,
/// or a lone literal prefix such as `tr`).
pub fn parse_partial_json(input: &str) -> Result<Option<Value>, PartialJsonError> {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
    };

    let value = match parser.value()? {
        Parsed::Incomplete => return Ok(None),
        Parsed::Partial(value) => return Ok(Some(value)),
        Parsed::Complete(value) => value,
    };

    parser.skip_whitespace();
    if parser.pos < parser.chars.len() {
        return Err(parser.error("unexpected trailing characters"));
    }
    Ok(Some(value))
}

enum Parsed {
    /// The value and everything it contains is closed.
    Complete(Value),
    /// Input ended inside the value.
    Partial(Value),
    /// Input ended before anything usable arrived.
    Incomplete,
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn error(&self, message: &str) -> PartialJsonError {
        PartialJsonError {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn value(&mut self) -> Result<Parsed, PartialJsonError> {
        self.skip_whitespace();
        match self.peek() {
            None => Ok(Parsed::Incomplete),
            Some('{') => self.object(),
            Some('[') => self.array(),
            Some('"') => Ok(match self.string()? {
                (text, true) => Parsed::Complete(Value::String(text)),
                (text, false) => Parsed::Partial(Value::String(text)),
            }),
            Some('t') => self.literal("true", Value::Bool(true)),
            Some('f') => self.literal("false", Value::Bool(false)),
            Some('n') => self.literal("null", Value::Null),
            Some(ch) if ch == '-' || ch.is_ascii_digit() => self.number(),
            Some(_) => Err(self.error("unexpected character")),
        }
    }

    fn object(&mut self) -> Result<Parsed, PartialJsonError> {
        self.pos += 1;
        let mut map = Map::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Ok(Parsed::Partial(Value::Object(map))),
                Some('}') => {
                    self.pos += 1;
                    return Ok(Parsed::Complete(Value::Object(map)));
                }
                Some('"') => {}
                Some(_) => return Err(self.error("expected object key")),
            }

            let (key, closed) = self.string()?;
            if !closed {
                return Ok(Parsed::Partial(Value::Object(map)));
            }

            self.skip_whitespace();
            match self.peek() {
                None => return Ok(Parsed::Partial(Value::Object(map))),
                Some(':') => self.pos += 1,
                Some(_) => return Err(self.error("expected ':' after object key")),
            }

            match self.value()? {
                Parsed::Incomplete => return Ok(Parsed::Partial(Value::Object(map))),
                Parsed::Partial(value) => {
                    map.insert(key, value);
                    return Ok(Parsed::Partial(Value::Object(map)));
                }
                Parsed::Complete(value) => {
                    map.insert(key, value);
                }
            }

            self.skip_whitespace();
            match self.peek() {
                None => return Ok(Parsed::Partial(Value::Object(map))),
                Some(',') => self.pos += 1,
                Some('}') => {
                    self.pos += 1;
                    return Ok(Parsed::Complete(Value::Object(map)));
                }
                Some(_) => return Err(self.error("expected ',' or '}' in object")),
            }
        }
    }

    fn array(&mut self) -> Result<Parsed, PartialJsonError> {
        self.pos += 1;
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();
            if self.peek() == Some(']') {
                self.pos += 1;
                return Ok(Parsed::Complete(Value::Array(items)));
            }

            match self.value()? {
                Parsed::Incomplete => return Ok(Parsed::Partial(Value::Array(items))),
                Parsed::Partial(value) => {
                    items.push(value);
                    return Ok(Parsed::Partial(Value::Array(items)));
                }
                Parsed::Complete(value) => items.push(value),
            }

            self.skip_whitespace();
            match self.peek() {
                None => return Ok(Parsed::Partial(Value::Array(items))),
                Some(',') => self.pos += 1,
                Some(']') => {
                    self.pos += 1;
                    return Ok(Parsed::Complete(Value::Array(items)));
                }
                Some(_) => return Err(self.error("expected ',' or ']' in array")),
            }
        }
    }

    /// Returns the decoded text and whether the closing quote was seen.
    fn string(&mut self) -> Result<(String, bool), PartialJsonError> {
        self.pos += 1;
        let mut out = String::new();

        while let Some(ch) = self.peek() {
            self.pos += 1;
            match ch {
                '"' => return Ok((out, true)),
                '\\' => {
                    let Some(escape) = self.peek() else {
                        return Ok((out, false));
                    };
                    self.pos += 1;
                    match escape {
                        '"' => out.push('"'),
                        '\\' => out.push('\\'),
                        '/' => out.push('/'),
                        'b' => out.push('\u{8}'),
                        'f' => out.push('\u{c}'),
                        'n' => out.push('\n'),
                        'r' => out.push('\r'),
                        't' => out.push('\t'),
                        'u' => match self.unicode_escape()? {
                            Some(decoded) => out.push(decoded),
                            None => return Ok((out, false)),
                        },
                        _ => return Err(self.error("invalid escape sequence")),
                    }
                }
                _ => out.push(ch),
            }
        }

        Ok((out, false))
    }

    /// Decodes the hex digits after `\u`, joining surrogate pairs. `None`
    /// means the escape was cut off by the end of input.
    fn unicode_escape(&mut self) -> Result<Option<char>, PartialJsonError> {
        let Some(high) = self.hex4()? else {
            return Ok(None);
        };

        if !(0xD800..0xDC00).contains(&high) {
            return Ok(Some(char::from_u32(high).unwrap_or(char::REPLACEMENT_CHARACTER)));
        }

        match (self.peek(), self.chars.get(self.pos + 1).copied()) {
            (None, _) | (Some('\\'), None) => return Ok(None),
            (Some('\\'), Some('u')) => {}
            _ => return Ok(Some(char::REPLACEMENT_CHARACTER)),
        }

        self.pos += 2;
        let Some(low) = self.hex4()? else {
            return Ok(None);
        };
        let combined = 0x10000 + ((high - 0xD800) << 10) + (low.wrapping_sub(0xDC00) & 0x3FF);
        Ok(Some(
            char::from_u32(combined).unwrap_or(char::REPLACEMENT_CHARACTER),
        ))
    }

    fn hex4(&mut self) -> Result<Option<u32>, PartialJsonError> {
        let mut value = 0u32;
        for _ in 0..4 {
            let Some(ch) = self.peek() else {
                return Ok(None);
            };
            let digit = ch
                .to_digit(16)
                .ok_or_else(|| self.error("invalid unicode escape"))?;
            value = value * 16 + digit;
            self.pos += 1;
        }
        Ok(Some(value))
    }

    fn literal(&mut self, word: &str, value: Value) -> Result<Parsed, PartialJsonError> {
        for expected in word.chars() {
            match self.peek() {
                None => return Ok(Parsed::Incomplete),
                Some(ch) if ch == expected => self.pos += 1,
                Some(_) => return Err(self.error("invalid literal")),
            }
        }
        Ok(Parsed::Complete(value))
    }

    fn number(&mut self) -> Result<Parsed, PartialJsonError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|ch| ch.is_ascii_digit() || matches!(ch, '-' | '+' | '.' | 'e' | 'E'))
        {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();

        if self.peek().is_some() {
            return parse_number(&text)
                .map(Parsed::Complete)
                .ok_or_else(|| self.error("invalid number"));
        }

        // Input ended inside the number; keep the longest prefix that parses.
        let trimmed = text.trim_end_matches(|ch: char| !ch.is_ascii_digit());
        Ok(parse_number(trimmed).map_or(Parsed::Incomplete, Parsed::Partial))
    }
}

fn parse_number(text: &str) -> Option<Value> {
    if text.is_empty() {
        return None;
    }
    if let Ok(value) = text.parse::<i64>() {
        return Some(Value::Number(value.into()));
    }
    if let Ok(value) = text.parse::<u64>() {
        return Some(Value::Number(value.into()));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}
