//! JSON text <-> `OrderedValue`.
//!
//! Parsing is a hand-rolled recursive descent that builds [`OrderedValue`] directly, so
//! object keys keep their source order. Once an object's pairs are fully collected they
//! are checked for duplicates and then inspected for the binary sentinel
//! `{"$binary": "<hex>"}`, which becomes [`OrderedValue::Bytes`].
//!
//! Writing goes through `serde_json` using the `Serialize` impl on [`OrderedValue`]
//! and one of three layouts (see [`TextStyle`]).
//!
//! # Example
//! ```
//! use mpjson_core::json::{parse_value, write_value, TextStyle};
//! use mpjson_core::OrderedValue;
//!
//! let value = parse_value(r#"{"blob": {"$binary": "00ff"}, "n": 1}"#, 128).unwrap();
//! let blob = value.as_map().unwrap().get("blob").unwrap();
//! assert_eq!(blob, &OrderedValue::Bytes(vec![0x00, 0xff]));
//! assert_eq!(
//!     write_value(&value, TextStyle::Spaced).unwrap(),
//!     r#"{"blob": {"$binary": "00ff"}, "n": 1}"#
//! );
//! ```

use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;
use tracing::trace;

use crate::error::{DecodeError, Position, Result};
use crate::value::{OrderedMap, OrderedValue, Precision};

/// Layout of JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextStyle {
    /// `{"a": 1, "b": [1, 2]}`: a space after every `,` and `:`.
    #[default]
    Spaced,
    /// `{"a":1,"b":[1,2]}`
    Compact,
    /// Two-space indentation, one entry per line.
    Pretty,
}

/// Write a value as JSON text.
///
/// Fails only for floats that JSON cannot express (NaN and infinities).
pub fn write_value(value: &OrderedValue, style: TextStyle) -> Result<String> {
    let text = match style {
        TextStyle::Compact => serde_json::to_string(value)?,
        TextStyle::Pretty => serde_json::to_string_pretty(value)?,
        TextStyle::Spaced => {
            let mut out = Vec::with_capacity(128);
            let mut serializer = serde_json::Serializer::with_formatter(&mut out, SpacedFormatter);
            value.serialize(&mut serializer)?;
            String::from_utf8(out)
                .map_err(|e| DecodeError::Text(serde::ser::Error::custom(e)))?
        }
    };
    Ok(text)
}

/// Compact layout with `", "` between elements and `": "` after keys.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Parse one JSON document.
///
/// Integers without fraction or exponent that fit `[-2^63, 2^64 - 1]` become
/// [`OrderedValue::Integer`]; every other number becomes a double-precision
/// [`OrderedValue::Float`]. Containers nested deeper than `max_depth` are rejected.
pub fn parse_value(text: &str, max_depth: usize) -> Result<OrderedValue> {
    let mut parser = Parser {
        text,
        pos: if text.starts_with('\u{feff}') { 3 } else { 0 },
        depth: 0,
        max_depth,
    };
    parser.skip_whitespace();
    let value = parser.parse_any()?;
    parser.skip_whitespace();
    if parser.pos != text.len() {
        return Err(parser.syntax("trailing characters after JSON value"));
    }
    Ok(value)
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.pos += 1;
        }
    }

    fn skip_digits(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
    }

    fn position(&self, offset: usize) -> Position {
        let (line, column) = line_column(self.text, offset);
        Position::Text { line, column }
    }

    fn syntax(&self, message: impl Into<String>) -> DecodeError {
        self.syntax_at(self.pos, message)
    }

    fn syntax_at(&self, offset: usize, message: impl Into<String>) -> DecodeError {
        let (line, column) = line_column(self.text, offset);
        DecodeError::Syntax {
            line,
            column,
            offset,
            message: message.into(),
        }
    }

    fn enter(&mut self) -> Result<()> {
        if self.depth >= self.max_depth {
            return Err(DecodeError::DepthLimitExceeded {
                limit: self.max_depth,
                position: self.position(self.pos),
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn parse_any(&mut self) -> Result<OrderedValue> {
        match self.peek() {
            None => Err(self.syntax("unexpected end of input")),
            Some(b'{') => self.parse_object(),
            Some(b'[') => self.parse_array(),
            Some(b'"') => self.parse_string().map(OrderedValue::String),
            Some(b't') => self.parse_literal("true", OrderedValue::Bool(true)),
            Some(b'f') => self.parse_literal("false", OrderedValue::Bool(false)),
            Some(b'n') => self.parse_literal("null", OrderedValue::Null),
            Some(b'-' | b'0'..=b'9') => self.parse_number(),
            Some(_) => {
                let found = self.text[self.pos..].chars().next().unwrap_or_default();
                Err(self.syntax(format!("unexpected character {found:?}")))
            }
        }
    }

    fn parse_literal(&mut self, literal: &str, value: OrderedValue) -> Result<OrderedValue> {
        if self.text[self.pos..].starts_with(literal) {
            self.pos += literal.len();
            Ok(value)
        } else {
            Err(self.syntax(format!("expected `{literal}`")))
        }
    }

    fn parse_array(&mut self) -> Result<OrderedValue> {
        self.enter()?;
        self.pos += 1;
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
        } else {
            loop {
                self.skip_whitespace();
                items.push(self.parse_any()?);
                self.skip_whitespace();
                match self.peek() {
                    Some(b',') => self.pos += 1,
                    Some(b']') => {
                        self.pos += 1;
                        break;
                    }
                    _ => return Err(self.syntax("expected `,` or `]` in array")),
                }
            }
        }
        self.depth -= 1;
        Ok(OrderedValue::Array(items))
    }

    fn parse_object(&mut self) -> Result<OrderedValue> {
        let start = self.pos;
        self.enter()?;
        self.pos += 1;
        let mut pairs = Vec::new();
        let mut key_offsets = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
        } else {
            loop {
                self.skip_whitespace();
                if self.peek() != Some(b'"') {
                    return Err(self.syntax("expected string key in object"));
                }
                key_offsets.push(self.pos);
                let key = self.parse_string()?;
                self.skip_whitespace();
                if self.peek() != Some(b':') {
                    return Err(self.syntax("expected `:` after object key"));
                }
                self.pos += 1;
                self.skip_whitespace();
                let value = self.parse_any()?;
                pairs.push((key, value));
                self.skip_whitespace();
                match self.peek() {
                    Some(b',') => self.pos += 1,
                    Some(b'}') => {
                        self.pos += 1;
                        break;
                    }
                    _ => return Err(self.syntax("expected `,` or `}` in object")),
                }
            }
        }
        self.depth -= 1;

        let map = OrderedMap::try_from_pairs(pairs).map_err(|dup| DecodeError::DuplicateKey {
            position: self.position(key_offsets[dup.index]),
            key: dup.key,
        })?;
        self.finish_object(map, start)
    }

    /// Turn an exact `{"$binary": "<hex>"}` into bytes; leave every other map alone.
    fn finish_object(&self, map: OrderedMap, start: usize) -> Result<OrderedValue> {
        match map.as_binary_sentinel() {
            Some(payload) => {
                let bytes = hex::decode(payload).map_err(|e| DecodeError::InvalidHex {
                    position: self.position(start),
                    message: e.to_string(),
                })?;
                trace!(len = bytes.len(), "decoded $binary sentinel");
                Ok(OrderedValue::Bytes(bytes))
            }
            None => Ok(OrderedValue::Map(map)),
        }
    }

    fn parse_string(&mut self) -> Result<String> {
        let start = self.pos;
        let text = self.text;
        let bytes = text.as_bytes();
        self.pos += 1;
        let mut out = String::new();
        loop {
            // Stops only on ASCII, so `run` never splits a UTF-8 sequence.
            let run = self.pos;
            while let Some(&b) = bytes.get(self.pos) {
                if b == b'"' || b == b'\\' || b < 0x20 {
                    break;
                }
                self.pos += 1;
            }
            out.push_str(&text[run..self.pos]);

            match bytes.get(self.pos) {
                None => return Err(self.syntax_at(start, "unterminated string")),
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b'\\') => {
                    self.pos += 1;
                    self.parse_escape(&mut out)?;
                }
                Some(_) => return Err(self.syntax("unescaped control character in string")),
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<()> {
        let escape = self
            .peek()
            .ok_or_else(|| self.syntax("unterminated escape sequence"))?;
        self.pos += 1;
        match escape {
            b'"' => out.push('"'),
            b'\\' => out.push('\\'),
            b'/' => out.push('/'),
            b'b' => out.push('\u{8}'),
            b'f' => out.push('\u{c}'),
            b'n' => out.push('\n'),
            b'r' => out.push('\r'),
            b't' => out.push('\t'),
            b'u' => {
                let c = self.parse_unicode_escape()?;
                out.push(c);
            }
            _ => return Err(self.syntax_at(self.pos - 2, "invalid escape sequence")),
        }
        Ok(())
    }

    /// `\uXXXX`, combining a surrogate pair into one scalar value. Lone surrogates
    /// are rejected since Rust strings cannot hold them.
    fn parse_unicode_escape(&mut self) -> Result<char> {
        let escape_start = self.pos - 2;
        let first = self.read_hex4()?;
        let code = match first {
            0xd800..=0xdbff => {
                if !self.text[self.pos..].starts_with("\\u") {
                    return Err(self.syntax_at(escape_start, "unpaired surrogate in unicode escape"));
                }
                self.pos += 2;
                let second = self.read_hex4()?;
                if !(0xdc00..=0xdfff).contains(&second) {
                    return Err(self.syntax_at(escape_start, "invalid low surrogate in unicode escape"));
                }
                0x10000 + ((first - 0xd800) << 10) + (second - 0xdc00)
            }
            0xdc00..=0xdfff => {
                return Err(self.syntax_at(escape_start, "unpaired surrogate in unicode escape"))
            }
            _ => first,
        };
        char::from_u32(code).ok_or_else(|| self.syntax_at(escape_start, "invalid unicode escape"))
    }

    fn read_hex4(&mut self) -> Result<u32> {
        let digits = self
            .text
            .as_bytes()
            .get(self.pos..self.pos + 4)
            .ok_or_else(|| self.syntax("truncated unicode escape"))?;
        let mut code = 0;
        for &d in digits {
            let v = char::from(d)
                .to_digit(16)
                .ok_or_else(|| self.syntax("invalid hex digit in unicode escape"))?;
            code = code * 16 + v;
        }
        self.pos += 4;
        Ok(code)
    }

    fn parse_number(&mut self) -> Result<OrderedValue> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        match self.peek() {
            Some(b'0') => self.pos += 1,
            Some(b'1'..=b'9') => self.skip_digits(),
            _ => return Err(self.syntax("expected digit in number")),
        }

        let mut integral = true;
        if self.peek() == Some(b'.') {
            integral = false;
            self.pos += 1;
            if !self.peek().is_some_and(|b| b.is_ascii_digit()) {
                return Err(self.syntax("expected digit after decimal point"));
            }
            self.skip_digits();
        }
        if let Some(b'e' | b'E') = self.peek() {
            integral = false;
            self.pos += 1;
            if let Some(b'+' | b'-') = self.peek() {
                self.pos += 1;
            }
            if !self.peek().is_some_and(|b| b.is_ascii_digit()) {
                return Err(self.syntax("expected digit in exponent"));
            }
            self.skip_digits();
        }

        let literal = &self.text[start..self.pos];
        if integral {
            if let Ok(n) = literal.parse::<i128>() {
                if (i128::from(i64::MIN)..=i128::from(u64::MAX)).contains(&n) {
                    return Ok(OrderedValue::Integer(n));
                }
            }
        }
        let f: f64 = literal
            .parse()
            .map_err(|_| self.syntax_at(start, "invalid number"))?;
        if f.is_infinite() {
            return Err(DecodeError::NumberOutOfRange {
                position: self.position(start),
            });
        }
        Ok(OrderedValue::Float(f, Precision::Double))
    }
}

/// 1-based line and column of a byte offset. Columns count characters; a leading
/// BOM is not one of them.
fn line_column(text: &str, offset: usize) -> (usize, usize) {
    let before = &text.as_bytes()[..offset.min(text.len())];
    let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
    let bom = if text.starts_with('\u{feff}') { 3 } else { 0 };
    let line_start = before
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(bom.min(before.len()), |i| i + 1);
    let column = before[line_start..]
        .iter()
        .filter(|&&b| b & 0xc0 != 0x80)
        .count()
        + 1;
    (line, column)
}
