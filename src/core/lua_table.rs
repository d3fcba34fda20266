//! Decoder for the table literals the addon writes into its SavedVariables file.
//!
//! The dump looks like
//!
//! ```text
//! MyBankData = {
//!     {
//!         "Bob", -- [1]
//!         1, -- [2]
//!         "|cff1eff00|Hitem:12345::::::::60:::::|h[Widget]|h|r", -- [3]
//!         3, -- [4]
//!     }, -- [1]
//! }
//! ```
//!
//! [`decode_assignment`] finds the `<name> = {` assignment with a regex and then hands the
//! literal to a small recursive-descent reader, so nested tables and braces inside strings
//! never confuse the end of the literal.

use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

// Deepest table literal the reader accepts.
const MAX_DEPTH: usize = 200;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("variable '{name}' not found")]
    VariableNotFound { name: String },

    #[error("malformed literal at line {line}, column {column}: {message}")]
    Malformed {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("malformed literal: row {key} is not a table")]
    RowNotTable { key: TableKey },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableKey {
    Index(i64),
    Name(String),
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKey::Index(index) => write!(f, "{}", index),
            TableKey::Name(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LuaValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Table(LuaTable),
}

impl LuaValue {
    /// Integer view of the value. Integral floats and numeric strings are accepted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            LuaValue::Integer(value) => Some(*value),
            LuaValue::Float(value) if value.fract() == 0.0 && value.is_finite() => {
                Some(*value as i64)
            }
            LuaValue::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            LuaValue::String(text) => Some(text.clone()),
            LuaValue::Integer(value) => Some(value.to_string()),
            LuaValue::Float(value) => Some(value.to_string()),
            LuaValue::Boolean(value) => Some(value.to_string()),
            LuaValue::Table(_) => None,
        }
    }

    pub fn as_table(&self) -> Option<&LuaTable> {
        match self {
            LuaValue::Table(table) => Some(table),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableEntry {
    pub key: TableKey,
    pub value: LuaValue,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LuaTable {
    entries: Vec<TableEntry>,
}

impl LuaTable {
    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<TableEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &TableKey) -> Option<&LuaValue> {
        self.entries
            .iter()
            .find(|entry| &entry.key == key)
            .map(|entry| &entry.value)
    }

    pub fn get_index(&self, index: i64) -> Option<&LuaValue> {
        self.get(&TableKey::Index(index))
    }

    pub fn get_name(&self, name: &str) -> Option<&LuaValue> {
        self.entries
            .iter()
            .find(|entry| matches!(&entry.key, TableKey::Name(n) if n == name))
            .map(|entry| &entry.value)
    }
}

impl FromIterator<(TableKey, LuaValue)> for LuaTable {
    fn from_iter<I: IntoIterator<Item = (TableKey, LuaValue)>>(iter: I) -> Self {
        let mut builder = TableBuilder::default();
        for (key, value) in iter {
            builder.insert(key, value);
        }
        builder.finish()
    }
}

// 重複的 key 原地覆蓋
#[derive(Default)]
struct TableBuilder {
    entries: Vec<TableEntry>,
    positions: HashMap<TableKey, usize>,
}

impl TableBuilder {
    fn insert(&mut self, key: TableKey, value: LuaValue) {
        if let Some(&at) = self.positions.get(&key) {
            self.entries[at].value = value;
            return;
        }
        self.positions.insert(key.clone(), self.entries.len());
        self.entries.push(TableEntry { key, value });
    }

    fn finish(self) -> LuaTable {
        LuaTable {
            entries: self.entries,
        }
    }
}

/// Locate `<name> = { ... }` in `content` and decode the literal.
pub fn decode_assignment(content: &str, name: &str) -> Result<LuaTable, DecodeError> {
    let not_found = || DecodeError::VariableNotFound {
        name: name.to_string(),
    };

    let pattern = Regex::new(&format!(r"\b{}\s*=\s*\{{", regex::escape(name)))
        .map_err(|_| not_found())?;
    let found = pattern.find(content).ok_or_else(not_found)?;

    let mut reader = Reader::new(content, found.end() - 1);
    reader.parse_table()
}

/// Decode a standalone table literal. Only whitespace and comments may follow it.
pub fn decode_table(literal: &str) -> Result<LuaTable, DecodeError> {
    let mut reader = Reader::new(literal, 0);
    reader.skip_trivia()?;
    let table = reader.parse_table()?;
    reader.skip_trivia()?;
    if reader.peek().is_some() {
        return Err(reader.error("unexpected text after table literal"));
    }
    Ok(table)
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Reader<'a> {
    fn new(src: &'a str, pos: usize) -> Self {
        Self { src, pos, depth: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + offset).copied()
    }

    fn error(&self, message: impl Into<String>) -> DecodeError {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, pos: usize, message: impl Into<String>) -> DecodeError {
        let bytes = self.src.as_bytes();
        let before = &bytes[..pos.min(bytes.len())];
        let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
        let column = before.iter().rev().take_while(|&&b| b != b'\n').count() + 1;
        DecodeError::Malformed {
            line,
            column,
            message: message.into(),
        }
    }

    fn expect(&mut self, wanted: u8) -> Result<(), DecodeError> {
        if self.peek() == Some(wanted) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", wanted as char)))
        }
    }

    fn skip_trivia(&mut self) -> Result<(), DecodeError> {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'-') if self.peek_at(1) == Some(b'-') => {
                    self.pos += 2;
                    if let Some(level) = self.long_bracket_level() {
                        self.read_long_body(level)?;
                    } else {
                        while let Some(b) = self.peek() {
                            if b == b'\n' {
                                break;
                            }
                            self.pos += 1;
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn long_bracket_level(&mut self) -> Option<usize> {
        if self.peek() != Some(b'[') {
            return None;
        }
        let mut level = 0;
        while self.peek_at(1 + level) == Some(b'=') {
            level += 1;
        }
        if self.peek_at(1 + level) != Some(b'[') {
            return None;
        }
        self.pos += level + 2;
        Some(level)
    }

    fn read_long_body(&mut self, level: usize) -> Result<&'a str, DecodeError> {
        let start = self.pos;
        // A newline right after the opening bracket is not part of the body.
        if self.peek() == Some(b'\r') {
            self.pos += 1;
        }
        if self.peek() == Some(b'\n') {
            self.pos += 1;
        }

        let closing = format!("]{}]", "=".repeat(level));
        let src = self.src;
        match src[self.pos..].find(&closing) {
            Some(offset) => {
                let body = &src[self.pos..self.pos + offset];
                self.pos += offset + closing.len();
                Ok(body)
            }
            None => Err(self.error_at(start, "unfinished long string or comment")),
        }
    }

    fn parse_ident(&mut self) -> &'a str {
        let src = self.src;
        let start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        &src[start..self.pos]
    }

    // None 代表 nil
    fn parse_value(&mut self) -> Result<Option<LuaValue>, DecodeError> {
        self.skip_trivia()?;
        match self.peek() {
            None => Err(self.error("unexpected end of input, expected a value")),
            Some(b'{') => Ok(Some(LuaValue::Table(self.parse_table()?))),
            Some(quote @ (b'"' | b'\'')) => Ok(Some(LuaValue::String(self.parse_quoted(quote)?))),
            Some(b'[') => match self.long_bracket_level() {
                Some(level) => Ok(Some(LuaValue::String(self.read_long_body(level)?.to_string()))),
                None => Err(self.error("unexpected '['")),
            },
            Some(b) if b.is_ascii_digit() || b == b'-' || b == b'.' => {
                self.parse_number().map(Some)
            }
            Some(b) if is_ident_start(b) => {
                let start = self.pos;
                match self.parse_ident() {
                    "nil" => Ok(None),
                    "true" => Ok(Some(LuaValue::Boolean(true))),
                    "false" => Ok(Some(LuaValue::Boolean(false))),
                    other => Err(self.error_at(start, format!("unexpected identifier '{}'", other))),
                }
            }
            Some(_) => {
                let found = self.src[self.pos..].chars().next().unwrap_or('?');
                Err(self.error(format!("unexpected character '{}'", found)))
            }
        }
    }

    fn parse_table(&mut self) -> Result<LuaTable, DecodeError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("table nested too deeply"));
        }
        self.depth += 1;
        let table = self.parse_table_body();
        self.depth -= 1;
        table
    }

    fn parse_table_body(&mut self) -> Result<LuaTable, DecodeError> {
        let open = self.pos;
        self.expect(b'{')?;
        let mut table = TableBuilder::default();
        let mut next_index = 1;

        loop {
            self.skip_trivia()?;
            match self.peek() {
                None => return Err(self.error_at(open, "table is never closed")),
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(table.finish());
                }
                _ => {}
            }

            let (key, value) = self.parse_entry(&mut next_index)?;
            if let Some(value) = value {
                table.insert(key, value);
            }

            self.skip_trivia()?;
            match self.peek() {
                Some(b',' | b';') => self.pos += 1,
                Some(b'}') => {}
                None => return Err(self.error_at(open, "table is never closed")),
                Some(_) => return Err(self.error("expected ',' or '}' after table entry")),
            }
        }
    }

    fn parse_entry(
        &mut self,
        next_index: &mut i64,
    ) -> Result<(TableKey, Option<LuaValue>), DecodeError> {
        match self.peek() {
            Some(b'[') if !matches!(self.peek_at(1), Some(b'[' | b'=')) => {
                self.pos += 1;
                let key_at = self.pos;
                let key = self.parse_value()?;
                let key = self.table_key(key, key_at)?;
                self.skip_trivia()?;
                self.expect(b']')?;
                self.skip_trivia()?;
                self.expect(b'=')?;
                Ok((key, self.parse_value()?))
            }
            Some(b) if is_ident_start(b) => {
                let start = self.pos;
                let name = self.parse_ident();
                self.skip_trivia()?;
                if self.peek() == Some(b'=') && self.peek_at(1) != Some(b'=') {
                    self.pos += 1;
                    return Ok((TableKey::Name(name.to_string()), self.parse_value()?));
                }
                self.pos = start;
                self.positional(next_index)
            }
            _ => self.positional(next_index),
        }
    }

    fn positional(
        &mut self,
        next_index: &mut i64,
    ) -> Result<(TableKey, Option<LuaValue>), DecodeError> {
        let key = TableKey::Index(*next_index);
        *next_index += 1;
        Ok((key, self.parse_value()?))
    }

    fn table_key(&self, value: Option<LuaValue>, at: usize) -> Result<TableKey, DecodeError> {
        match value {
            Some(LuaValue::Integer(index)) => Ok(TableKey::Index(index)),
            Some(LuaValue::Float(index)) if index.fract() == 0.0 && index.is_finite() => {
                Ok(TableKey::Index(index as i64))
            }
            Some(LuaValue::String(name)) => Ok(TableKey::Name(name)),
            _ => Err(self.error_at(at, "unsupported table key")),
        }
    }

    fn parse_quoted(&mut self, quote: u8) -> Result<String, DecodeError> {
        let start = self.pos;
        self.pos += 1;
        let mut buf = Vec::new();

        loop {
            let Some(b) = self.peek() else {
                return Err(self.error_at(start, "unfinished string"));
            };
            self.pos += 1;
            match b {
                b'\\' => self.parse_escape(&mut buf)?,
                b'\n' | b'\r' => return Err(self.error_at(start, "unfinished string")),
                _ if b == quote => break,
                _ => buf.push(b),
            }
        }

        String::from_utf8(buf).map_err(|_| self.error_at(start, "string is not valid UTF-8"))
    }

    fn parse_escape(&mut self, buf: &mut Vec<u8>) -> Result<(), DecodeError> {
        let Some(b) = self.peek() else {
            return Err(self.error("unfinished escape sequence"));
        };
        self.pos += 1;
        match b {
            b'n' | b'\n' => buf.push(b'\n'),
            b'r' => buf.push(b'\r'),
            b't' => buf.push(b'\t'),
            b'a' => buf.push(0x07),
            b'b' => buf.push(0x08),
            b'f' => buf.push(0x0c),
            b'v' => buf.push(0x0b),
            b'\\' | b'"' | b'\'' => buf.push(b),
            b'\r' => {
                buf.push(b'\n');
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            b'x' => {
                let code = self
                    .src
                    .get(self.pos..self.pos + 2)
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                    .ok_or_else(|| self.error("invalid \\x escape"))?;
                buf.push(code);
                self.pos += 2;
            }
            b'z' => {
                while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
                    self.pos += 1;
                }
            }
            b'0'..=b'9' => {
                let start = self.pos - 1;
                let mut end = self.pos;
                while end < start + 3 && self.src.as_bytes().get(end).is_some_and(u8::is_ascii_digit) {
                    end += 1;
                }
                let code: u32 = self.src[start..end]
                    .parse()
                    .map_err(|_| self.error_at(start, "invalid decimal escape"))?;
                let code = u8::try_from(code)
                    .map_err(|_| self.error_at(start, "decimal escape too large"))?;
                buf.push(code);
                self.pos = end;
            }
            other => {
                return Err(self.error(format!("invalid escape sequence '\\{}'", other as char)));
            }
        }
        Ok(())
    }

    fn parse_number(&mut self) -> Result<LuaValue, DecodeError> {
        let start = self.pos;
        let negative = self.peek() == Some(b'-');
        if negative {
            self.pos += 1;
        }

        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x' | b'X')) {
            self.pos += 2;
            let digits_start = self.pos;
            while self.peek().is_some_and(|b| b.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let value = u64::from_str_radix(&self.src[digits_start..self.pos], 16)
                .map_err(|_| self.error_at(start, "malformed hexadecimal number"))?
                as i64;
            return Ok(LuaValue::Integer(if negative {
                value.wrapping_neg()
            } else {
                value
            }));
        }

        let mut is_float = false;
        let mut digits = 0;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
            digits += 1;
        }
        if self.peek() == Some(b'.') {
            is_float = true;
            self.pos += 1;
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
                digits += 1;
            }
        }
        if digits == 0 {
            return Err(self.error_at(start, "malformed number"));
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            is_float = true;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            let exponent_start = self.pos;
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
            if self.pos == exponent_start {
                return Err(self.error_at(start, "malformed number exponent"));
            }
        }

        let text = &self.src[start..self.pos];
        if !is_float {
            if let Ok(value) = text.parse::<i64>() {
                return Ok(LuaValue::Integer(value));
            }
        }
        text.parse::<f64>()
            .map(LuaValue::Float)
            .map_err(|_| self.error_at(start, "malformed number"))
    }
}
