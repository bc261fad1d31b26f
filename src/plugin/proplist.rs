/*
 *  plugin/proplist.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  Parser for the property list a plugin declares
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

//! Plugins declare their tunables in a brace-nested text block:
//!
//! ```text
//! proplist {
//!     prop {
//!         id = "amplitude"
//!         desc = "amplitude of the distortion"
//!         type = "number"
//!         range = [0, 0.1]
//!     }
//! }
//! ```
//!
//! Every `prop` block found anywhere in the text becomes a `PropertySpec`.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use log::warn;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::store::{ConfigValue, ConfigVector, MAX_VECTOR_LEN};

#[derive(Debug, Error, PartialEq)]
pub enum PropListError {
    #[error("unexpected character '{0}' at line {1}")]
    UnexpectedChar(char, usize),
    #[error("unterminated string at line {0}")]
    UnterminatedString(usize),
    #[error("bad number \"{0}\" at line {1}")]
    BadNumber(String, usize),
    #[error("expected {0} at line {1}")]
    Expected(&'static str, usize),
}

/// Declared type of a tunable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    Number,
    Integer,
    Color,
    Filename,
    String,
    Bool,
    Other(String),
}

impl PropertyKind {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "number" | "float" => PropertyKind::Number,
            "integer" | "int" => PropertyKind::Integer,
            "color" | "colour" => PropertyKind::Color,
            "filename" | "file" => PropertyKind::Filename,
            "string" | "text" => PropertyKind::String,
            "bool" | "boolean" => PropertyKind::Bool,
            _ => PropertyKind::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PropertyKind::Number => "number",
            PropertyKind::Integer => "integer",
            PropertyKind::Color => "color",
            PropertyKind::Filename => "filename",
            PropertyKind::String => "string",
            PropertyKind::Bool => "bool",
            PropertyKind::Other(s) => s.as_str(),
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PropertyKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One tunable declared by a plugin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySpec {
    pub id: String,
    #[serde(rename = "desc")]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: PropertyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(String),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Eq,
    Comma,
}

/// A parsed `name { ... }` block. Unlike config nodes, child names repeat.
#[derive(Debug)]
struct Block {
    name: String,
    attrs: Vec<(String, ConfigValue)>,
    children: Vec<Block>,
}

impl Block {
    fn attr(&self, key: &str) -> Option<&ConfigValue> {
        self.attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self { chars: text.chars().peekable(), line: 1 }
    }

    fn tokenize(mut self) -> Result<Vec<(Token, usize)>, PropListError> {
        let mut out = Vec::new();

        while let Some(&c) = self.chars.peek() {
            let line = self.line;
            match c {
                '\n' => {
                    self.line += 1;
                    self.chars.next();
                }
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                '#' => {
                    while let Some(&c) = self.chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.chars.next();
                    }
                }
                '{' => { self.chars.next(); out.push((Token::LBrace, line)); }
                '}' => { self.chars.next(); out.push((Token::RBrace, line)); }
                '[' => { self.chars.next(); out.push((Token::LBracket, line)); }
                ']' => { self.chars.next(); out.push((Token::RBracket, line)); }
                '=' => { self.chars.next(); out.push((Token::Eq, line)); }
                ',' => { self.chars.next(); out.push((Token::Comma, line)); }
                '"' => {
                    self.chars.next();
                    out.push((Token::Str(self.string(line)?), line));
                }
                c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                    let mut s = String::new();
                    while let Some(&c) = self.chars.peek() {
                        if c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.') {
                            s.push(c);
                            self.chars.next();
                        } else {
                            break;
                        }
                    }
                    out.push((Token::Num(s), line));
                }
                c if c.is_alphabetic() || c == '_' => {
                    let mut s = String::new();
                    while let Some(&c) = self.chars.peek() {
                        if c.is_alphanumeric() || c == '_' {
                            s.push(c);
                            self.chars.next();
                        } else {
                            break;
                        }
                    }
                    out.push((Token::Ident(s), line));
                }
                other => return Err(PropListError::UnexpectedChar(other, line)),
            }
        }

        Ok(out)
    }

    fn string(&mut self, start: usize) -> Result<String, PropListError> {
        let mut s = String::new();
        loop {
            match self.chars.next() {
                None => return Err(PropListError::UnterminatedString(start)),
                Some('"') => return Ok(s),
                Some('\n') => return Err(PropListError::UnterminatedString(start)),
                Some('\\') => match self.chars.next() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some(c) => s.push(c),
                    None => return Err(PropListError::UnterminatedString(start)),
                },
                Some(c) => s.push(c),
            }
        }
    }
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |(_, l)| *l)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        self.pos += 1;
        tok
    }

    fn expect(&mut self, want: Token, what: &'static str) -> Result<(), PropListError> {
        let line = self.line();
        match self.next() {
            Some(t) if t == want => Ok(()),
            _ => Err(PropListError::Expected(what, line)),
        }
    }

    /// node := ident '{' (ident '=' value | node)* '}'
    fn block(&mut self, name: String) -> Result<Block, PropListError> {
        self.expect(Token::LBrace, "'{'")?;
        let mut block = Block { name, attrs: Vec::new(), children: Vec::new() };

        loop {
            let line = self.line();
            match self.next() {
                Some(Token::RBrace) => return Ok(block),
                Some(Token::Ident(key)) => match self.peek() {
                    Some(Token::Eq) => {
                        self.next();
                        let value = self.value()?;
                        block.attrs.retain(|(k, _)| *k != key);
                        block.attrs.push((key, value));
                    }
                    Some(Token::LBrace) => {
                        let child = self.block(key)?;
                        block.children.push(child);
                    }
                    _ => return Err(PropListError::Expected("'=' or '{'", line)),
                },
                _ => return Err(PropListError::Expected("'}' or identifier", line)),
            }
        }
    }

    fn number(text: &str, line: usize) -> Result<ConfigValue, PropListError> {
        if let Ok(i) = text.parse::<i64>() {
            return Ok(ConfigValue::Integer(i));
        }
        text.parse::<f64>()
            .map(ConfigValue::Number)
            .map_err(|_| PropListError::BadNumber(text.to_string(), line))
    }

    fn value(&mut self) -> Result<ConfigValue, PropListError> {
        let line = self.line();
        match self.next() {
            Some(Token::Str(s)) => Ok(ConfigValue::String(s)),
            Some(Token::Ident(s)) => Ok(ConfigValue::String(s)),
            Some(Token::Num(n)) => Self::number(&n, line),
            Some(Token::LBracket) => {
                let mut comps = Vec::new();
                loop {
                    let line = self.line();
                    match self.next() {
                        Some(Token::RBracket) => break,
                        Some(Token::Comma) => continue,
                        Some(Token::Num(n)) => match Self::number(&n, line)? {
                            ConfigValue::Integer(i) => comps.push(i as f64),
                            ConfigValue::Number(f) => comps.push(f),
                            _ => return Err(PropListError::BadNumber(n, line)),
                        },
                        _ => return Err(PropListError::Expected("number or ']'", line)),
                    }
                }
                if comps.is_empty() || comps.len() > MAX_VECTOR_LEN {
                    return Err(PropListError::Expected("1 to 4 vector components", line));
                }
                Ok(ConfigValue::Vector(ConfigVector::new(&comps)))
            }
            _ => Err(PropListError::Expected("value", line)),
        }
    }
}

/// Parse property list text into its top-level blocks
fn parse_blocks(text: &str) -> Result<Vec<Block>, PropListError> {
    let tokens = Lexer::new(text).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let mut blocks = Vec::new();

    while parser.peek().is_some() {
        let line = parser.line();
        match parser.next() {
            Some(Token::Ident(name)) => blocks.push(parser.block(name)?),
            _ => return Err(PropListError::Expected("identifier", line)),
        }
    }

    Ok(blocks)
}

fn collect(blocks: &[Block], out: &mut Vec<PropertySpec>) {
    for block in blocks {
        if block.name != "prop" {
            collect(&block.children, out);
            continue;
        }

        let id = match block.attr("id") {
            Some(ConfigValue::String(id)) => id.clone(),
            _ => {
                warn!("property list: prop without an id, skipping");
                continue;
            }
        };
        let description = match block.attr("desc") {
            Some(ConfigValue::String(d)) => d.clone(),
            _ => String::new(),
        };
        let kind = match block.attr("type") {
            Some(ConfigValue::String(t)) => PropertyKind::parse(t),
            _ => PropertyKind::Other(String::new()),
        };
        let range = match block.attr("range") {
            Some(ConfigValue::Vector(v)) if v.len() >= 2 => Some((v.as_slice()[0], v.as_slice()[1])),
            _ => None,
        };
        out.push(PropertySpec { id, description, kind, range });
    }
}

/// Parse property list text into its declared properties, in declaration order.
/// Empty text declares nothing.
pub fn parse(text: &str) -> Result<Vec<PropertySpec>, PropListError> {
    let blocks = parse_blocks(text)?;
    let mut props = Vec::new();
    collect(&blocks, &mut props);
    Ok(props)
}
