//! Column type tags.
//!
//! Configuration files name column types using ClickHouse type syntax
//! (`UInt32`, `Nullable(String)`, `Array(LowCardinality(String))`,
//! `Enum8('a' = 1, 'b' = 2)`). The text is parsed exactly once, while the
//! configuration is resolved, into the closed [`ColumnType`] enum. Nothing
//! downstream branches on type strings.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Error produced when a type tag cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid type '{input}': {message}")]
pub struct TypeParseError {
    pub input: String,
    pub message: String,
}

/// Closed set of column types understood by the generator and the DDL renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    String,
    Date,
    DateTime,
    Uuid,
    /// 8-bit enum; label and stored value pairs in declaration order.
    Enum8(Vec<(String, i16)>),
    /// 16-bit enum; label and stored value pairs in declaration order.
    Enum16(Vec<(String, i16)>),
    Nullable(Box<ColumnType>),
    Array(Box<ColumnType>),
    LowCardinality(Box<ColumnType>),
}

impl ColumnType {
    /// Parse a ClickHouse type expression.
    pub fn parse(input: &str) -> Result<Self, TypeParseError> {
        let mut parser = Parser {
            input,
            rest: input.trim(),
        };
        let parsed = parser.parse_type()?;
        if !parser.rest.trim().is_empty() {
            return Err(parser.error(format!("unexpected trailing input '{}'", parser.rest)));
        }
        Ok(parsed)
    }

    /// Inclusive bounds of a signed integer type.
    pub fn signed_bounds(&self) -> Option<(i64, i64)> {
        match self {
            ColumnType::Int8 => Some((i8::MIN as i64, i8::MAX as i64)),
            ColumnType::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
            ColumnType::Int32 => Some((i32::MIN as i64, i32::MAX as i64)),
            ColumnType::Int64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    /// Inclusive upper bound of an unsigned integer type.
    pub fn unsigned_max(&self) -> Option<u64> {
        match self {
            ColumnType::UInt8 => Some(u8::MAX as u64),
            ColumnType::UInt16 => Some(u16::MAX as u64),
            ColumnType::UInt32 => Some(u32::MAX as u64),
            ColumnType::UInt64 => Some(u64::MAX),
            _ => None,
        }
    }

    /// Fixed on-disk width in bytes for fixed-size leaf types.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            ColumnType::Int8 | ColumnType::UInt8 | ColumnType::Enum8(_) => Some(1),
            ColumnType::Int16 | ColumnType::UInt16 | ColumnType::Enum16(_) | ColumnType::Date => {
                Some(2)
            }
            ColumnType::Int32 | ColumnType::UInt32 | ColumnType::Float32 | ColumnType::DateTime => {
                Some(4)
            }
            ColumnType::Int64 | ColumnType::UInt64 | ColumnType::Float64 => Some(8),
            ColumnType::Uuid => Some(16),
            _ => None,
        }
    }
}

impl FromStr for ColumnType {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Int8 => write!(f, "Int8"),
            ColumnType::Int16 => write!(f, "Int16"),
            ColumnType::Int32 => write!(f, "Int32"),
            ColumnType::Int64 => write!(f, "Int64"),
            ColumnType::UInt8 => write!(f, "UInt8"),
            ColumnType::UInt16 => write!(f, "UInt16"),
            ColumnType::UInt32 => write!(f, "UInt32"),
            ColumnType::UInt64 => write!(f, "UInt64"),
            ColumnType::Float32 => write!(f, "Float32"),
            ColumnType::Float64 => write!(f, "Float64"),
            ColumnType::String => write!(f, "String"),
            ColumnType::Date => write!(f, "Date"),
            ColumnType::DateTime => write!(f, "DateTime"),
            ColumnType::Uuid => write!(f, "UUID"),
            ColumnType::Enum8(labels) => write_enum(f, "Enum8", labels),
            ColumnType::Enum16(labels) => write_enum(f, "Enum16", labels),
            ColumnType::Nullable(inner) => write!(f, "Nullable({inner})"),
            ColumnType::Array(inner) => write!(f, "Array({inner})"),
            ColumnType::LowCardinality(inner) => write!(f, "LowCardinality({inner})"),
        }
    }
}

fn write_enum(f: &mut fmt::Formatter<'_>, name: &str, labels: &[(String, i16)]) -> fmt::Result {
    write!(f, "{name}(")?;
    for (i, (label, value)) in labels.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        let escaped = label.replace('\\', "\\\\").replace('\'', "\\'");
        write!(f, "'{escaped}' = {value}")?;
    }
    write!(f, ")")
}

impl Serialize for ColumnType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct Parser<'a> {
    input: &'a str,
    rest: &'a str,
}

impl Parser<'_> {
    fn error(&self, message: impl Into<String>) -> TypeParseError {
        TypeParseError {
            input: self.input.to_string(),
            message: message.into(),
        }
    }

    fn parse_type(&mut self) -> Result<ColumnType, TypeParseError> {
        let rest: &str = self.rest.trim_start();
        let name_len = rest
            .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .unwrap_or(rest.len());
        if name_len == 0 {
            return Err(self.error("expected a type name"));
        }
        let name = &rest[..name_len];
        self.rest = &rest[name_len..];

        let leaf = match name {
            "Int8" => Some(ColumnType::Int8),
            "Int16" => Some(ColumnType::Int16),
            "Int32" => Some(ColumnType::Int32),
            "Int64" => Some(ColumnType::Int64),
            "UInt8" => Some(ColumnType::UInt8),
            "UInt16" => Some(ColumnType::UInt16),
            "UInt32" => Some(ColumnType::UInt32),
            "UInt64" => Some(ColumnType::UInt64),
            "Float32" => Some(ColumnType::Float32),
            "Float64" => Some(ColumnType::Float64),
            "String" => Some(ColumnType::String),
            "Date" => Some(ColumnType::Date),
            "DateTime" => Some(ColumnType::DateTime),
            "UUID" => Some(ColumnType::Uuid),
            _ => None,
        };
        if let Some(leaf) = leaf {
            return Ok(leaf);
        }

        match name {
            "Nullable" | "Array" | "LowCardinality" => {
                self.expect('(')?;
                let inner = Box::new(self.parse_type()?);
                self.expect(')')?;
                Ok(match name {
                    "Nullable" => ColumnType::Nullable(inner),
                    "Array" => ColumnType::Array(inner),
                    _ => ColumnType::LowCardinality(inner),
                })
            }
            "Enum8" | "Enum16" => {
                let labels = self.parse_enum_body()?;
                let (min, max) = if name == "Enum8" {
                    (i8::MIN as i16, i8::MAX as i16)
                } else {
                    (i16::MIN, i16::MAX)
                };
                if let Some((label, value)) = labels.iter().find(|(_, v)| *v < min || *v > max) {
                    return Err(
                        self.error(format!("value {value} of '{label}' does not fit {name}"))
                    );
                }
                Ok(if name == "Enum8" {
                    ColumnType::Enum8(labels)
                } else {
                    ColumnType::Enum16(labels)
                })
            }
            other => Err(self.error(format!("unsupported type '{other}'"))),
        }
    }

    fn expect(&mut self, c: char) -> Result<(), TypeParseError> {
        self.rest = self.rest.trim_start();
        match self.rest.strip_prefix(c) {
            Some(rest) => {
                self.rest = rest;
                Ok(())
            }
            None => Err(self.error(format!("expected '{c}'"))),
        }
    }

    /// Parses `('a' = 1, 'b' = 2)`. Values may be omitted, in which case
    /// labels are numbered from 1 in declaration order.
    fn parse_enum_body(&mut self) -> Result<Vec<(String, i16)>, TypeParseError> {
        self.expect('(')?;
        let mut labels: Vec<(String, i16)> = Vec::new();
        loop {
            self.rest = self.rest.trim_start();
            let label = self.parse_quoted()?;
            self.rest = self.rest.trim_start();
            let value = if let Some(rest) = self.rest.strip_prefix('=') {
                self.rest = rest.trim_start();
                let digits = self
                    .rest
                    .find(|c: char| !c.is_ascii_digit() && c != '-')
                    .unwrap_or(self.rest.len());
                let number = self.rest[..digits]
                    .parse::<i16>()
                    .map_err(|_| self.error(format!("invalid enum value for '{label}'")))?;
                self.rest = &self.rest[digits..];
                number
            } else {
                labels.len() as i16 + 1
            };
            if labels.iter().any(|(existing, _)| *existing == label) {
                return Err(self.error(format!("duplicate enum label '{label}'")));
            }
            labels.push((label, value));

            self.rest = self.rest.trim_start();
            if let Some(rest) = self.rest.strip_prefix(',') {
                self.rest = rest;
                continue;
            }
            self.expect(')')?;
            return Ok(labels);
        }
    }

    fn parse_quoted(&mut self) -> Result<String, TypeParseError> {
        let rest: &str = self.rest;
        let Some(body) = rest.strip_prefix('\'') else {
            return Err(self.error("expected a quoted enum label"));
        };
        let mut label = String::new();
        let mut chars = body.char_indices();
        while let Some((idx, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, escaped)) => label.push(escaped),
                    None => break,
                },
                '\'' => {
                    self.rest = &body[idx + 1..];
                    return Ok(label);
                }
                other => label.push(other),
            }
        }
        Err(self.error("unterminated enum label"))
    }
}
