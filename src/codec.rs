//! Bidirectional translation between declared values and their AT wire text.
//!
//! Each registry parameter names one [`Codec`] variant. The codec renders a
//! declared [`Value`] into the argument text of a set command, parses the
//! payload token of a query response back into a [`Value`], and compares the
//! two while tolerating the representational drift AT responses are full of:
//! booleans reported as `0`/`1`, integers with leading zeros, strings quoted
//! or bare.

use core::fmt::Write;

use crate::config::{Value, ValueString};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Codec {
    /// Boolean switch, `1`/`0` on the wire.
    Flag,
    /// Decimal integer.
    Integer,
    /// Quoted string; responses may drop the quotes. Compared
    /// case-insensitively.
    Quoted,
    /// Opaque multi-value text (e.g. `31,0`), compared by exact match.
    Raw,
    /// Presence-style list parameter: an empty listing means "already in the
    /// desired state". Declared as a boolean; `false` means nothing to
    /// enforce.
    EmptyList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RenderError {
    /// The declared value's type does not fit this codec.
    TypeMismatch,
    /// The rendered argument does not fit the command buffer.
    Overflow,
    /// This codec never renders an argument.
    NoArgument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// The response held no payload line for this parameter. The engine
    /// treats this as "currently unset".
    Missing,
    /// Payload token did not match the expected shape.
    Malformed,
    /// Payload token exceeds the value capacity.
    Overflow,
}

fn unquote(token: &str) -> &str {
    token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(token)
}

impl Codec {
    /// Renders `value` as the argument text of a set command.
    pub fn render(&self, value: &Value, out: &mut impl Write) -> Result<(), RenderError> {
        match (self, value) {
            (Codec::Flag, Value::Bool(b)) => {
                write!(out, "{}", *b as u8).map_err(|_| RenderError::Overflow)
            }
            (Codec::Flag, Value::Int(n @ (0 | 1))) => {
                write!(out, "{}", n).map_err(|_| RenderError::Overflow)
            }
            (Codec::Integer, Value::Int(n)) => {
                write!(out, "{}", n).map_err(|_| RenderError::Overflow)
            }
            (Codec::Integer, Value::Bool(b)) => {
                write!(out, "{}", *b as u8).map_err(|_| RenderError::Overflow)
            }
            (Codec::Quoted, Value::Text(s)) => {
                write!(out, "\"{}\"", s.as_str()).map_err(|_| RenderError::Overflow)
            }
            (Codec::Raw, Value::Text(s)) => {
                out.write_str(s.as_str()).map_err(|_| RenderError::Overflow)
            }
            (Codec::EmptyList, _) => Err(RenderError::NoArgument),
            _ => Err(RenderError::TypeMismatch),
        }
    }

    /// Parses the payload token a query extraction produced.
    ///
    /// `None` means the response held no matching line; every codec except
    /// [`Codec::EmptyList`] reports that as [`ParseError::Missing`].
    pub fn parse(&self, token: Option<&str>) -> Result<Value, ParseError> {
        if let Codec::EmptyList = self {
            return Ok(Value::Bool(token.is_none()));
        }
        let token = token.ok_or(ParseError::Missing)?.trim();
        match self {
            Codec::Flag => unquote(token)
                .trim()
                .parse::<i32>()
                .map(|n| Value::Bool(n != 0))
                .map_err(|_| ParseError::Malformed),
            Codec::Integer => unquote(token)
                .trim()
                .parse::<i32>()
                .map(Value::Int)
                .map_err(|_| ParseError::Malformed),
            Codec::Quoted => ValueString::try_from(unquote(token))
                .map(Value::Text)
                .map_err(|_| ParseError::Overflow),
            Codec::Raw => ValueString::try_from(token)
                .map(Value::Text)
                .map_err(|_| ParseError::Overflow),
            Codec::EmptyList => unreachable!(),
        }
    }

    /// Compares a declared value against a parsed current value after
    /// normalizing representation.
    pub fn matches(&self, declared: &Value, current: &Value) -> bool {
        match self {
            Codec::Flag => match (Self::as_flag(declared), Self::as_flag(current)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            Codec::Integer => match (Self::as_numeric(declared), Self::as_numeric(current)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            Codec::Quoted => match (declared, current) {
                (Value::Text(a), Value::Text(b)) => a.as_str().eq_ignore_ascii_case(b.as_str()),
                _ => false,
            },
            Codec::Raw => match (declared, current) {
                (Value::Text(a), Value::Text(b)) => a == b,
                _ => false,
            },
            Codec::EmptyList => match declared {
                // Declared `false` leaves the list alone.
                Value::Bool(false) => true,
                Value::Bool(true) => matches!(current, Value::Bool(true)),
                _ => false,
            },
        }
    }

    fn as_flag(value: &Value) -> Option<bool> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Int(n) => Some(*n != 0),
            Value::Text(_) => None,
        }
    }

    fn as_numeric(value: &Value) -> Option<i32> {
        match value {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(*b as i32),
            Value::Text(s) => s.trim().parse().ok(),
        }
    }
}
