//! Typed value encoding.
//!
//! Every supported kind has a fixed little-endian layout. `bool` and `char`
//! occupy one byte when read; `char` writes its full UTF-8 encoding.

use std::fmt;

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::{Error, Result};

/// Closed set of primitive kinds that can live at a game address.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ValueKind {
    Bool,
    U8,
    Char,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl ValueKind {
    /// Number of bytes read for this kind.
    pub const fn size(self) -> usize {
        match self {
            ValueKind::Bool | ValueKind::U8 | ValueKind::Char => 1,
            ValueKind::I16 | ValueKind::U16 => 2,
            ValueKind::I32 | ValueKind::U32 | ValueKind::F32 => 4,
            ValueKind::I64 | ValueKind::U64 | ValueKind::F64 => 8,
        }
    }

    /// The zero value of this kind.
    pub fn zero(self) -> Value {
        match self {
            ValueKind::Bool => Value::Bool(false),
            ValueKind::U8 => Value::U8(0),
            ValueKind::Char => Value::Char('\0'),
            ValueKind::I16 => Value::I16(0),
            ValueKind::U16 => Value::U16(0),
            ValueKind::I32 => Value::I32(0),
            ValueKind::U32 => Value::U32(0),
            ValueKind::I64 => Value::I64(0),
            ValueKind::U64 => Value::U64(0),
            ValueKind::F32 => Value::F32(0.0),
            ValueKind::F64 => Value::F64(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Bool(bool),
    U8(u8),
    Char(char),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
}

fn take<const N: usize>(kind: ValueKind, bytes: &[u8]) -> Result<[u8; N]> {
    bytes
        .get(..N)
        .and_then(|b| b.try_into().ok())
        .ok_or(Error::BufferTooShort {
            kind,
            expected: N,
            actual: bytes.len(),
        })
}

fn parse_int<T>(kind: ValueKind, text: &str) -> Result<T>
where
    T: TryFrom<i128>,
{
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i128::from_str_radix(hex, 16),
        None => digits.parse::<i128>(),
    }
    .map_err(|e| Error::InvalidValue(format!("{:?} is not a valid {}: {}", text, kind, e)))?;

    let value = if negative { -magnitude } else { magnitude };
    T::try_from(value)
        .map_err(|_| Error::InvalidValue(format!("{} is out of range for {}", text, kind)))
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::U8(_) => ValueKind::U8,
            Value::Char(_) => ValueKind::Char,
            Value::I16(_) => ValueKind::I16,
            Value::U16(_) => ValueKind::U16,
            Value::I32(_) => ValueKind::I32,
            Value::U32(_) => ValueKind::U32,
            Value::I64(_) => ValueKind::I64,
            Value::U64(_) => ValueKind::U64,
            Value::F32(_) => ValueKind::F32,
            Value::F64(_) => ValueKind::F64,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match *self {
            Value::Bool(v) => vec![u8::from(v)],
            Value::U8(v) => vec![v],
            Value::Char(c) => {
                let mut buf = [0u8; 4];
                c.encode_utf8(&mut buf).as_bytes().to_vec()
            }
            Value::I16(v) => v.to_le_bytes().to_vec(),
            Value::U16(v) => v.to_le_bytes().to_vec(),
            Value::I32(v) => v.to_le_bytes().to_vec(),
            Value::U32(v) => v.to_le_bytes().to_vec(),
            Value::I64(v) => v.to_le_bytes().to_vec(),
            Value::U64(v) => v.to_le_bytes().to_vec(),
            Value::F32(v) => v.to_le_bytes().to_vec(),
            Value::F64(v) => v.to_le_bytes().to_vec(),
        }
    }

    /// Decode `kind` from the start of `bytes`. Extra trailing bytes are ignored.
    pub fn decode(kind: ValueKind, bytes: &[u8]) -> Result<Value> {
        let value = match kind {
            ValueKind::Bool => Value::Bool(take::<1>(kind, bytes)?[0] != 0),
            ValueKind::U8 => Value::U8(take::<1>(kind, bytes)?[0]),
            ValueKind::Char => {
                take::<1>(kind, bytes)?;
                let text = String::from_utf8_lossy(&bytes[..bytes.len().min(4)]);
                Value::Char(text.chars().next().unwrap_or(char::REPLACEMENT_CHARACTER))
            }
            ValueKind::I16 => Value::I16(i16::from_le_bytes(take(kind, bytes)?)),
            ValueKind::U16 => Value::U16(u16::from_le_bytes(take(kind, bytes)?)),
            ValueKind::I32 => Value::I32(i32::from_le_bytes(take(kind, bytes)?)),
            ValueKind::U32 => Value::U32(u32::from_le_bytes(take(kind, bytes)?)),
            ValueKind::I64 => Value::I64(i64::from_le_bytes(take(kind, bytes)?)),
            ValueKind::U64 => Value::U64(u64::from_le_bytes(take(kind, bytes)?)),
            ValueKind::F32 => Value::F32(f32::from_le_bytes(take(kind, bytes)?)),
            ValueKind::F64 => Value::F64(f64::from_le_bytes(take(kind, bytes)?)),
        };
        Ok(value)
    }

    /// Parse user input. Integers accept decimal or `0x`-prefixed hex.
    pub fn parse(kind: ValueKind, text: &str) -> Result<Value> {
        let invalid = |e: &dyn fmt::Display| {
            Error::InvalidValue(format!("{:?} is not a valid {}: {}", text, kind, e))
        };

        let value = match kind {
            ValueKind::Bool => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => return Err(invalid(&"expected true/false/1/0")),
            },
            ValueKind::Char => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Value::Char(c),
                    _ => return Err(invalid(&"expected exactly one character")),
                }
            }
            ValueKind::U8 => Value::U8(parse_int(kind, text)?),
            ValueKind::I16 => Value::I16(parse_int(kind, text)?),
            ValueKind::U16 => Value::U16(parse_int(kind, text)?),
            ValueKind::I32 => Value::I32(parse_int(kind, text)?),
            ValueKind::U32 => Value::U32(parse_int(kind, text)?),
            ValueKind::I64 => Value::I64(parse_int(kind, text)?),
            ValueKind::U64 => Value::U64(parse_int(kind, text)?),
            ValueKind::F32 => Value::F32(text.trim().parse().map_err(|e| invalid(&e))?),
            ValueKind::F64 => Value::F64(text.trim().parse().map_err(|e| invalid(&e))?),
        };
        Ok(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::U8(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "{:?}", v),
            Value::I16(v) => write!(f, "{}", v),
            Value::U16(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::U32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::U64(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
        }
    }
}

/// Rust types that map onto a [`ValueKind`].
pub trait Primitive: Copy + Default + Sized {
    const KIND: ValueKind;

    fn into_value(self) -> Value;

    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! impl_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const KIND: ValueKind = ValueKind::$variant;

                fn into_value(self) -> Value {
                    Value::$variant(self)
                }

                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_primitive! {
    bool => Bool,
    u8 => U8,
    char => Char,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}
