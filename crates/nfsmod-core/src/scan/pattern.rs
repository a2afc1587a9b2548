//! Byte patterns and Boyer-Moore-Horspool search.

use std::fmt;

use crate::error::{Error, Result};

/// A non-empty, fully specified byte sequence.
///
/// Byte 0 of the pattern sits at the lowest address of a match, so a
/// little-endian value must be given in its in-memory byte order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    bytes: Vec<u8>,
}

impl Pattern {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(Error::InvalidPattern("pattern is empty".into()));
        }
        Ok(Self { bytes })
    }

    /// Parse space-separated hex bytes, e.g. `"DE AD BE EF"`.
    ///
    /// Wildcards are not supported.
    pub fn parse(text: &str) -> Result<Self> {
        let bytes = text
            .split_whitespace()
            .map(|token| {
                if token.contains('?') {
                    return Err(Error::InvalidPattern(format!(
                        "wildcard {:?} is not supported",
                        token
                    )));
                }
                let digits = token
                    .strip_prefix("0x")
                    .or_else(|| token.strip_prefix("0X"))
                    .unwrap_or(token);
                if digits.len() != 2 {
                    return Err(Error::InvalidPattern(format!(
                        "{:?} is not a single hex byte",
                        token
                    )));
                }
                u8::from_str_radix(digits, 16).map_err(|e| {
                    Error::InvalidPattern(format!("{:?} is not a hex byte: {}", token, e))
                })
            })
            .collect::<Result<Vec<u8>>>()?;
        Self::new(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `false`: a pattern holds at least one byte.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Offset of the first occurrence in `haystack`.
    pub fn find_in(&self, haystack: &[u8]) -> Option<usize> {
        horspool(haystack, &self.bytes)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.bytes.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

/// Horspool search with a 256-entry bad-character table.
fn horspool(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    let m = needle.len();
    if m == 0 || haystack.len() < m {
        return None;
    }
    if m == 1 {
        return memchr::memchr(needle[0], haystack);
    }

    let mut skip = [m; 256];
    for (i, &byte) in needle[..m - 1].iter().enumerate() {
        skip[byte as usize] = m - 1 - i;
    }

    let last = m - 1;
    let mut pos = 0;
    while pos <= haystack.len() - m {
        let window = &haystack[pos..pos + m];
        if window.iter().rev().eq(needle.iter().rev()) {
            return Some(pos);
        }
        pos += skip[window[last] as usize];
    }
    None
}
