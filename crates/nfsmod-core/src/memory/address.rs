use std::fmt;

use crate::error::{Error, Result};

/// A location in the target's address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
    Absolute(u64),
    /// Offset from the main module's load address.
    Relative(u64),
}

impl Address {
    /// Resolve against `base`. Only consulted for relative addresses.
    pub fn resolve_with(self, base: impl FnOnce() -> Result<u64>) -> Result<u64> {
        match self {
            Address::Absolute(address) => Ok(address),
            Address::Relative(offset) => {
                let base = base()?;
                base.checked_add(offset)
                    .ok_or(Error::AddressOverflow { base, offset })
            }
        }
    }
}

impl From<u64> for Address {
    fn from(address: u64) -> Self {
        Address::Absolute(address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Absolute(a) => write!(f, "{:#x}", a),
            Address::Relative(o) => write!(f, "base+{:#x}", o),
        }
    }
}
