//! Virtual memory region descriptors.
//!
//! Flag values mirror the Win32 `PAGE_*` and `MEM_*` constants so the platform
//! layer can convert without a lookup table.

use std::fmt;

use serde::Serialize;

/// Page protection bit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct PageProtection(pub u32);

impl PageProtection {
    pub const NOACCESS: Self = Self(0x01);
    pub const READONLY: Self = Self(0x02);
    pub const READWRITE: Self = Self(0x04);
    pub const WRITECOPY: Self = Self(0x08);
    pub const EXECUTE: Self = Self(0x10);
    pub const EXECUTE_READ: Self = Self(0x20);
    pub const EXECUTE_READWRITE: Self = Self(0x40);
    pub const EXECUTE_WRITECOPY: Self = Self(0x80);
    pub const GUARD: Self = Self(0x100);
    pub const NOCACHE: Self = Self(0x200);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_guarded(self) -> bool {
        self.contains(Self::GUARD)
    }

    /// Protection without the GUARD/NOCACHE modifiers.
    pub fn base(self) -> Self {
        Self(self.0 & 0xFF)
    }
}

impl std::ops::BitOr for PageProtection {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for PageProtection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.base() {
            Self::NOACCESS => "---",
            Self::READONLY => "r--",
            Self::READWRITE => "rw-",
            Self::WRITECOPY => "rc-",
            Self::EXECUTE => "--x",
            Self::EXECUTE_READ => "r-x",
            Self::EXECUTE_READWRITE => "rwx",
            Self::EXECUTE_WRITECOPY => "rcx",
            _ => "???",
        };
        f.write_str(name)?;
        if self.is_guarded() {
            f.write_str("+guard")?;
        }
        Ok(())
    }
}

/// Allocation state of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RegionState(pub u32);

impl RegionState {
    pub const COMMIT: Self = Self(0x1000);
    pub const RESERVE: Self = Self(0x2000);
    pub const FREE: Self = Self(0x10000);

    pub fn is_committed(self) -> bool {
        self.0 & Self::COMMIT.0 != 0
    }
}

impl fmt::Display for RegionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::COMMIT => f.write_str("commit"),
            Self::RESERVE => f.write_str("reserve"),
            Self::FREE => f.write_str("free"),
            other => write!(f, "{:#x}", other.0),
        }
    }
}

/// One span of the target's virtual address space, as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryRegion {
    pub base: u64,
    pub size: usize,
    pub protection: PageProtection,
    pub state: RegionState,
}

impl MemoryRegion {
    pub fn end(&self) -> u64 {
        self.base.saturating_add(self.size as u64)
    }

    /// Committed and not guarded.
    pub fn is_scannable(&self) -> bool {
        self.state.is_committed() && !self.protection.is_guarded()
    }
}
