//! Prelude module for convenient imports
//!
//! ```ignore
//! use nfsmod_core::prelude::*;
//! ```
//!
//! Brings the types a mod needs into scope:
//!
//! - Memory access: `GameMemory`, `ProtectedMemory`, `Address`, `TextEncoding`
//! - Typed values: `Primitive`, `Value`, `ValueKind`
//! - Mod lifecycle: `Mod`, `ModHost`, `ShutdownSignal`
//! - Error handling: `Error`, `Result`

pub use crate::error::{Error, Result};

pub use crate::memory::{
    Address, GameMemory, Primitive, ProtectedMemory, TextEncoding, Value, ValueKind,
};

pub use crate::host::{Mod, ModHost, ShutdownSignal};

pub use crate::process::{Platform, SystemProvider};

pub use crate::scan::{Pattern, PatternScanner};
