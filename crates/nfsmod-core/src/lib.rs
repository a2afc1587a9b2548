//! # nfsmod-core
//!
//! Core library for the nfsmod scripting host.
//!
//! This crate provides:
//! - Process discovery and an OS seam for remote memory access
//! - Protection-aware typed and string reads/writes ([`ProtectedMemory`])
//! - A fail-soft view for mod code ([`GameMemory`])
//! - Byte pattern scanning over committed memory
//! - A fixed-interval mod host

pub mod config;
pub mod error;
pub mod host;
pub mod memory;
pub mod prelude;
pub mod process;
pub mod scan;

pub use config::{Config, LogConfig};
pub use error::{Error, Result};
pub use host::{HostSummary, Mod, ModHost, ShutdownSignal, StopReason};
pub use memory::{
    Address, GameMemory, Primitive, ProtectedMemory, TextEncoding, Value, ValueKind,
};
pub use process::{
    MemoryRegion, PageProtection, Platform, ProcessHandle, ProcessInfo, ProcessProvider, RawHandle,
    RegionState, SystemProvider, VirtualMemory,
};
pub use scan::{Pattern, PatternScanner, match_pattern};
