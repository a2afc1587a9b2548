use thiserror::Error;

use crate::memory::ValueKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Failed to open process: {0}")]
    ProcessOpenFailed(String),

    #[error("Failed to query main module: {0}")]
    ModuleQueryFailed(String),

    #[error("Failed to read process memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("Failed to write process memory at address {address:#x}: {message}")]
    MemoryWriteFailed { address: u64, message: String },

    #[error("Failed to change page protection at address {address:#x}: {message}")]
    ProtectionFailed { address: u64, message: String },

    #[error("Buffer too short for {kind}: expected {expected} bytes, got {actual}")]
    BufferTooShort {
        kind: ValueKind,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Address overflow: base {base:#x} + offset {offset:#x}")]
    AddressOverflow { base: u64, offset: u64 },

    #[error("Process memory access is not supported on this platform")]
    UnsupportedPlatform,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Attach failures leave nothing to operate on; hosts terminate on these.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, Error::ProcessNotFound(_) | Error::ProcessOpenFailed(_))
    }

    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}
