//! Fail-soft view over [`ProtectedMemory`] for mod code.
//!
//! Mods poke at addresses that may be stale after a game update. Rather than
//! threading errors through every script, these methods swallow failures and
//! return a fixed sentinel, logging the failure when debug mode is on.
//!
//! Losing the process is the exception. When re-attaching fails the call
//! still returns its sentinel, but the error is logged unconditionally and
//! kept until [`GameMemory::take_fatal`] collects it; the host stops on it.

use std::fmt::Display;
use std::sync::{Mutex, PoisonError};

use tracing::{error, warn};

use super::{Address, Primitive, ProtectedMemory, TextEncoding, Value, ValueKind};
use crate::error::{Error, Result};
use crate::process::Platform;

pub struct GameMemory<'a, P: Platform> {
    memory: &'a ProtectedMemory<P>,
    debug: bool,
    fatal: Mutex<Option<Error>>,
}

impl<'a, P: Platform> GameMemory<'a, P> {
    pub fn new(memory: &'a ProtectedMemory<P>, debug: bool) -> Self {
        Self {
            memory,
            debug,
            fatal: Mutex::new(None),
        }
    }

    /// The underlying rich accessor.
    pub fn inner(&self) -> &'a ProtectedMemory<P> {
        self.memory
    }

    /// First unrecoverable error seen since the last call, if any.
    pub fn take_fatal(&self) -> Option<Error> {
        self.fatal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn soften<T>(&self, result: Result<T>, sentinel: T, op: &str, params: impl Display) -> T {
        match result {
            Ok(value) => value,
            Err(e) if e.is_unrecoverable() => {
                error!("{}({}) lost the target process: {}", op, params, e);
                let mut fatal = self.fatal.lock().unwrap_or_else(PoisonError::into_inner);
                if fatal.is_none() {
                    *fatal = Some(e);
                }
                sentinel
            }
            Err(e) => {
                if self.debug {
                    warn!("{}({}) failed: {}", op, params, e);
                }
                sentinel
            }
        }
    }

    /// Returns `[0]` on failure.
    pub fn read_bytes(&self, address: impl Into<Address>, size: usize) -> Vec<u8> {
        let address = address.into();
        self.soften(
            self.memory.read_bytes(address, size),
            vec![0],
            "read_bytes",
            format_args!("{}, {}", address, size),
        )
    }

    pub fn write_bytes(&self, address: impl Into<Address>, bytes: &[u8]) -> bool {
        let address = address.into();
        self.soften(
            self.memory.write_bytes(address, bytes).map(|()| true),
            false,
            "write_bytes",
            format_args!("{}, {} bytes", address, bytes.len()),
        )
    }

    /// Returns `T::default()` on failure.
    pub fn read<T: Primitive>(&self, address: impl Into<Address>) -> T {
        let address = address.into();
        self.soften(
            self.memory.read::<T>(address),
            T::default(),
            "read",
            format_args!("{}, {}", address, T::KIND),
        )
    }

    pub fn write<T: Primitive>(&self, address: impl Into<Address>, value: T) -> bool {
        let address = address.into();
        self.soften(
            self.memory.write(address, value).map(|()| true),
            false,
            "write",
            format_args!("{}, {}", address, value.into_value()),
        )
    }

    /// Dynamic-kind read. Returns the kind's zero value on failure.
    pub fn read_value(&self, address: impl Into<Address>, kind: ValueKind) -> Value {
        let address = address.into();
        self.soften(
            self.memory.read_value(address, kind),
            kind.zero(),
            "read_value",
            format_args!("{}, {}", address, kind),
        )
    }

    pub fn write_value(&self, address: impl Into<Address>, value: &Value) -> bool {
        let address = address.into();
        self.soften(
            self.memory.write_value(address, value).map(|()| true),
            false,
            "write_value",
            format_args!("{}, {}", address, value),
        )
    }

    /// Returns an empty string on failure.
    pub fn read_string(
        &self,
        encoding: TextEncoding,
        address: impl Into<Address>,
        length: usize,
    ) -> String {
        let address = address.into();
        self.soften(
            self.memory.read_string(encoding, address, length),
            String::new(),
            "read_string",
            format_args!("{}, {}, {}", encoding, address, length),
        )
    }

    pub fn write_string(
        &self,
        encoding: TextEncoding,
        address: impl Into<Address>,
        text: &str,
    ) -> bool {
        let address = address.into();
        self.soften(
            self.memory
                .write_string(encoding, address, text)
                .map(|()| true),
            false,
            "write_string",
            format_args!("{}, {}, {:?}", encoding, address, text),
        )
    }

    pub fn clear(&self, address: impl Into<Address>, length: usize) -> bool {
        let address = address.into();
        self.soften(
            self.memory.clear(address, length).map(|()| true),
            false,
            "clear",
            format_args!("{}, {}", address, length),
        )
    }

    pub fn read_ascii(&self, address: impl Into<Address>, length: usize) -> String {
        self.read_string(TextEncoding::Ascii, address, length)
    }

    pub fn write_ascii(&self, address: impl Into<Address>, text: &str) -> bool {
        self.write_string(TextEncoding::Ascii, address, text)
    }

    pub fn read_unicode(&self, address: impl Into<Address>, length: usize) -> String {
        self.read_string(TextEncoding::Utf16, address, length)
    }

    pub fn write_unicode(&self, address: impl Into<Address>, text: &str) -> bool {
        self.write_string(TextEncoding::Utf16, address, text)
    }
}

macro_rules! typed_accessors {
    ($($ty:ty => $read:ident, $write:ident);* $(;)?) => {
        impl<P: Platform> GameMemory<'_, P> {
            $(
                pub fn $read(&self, address: impl Into<Address>) -> $ty {
                    self.read::<$ty>(address)
                }

                pub fn $write(&self, address: impl Into<Address>, value: $ty) -> bool {
                    self.write(address, value)
                }
            )*
        }
    };
}

typed_accessors! {
    bool => read_bool, write_bool;
    u8 => read_u8, write_u8;
    char => read_char, write_char;
    i16 => read_i16, write_i16;
    u16 => read_u16, write_u16;
    i32 => read_i32, write_i32;
    u32 => read_u32, write_u32;
    i64 => read_i64, write_i64;
    u64 => read_u64, write_u64;
    f32 => read_f32, write_f32;
    f64 => read_f64, write_f64;
}
