//! Byte-exact access to the target with scoped page-protection elevation.

use std::sync::{Mutex, PoisonError};

use tracing::{debug, trace};

use super::{Address, Primitive, TextEncoding, Value, ValueKind};
use crate::error::{Error, Result};
use crate::process::{PageProtection, Platform, ProcessHandle, RawHandle, VirtualMemory};

/// Restores the previous protection of a range when dropped.
///
/// If elevation failed there is nothing to restore and the guard is inert.
struct ProtectionGuard<'a, V: VirtualMemory> {
    memory: &'a V,
    handle: RawHandle,
    address: u64,
    size: usize,
    previous: Option<PageProtection>,
}

impl<'a, V: VirtualMemory> ProtectionGuard<'a, V> {
    fn elevate(memory: &'a V, handle: RawHandle, address: u64, size: usize) -> Self {
        let previous = match memory.protect(handle, address, size, PageProtection::READWRITE) {
            Ok(old) => Some(old),
            Err(e) => {
                debug!("Protection elevation failed, attempting transfer anyway: {}", e);
                None
            }
        };
        Self {
            memory,
            handle,
            address,
            size,
            previous,
        }
    }
}

impl<V: VirtualMemory> Drop for ProtectionGuard<'_, V> {
    fn drop(&mut self) {
        let Some(previous) = self.previous else {
            return;
        };
        if let Err(e) = self
            .memory
            .protect(self.handle, self.address, self.size, previous)
        {
            debug!(
                "Failed to restore protection {} at {:#x}: {}",
                previous, self.address, e
            );
        }
    }
}

/// Reads and writes the target's memory regardless of page protection.
///
/// Every transfer elevates the touched range to read-write, moves the bytes
/// and restores the previous protection, serialised by an internal lock.
/// Relative addresses are resolved against a freshly queried module base on
/// every call.
pub struct ProtectedMemory<P: Platform> {
    process: ProcessHandle<P>,
    transfer_lock: Mutex<()>,
}

impl<P: Platform> ProtectedMemory<P> {
    pub fn new(process: ProcessHandle<P>) -> Self {
        Self {
            process,
            transfer_lock: Mutex::new(()),
        }
    }

    /// Attach to `name` and wrap the handle.
    pub fn attach(provider: P, name: impl Into<String>) -> Result<Self> {
        ProcessHandle::attach(provider, name).map(Self::new)
    }

    pub fn process(&self) -> &ProcessHandle<P> {
        &self.process
    }

    pub fn base_address(&self) -> Result<u64> {
        self.process.base_address()
    }

    pub fn resolve(&self, address: Address) -> Result<u64> {
        address.resolve_with(|| self.process.base_address())
    }

    pub fn read_bytes(&self, address: impl Into<Address>, size: usize) -> Result<Vec<u8>> {
        if size == 0 {
            return Ok(Vec::new());
        }
        let handle = self.process.ensure_attached()?;
        let address = self.resolve(address.into())?;
        let provider = self.process.provider();

        let _lock = self
            .transfer_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let _guard = ProtectionGuard::elevate(provider, handle, address, size);

        let mut buf = vec![0u8; size];
        provider.read(handle, address, &mut buf)?;
        trace!("Read {} bytes at {:#x}", size, address);
        Ok(buf)
    }

    pub fn write_bytes(&self, address: impl Into<Address>, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let handle = self.process.ensure_attached()?;
        let address = self.resolve(address.into())?;
        let provider = self.process.provider();

        let _lock = self
            .transfer_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let _guard = ProtectionGuard::elevate(provider, handle, address, bytes.len());

        provider.write(handle, address, bytes)?;
        trace!("Wrote {} bytes at {:#x}", bytes.len(), address);
        Ok(())
    }

    pub fn read<T: Primitive>(&self, address: impl Into<Address>) -> Result<T> {
        let value = self.read_value(address, T::KIND)?;
        T::from_value(value).ok_or_else(|| {
            Error::InvalidValue(format!("decoded {} where {} was expected", value.kind(), T::KIND))
        })
    }

    pub fn write<T: Primitive>(&self, address: impl Into<Address>, value: T) -> Result<()> {
        self.write_value(address, &value.into_value())
    }

    pub fn read_value(&self, address: impl Into<Address>, kind: ValueKind) -> Result<Value> {
        let bytes = self.read_bytes(address, kind.size())?;
        Value::decode(kind, &bytes)
    }

    pub fn write_value(&self, address: impl Into<Address>, value: &Value) -> Result<()> {
        self.write_bytes(address, &value.encode())
    }

    /// Read `length` bytes and decode them, cutting at the first NUL.
    pub fn read_string(
        &self,
        encoding: TextEncoding,
        address: impl Into<Address>,
        length: usize,
    ) -> Result<String> {
        let bytes = self.read_bytes(address, length)?;
        encoding.decode(&bytes)
    }

    /// Write `text` followed by the encoding's NUL terminator.
    pub fn write_string(
        &self,
        encoding: TextEncoding,
        address: impl Into<Address>,
        text: &str,
    ) -> Result<()> {
        let bytes = encoding.encode_terminated(text)?;
        self.write_bytes(address, &bytes)
    }

    /// Zero-fill `length` bytes, typically before writing a shorter string
    /// into a fixed-size slot.
    pub fn clear(&self, address: impl Into<Address>, length: usize) -> Result<()> {
        self.write_bytes(address, &vec![0u8; length])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::mock::MockProcess;
    use crate::process::RegionState;

    const BASE: u64 = 0x1000;

    fn target(data: Vec<u8>) -> MockProcess {
        MockProcess::with_module("speed.exe", BASE, data)
    }

    fn memory(mock: &MockProcess) -> ProtectedMemory<&MockProcess> {
        ProtectedMemory::attach(mock, "speed.exe").unwrap()
    }

    #[test]
    fn test_read_restores_protection() {
        let mock = MockProcess::builder()
            .process(1, "speed.exe")
            .region_with(
                BASE,
                vec![7; 0x100],
                PageProtection::READONLY,
                RegionState::COMMIT,
            )
            .build();
        let mem = memory(&mock);

        assert_eq!(mem.read_bytes(BASE + 4, 2).unwrap(), vec![7, 7]);

        let calls = mock.protect_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].protection, PageProtection::READWRITE);
        assert_eq!(calls[0].address, BASE + 4);
        assert_eq!(calls[0].size, 2);
        assert_eq!(calls[1].protection, PageProtection::READONLY);
        assert_eq!(mock.protection_at(BASE), Some(PageProtection::READONLY));
    }

    #[test]
    fn test_failed_read_still_restores_protection() {
        let mock = MockProcess::builder()
            .process(1, "speed.exe")
            .region_with(
                BASE,
                vec![0; 0x100],
                PageProtection::EXECUTE_READ,
                RegionState::COMMIT,
            )
            .fail_transfers()
            .build();
        let mem = memory(&mock);

        assert!(matches!(
            mem.read_bytes(BASE, 4),
            Err(Error::MemoryReadFailed { .. })
        ));
        assert_eq!(mock.protect_calls().len(), 2);
        assert_eq!(mock.protection_at(BASE), Some(PageProtection::EXECUTE_READ));
    }

    #[test]
    fn test_failed_write_still_restores_protection() {
        let mock = target(vec![0; 0x100]);
        mock.set_fail_transfers(true);
        let mem = memory(&mock);

        assert!(matches!(
            mem.write_bytes(BASE, &[1, 2]),
            Err(Error::MemoryWriteFailed { .. })
        ));
        let calls = mock.protect_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].protection, PageProtection::READWRITE);
        assert_eq!(mock.protection_at(BASE), Some(PageProtection::READWRITE));
    }

    #[test]
    fn test_failed_elevation_still_transfers() {
        let mock = MockProcess::builder()
            .process(1, "speed.exe")
            .region(BASE, vec![0xAB; 0x10])
            .fail_protect()
            .build();
        let mem = memory(&mock);

        assert_eq!(mem.read_bytes(BASE, 1).unwrap(), vec![0xAB]);
        assert_eq!(mock.read_calls(), 1);
        assert!(mock.protect_calls().is_empty());
    }

    #[test]
    fn test_zero_size_makes_no_os_calls() {
        let mock = target(vec![0; 0x10]);
        let mem = memory(&mock);

        assert!(mem.read_bytes(Address::Relative(0), 0).unwrap().is_empty());
        mem.write_bytes(Address::Relative(0), &[]).unwrap();

        assert_eq!(mock.read_calls(), 0);
        assert_eq!(mock.write_calls(), 0);
        assert_eq!(mock.base_queries(), 0);
        assert!(mock.protect_calls().is_empty());
    }

    #[test]
    fn test_typed_round_trip() {
        let mock = target(vec![0; 0x100]);
        let mem = memory(&mock);

        mem.write(Address::Relative(0x10), -42i32).unwrap();
        assert_eq!(mem.read::<i32>(Address::Relative(0x10)).unwrap(), -42);
        assert_eq!(
            mock.bytes_at(BASE + 0x10, 4).unwrap(),
            vec![0xD6, 0xFF, 0xFF, 0xFF]
        );

        mem.write(BASE + 0x20, 1.5f32).unwrap();
        assert_eq!(mem.read::<f32>(BASE + 0x20).unwrap(), 1.5);

        mem.write(BASE + 0x30, true).unwrap();
        assert!(mem.read::<bool>(BASE + 0x30).unwrap());
    }

    #[test]
    fn test_read_value_dynamic_kind() {
        let mock = target(vec![0; 0x100]);
        let mem = memory(&mock);

        mem.write_value(BASE, &Value::U16(0xBEEF)).unwrap();
        assert_eq!(
            mem.read_value(BASE, ValueKind::U16).unwrap(),
            Value::U16(0xBEEF)
        );
    }

    #[test]
    fn test_relative_requeries_base_each_call() {
        let mock = MockProcess::builder()
            .process(1, "speed.exe")
            .base_addresses(&[0x1000, 0x2000])
            .region(0x1000, vec![0x11; 0x100])
            .region(0x2000, vec![0x22; 0x100])
            .build();
        let mem = memory(&mock);

        assert_eq!(mem.read::<u8>(Address::Relative(0x10)).unwrap(), 0x11);
        assert_eq!(mem.read::<u8>(Address::Relative(0x10)).unwrap(), 0x22);
        assert_eq!(mock.base_queries(), 2);
    }

    #[test]
    fn test_write_string_appends_terminator() {
        let mock = target(vec![0xFF; 0x100]);
        let mem = memory(&mock);

        mem.write_string(TextEncoding::Ascii, BASE, "GT").unwrap();
        assert_eq!(mock.bytes_at(BASE, 4).unwrap(), vec![b'G', b'T', 0, 0xFF]);

        mem.write_string(TextEncoding::Utf16, BASE + 0x10, "GT")
            .unwrap();
        assert_eq!(
            mock.bytes_at(BASE + 0x10, 7).unwrap(),
            vec![b'G', 0, b'T', 0, 0, 0, 0xFF]
        );
    }

    #[test]
    fn test_read_string_cuts_at_nul() {
        let mut data = vec![0u8; 0x40];
        data[..9].copy_from_slice(b"Razor\0abc");
        let mock = target(data);
        let mem = memory(&mock);

        assert_eq!(
            mem.read_string(TextEncoding::Ascii, BASE, 16).unwrap(),
            "Razor"
        );
    }

    #[test]
    fn test_clear_zero_fills() {
        let mock = target(vec![0xFF; 0x20]);
        let mem = memory(&mock);

        mem.clear(BASE + 2, 4).unwrap();
        assert_eq!(
            mock.bytes_at(BASE, 8).unwrap(),
            vec![0xFF, 0xFF, 0, 0, 0, 0, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_reattaches_after_invalidate() {
        let mock = target(vec![5; 0x10]);
        let mem = memory(&mock);

        mem.process().invalidate();
        assert_eq!(mem.read::<u8>(BASE).unwrap(), 5);
        assert_eq!(mock.open_count(), 2);
    }

    #[test]
    fn test_concurrent_writes_leave_protection_intact() {
        fn assert_sync<T: Sync>() {}
        assert_sync::<ProtectedMemory<MockProcess>>();

        let mock = MockProcess::builder()
            .process(1, "speed.exe")
            .region_with(
                BASE,
                vec![0; 0x100],
                PageProtection::READONLY,
                RegionState::COMMIT,
            )
            .build();
        let mem = memory(&mock);

        std::thread::scope(|s| {
            for i in 0..4u64 {
                let mem = &mem;
                s.spawn(move || {
                    for _ in 0..25 {
                        mem.write(BASE + i * 4, i as u32).unwrap();
                    }
                });
            }
        });

        assert_eq!(mock.protection_at(BASE), Some(PageProtection::READONLY));
        for i in 0..4u64 {
            assert_eq!(mem.read::<u32>(BASE + i * 4).unwrap(), i as u32);
        }
    }
}
