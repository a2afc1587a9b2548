//! In-process provider for CLI tests.

use std::sync::atomic::{AtomicBool, Ordering};

use nfsmod_core::{
    Error, MemoryRegion, PageProtection, ProcessInfo, ProcessProvider, RawHandle, Result,
    VirtualMemory,
};

/// One `speed.exe` (pid 42) with 16 zeroed bytes at its base `0x400000`.
#[derive(Default)]
pub struct FakeProvider {
    pub refuse: bool,
    gone: AtomicBool,
}

pub const BASE: u64 = 0x40_0000;

impl FakeProvider {
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    /// Make the process disappear from the process list.
    pub fn vanish(&self) {
        self.gone.store(true, Ordering::SeqCst);
    }
}

impl ProcessProvider for FakeProvider {
    fn list_processes(&self) -> Result<Vec<ProcessInfo>> {
        if self.gone.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        Ok(vec![ProcessInfo {
            pid: 42,
            name: "speed.exe".to_string(),
        }])
    }

    fn open_process(&self, _pid: u32) -> Result<RawHandle> {
        if self.refuse {
            Err(Error::ProcessOpenFailed("access denied".to_string()))
        } else {
            Ok(RawHandle(0x10))
        }
    }

    fn close_process(&self, _handle: RawHandle) {}

    fn main_module_base(&self, _pid: u32) -> Result<u64> {
        Ok(BASE)
    }
}

impl VirtualMemory for FakeProvider {
    fn protect(
        &self,
        _handle: RawHandle,
        _address: u64,
        _size: usize,
        protection: PageProtection,
    ) -> Result<PageProtection> {
        Ok(protection)
    }

    fn read(&self, _handle: RawHandle, address: u64, buf: &mut [u8]) -> Result<()> {
        if address < BASE || address + buf.len() as u64 > BASE + 0x10 {
            return Err(Error::MemoryReadFailed {
                address,
                message: "unmapped".to_string(),
            });
        }
        buf.fill(0);
        Ok(())
    }

    fn write(&self, _handle: RawHandle, _address: u64, _bytes: &[u8]) -> Result<()> {
        Ok(())
    }

    fn query_region(&self, _handle: RawHandle, _address: u64) -> Option<MemoryRegion> {
        None
    }
}
