//! Fallback backend for platforms without remote process memory access.

use super::{MemoryRegion, PageProtection, ProcessInfo, ProcessProvider, RawHandle, VirtualMemory};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProvider;

impl SystemProvider {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessProvider for SystemProvider {
    fn list_processes(&self) -> Result<Vec<ProcessInfo>> {
        Err(Error::UnsupportedPlatform)
    }

    fn open_process(&self, _pid: u32) -> Result<RawHandle> {
        Err(Error::UnsupportedPlatform)
    }

    fn close_process(&self, _handle: RawHandle) {}

    fn main_module_base(&self, _pid: u32) -> Result<u64> {
        Err(Error::UnsupportedPlatform)
    }
}

impl VirtualMemory for SystemProvider {
    fn protect(
        &self,
        _handle: RawHandle,
        _address: u64,
        _size: usize,
        _protection: PageProtection,
    ) -> Result<PageProtection> {
        Err(Error::UnsupportedPlatform)
    }

    fn read(&self, _handle: RawHandle, _address: u64, _buf: &mut [u8]) -> Result<()> {
        Err(Error::UnsupportedPlatform)
    }

    fn write(&self, _handle: RawHandle, _address: u64, _bytes: &[u8]) -> Result<()> {
        Err(Error::UnsupportedPlatform)
    }

    fn query_region(&self, _handle: RawHandle, _address: u64) -> Option<MemoryRegion> {
        None
    }
}
