//! Recording in-memory backend for tests.

use std::sync::{Mutex, MutexGuard};

use super::{
    MemoryRegion, PageProtection, ProcessInfo, ProcessProvider, RawHandle, RegionState,
    VirtualMemory,
};
use crate::error::{Error, Result};

/// What `open_process` hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenBehavior {
    Succeed,
    Null,
    Refuse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtectCall {
    pub address: u64,
    pub size: usize,
    pub protection: PageProtection,
}

#[derive(Debug, Clone)]
struct MockRegion {
    base: u64,
    data: Vec<u8>,
    protection: PageProtection,
    state: RegionState,
}

impl MockRegion {
    fn end(&self) -> u64 {
        self.base + self.data.len() as u64
    }

    fn span(&self, address: u64, len: usize) -> Option<std::ops::Range<usize>> {
        let end = address.checked_add(len as u64)?;
        if address < self.base || end > self.end() {
            return None;
        }
        let start = (address - self.base) as usize;
        Some(start..start + len)
    }
}

#[derive(Debug)]
struct MockState {
    processes: Vec<ProcessInfo>,
    open_behavior: OpenBehavior,
    next_handle: usize,
    open_count: usize,
    closed: Vec<RawHandle>,
    base_addresses: Vec<u64>,
    base_queries: usize,
    regions: Vec<MockRegion>,
    protect_calls: Vec<ProtectCall>,
    fail_protect: bool,
    fail_transfers: bool,
    reads: usize,
    writes: usize,
}

/// Fake process table plus a sparse address space.
///
/// Addresses between configured regions are reported as free gaps; queries
/// past the last region return `None`.
#[derive(Debug)]
pub struct MockProcess {
    state: Mutex<MockState>,
}

pub struct MockProcessBuilder {
    state: MockState,
}

impl MockProcessBuilder {
    pub fn process(mut self, pid: u32, name: &str) -> Self {
        self.state.processes.push(ProcessInfo {
            pid,
            name: name.to_string(),
        });
        self
    }

    pub fn open_behavior(mut self, behavior: OpenBehavior) -> Self {
        self.state.open_behavior = behavior;
        self
    }

    /// Successive main-module base answers; the last one repeats.
    pub fn base_addresses(mut self, bases: &[u64]) -> Self {
        self.state.base_addresses = bases.to_vec();
        self
    }

    pub fn base_address(self, base: u64) -> Self {
        self.base_addresses(&[base])
    }

    /// Committed read-write region.
    pub fn region(self, base: u64, data: Vec<u8>) -> Self {
        self.region_with(base, data, PageProtection::READWRITE, RegionState::COMMIT)
    }

    pub fn region_with(
        mut self,
        base: u64,
        data: Vec<u8>,
        protection: PageProtection,
        state: RegionState,
    ) -> Self {
        self.state.regions.push(MockRegion {
            base,
            data,
            protection,
            state,
        });
        self.state.regions.sort_by_key(|r| r.base);
        self
    }

    pub fn fail_protect(mut self) -> Self {
        self.state.fail_protect = true;
        self
    }

    pub fn fail_transfers(mut self) -> Self {
        self.state.fail_transfers = true;
        self
    }

    pub fn build(self) -> MockProcess {
        MockProcess {
            state: Mutex::new(self.state),
        }
    }
}

impl MockProcess {
    pub fn builder() -> MockProcessBuilder {
        MockProcessBuilder {
            state: MockState {
                processes: Vec::new(),
                open_behavior: OpenBehavior::Succeed,
                next_handle: 0x100,
                open_count: 0,
                closed: Vec::new(),
                base_addresses: vec![0],
                base_queries: 0,
                regions: Vec::new(),
                protect_calls: Vec::new(),
                fail_protect: false,
                fail_transfers: false,
                reads: 0,
                writes: 0,
            },
        }
    }

    /// Target with one process and one region starting at its module base.
    pub fn with_module(name: &str, base: u64, data: Vec<u8>) -> Self {
        Self::builder()
            .process(1234, name)
            .base_address(base)
            .region(base, data)
            .build()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn set_fail_transfers(&self, fail: bool) {
        self.lock().fail_transfers = fail;
    }

    /// Drop every region, as if the process had exited.
    pub fn unmap_all(&self) {
        self.lock().regions.clear();
    }

    /// Empty the process table so the next attach finds nothing.
    pub fn remove_processes(&self) {
        self.lock().processes.clear();
    }

    pub fn protect_calls(&self) -> Vec<ProtectCall> {
        self.lock().protect_calls.clone()
    }

    pub fn protection_at(&self, address: u64) -> Option<PageProtection> {
        self.lock()
            .regions
            .iter()
            .find(|r| r.span(address, 1).is_some())
            .map(|r| r.protection)
    }

    pub fn bytes_at(&self, address: u64, len: usize) -> Option<Vec<u8>> {
        let state = self.lock();
        state
            .regions
            .iter()
            .find_map(|r| r.span(address, len).map(|span| r.data[span].to_vec()))
    }

    pub fn closed_handles(&self) -> Vec<RawHandle> {
        self.lock().closed.clone()
    }

    pub fn open_count(&self) -> usize {
        self.lock().open_count
    }

    pub fn base_queries(&self) -> usize {
        self.lock().base_queries
    }

    pub fn read_calls(&self) -> usize {
        self.lock().reads
    }

    pub fn write_calls(&self) -> usize {
        self.lock().writes
    }
}

impl ProcessProvider for MockProcess {
    fn list_processes(&self) -> Result<Vec<ProcessInfo>> {
        Ok(self.lock().processes.clone())
    }

    fn open_process(&self, pid: u32) -> Result<RawHandle> {
        let mut state = self.lock();
        state.open_count += 1;
        match state.open_behavior {
            OpenBehavior::Succeed => {
                let handle = RawHandle(state.next_handle);
                state.next_handle += 4;
                Ok(handle)
            }
            OpenBehavior::Null => Ok(RawHandle::NULL),
            OpenBehavior::Refuse => Err(Error::ProcessOpenFailed(format!(
                "access denied for pid {}",
                pid
            ))),
        }
    }

    fn close_process(&self, handle: RawHandle) {
        self.lock().closed.push(handle);
    }

    fn main_module_base(&self, _pid: u32) -> Result<u64> {
        let mut state = self.lock();
        let index = state.base_queries.min(state.base_addresses.len() - 1);
        state.base_queries += 1;
        Ok(state.base_addresses[index])
    }
}

impl VirtualMemory for MockProcess {
    fn protect(
        &self,
        _handle: RawHandle,
        address: u64,
        size: usize,
        protection: PageProtection,
    ) -> Result<PageProtection> {
        let mut state = self.lock();
        if state.fail_protect {
            return Err(Error::ProtectionFailed {
                address,
                message: "mock protect failure".into(),
            });
        }
        state.protect_calls.push(ProtectCall {
            address,
            size,
            protection,
        });
        let region = state
            .regions
            .iter_mut()
            .find(|r| r.span(address, 1).is_some())
            .ok_or_else(|| Error::ProtectionFailed {
                address,
                message: "unmapped".into(),
            })?;
        Ok(std::mem::replace(&mut region.protection, protection))
    }

    fn read(&self, _handle: RawHandle, address: u64, buf: &mut [u8]) -> Result<()> {
        let mut state = self.lock();
        state.reads += 1;
        if state.fail_transfers {
            return Err(Error::MemoryReadFailed {
                address,
                message: "mock read failure".into(),
            });
        }
        let (region, span) = state
            .regions
            .iter()
            .find_map(|r| r.span(address, buf.len()).map(|span| (r, span)))
            .ok_or_else(|| Error::MemoryReadFailed {
                address,
                message: "unmapped".into(),
            })?;
        buf.copy_from_slice(&region.data[span]);
        Ok(())
    }

    fn write(&self, _handle: RawHandle, address: u64, bytes: &[u8]) -> Result<()> {
        let mut state = self.lock();
        state.writes += 1;
        if state.fail_transfers {
            return Err(Error::MemoryWriteFailed {
                address,
                message: "mock write failure".into(),
            });
        }
        let (region, span) = state
            .regions
            .iter_mut()
            .find_map(|r| r.span(address, bytes.len()).map(|span| (r, span)))
            .ok_or_else(|| Error::MemoryWriteFailed {
                address,
                message: "unmapped".into(),
            })?;
        region.data[span].copy_from_slice(bytes);
        Ok(())
    }

    fn query_region(&self, _handle: RawHandle, address: u64) -> Option<MemoryRegion> {
        let state = self.lock();
        let next = state.regions.iter().find(|r| r.end() > address)?;
        if address < next.base {
            return Some(MemoryRegion {
                base: address,
                size: (next.base - address) as usize,
                protection: PageProtection::NOACCESS,
                state: RegionState::FREE,
            });
        }
        Some(MemoryRegion {
            base: next.base,
            size: next.data.len(),
            protection: next.protection,
            state: next.state,
        })
    }
}
