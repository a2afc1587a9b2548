//! Target process discovery and the OS seam.
//!
//! Everything that talks to the operating system goes through two traits:
//! [`ProcessProvider`] (enumerate, open and close processes) and
//! [`VirtualMemory`] (page protection, raw transfers and region queries).
//! [`SystemProvider`] implements both for the current platform.

pub mod region;

#[cfg(target_os = "windows")]
mod win32;
#[cfg(target_os = "windows")]
pub use win32::SystemProvider;

#[cfg(not(target_os = "windows"))]
mod unsupported;
#[cfg(not(target_os = "windows"))]
pub use unsupported::SystemProvider;

#[cfg(test)]
pub mod mock;

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::error::{Error, Result};
pub use region::{MemoryRegion, PageProtection, RegionState};

/// Opaque OS handle value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RawHandle(pub usize);

impl RawHandle {
    pub const NULL: Self = Self(0);

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

/// One entry of the OS process list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
}

/// Process enumeration and handle lifetime.
pub trait ProcessProvider {
    fn list_processes(&self) -> Result<Vec<ProcessInfo>>;

    /// Open `pid` with VM read/write/operation and query rights.
    ///
    /// An OS refusal is reported as [`Error::ProcessOpenFailed`].
    fn open_process(&self, pid: u32) -> Result<RawHandle>;

    fn close_process(&self, handle: RawHandle);

    /// Load address of the main executable module of `pid`.
    fn main_module_base(&self, pid: u32) -> Result<u64>;
}

/// Raw access to another process's address space.
pub trait VirtualMemory {
    /// Change protection of `[address, address + size)`, returning the previous value.
    fn protect(
        &self,
        handle: RawHandle,
        address: u64,
        size: usize,
        protection: PageProtection,
    ) -> Result<PageProtection>;

    /// Fill `buf` from `address`. A partial copy is an error.
    fn read(&self, handle: RawHandle, address: u64, buf: &mut [u8]) -> Result<()>;

    fn write(&self, handle: RawHandle, address: u64, bytes: &[u8]) -> Result<()>;

    /// Describe the region containing `address`, or `None` past the end of
    /// the address space.
    fn query_region(&self, handle: RawHandle, address: u64) -> Option<MemoryRegion>;
}

/// Both halves of the OS seam.
pub trait Platform: ProcessProvider + VirtualMemory {}

impl<T: ProcessProvider + VirtualMemory + ?Sized> Platform for T {}

impl<T: ProcessProvider + ?Sized> ProcessProvider for &T {
    fn list_processes(&self) -> Result<Vec<ProcessInfo>> {
        (**self).list_processes()
    }

    fn open_process(&self, pid: u32) -> Result<RawHandle> {
        (**self).open_process(pid)
    }

    fn close_process(&self, handle: RawHandle) {
        (**self).close_process(handle)
    }

    fn main_module_base(&self, pid: u32) -> Result<u64> {
        (**self).main_module_base(pid)
    }
}

impl<T: VirtualMemory + ?Sized> VirtualMemory for &T {
    fn protect(
        &self,
        handle: RawHandle,
        address: u64,
        size: usize,
        protection: PageProtection,
    ) -> Result<PageProtection> {
        (**self).protect(handle, address, size, protection)
    }

    fn read(&self, handle: RawHandle, address: u64, buf: &mut [u8]) -> Result<()> {
        (**self).read(handle, address, buf)
    }

    fn write(&self, handle: RawHandle, address: u64, bytes: &[u8]) -> Result<()> {
        (**self).write(handle, address, bytes)
    }

    fn query_region(&self, handle: RawHandle, address: u64) -> Option<MemoryRegion> {
        (**self).query_region(handle, address)
    }
}

#[derive(Debug, Clone, Copy)]
struct HandleState {
    pid: u32,
    handle: RawHandle,
}

/// Handle to a target process identified by executable name.
///
/// The OS handle is re-acquired lazily when it has been invalidated, and
/// closed when the `ProcessHandle` is dropped.
pub struct ProcessHandle<P: ProcessProvider> {
    provider: P,
    name: String,
    state: Mutex<HandleState>,
}

impl<P: ProcessProvider> ProcessHandle<P> {
    /// Find `name` in the process list and open it.
    ///
    /// Matching is case-insensitive, and a name without an extension also
    /// matches `<name>.exe`. Fails with [`Error::ProcessNotFound`] when no
    /// process matches or the OS hands back a null handle, and with
    /// [`Error::ProcessOpenFailed`] when the OS refuses access.
    pub fn attach(provider: P, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let state = acquire(&provider, &name)?;
        info!("Attached to {} (pid: {})", name, state.pid);
        Ok(Self {
            provider,
            name,
            state: Mutex::new(state),
        })
    }

    /// Current handle, re-running acquisition if it was invalidated.
    pub fn ensure_attached(&self) -> Result<RawHandle> {
        let mut state = self.lock_state();
        if state.handle.is_null() {
            debug!("Handle for {} is stale, re-attaching", self.name);
            *state = acquire(&self.provider, &self.name)?;
        }
        Ok(state.handle)
    }

    /// Main module load address. Queried from the OS on every call.
    pub fn base_address(&self) -> Result<u64> {
        self.ensure_attached()?;
        let pid = self.pid();
        self.provider.main_module_base(pid)
    }

    /// Close the current handle; the next operation re-attaches.
    pub fn invalidate(&self) {
        let mut state = self.lock_state();
        if !state.handle.is_null() {
            self.provider.close_process(state.handle);
            state.handle = RawHandle::NULL;
        }
    }

    pub fn pid(&self) -> u32 {
        self.lock_state().pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw_handle(&self) -> RawHandle {
        self.lock_state().handle
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn lock_state(&self) -> MutexGuard<'_, HandleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P: ProcessProvider> Drop for ProcessHandle<P> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if !state.handle.is_null() {
            debug!("Closing handle for {} (pid: {})", self.name, state.pid);
            self.provider.close_process(state.handle);
            state.handle = RawHandle::NULL;
        }
    }
}

fn acquire<P: ProcessProvider>(provider: &P, name: &str) -> Result<HandleState> {
    let target = provider
        .list_processes()?
        .into_iter()
        .find(|p| name_matches(&p.name, name))
        .ok_or_else(|| Error::ProcessNotFound(name.to_string()))?;

    let handle = provider.open_process(target.pid)?;
    if handle.is_null() {
        return Err(Error::ProcessNotFound(format!(
            "{} (pid {}) returned a null handle",
            name, target.pid
        )));
    }

    debug!("Opened {} (pid: {}, handle: {:#x})", target.name, target.pid, handle.0);
    Ok(HandleState {
        pid: target.pid,
        handle,
    })
}

fn name_matches(candidate: &str, query: &str) -> bool {
    if candidate.eq_ignore_ascii_case(query) {
        return true;
    }
    let (candidate, query) = (candidate.as_bytes(), query.as_bytes());
    !query.contains(&b'.')
        && candidate.len() == query.len() + 4
        && candidate[..query.len()].eq_ignore_ascii_case(query)
        && candidate[query.len()..].eq_ignore_ascii_case(b".exe")
}
