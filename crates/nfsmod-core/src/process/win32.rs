//! Win32 implementation of the OS seam.

use std::ffi::c_void;
use std::mem::size_of;

use tracing::trace;
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::System::Diagnostics::Debug::{ReadProcessMemory, WriteProcessMemory};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CREATE_TOOLHELP_SNAPSHOT_FLAGS, CreateToolhelp32Snapshot, MODULEENTRY32W, Module32FirstW,
    PROCESSENTRY32W, Process32FirstW, Process32NextW, TH32CS_SNAPMODULE, TH32CS_SNAPMODULE32,
    TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Memory::{
    MEMORY_BASIC_INFORMATION, PAGE_PROTECTION_FLAGS, VirtualProtectEx, VirtualQueryEx,
};
use windows::Win32::System::Threading::{
    OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_OPERATION, PROCESS_VM_READ,
    PROCESS_VM_WRITE,
};

use super::{
    MemoryRegion, PageProtection, ProcessInfo, ProcessProvider, RawHandle, RegionState,
    VirtualMemory,
};
use crate::error::{Error, Result};

/// Live OS backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProvider;

impl SystemProvider {
    pub fn new() -> Self {
        Self
    }
}

fn to_handle(raw: RawHandle) -> HANDLE {
    HANDLE(raw.0 as *mut c_void)
}

/// Closes a toolhelp snapshot on drop.
struct Snapshot(HANDLE);

impl Snapshot {
    fn take(flags: CREATE_TOOLHELP_SNAPSHOT_FLAGS, pid: u32) -> windows::core::Result<Self> {
        // SAFETY: CreateToolhelp32Snapshot has no pointer arguments.
        unsafe { CreateToolhelp32Snapshot(flags, pid) }.map(Self)
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        // SAFETY: the handle came from CreateToolhelp32Snapshot and is closed once.
        let _ = unsafe { CloseHandle(self.0) };
    }
}

fn utf16_until_nul(units: &[u16]) -> String {
    let len = units.iter().position(|&c| c == 0).unwrap_or(units.len());
    String::from_utf16_lossy(&units[..len])
}

impl ProcessProvider for SystemProvider {
    fn list_processes(&self) -> Result<Vec<ProcessInfo>> {
        let snapshot = Snapshot::take(TH32CS_SNAPPROCESS, 0)
            .map_err(|e| Error::ProcessNotFound(format!("process snapshot failed: {}", e)))?;

        let mut entry = PROCESSENTRY32W {
            dwSize: size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };

        let mut processes = Vec::new();
        // SAFETY: entry is a properly sized PROCESSENTRY32W and the snapshot is live.
        let mut ok = unsafe { Process32FirstW(snapshot.0, &mut entry) }.is_ok();
        while ok {
            processes.push(ProcessInfo {
                pid: entry.th32ProcessID,
                name: utf16_until_nul(&entry.szExeFile),
            });
            // SAFETY: as above.
            ok = unsafe { Process32NextW(snapshot.0, &mut entry) }.is_ok();
        }

        Ok(processes)
    }

    fn open_process(&self, pid: u32) -> Result<RawHandle> {
        let access =
            PROCESS_VM_READ | PROCESS_VM_WRITE | PROCESS_VM_OPERATION | PROCESS_QUERY_INFORMATION;
        // SAFETY: OpenProcess has no pointer arguments.
        let handle = unsafe { OpenProcess(access, false, pid) }
            .map_err(|e| Error::ProcessOpenFailed(format!("pid {}: {}", pid, e)))?;
        Ok(RawHandle(handle.0 as usize))
    }

    fn close_process(&self, handle: RawHandle) {
        // SAFETY: the handle was returned by OpenProcess and is owned by the caller.
        let _ = unsafe { CloseHandle(to_handle(handle)) };
    }

    fn main_module_base(&self, pid: u32) -> Result<u64> {
        let snapshot = Snapshot::take(TH32CS_SNAPMODULE | TH32CS_SNAPMODULE32, pid)
            .map_err(|e| Error::ModuleQueryFailed(format!("module snapshot failed: {}", e)))?;

        let mut entry = MODULEENTRY32W {
            dwSize: size_of::<MODULEENTRY32W>() as u32,
            ..Default::default()
        };

        // SAFETY: entry is a properly sized MODULEENTRY32W and the snapshot is live.
        unsafe { Module32FirstW(snapshot.0, &mut entry) }
            .map_err(|e| Error::ModuleQueryFailed(format!("no modules for pid {}: {}", pid, e)))?;

        Ok(entry.modBaseAddr as u64)
    }
}

impl VirtualMemory for SystemProvider {
    fn protect(
        &self,
        handle: RawHandle,
        address: u64,
        size: usize,
        protection: PageProtection,
    ) -> Result<PageProtection> {
        let mut old = PAGE_PROTECTION_FLAGS(0);
        // SAFETY: VirtualProtectEx validates the target range itself; `old` is a valid out pointer.
        unsafe {
            VirtualProtectEx(
                to_handle(handle),
                address as *const c_void,
                size,
                PAGE_PROTECTION_FLAGS(protection.0),
                &mut old,
            )
        }
        .map_err(|e| Error::ProtectionFailed {
            address,
            message: e.to_string(),
        })?;
        Ok(PageProtection(old.0))
    }

    fn read(&self, handle: RawHandle, address: u64, buf: &mut [u8]) -> Result<()> {
        let mut bytes_read = 0usize;
        // SAFETY: buf is valid for buf.len() bytes; the remote address is checked by the OS.
        unsafe {
            ReadProcessMemory(
                to_handle(handle),
                address as *const c_void,
                buf.as_mut_ptr() as *mut c_void,
                buf.len(),
                Some(&mut bytes_read),
            )
        }
        .map_err(|e| Error::MemoryReadFailed {
            address,
            message: e.to_string(),
        })?;

        if bytes_read != buf.len() {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!("partial read: {} of {} bytes", bytes_read, buf.len()),
            });
        }
        Ok(())
    }

    fn write(&self, handle: RawHandle, address: u64, bytes: &[u8]) -> Result<()> {
        let mut bytes_written = 0usize;
        // SAFETY: bytes is valid for bytes.len() bytes; the remote address is checked by the OS.
        unsafe {
            WriteProcessMemory(
                to_handle(handle),
                address as *const c_void,
                bytes.as_ptr() as *const c_void,
                bytes.len(),
                Some(&mut bytes_written),
            )
        }
        .map_err(|e| Error::MemoryWriteFailed {
            address,
            message: e.to_string(),
        })?;

        if bytes_written != bytes.len() {
            return Err(Error::MemoryWriteFailed {
                address,
                message: format!("partial write: {} of {} bytes", bytes_written, bytes.len()),
            });
        }
        Ok(())
    }

    fn query_region(&self, handle: RawHandle, address: u64) -> Option<MemoryRegion> {
        let mut info = MEMORY_BASIC_INFORMATION::default();
        // SAFETY: info is a valid out buffer of the size passed.
        let written = unsafe {
            VirtualQueryEx(
                to_handle(handle),
                Some(address as *const c_void),
                &mut info,
                size_of::<MEMORY_BASIC_INFORMATION>(),
            )
        };
        if written == 0 {
            trace!("VirtualQueryEx stopped at {:#x}", address);
            return None;
        }

        Some(MemoryRegion {
            base: info.BaseAddress as u64,
            size: info.RegionSize,
            protection: PageProtection(info.Protect.0),
            state: RegionState(info.State.0),
        })
    }
}
