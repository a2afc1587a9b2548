//! Signature scanning over committed memory.
//!
//! The scanner walks every region of the target, keeps the ones that are
//! committed and not guard pages, reads each in full and searches it for a
//! [`Pattern`]. Matches spanning two regions are not found.
//!
//! Regions are read with plain remote reads. Page protection is never
//! touched, so code pages keep their execute rights while the game runs.

mod pattern;
mod regions;

pub use pattern::Pattern;
pub use regions::Regions;

use tracing::{debug, trace};

use crate::error::Result;
use crate::memory::ProtectedMemory;
use crate::process::{MemoryRegion, Platform};

pub struct PatternScanner<'a, P: Platform> {
    memory: &'a ProtectedMemory<P>,
}

impl<'a, P: Platform> PatternScanner<'a, P> {
    pub fn new(memory: &'a ProtectedMemory<P>) -> Self {
        Self { memory }
    }

    /// Every region reported by the OS, from address 0 upward.
    pub fn regions(&self) -> Result<Vec<MemoryRegion>> {
        let handle = self.memory.process().ensure_attached()?;
        Ok(Regions::new(self.memory.process().provider(), handle).collect())
    }

    /// Regions the scanner will search.
    pub fn scannable_regions(&self) -> Result<Vec<MemoryRegion>> {
        let mut regions = self.regions()?;
        regions.retain(MemoryRegion::is_scannable);
        Ok(regions)
    }

    /// Address of the first match, in region order.
    pub fn find(&self, pattern: &Pattern) -> Result<Option<u64>> {
        let handle = self.memory.process().ensure_attached()?;
        let provider = self.memory.process().provider();

        for region in Regions::new(provider, handle).filter(MemoryRegion::is_scannable) {
            let mut buffer = vec![0u8; region.size];
            if let Err(e) = provider.read(handle, region.base, &mut buffer) {
                trace!("Skipping region {:#x}+{:#x}: {}", region.base, region.size, e);
                continue;
            }

            if let Some(offset) = pattern.find_in(&buffer) {
                let address = region.base + offset as u64;
                debug!("Pattern [{}] found at {:#x}", pattern, address);
                return Ok(Some(address));
            }
        }

        debug!("Pattern [{}] not found", pattern);
        Ok(None)
    }
}

/// Attach to `process_name` and scan it once.
///
/// Attach failures are not fatal here: a missing process yields `None`.
pub fn match_pattern<P: Platform>(
    provider: P,
    process_name: &str,
    pattern: &Pattern,
) -> Option<u64> {
    let memory = match ProtectedMemory::attach(provider, process_name) {
        Ok(memory) => memory,
        Err(e) => {
            debug!("Pattern scan skipped: {}", e);
            return None;
        }
    };

    match PatternScanner::new(&memory).find(pattern) {
        Ok(found) => found,
        Err(e) => {
            debug!("Pattern scan failed: {}", e);
            None
        }
    }
}
