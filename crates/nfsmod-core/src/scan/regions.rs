//! Walk of the target's virtual address space.

use crate::process::{MemoryRegion, RawHandle, VirtualMemory};

/// Iterator over successive regions starting at address 0.
///
/// Each query starts where the previous region ended. The walk ends when the
/// OS stops answering, reports an empty region, or the next address would
/// overflow.
pub struct Regions<'a, V: VirtualMemory> {
    memory: &'a V,
    handle: RawHandle,
    next: Option<u64>,
}

impl<'a, V: VirtualMemory> Regions<'a, V> {
    pub fn new(memory: &'a V, handle: RawHandle) -> Self {
        Self {
            memory,
            handle,
            next: Some(0),
        }
    }
}

impl<V: VirtualMemory> Iterator for Regions<'_, V> {
    type Item = MemoryRegion;

    fn next(&mut self) -> Option<MemoryRegion> {
        let address = self.next.take()?;
        let region = self.memory.query_region(self.handle, address)?;
        if region.size == 0 {
            return None;
        }
        self.next = region
            .base
            .checked_add(region.size as u64)
            .filter(|&next| next > address);
        Some(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::mock::MockProcess;
    use crate::process::{PageProtection, RegionState};

    #[test]
    fn test_walk_reports_gaps_and_regions() {
        let mock = MockProcess::builder()
            .region(0x1000, vec![0; 0x1000])
            .region(0x3000, vec![0; 0x800])
            .build();

        let regions: Vec<_> = Regions::new(&mock, RawHandle(1)).collect();
        let spans: Vec<_> = regions.iter().map(|r| (r.base, r.size)).collect();
        assert_eq!(
            spans,
            vec![
                (0, 0x1000),
                (0x1000, 0x1000),
                (0x2000, 0x1000),
                (0x3000, 0x800)
            ]
        );
        assert_eq!(regions[0].state, RegionState::FREE);
        assert!(regions[1].is_scannable());
    }

    #[test]
    fn test_walk_of_empty_space() {
        let mock = MockProcess::builder().build();
        assert_eq!(Regions::new(&mock, RawHandle(1)).count(), 0);
    }

    #[test]
    fn test_walk_stops_at_top_of_address_space() {
        let top = u64::MAX - 0xFFF;
        let mock = MockProcess::builder()
            .region_with(
                top,
                vec![0; 0xFFF],
                PageProtection::READONLY,
                RegionState::COMMIT,
            )
            .build();

        let last = Regions::new(&mock, RawHandle(1)).last().unwrap();
        assert_eq!(last.base, top);
    }
}
