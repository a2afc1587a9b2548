//! Regions command implementation.

use anyhow::Result;
use nfsmod_core::{MemoryRegion, PatternScanner, Platform, ProtectedMemory};

/// Run the regions command
pub fn run<P: Platform>(memory: &ProtectedMemory<P>, all: bool, json: bool) -> Result<()> {
    let scanner = PatternScanner::new(memory);
    let regions = if all {
        scanner.regions()?
    } else {
        scanner.scannable_regions()?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&regions)?);
        return Ok(());
    }

    println!("{:<18} {:<18} {:>12}  {:<9} {}", "BASE", "END", "SIZE", "PROT", "STATE");
    for region in &regions {
        println!("{}", format_row(region));
    }
    println!();
    println!(
        "{} regions, {} bytes",
        regions.len(),
        regions.iter().map(|r| r.size as u64).sum::<u64>()
    );

    Ok(())
}

fn format_row(region: &MemoryRegion) -> String {
    format!(
        "{:<18} {:<18} {:>12}  {:<9} {}",
        format!("{:#x}", region.base),
        format!("{:#x}", region.end()),
        format!("{:#x}", region.size),
        region.protection.to_string(),
        region.state
    )
}
