//! Scan command implementation.

use anyhow::{Context, Result};
use nfsmod_core::{Pattern, PatternScanner, Platform, ProtectedMemory};
use owo_colors::OwoColorize;
use serde::Serialize;

use super::hex_utils::format_hex_address;

#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub pattern: String,
    pub address: Option<u64>,
    /// Offset from the main module base, when the match lies above it
    pub module_offset: Option<u64>,
}

impl ScanReport {
    pub fn new(pattern: &Pattern, address: Option<u64>, base: Option<u64>) -> Self {
        let module_offset = match (address, base) {
            (Some(address), Some(base)) => address.checked_sub(base),
            _ => None,
        };
        Self {
            pattern: pattern.to_string(),
            address,
            module_offset,
        }
    }
}

/// Run the scan command
pub fn run<P: Platform>(memory: &ProtectedMemory<P>, pattern: &str, json: bool) -> Result<()> {
    let pattern = Pattern::parse(pattern).context("Invalid pattern")?;
    let address = PatternScanner::new(memory).find(&pattern)?;
    let report = ScanReport::new(&pattern, address, memory.base_address().ok());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match (report.address, report.module_offset) {
        (Some(address), Some(offset)) => println!(
            "[{}] found at {} (base+{})",
            report.pattern,
            format_hex_address(address).green(),
            format_hex_address(offset)
        ),
        (Some(address), None) => println!(
            "[{}] found at {}",
            report.pattern,
            format_hex_address(address).green()
        ),
        (None, _) => println!("[{}] {}", report.pattern, "not found".red()),
    }

    Ok(())
}
