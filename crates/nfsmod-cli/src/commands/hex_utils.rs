//! Hex address parsing and formatting utilities.

use anyhow::Result;
use nfsmod_core::{Address, Platform, ProtectedMemory};

/// Parse a hex address string (with or without 0x prefix).
pub fn parse_hex_address(s: &str) -> Result<u64> {
    let s = s.trim_start_matches("0x").trim_start_matches("0X");
    u64::from_str_radix(s, 16).map_err(|e| anyhow::anyhow!("Invalid hex address: {}", e))
}

/// Format an address as a hex string with 0x prefix.
pub fn format_hex_address(addr: u64) -> String {
    format!("0x{:X}", addr)
}

/// Absolute form of `address` for display; relative addresses that cannot
/// be resolved are shown as given.
pub fn describe<P: Platform>(memory: &ProtectedMemory<P>, address: Address) -> String {
    match address {
        Address::Absolute(addr) => format_hex_address(addr),
        Address::Relative(_) => match memory.resolve(address) {
            Ok(addr) => format!("{} ({})", format_hex_address(addr), address),
            Err(_) => address.to_string(),
        },
    }
}
