//! Read command implementation.

use anyhow::Result;
use nfsmod_core::{Address, GameMemory, Platform, ProtectedMemory, ValueKind};

use super::hex_utils::describe;

/// Run the read command.
///
/// Goes through the fail-soft view, so an unreadable address prints the
/// kind's zero value exactly as a mod would see it.
pub fn run<P: Platform>(
    memory: &ProtectedMemory<P>,
    address: Address,
    kind: ValueKind,
    debug: bool,
) -> Result<()> {
    let game = GameMemory::new(memory, debug);
    let value = game.read_value(address, kind);
    super::ensure_alive(&game)?;
    println!("{} [{}] = {}", describe(memory, address), kind, value);
    Ok(())
}
