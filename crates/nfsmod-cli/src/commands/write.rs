//! Write command implementation.

use anyhow::{Context, Result, bail};
use nfsmod_core::{Address, GameMemory, Platform, ProtectedMemory, Value, ValueKind};
use tracing::info;

use super::hex_utils::describe;

/// Run the write command
pub fn run<P: Platform>(
    memory: &ProtectedMemory<P>,
    address: Address,
    text: &str,
    kind: ValueKind,
    debug: bool,
) -> Result<()> {
    let value = Value::parse(kind, text).with_context(|| format!("Invalid {} value", kind))?;
    let game = GameMemory::new(memory, debug);

    let written = game.write_value(address, &value);
    super::ensure_alive(&game)?;
    if !written {
        bail!(
            "Failed to write {} to {} (run with --debug for details)",
            value,
            describe(memory, address)
        );
    }

    info!("Wrote {} [{}] to {}", value, kind, describe(memory, address));
    Ok(())
}
