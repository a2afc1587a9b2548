//! String read/write commands.

use anyhow::{Result, bail};
use nfsmod_core::{Address, GameMemory, Platform, ProtectedMemory, TextEncoding};
use tracing::info;

use super::hex_utils::describe;

/// Read up to `length` bytes and print the text before the first NUL.
pub fn read<P: Platform>(
    memory: &ProtectedMemory<P>,
    address: Address,
    length: usize,
    encoding: TextEncoding,
    debug: bool,
) -> Result<()> {
    let game = GameMemory::new(memory, debug);
    let text = game.read_string(encoding, address, length);
    super::ensure_alive(&game)?;
    println!("{} [{}] = {:?}", describe(memory, address), encoding, text);
    Ok(())
}

/// Write `text` plus its terminator, optionally zero-filling `clear` bytes first.
pub fn write<P: Platform>(
    memory: &ProtectedMemory<P>,
    address: Address,
    text: &str,
    encoding: TextEncoding,
    clear: Option<usize>,
    debug: bool,
) -> Result<()> {
    let game = GameMemory::new(memory, debug);

    if let Some(length) = clear {
        let cleared = game.clear(address, length);
        super::ensure_alive(&game)?;
        if !cleared {
            bail!("Failed to clear {} bytes at {}", length, describe(memory, address));
        }
    }

    let written = game.write_string(encoding, address, text);
    super::ensure_alive(&game)?;
    if !written {
        bail!(
            "Failed to write {:?} to {} (run with --debug for details)",
            text,
            describe(memory, address)
        );
    }

    info!("Wrote {:?} [{}] to {}", text, encoding, describe(memory, address));
    Ok(())
}
