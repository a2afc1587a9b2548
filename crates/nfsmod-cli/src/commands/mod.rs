//! CLI command implementations.

pub mod hex_utils;
pub mod hexdump;
pub mod read;
pub mod regions;
pub mod scan;
pub mod string;
pub mod watch;
pub mod write;

use anyhow::Result;
use nfsmod_core::{GameMemory, Platform};

/// Fail the command if the fail-soft view lost the target process.
pub fn ensure_alive<P: Platform>(game: &GameMemory<'_, P>) -> Result<()> {
    match game.take_fatal() {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
