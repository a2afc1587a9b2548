//! Attaching to the game process.

use nfsmod_core::{Error, Platform, ProtectedMemory, SystemProvider};
use tracing::error;

/// Attach through `provider`, describing why it failed.
pub fn attach_with<P: Platform>(provider: P, name: &str) -> Result<ProtectedMemory<P>, String> {
    ProtectedMemory::attach(provider, name).map_err(|e| match e {
        Error::ProcessNotFound(_) => format!("{} is not running", name),
        Error::ProcessOpenFailed(reason) => format!(
            "Failed to open {}: {} (try running as administrator)",
            name, reason
        ),
        other => format!("Failed to attach to {}: {}", name, other),
    })
}

/// Attach to `name` on the live system or terminate with status 1.
///
/// Every command needs a live process, so there is nothing useful to do
/// without one.
pub fn attach_or_exit(name: &str) -> ProtectedMemory<SystemProvider> {
    match attach_with(SystemProvider::new(), name) {
        Ok(memory) => memory,
        Err(message) => {
            error!("{}", message);
            std::process::exit(1);
        }
    }
}
