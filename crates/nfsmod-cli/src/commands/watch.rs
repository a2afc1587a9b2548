//! Watch command implementation.
//!
//! Registers a single mod that polls one value on every host tick and logs
//! each change, until Ctrl+C or until the game goes away.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use nfsmod_core::{
    Address, GameMemory, Mod, ModHost, Platform, ProtectedMemory, ShutdownSignal, StopReason,
    Value, ValueKind,
};
use tracing::info;

use super::hex_utils::describe;

/// Remembers the last observed value.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    last: Option<Value>,
    changes: u64,
}

impl ChangeTracker {
    /// Record `value`, returning the previous one when it differs.
    ///
    /// The first observation is not a change.
    pub fn observe(&mut self, value: Value) -> Option<Value> {
        let previous = self.last.replace(value)?;
        if previous == value {
            None
        } else {
            self.changes += 1;
            Some(previous)
        }
    }

    pub fn last(&self) -> Option<Value> {
        self.last
    }

    pub fn changes(&self) -> u64 {
        self.changes
    }
}

struct WatchMod {
    address: Address,
    kind: ValueKind,
    label: String,
    tracker: ChangeTracker,
}

impl<P: Platform> Mod<P> for WatchMod {
    fn name(&self) -> &str {
        "watch"
    }

    fn on_load(&mut self, memory: &GameMemory<'_, P>) {
        let value = memory.read_value(self.address, self.kind);
        self.tracker.observe(value);
        info!("{} [{}] = {}", self.label, self.kind, value);
    }

    fn on_update(&mut self, memory: &GameMemory<'_, P>) {
        let value = memory.read_value(self.address, self.kind);
        if let Some(previous) = self.tracker.observe(value) {
            info!("{} [{}]: {} -> {}", self.label, self.kind, previous, value);
        }
    }

    fn on_unload(&mut self) {
        info!(
            "Stopped watching {} after {} change(s)",
            self.label,
            self.tracker.changes()
        );
    }
}

/// Run the watch command
pub fn run<P: Platform>(
    memory: &ProtectedMemory<P>,
    address: Address,
    kind: ValueKind,
    interval: Duration,
    debug: bool,
) -> Result<()> {
    let shutdown = Arc::new(ShutdownSignal::new());
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal, stopping...");
        shutdown_ctrlc.trigger();
    })?;

    let mut host: ModHost<P> = ModHost::new(interval);
    host.register(Box::new(WatchMod {
        address,
        kind,
        label: describe(memory, address),
        tracker: ChangeTracker::default(),
    }));

    println!("Watching... (Press Ctrl+C to stop)");
    let summary = host.run(memory, debug, &shutdown)?;

    match summary.stop_reason {
        StopReason::Shutdown => info!("Watch stopped after {} ticks", summary.ticks),
        StopReason::ProcessExited => info!("Game exited after {} ticks", summary.ticks),
    }
    Ok(())
}
