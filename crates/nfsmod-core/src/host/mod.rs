//! Mod lifecycle host.
//!
//! Mods are loaded once, updated on a fixed interval and unloaded when the
//! host stops. A hook that panics disables its mod; the others keep running.
//! Losing the process for good (a failed re-attach) ends the run with that
//! error after the remaining mods are unloaded.

mod pacer;

pub use pacer::ShutdownSignal;

use pacer::TickPacer;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::error::Result;
use crate::memory::{Address, GameMemory, ProtectedMemory};
use crate::process::Platform;

/// A script driven by [`ModHost`].
///
/// Setup that must happen before the first tick, in whatever order a mod
/// needs, belongs in `on_load`; there are no separate pre-init stages.
pub trait Mod<P: Platform> {
    fn name(&self) -> &str;

    /// Called once before the first update.
    fn on_load(&mut self, _memory: &GameMemory<'_, P>) {}

    /// Called every tick while the mod is active.
    fn on_update(&mut self, _memory: &GameMemory<'_, P>) {}

    /// Called once when the host stops, for mods that are still active.
    /// This includes the game exiting.
    fn on_unload(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    ProcessExited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSummary {
    pub ticks: u64,
    pub stop_reason: StopReason,
    /// Names of mods disabled after a panic.
    pub disabled: Vec<String>,
}

struct Slot<P: Platform> {
    module: Box<dyn Mod<P>>,
    active: bool,
}

pub struct ModHost<P: Platform> {
    interval: Duration,
    mods: Vec<Slot<P>>,
}

impl<P: Platform> ModHost<P> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            mods: Vec::new(),
        }
    }

    pub fn register(&mut self, module: Box<dyn Mod<P>>) {
        info!("Registered mod: {}", module.name());
        self.mods.push(Slot {
            module,
            active: true,
        });
    }

    pub fn mod_names(&self) -> Vec<&str> {
        self.mods.iter().map(|s| s.module.name()).collect()
    }

    /// Drive all registered mods until shutdown or until the target stops
    /// answering reads.
    pub fn run(
        &mut self,
        memory: &ProtectedMemory<P>,
        debug: bool,
        shutdown: &ShutdownSignal,
    ) -> Result<HostSummary> {
        memory.process().ensure_attached()?;
        let game = GameMemory::new(memory, debug);

        let mut ticks = 0u64;
        let outcome = self.drive(memory, &game, shutdown, &mut ticks);

        for slot in self.mods.iter_mut().filter(|s| s.active) {
            call_hook(slot, "on_unload", |m| m.on_unload());
        }
        let stop_reason = outcome?;

        let disabled = self
            .mods
            .iter()
            .filter(|s| !s.active)
            .map(|s| s.module.name().to_string())
            .collect();

        debug!("Mod host stopped after {} ticks ({:?})", ticks, stop_reason);
        Ok(HostSummary {
            ticks,
            stop_reason,
            disabled,
        })
    }
}

impl<P: Platform> ModHost<P> {
    fn drive(
        &mut self,
        memory: &ProtectedMemory<P>,
        game: &GameMemory<'_, P>,
        shutdown: &ShutdownSignal,
        ticks: &mut u64,
    ) -> Result<StopReason> {
        for slot in &mut self.mods {
            call_hook(slot, "on_load", |m| m.on_load(game));
        }
        if let Some(e) = game.take_fatal() {
            return Err(e);
        }

        let mut pacer = TickPacer::new(self.interval);
        loop {
            if !pacer.wait(shutdown) {
                return Ok(StopReason::Shutdown);
            }
            if !is_alive(memory) {
                info!("Target process no longer responds, stopping mods");
                return Ok(StopReason::ProcessExited);
            }

            for slot in self.mods.iter_mut().filter(|s| s.active) {
                call_hook(slot, "on_update", |m| m.on_update(game));
            }
            if let Some(e) = game.take_fatal() {
                error!("Stopping mods after {} ticks: {}", ticks, e);
                return Err(e);
            }
            *ticks += 1;
        }
    }
}

fn is_alive<P: Platform>(memory: &ProtectedMemory<P>) -> bool {
    memory.read_bytes(Address::Relative(0), 1).is_ok()
}

fn call_hook<P: Platform>(slot: &mut Slot<P>, hook: &str, f: impl FnOnce(&mut dyn Mod<P>)) {
    let module = &mut *slot.module;
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| f(module))) {
        error!(
            "Mod {} panicked in {}: {}",
            slot.module.name(),
            hook,
            panic_message(&*payload)
        );
        slot.active = false;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
