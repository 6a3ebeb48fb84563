//! Network-state watcher
//!
//! [`ConnectionMonitor`] is the single piece of state shared between the
//! mesh event context and the worker. The role lives in an atomic and a
//! [`Signal`] wakes the worker when the node attaches, so the worker can
//! block instead of polling.

use core::convert::Infallible;
use core::sync::atomic::{AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use hal_abstractions::{ChangedFlags, MeshNetwork, MeshRole};

/// Connection state derived from mesh role changes
pub struct ConnectionMonitor {
    role: AtomicU8,
    attached: Signal<CriticalSectionRawMutex, ()>,
}

impl ConnectionMonitor {
    pub const fn new() -> Self {
        Self {
            role: AtomicU8::new(MeshRole::Disabled as u8),
            attached: Signal::new(),
        }
    }

    /// Handle a state-change notification from the mesh stack
    ///
    /// Only notifications carrying [`ChangedFlags::THREAD_ROLE`] update the
    /// state. Returns whether the role was applied.
    pub fn on_state_changed(&self, flags: ChangedFlags, role: MeshRole) -> bool {
        if !flags.contains(ChangedFlags::THREAD_ROLE) {
            trace!("State change {:?} without role flag ignored", flags);
            return false;
        }
        self.set_role(role);
        true
    }

    /// Store `role` and wake the worker if it means the node is attached
    pub fn set_role(&self, role: MeshRole) {
        let previous = MeshRole::from_raw(self.role.swap(role as u8, Ordering::AcqRel));

        if role.is_attached() {
            if !previous.is_attached() {
                info!("Mesh attached as {:?}", role);
            }
            self.attached.signal(());
        } else {
            if previous.is_attached() {
                warn!("Mesh connection lost (role {:?})", role);
            }
            self.attached.reset();
        }
    }

    pub fn role(&self) -> MeshRole {
        MeshRole::from_raw(self.role.load(Ordering::Acquire))
    }

    pub fn is_connected(&self) -> bool {
        self.role().is_attached()
    }

    /// Resolve once the node is attached
    pub async fn wait_connected(&self) {
        while !self.is_connected() {
            self.attached.wait().await;
        }
    }
}

impl Default for ConnectionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Start the mesh stack and feed its role changes into `monitor`
///
/// Runs forever once the stack is up; only a failed start returns.
pub async fn watch<M: MeshNetwork>(
    mesh: &mut M,
    monitor: &ConnectionMonitor,
) -> Result<Infallible, M::Error> {
    mesh.start()?;
    info!("Mesh stack started, role {:?}", mesh.role());
    monitor.on_state_changed(ChangedFlags::THREAD_ROLE, mesh.role());

    loop {
        let flags = mesh.wait_changed().await;
        monitor.on_state_changed(flags, mesh.role());
    }
}
