//! Connectivity probing for configured storages.
//!
//! Probing a remote endpoint may block for a full network timeout, so it is
//! deliberately decoupled from CRUD: services run a probe only on
//! read-for-display, never during create, update or delete. Probe failures
//! become a [`BackendStatus`] on the returned configuration, never errors.

use crate::backend::Backend;
use crate::config::{BackendStatus, OptionMap};

/// A live reachability check for a configured storage.
pub trait ConnectivityProbe: Send + Sync {
    /// Probe the storage described by the backend and its options.
    /// Implementations are expected to bound their own network timeouts.
    fn probe(&self, backend: &Backend, options: &OptionMap) -> BackendStatus;
}

/// Probe that never contacts anything and always reports
/// [`BackendStatus::Indeterminate`]. Used where no driver-level probe is
/// wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndeterminateProbe;

impl ConnectivityProbe for IndeterminateProbe {
    fn probe(&self, _backend: &Backend, _options: &OptionMap) -> BackendStatus {
        BackendStatus::Indeterminate
    }
}
