//! Lifecycle events - ordered, synchronous observer dispatch
//!
//! Observers are registered per entity type at schema build time and fired
//! by the lifecycle controller at the defined phase boundaries only.
//! "Before" hooks receive a [`LifecycleGate`] whose veto flag is inspected
//! immediately after the full dispatch pass.

use crate::record::Record;

/// Mutable veto carrier for "before" hooks, defaulting to allow
#[derive(Debug, Clone)]
pub struct LifecycleGate {
    allowed: bool,
}

impl LifecycleGate {
    pub fn new() -> Self {
        Self { allowed: true }
    }

    /// Veto the guarded phase. Later listeners still run; the controller
    /// checks the flag after dispatch.
    pub fn veto(&mut self) {
        self.allowed = false;
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }
}

impl Default for LifecycleGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle listener with default no-op hooks.
///
/// Dispatch is single-threaded and synchronous, in registration order.
/// Hooks may mutate the record; "before" hooks may veto through the gate.
pub trait RecordObserver: Send + Sync {
    fn init(&self, _record: &mut Record) {}

    fn after_find(&self, _record: &mut Record) {}

    fn before_insert(&self, _record: &mut Record, _gate: &mut LifecycleGate) {}

    fn after_insert(&self, _record: &mut Record) {}

    fn before_update(&self, _record: &mut Record, _gate: &mut LifecycleGate) {}

    fn after_update(&self, _record: &mut Record) {}

    fn before_delete(&self, _record: &mut Record, _gate: &mut LifecycleGate) {}

    fn after_delete(&self, _record: &mut Record) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_defaults_to_allow() {
        let gate = LifecycleGate::new();
        assert!(gate.is_allowed());
    }

    #[test]
    fn test_veto_sticks() {
        let mut gate = LifecycleGate::new();
        gate.veto();
        assert!(!gate.is_allowed());
        // a later listener cannot un-veto
        gate.veto();
        assert!(!gate.is_allowed());
    }
}
