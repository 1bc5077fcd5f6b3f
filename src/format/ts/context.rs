//! Per-PID elementary stream runtime state.

use super::counter::WrappingCounter;
use std::collections::HashMap;

/// Runtime state the muxer keeps for one elementary stream PID: just the
/// 4-bit continuity counter. The ES descriptor itself (stream type,
/// PMT-visible metadata) lives in the PMT's `elementary_streams` list; rather
/// than give `EsContext` a back-reference into that list (which would tangle
/// lifetimes for no benefit), lookups that need the descriptor go through
/// the PMT by PID. The muxer is the sole owner of both.
#[derive(Debug, Clone)]
pub struct EsContext {
    continuity_counter: WrappingCounter,
}

impl EsContext {
    /// Creates a fresh context with its continuity counter at `0`.
    pub fn new() -> Self {
        Self {
            continuity_counter: WrappingCounter::new(0x0F),
        }
    }

    /// Reads the current continuity counter and advances it. Only packets
    /// that carry a payload may call this — per ISO/IEC 13818-1, the
    /// continuity counter does not advance for adaptation-field-only
    /// packets (`adaptation_field_control == '10'`).
    pub fn next_continuity_counter(&mut self) -> u8 {
        self.continuity_counter.get()
    }

    /// Reads the current continuity counter without advancing it, for
    /// packets that carry no payload (e.g. an all-stuffing adaptation-field
    /// packet).
    pub fn peek_continuity_counter(&self) -> u8 {
        self.continuity_counter.peek()
    }
}

impl Default for EsContext {
    fn default() -> Self {
        Self::new()
    }
}

/// The muxer's registry of per-PID [`EsContext`]s, keyed by elementary PID.
#[derive(Debug, Clone, Default)]
pub struct EsContextRegistry {
    contexts: HashMap<u16, EsContext>,
}

impl EsContextRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and registers a fresh context for `pid`, replacing any prior
    /// context at that PID.
    pub fn create(&mut self, pid: u16) {
        self.contexts.insert(pid, EsContext::new());
    }

    /// Removes the context for `pid`, if any.
    pub fn remove(&mut self, pid: u16) {
        self.contexts.remove(&pid);
    }

    /// Mutable access to the context for `pid`, if registered.
    pub fn get_mut(&mut self, pid: u16) -> Option<&mut EsContext> {
        self.contexts.get_mut(&pid)
    }

    /// Whether a context is registered for `pid`.
    pub fn contains(&self, pid: u16) -> bool {
        self.contexts.contains_key(&pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_remove_round_trips() {
        let mut registry = EsContextRegistry::new();
        assert!(!registry.contains(0x0100));
        registry.create(0x0100);
        assert!(registry.contains(0x0100));
        registry.remove(0x0100);
        assert!(!registry.contains(0x0100));
    }

    #[test]
    fn continuity_counter_advances_independently_per_pid() {
        let mut registry = EsContextRegistry::new();
        registry.create(0x0100);
        registry.create(0x0101);

        let cc_a = registry.get_mut(0x0100).unwrap().next_continuity_counter();
        let cc_b = registry.get_mut(0x0101).unwrap().next_continuity_counter();
        let cc_a2 = registry.get_mut(0x0100).unwrap().next_continuity_counter();

        assert_eq!(cc_a, 0);
        assert_eq!(cc_b, 0);
        assert_eq!(cc_a2, 1);
    }
}
