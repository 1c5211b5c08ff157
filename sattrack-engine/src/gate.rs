//! Initialization gate
//!
//! Holds back satellite and sun/moon computation until the home observer's
//! location is known. The gate opens once and never closes again.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    AwaitingObserver,
    Ready,
}

#[derive(Debug, Default)]
pub struct InitGate {
    ready: AtomicBool,
}

impl InitGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GateState {
        if self.is_ready() {
            GateState::Ready
        } else {
            GateState::AwaitingObserver
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Move to `Ready`. Returns `true` only for the call that opened the gate.
    pub fn open(&self) -> bool {
        let opened = !self.ready.swap(true, Ordering::AcqRel);
        if opened {
            tracing::info!("Observer location available, computation enabled");
        }
        opened
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_opens_once() {
        let gate = InitGate::new();
        assert_eq!(gate.state(), GateState::AwaitingObserver);

        assert!(gate.open());
        assert_eq!(gate.state(), GateState::Ready);

        assert!(!gate.open());
        assert!(gate.is_ready());
    }
}
