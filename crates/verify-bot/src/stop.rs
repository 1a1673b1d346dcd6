//! Cooperative stop signal for a verification run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared stop flag. Raising it never interrupts an in-flight request; the
/// dispatcher polls it at batch boundaries and checkers before every attempt.
#[derive(Clone, Default, Debug)]
pub struct StopSignal {
    raised: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}
