//! Cooperative stop signal shared by every long-lived loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Set once, observed by each loop at the top of every iteration
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
