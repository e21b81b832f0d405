//! Two-state liveness flag.
//!
//! `/webping` deliberately answers 404 when the flag is off so that a load
//! balancer liveness probe sees a hard failure rather than an error page.
//! The flag starts enabled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared on/off health flag. Clones share the same state.
#[derive(Clone, Debug)]
pub struct WebPing {
    enabled: Arc<AtomicBool>,
}

impl WebPing {
    /// Creates an enabled flag.
    pub fn new() -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Makes `/webping` answer OK.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// Makes `/webping` answer Fail.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// Current state of the flag.
    pub fn is_ok(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

impl Default for WebPing {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_enabled() {
        assert!(WebPing::new().is_ok());
    }

    #[test]
    fn test_toggle() {
        let flag = WebPing::new();
        flag.disable();
        assert!(!flag.is_ok());
        flag.enable();
        assert!(flag.is_ok());
    }

    #[test]
    fn test_clones_share_state() {
        let flag = WebPing::new();
        let clone = flag.clone();
        clone.disable();
        assert!(!flag.is_ok());
    }
}
