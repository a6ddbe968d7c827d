pub mod conversion;
pub mod download;
pub mod health;

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonState {
    pub enabled: bool,
    pub label: String,
}

impl ButtonState {
    pub fn ready(label: &str) -> Self {
        Self {
            enabled: true,
            label: label.to_string(),
        }
    }

    pub fn disabled(label: &str) -> Self {
        Self {
            enabled: false,
            label: label.to_string(),
        }
    }
}

/// Holds a controller's in-flight flag for the lifetime of one operation.
/// Dropping it clears the flag, whatever path the operation left by.
pub(crate) struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_is_exclusive_and_released_on_drop() {
        let flag = AtomicBool::new(false);
        let guard = InFlight::acquire(&flag).unwrap();
        assert!(InFlight::acquire(&flag).is_none());
        drop(guard);
        assert!(!flag.load(Ordering::SeqCst));
        assert!(InFlight::acquire(&flag).is_some());
    }
}
