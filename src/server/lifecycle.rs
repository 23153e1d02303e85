//! Process-wide service state
//!
//! Starting -> Running -> ShuttingDown, never backwards. Written by the
//! lifecycle-control task, read concurrently by readiness checks.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Starting,
    Running,
    ShuttingDown,
}

impl ServiceState {
    fn as_u8(self) -> u8 {
        match self {
            ServiceState::Starting => 0,
            ServiceState::Running => 1,
            ServiceState::ShuttingDown => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => ServiceState::Starting,
            1 => ServiceState::Running,
            _ => ServiceState::ShuttingDown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceState::Starting => "starting",
            ServiceState::Running => "running",
            ServiceState::ShuttingDown => "shutting down",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared handle to the current service state
///
/// Clones share the same underlying state.
#[derive(Debug, Clone)]
pub struct ServiceLifecycle {
    state: Arc<AtomicU8>,
}

impl ServiceLifecycle {
    /// Create a new lifecycle in the `Starting` state
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(ServiceState::Starting.as_u8())),
        }
    }

    /// Move to `state`
    ///
    /// Setting the current state again is a no-op. Once `ShuttingDown` has
    /// been stored it is never replaced.
    pub fn set_state(&self, state: ServiceState) {
        let next = state.as_u8();
        let previous = self
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                if current == ServiceState::ShuttingDown.as_u8() {
                    None
                } else {
                    Some(next)
                }
            });

        match previous {
            Ok(prev) if prev != next => {
                info!(
                    from = %ServiceState::from_u8(prev),
                    to = %state,
                    "Service state changed"
                );
            }
            _ => {}
        }
    }

    pub fn current_state(&self) -> ServiceState {
        ServiceState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// True only while `Running`
    pub fn is_ready(&self) -> bool {
        self.current_state() == ServiceState::Running
    }
}

impl Default for ServiceLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
