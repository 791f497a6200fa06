use uuid::Uuid;

/// Connect/teardown state of one thread's driver slot.
///
/// `connect()` walks `Uninitialized/TornDown -> Connecting -> Connected`;
/// a failed connect reverts to `Uninitialized`. `teardown()` moves
/// `Connected -> TornDown`, after which a fresh `connect()` is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Connecting,
    Connected,
    TornDown,
}

impl LifecycleState {
    pub fn may_connect(self) -> bool {
        matches!(self, LifecycleState::Uninitialized | LifecycleState::TornDown)
    }
}

/// Observer for driver lifecycle events. All hooks default to no-ops, so a
/// listener may implement only what it cares about; registering no listener
/// at all changes nothing but the notifications.
pub trait DriverListener: Send + Sync {
    fn on_connect(&self, _session_id: Uuid) {}
    fn on_teardown(&self, _session_id: Uuid) {}
    fn on_error(&self, _code: &str, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectable_states() {
        assert!(LifecycleState::Uninitialized.may_connect());
        assert!(LifecycleState::TornDown.may_connect());
        assert!(!LifecycleState::Connecting.may_connect());
        assert!(!LifecycleState::Connected.may_connect());
    }
}
