use crate::core::Backend;
use crate::driver::session::Session;
use crate::errors::{DriverError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;

/// Thread-keyed session map.
///
/// Access discipline is per-key: a thread only ever registers, reads and
/// removes its own entry, so the lock protects map structure mutation, never
/// session state. Sessions of other threads are untouched by any operation
/// here.
pub struct SessionRegistry<B: Backend> {
    sessions: Mutex<HashMap<ThreadId, Arc<Session<B>>>>,
}

impl<B: Backend> SessionRegistry<B> {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Bind a session to the calling thread. Fails when the thread already
    /// owns one; the existing session is left untouched.
    pub fn register(&self, session: Session<B>) -> Result<Arc<Session<B>>> {
        let key = std::thread::current().id();
        let mut sessions = self.lock();
        if sessions.contains_key(&key) {
            return Err(DriverError::AlreadyInitialized);
        }
        let session = Arc::new(session);
        sessions.insert(key, Arc::clone(&session));
        Ok(session)
    }

    /// The calling thread's session, failing fast when there is none so bugs
    /// surface at the call site instead of deep inside an interaction.
    pub fn active(&self) -> Result<Arc<Session<B>>> {
        self.lookup().ok_or(DriverError::NotInitialized)
    }

    pub fn lookup(&self) -> Option<Arc<Session<B>>> {
        self.lock().get(&std::thread::current().id()).cloned()
    }

    pub fn is_registered(&self) -> bool {
        self.lock().contains_key(&std::thread::current().id())
    }

    /// Whether any session is bound to the given thread.
    pub fn contains(&self, id: ThreadId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Remove and return the calling thread's session, if any.
    pub fn remove(&self) -> Option<Arc<Session<B>>> {
        self.lock().remove(&std::thread::current().id())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ThreadId, Arc<Session<B>>>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<B: Backend> Default for SessionRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DriverConfig;
    use crate::testing::MockBackend;

    fn open_session() -> Session<MockBackend> {
        Session::open(MockBackend::new(), DriverConfig::default()).unwrap()
    }

    #[test]
    fn register_then_lookup_and_remove() {
        let registry = SessionRegistry::new();
        assert!(!registry.is_registered());

        let session = registry.register(open_session()).unwrap();
        assert!(registry.is_registered());
        assert_eq!(registry.active().unwrap().id(), session.id());

        let removed = registry.remove().unwrap();
        assert_eq!(removed.id(), session.id());
        assert!(registry.is_empty());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = SessionRegistry::new();
        let original = registry.register(open_session()).unwrap();
        let err = registry.register(open_session()).unwrap_err();
        assert!(matches!(err, DriverError::AlreadyInitialized));
        // Original entry untouched.
        assert_eq!(registry.active().unwrap().id(), original.id());
    }

    #[test]
    fn active_fails_fast_without_session() {
        let registry: SessionRegistry<MockBackend> = SessionRegistry::new();
        assert!(matches!(
            registry.active().unwrap_err(),
            DriverError::NotInitialized
        ));
    }

    #[test]
    fn entries_are_isolated_per_thread() {
        let registry = Arc::new(SessionRegistry::new());
        let main_session = registry.register(open_session()).unwrap();

        let registry2 = Arc::clone(&registry);
        let other_id = std::thread::spawn(move || {
            let session = registry2.register(open_session()).unwrap();
            let id = session.id();
            registry2.remove().unwrap();
            id
        })
        .join()
        .unwrap();

        assert_ne!(main_session.id(), other_id);
        // The other thread's removal did not disturb this thread's entry.
        assert_eq!(registry.active().unwrap().id(), main_session.id());
    }
}
