use crate::core::{Backend, DriverConfig};
use crate::errors::{DriverError, Result};
use crate::types::Locator;
use crate::utils::js;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::Mutex;
use std::thread::ThreadId;
use uuid::Uuid;

/// One live automation connection, owned by exactly one thread.
///
/// Holds the launched backend, the immutable session configuration and the
/// thread's active frame context. Element handles are never stored here: the
/// underlying nodes go stale on any navigation, so every operation resolves
/// its locator fresh.
pub struct Session<B: Backend> {
    id: Uuid,
    owner: ThreadId,
    created_at: DateTime<Utc>,
    config: DriverConfig,
    backend: B,
    frame: Mutex<Option<Locator>>,
    parent_window: String,
}

impl<B: Backend> Session<B> {
    /// Launch the backend and bind the session to the calling thread.
    pub fn open(mut backend: B, config: DriverConfig) -> Result<Self> {
        backend.launch(&config)?;
        let parent_window = backend.active_window()?;
        Ok(Self {
            id: Uuid::new_v4(),
            owner: std::thread::current().id(),
            created_at: Utc::now(),
            config,
            backend,
            frame: Mutex::new(None),
            parent_window,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Handle of the window the session started in.
    pub fn parent_window(&self) -> &str {
        &self.parent_window
    }

    pub fn frame(&self) -> Option<Locator> {
        self.frame
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set_frame(&self, frame: Option<Locator>) {
        *self
            .frame
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = frame;
    }

    /// Run an operation body under the standard prelude, rooted at the
    /// thread's active frame context. The body must return a JSON object.
    pub fn eval_object(&self, body: &str) -> Result<Map<String, Value>> {
        let frame = self.frame();
        let script = js::script(frame.as_ref(), body);
        match self.backend.evaluate(&script)? {
            Value::Object(map) => Ok(map),
            other => Err(DriverError::Script(format!(
                "script returned a non-object: {other}"
            ))),
        }
    }

    /// Like [`eval_object`](Self::eval_object), but requires the body to have
    /// reported `ok: true` and surfaces its `error` field otherwise.
    pub fn expect_ok(&self, body: &str) -> Result<Map<String, Value>> {
        let map = self.eval_object(body)?;
        if object_ok(&map) {
            Ok(map)
        } else {
            Err(DriverError::Script(script_error(&map)))
        }
    }

    pub fn close(&self) -> Result<()> {
        self.backend.close()
    }
}

// The backend carries no useful Debug surface; identity fields are enough.
impl<B: Backend> std::fmt::Debug for Session<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Whether a script result object reported success.
pub fn object_ok(map: &Map<String, Value>) -> bool {
    map.get("ok").and_then(Value::as_bool).unwrap_or(false)
}

/// The `error` field of a script result, or a placeholder.
pub fn script_error(map: &Map<String, Value>) -> String {
    map.get("error")
        .and_then(Value::as_str)
        .unwrap_or("unspecified script failure")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mock_session;

    #[test]
    fn debug_formatting_shows_identity_and_elides_backend() {
        let (session, _state) = mock_session();
        let rendered = format!("{session:?}");
        assert!(rendered.contains("Session"));
        assert!(rendered.contains(&session.id().to_string()));
        assert!(!rendered.contains("backend"));
    }
}
