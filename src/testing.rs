//! In-memory backend for tests.
//!
//! [`MockBackend`] records every injected script and answers from stub rules,
//! so driver logic is exercised without a browser. Rules match on a substring
//! of the script; the most recently installed matching rule wins, which lets
//! a test override an earlier blanket stub.

use crate::core::{Backend, DriverConfig, DriverListener, ReportSink};
use crate::driver::session::Session;
use crate::errors::{DriverError, Result};
use crate::types::ElementRegion;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

struct Rule {
    pattern: String,
    responses: VecDeque<Value>,
}

/// Shared state behind one or more [`MockBackend`] instances. Tests keep an
/// `Arc` to it for stubbing and assertions.
#[derive(Default)]
pub struct MockState {
    scripts: Mutex<Vec<String>>,
    rules: Mutex<Vec<Rule>>,
    navigations: Mutex<Vec<String>>,
    windows: Mutex<Vec<String>>,
    active: Mutex<String>,
    fail_launch: AtomicBool,
    launched: AtomicBool,
    closed: AtomicBool,
}

impl MockState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer every script containing `pattern` with `response`.
    pub fn stub(&self, pattern: &str, response: Value) {
        self.stub_seq(pattern, vec![response]);
    }

    /// Answer consecutive matching scripts with consecutive responses; the
    /// last response repeats once the rest are used up.
    pub fn stub_seq(&self, pattern: &str, responses: Vec<Value>) {
        self.lock(&self.rules).push(Rule {
            pattern: pattern.to_string(),
            responses: responses.into(),
        });
    }

    /// Every script evaluated so far, in order.
    pub fn scripts(&self) -> Vec<String> {
        self.lock(&self.scripts).clone()
    }

    /// Number of evaluated scripts containing `pattern`.
    pub fn scripts_matching(&self, pattern: &str) -> usize {
        self.lock(&self.scripts)
            .iter()
            .filter(|s| s.contains(pattern))
            .count()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.lock(&self.navigations).clone()
    }

    pub fn set_windows(&self, handles: Vec<String>) {
        *self.lock(&self.windows) = handles;
    }

    pub fn active_window(&self) -> String {
        self.lock(&self.active).clone()
    }

    /// Make the next `launch` fail, as an unreachable endpoint would.
    pub fn fail_next_launch(&self) {
        self.fail_launch.store(true, Ordering::SeqCst);
    }

    pub fn was_launched(&self) -> bool {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn respond(&self, script: &str) -> Value {
        let mut rules = self.lock(&self.rules);
        for rule in rules.iter_mut().rev() {
            if script.contains(&rule.pattern) {
                return if rule.responses.len() > 1 {
                    rule.responses.pop_front().unwrap_or_else(|| json!({ "ok": true }))
                } else {
                    rule.responses.front().cloned().unwrap_or_else(|| json!({ "ok": true }))
                };
            }
        }
        json!({ "ok": true })
    }

    fn lock<'a, T>(&self, m: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Backend double for driver tests.
pub struct MockBackend {
    state: Arc<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            state: MockState::new(),
        }
    }

    pub fn with_state(state: Arc<MockState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> Arc<MockState> {
        Arc::clone(&self.state)
    }

    /// Backend factory sharing one state across every produced instance, for
    /// drivers that launch a backend per thread.
    pub fn factory(state: Arc<MockState>) -> impl Fn() -> MockBackend + Send + Sync {
        move || MockBackend::with_state(Arc::clone(&state))
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MockBackend {
    fn launch(&mut self, _config: &DriverConfig) -> Result<()> {
        if self.state.fail_launch.swap(false, Ordering::SeqCst) {
            return Err(DriverError::ConnectionFailed("mock endpoint down".to_string()));
        }
        self.state.launched.store(true, Ordering::SeqCst);
        let mut windows = self.state.lock(&self.state.windows);
        if windows.is_empty() {
            windows.push("win-0".to_string());
        }
        *self.state.lock(&self.state.active) = windows[0].clone();
        Ok(())
    }

    fn navigate(&self, url: &str) -> Result<()> {
        self.state.lock(&self.state.navigations).push(url.to_string());
        Ok(())
    }

    fn evaluate(&self, script: &str) -> Result<Value> {
        self.state.lock(&self.state.scripts).push(script.to_string());
        Ok(self.state.respond(script))
    }

    fn screenshot(&self) -> Result<Vec<u8>> {
        // PNG magic bytes are enough for assertions.
        Ok(vec![137, 80, 78, 71])
    }

    fn current_url(&self) -> Result<String> {
        Ok(self
            .state
            .lock(&self.state.navigations)
            .last()
            .cloned()
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    fn active_window(&self) -> Result<String> {
        Ok(self.state.active_window())
    }

    fn window_handles(&self) -> Result<Vec<String>> {
        Ok(self.state.lock(&self.state.windows).clone())
    }

    fn activate_window(&self, handle: &str) -> Result<()> {
        let windows = self.state.lock(&self.state.windows);
        if !windows.iter().any(|w| w == handle) {
            return Err(DriverError::Backend(format!("no window with handle {handle}")));
        }
        *self.state.lock(&self.state.active) = handle.to_string();
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.state.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// A launched mock session plus a handle to its state, the usual starting
/// point of a component test.
pub fn mock_session() -> (Session<MockBackend>, Arc<MockState>) {
    let backend = MockBackend::new();
    let state = backend.state();
    let session = Session::open(backend, DriverConfig::default())
        .unwrap_or_else(|e| panic!("mock session open failed: {e}"));
    (session, state)
}

/// Report sink recording every attachment label, and separately the labels
/// that arrived with an element region.
#[derive(Default)]
pub struct RecordingSink {
    attachments: Mutex<Vec<(String, usize)>>,
    regions: Mutex<Vec<(String, ElementRegion)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.attachments
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(label, _)| label.clone())
            .collect()
    }

    /// Labels of region-carrying attachments, in arrival order.
    pub fn region_labels(&self) -> Vec<String> {
        self.regions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .map(|(label, _)| label.clone())
            .collect()
    }
}

impl ReportSink for RecordingSink {
    fn attach(&self, label: &str, image: &[u8]) {
        self.attachments
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((label.to_string(), image.len()));
    }

    fn attach_region(&self, label: &str, image: &[u8], region: ElementRegion) {
        self.regions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((label.to_string(), region));
        self.attach(label, image);
    }
}

/// Listener recording lifecycle events as `connect:<id>`, `teardown:<id>` and
/// `error:<code>` strings.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl DriverListener for RecordingListener {
    fn on_connect(&self, session_id: Uuid) {
        self.record(format!("connect:{session_id}"));
    }

    fn on_teardown(&self, session_id: Uuid) {
        self.record(format!("teardown:{session_id}"));
    }

    fn on_error(&self, code: &str, _message: &str) {
        self.record(format!("error:{code}"));
    }
}

impl RecordingListener {
    fn record(&self, event: String) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
