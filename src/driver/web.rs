use crate::core::{
    Backend, ConfigSource, DriverConfig, DriverListener, LifecycleState, ReportSink, TestInterface,
};
use crate::driver::chrome::ChromeBackend;
use crate::driver::context::ContextSwitcher;
use crate::driver::interaction::Interactor;
use crate::driver::links::{HttpProber, LinkScanner};
use crate::driver::locator::{LocatorResolver, POLL_INTERVAL};
use crate::driver::registry::SessionRegistry;
use crate::driver::scroll::Scroller;
use crate::driver::session::Session;
use crate::errors::{DriverError, Result};
use crate::types::{LinkReport, Locator, ScrollDirection, ScrollTarget};
use crate::utils::Screenshots;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

/// Browser implementation of [`TestInterface`].
///
/// One instance is shared by every test thread; each thread gets its own
/// session through the registry, created by the backend factory at connect
/// time. Listener and report sink are optional and shared across threads.
pub struct WebDriver<B: Backend> {
    registry: SessionRegistry<B>,
    factory: Box<dyn Fn() -> B + Send + Sync>,
    listener: Option<Arc<dyn DriverListener>>,
    report: Option<Arc<dyn ReportSink>>,
    states: Mutex<HashMap<ThreadId, LifecycleState>>,
}

/// The Chrome driver most harnesses use.
pub type ChromeDriver = WebDriver<ChromeBackend>;

impl ChromeDriver {
    pub fn chrome() -> Self {
        Self::new(ChromeBackend::new)
    }
}

impl<B: Backend> WebDriver<B> {
    pub fn new(factory: impl Fn() -> B + Send + Sync + 'static) -> Self {
        Self {
            registry: SessionRegistry::new(),
            factory: Box::new(factory),
            listener: None,
            report: None,
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn DriverListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn with_report_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.report = Some(sink);
        self
    }

    /// Lifecycle state of the calling thread's driver slot.
    pub fn lifecycle_state(&self) -> LifecycleState {
        *self
            .states
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&std::thread::current().id())
            .unwrap_or(&LifecycleState::Uninitialized)
    }

    /// Attribute read when the locator names one, text read otherwise.
    pub fn read(&self, locator: &Locator) -> Result<Option<String>> {
        let session = self.registry.active()?;
        Interactor::read(&session, locator)
    }

    fn set_state(&self, state: LifecycleState) {
        self.states
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(std::thread::current().id(), state);
    }

    fn notify_error(&self, err: &DriverError) {
        if let Some(listener) = &self.listener {
            listener.on_error(err.code(), &err.to_string());
        }
    }

    /// Screenshot the current page into the report sink, with the acted-on
    /// element's region when a locator is given. Step documentation only; a
    /// failed capture or region lookup is logged and otherwise ignored.
    fn attach_step(&self, session: &Session<B>, label: &str, locator: Option<&Locator>) {
        let Some(sink) = &self.report else { return };
        let image = match session.backend().screenshot() {
            Ok(image) => image,
            Err(err) => {
                debug!(label, %err, "step screenshot failed");
                return;
            }
        };
        let region = locator.and_then(|l| match Screenshots::element_region(session, l) {
            Ok(region) => region,
            Err(err) => {
                debug!(label, %err, "element region lookup failed");
                None
            }
        });
        match region {
            Some(region) => sink.attach_region(label, &image, region),
            None => sink.attach(label, &image),
        }
    }

    /// Drop lifecycle entries of threads that reached a terminal state and no
    /// longer own a session, so the map stays bounded by live sessions.
    fn prune_states(&self) {
        let current = std::thread::current().id();
        self.states
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .retain(|id, state| {
                *id == current || !state.may_connect() || self.registry.contains(*id)
            });
    }
}

impl<B: Backend> TestInterface for WebDriver<B> {
    fn connect(&self, config: &dyn ConfigSource) -> Result<Uuid> {
        if self.registry.is_registered() || !self.lifecycle_state().may_connect() {
            let err = DriverError::AlreadyInitialized;
            self.notify_error(&err);
            return Err(err);
        }
        self.set_state(LifecycleState::Connecting);
        let config = DriverConfig::from_source(config);
        let session = match Session::open((self.factory)(), config) {
            Ok(session) => session,
            Err(err) => {
                self.set_state(LifecycleState::Uninitialized);
                self.notify_error(&err);
                return Err(err);
            }
        };
        let session = match self.registry.register(session) {
            Ok(session) => session,
            Err(err) => {
                self.set_state(LifecycleState::Uninitialized);
                self.notify_error(&err);
                return Err(err);
            }
        };
        self.set_state(LifecycleState::Connected);
        self.prune_states();
        info!(session_id = %session.id(), "session connected");
        if let Some(listener) = &self.listener {
            listener.on_connect(session.id());
        }
        Ok(session.id())
    }

    fn is_initialized(&self) -> bool {
        self.registry.is_registered()
    }

    fn teardown(&self) -> Result<()> {
        let Some(session) = self.registry.remove() else {
            return Ok(());
        };
        let id = session.id();
        let closed = session.close();
        self.set_state(LifecycleState::TornDown);
        if let Err(err) = closed {
            self.notify_error(&err);
            return Err(err);
        }
        info!(session_id = %id, "session torn down");
        if let Some(listener) = &self.listener {
            listener.on_teardown(id);
        }
        Ok(())
    }

    fn session_id(&self) -> Option<Uuid> {
        self.registry.lookup().map(|session| session.id())
    }

    fn navigate_to_url(&self, url: &str) -> Result<()> {
        let session = self.registry.active()?;
        session.backend().navigate(url)?;
        // Navigation lands in a fresh top-level document.
        session.set_frame(None);
        Ok(())
    }

    fn current_url(&self) -> Result<String> {
        self.registry.active()?.backend().current_url()
    }

    fn wait_for_page_ready(&self, timeout: Duration) -> Result<bool> {
        let session = self.registry.active()?;
        let start = Instant::now();
        loop {
            let map = session
                .expect_ok("return { ok: true, ready: __doc.readyState === 'complete' };")?;
            if map.get("ready").and_then(Value::as_bool).unwrap_or(false) {
                return Ok(true);
            }
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Ok(false);
            }
            std::thread::sleep(POLL_INTERVAL.min(timeout - elapsed));
        }
    }

    fn click(&self, locator: &Locator) -> Result<()> {
        let session = self.registry.active()?;
        Interactor::click(&session, locator)?;
        self.attach_step(&session, &format!("click {}", locator.expression), Some(locator));
        Ok(())
    }

    fn click_times(&self, locator: &Locator, count: u32, delay: Duration) -> Result<()> {
        let session = self.registry.active()?;
        Interactor::click_times(&session, locator, count, delay)?;
        self.attach_step(
            &session,
            &format!("click x{count} {}", locator.expression),
            Some(locator),
        );
        Ok(())
    }

    fn hover(&self, locator: &Locator) -> Result<()> {
        let session = self.registry.active()?;
        Interactor::hover(&session, locator)?;
        self.attach_step(&session, &format!("hover {}", locator.expression), Some(locator));
        Ok(())
    }

    fn set_text(&self, locator: &Locator, text: &str) -> Result<()> {
        let session = self.registry.active()?;
        Interactor::set_text(&session, locator, text)?;
        self.attach_step(
            &session,
            &format!("set_text {}", locator.expression),
            Some(locator),
        );
        Ok(())
    }

    fn get_text(&self, locator: &Locator) -> Result<Option<String>> {
        let session = self.registry.active()?;
        Interactor::get_text(&session, locator)
    }

    fn get_attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>> {
        let session = self.registry.active()?;
        Interactor::get_attribute(&session, locator, name)
    }

    fn visible_texts(&self, locator: &Locator) -> Result<Vec<String>> {
        let session = self.registry.active()?;
        LocatorResolver::visible_texts(&session, locator, session.config().implicit_wait)
    }

    fn set_radio_button_value(&self, container: &Locator, label: &str) -> Result<()> {
        let session = self.registry.active()?;
        Interactor::set_radio_button_value(&session, container, label)?;
        self.attach_step(&session, &format!("radio '{label}'"), Some(container));
        Ok(())
    }

    fn check_broken_links(&self) -> Result<Vec<LinkReport>> {
        let session = self.registry.active()?;
        let prober = HttpProber::new()?;
        LinkScanner::scan(&session, &prober)
    }

    fn take_screenshot(&self) -> Result<Vec<u8>> {
        self.registry.active()?.backend().screenshot()
    }

    fn scroll(&self, direction: ScrollDirection, count: u32, delay: Duration) -> Result<()> {
        let session = self.registry.active()?;
        Scroller::scroll(&session, direction, count, delay)
    }

    fn scroll_until_visible(
        &self,
        direction: ScrollDirection,
        target: &ScrollTarget,
    ) -> Result<bool> {
        let session = self.registry.active()?;
        Scroller::search(&session, direction, target)
    }

    fn scroll_to_card_view(
        &self,
        max_scrolls: u32,
        rail: Option<&Locator>,
        card: Option<&Locator>,
        text: Option<&str>,
    ) -> Result<bool> {
        let session = self.registry.active()?;
        Scroller::to_card_view(&session, max_scrolls, rail, card, text)
    }

    fn scroll_to_footer(&self, footer: &Locator, max_scrolls: u32) -> Result<bool> {
        let session = self.registry.active()?;
        Scroller::to_footer(&session, footer, max_scrolls)
    }

    fn switch_to_frame(&self, frame: &Locator) -> Result<()> {
        let session = self.registry.active()?;
        ContextSwitcher::switch_to_frame(&session, frame)
    }

    fn switch_to_default_content(&self) -> Result<()> {
        let session = self.registry.active()?;
        ContextSwitcher::switch_to_default_content(&session)
    }

    fn switch_to_window(&self, handle: &str) -> Result<()> {
        let session = self.registry.active()?;
        ContextSwitcher::switch_to_window(&session, handle)
    }

    fn window_handles(&self) -> Result<Vec<String>> {
        self.registry.active()?.backend().window_handles()
    }

    fn parent_window_handle(&self) -> Result<String> {
        Ok(self.registry.active()?.parent_window().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockBackend, MockState, RecordingSink};
    use serde_json::json;

    fn driver() -> (WebDriver<MockBackend>, Arc<MockState>) {
        let state = MockState::new();
        (WebDriver::new(MockBackend::factory(Arc::clone(&state))), state)
    }

    #[test]
    fn page_ready_polls_until_complete() {
        let (driver, state) = driver();
        driver.connect(&HashMap::new()).unwrap();
        state.stub_seq(
            "readyState === 'complete'",
            vec![
                json!({ "ok": true, "ready": false }),
                json!({ "ok": true, "ready": true }),
            ],
        );
        assert!(driver.wait_for_page_ready(Duration::from_secs(2)).unwrap());
        assert_eq!(state.scripts_matching("readyState === 'complete'"), 2);
    }

    #[test]
    fn page_ready_times_out_as_false_not_error() {
        let (driver, state) = driver();
        driver.connect(&HashMap::new()).unwrap();
        state.stub(
            "readyState === 'complete'",
            json!({ "ok": true, "ready": false }),
        );
        assert!(!driver.wait_for_page_ready(Duration::from_millis(30)).unwrap());
    }

    #[test]
    fn navigation_clears_frame_context() {
        let (driver, state) = driver();
        driver.connect(&HashMap::new()).unwrap();
        state.stub("count: __nodes.length", json!({ "ok": true, "count": 1 }));
        state.stub("contentDocument", json!({ "ok": true }));
        driver.switch_to_frame(&Locator::new("#inner")).unwrap();

        driver.navigate_to_url("https://app.test/next").unwrap();

        assert_eq!(state.navigations(), vec!["https://app.test/next".to_string()]);
        assert_eq!(driver.registry.active().unwrap().frame(), None);
    }

    #[test]
    fn interaction_steps_reach_the_report_sink() {
        let state = MockState::new();
        let sink = Arc::new(RecordingSink::new());
        let driver = WebDriver::new(MockBackend::factory(Arc::clone(&state)))
            .with_report_sink(Arc::clone(&sink) as Arc<dyn ReportSink>);
        driver.connect(&HashMap::new()).unwrap();
        state.stub("count: __nodes.length", json!({ "ok": true, "count": 1 }));
        state.stub("count: visible", json!({ "ok": true, "count": 1 }));
        state.stub("elementFromPoint", json!({ "ok": true }));

        driver.click(&Locator::new("#save")).unwrap();
        driver
            .click_times(&Locator::new("#next"), 3, Duration::from_millis(1))
            .unwrap();
        driver.hover(&Locator::new("#menu")).unwrap();

        assert_eq!(
            sink.labels(),
            vec![
                "click #save".to_string(),
                "click x3 #next".to_string(),
                "hover #menu".to_string(),
            ]
        );
    }

    #[test]
    fn attachments_carry_the_element_region_when_resolvable() {
        let state = MockState::new();
        let sink = Arc::new(RecordingSink::new());
        let driver = WebDriver::new(MockBackend::factory(Arc::clone(&state)))
            .with_report_sink(Arc::clone(&sink) as Arc<dyn ReportSink>);
        driver.connect(&HashMap::new()).unwrap();
        state.stub("count: __nodes.length", json!({ "ok": true, "count": 1 }));
        state.stub("count: visible", json!({ "ok": true, "count": 1 }));
        state.stub("elementFromPoint", json!({ "ok": true }));
        state.stub(
            "region: { x: r.left",
            json!({ "ok": true, "region": { "x": 4.0, "y": 8.0, "width": 80.0, "height": 24.0 } }),
        );

        driver.click(&Locator::new("#save")).unwrap();

        assert_eq!(sink.labels(), vec!["click #save".to_string()]);
        assert_eq!(sink.region_labels(), vec!["click #save".to_string()]);
    }

    #[test]
    fn finished_thread_states_are_pruned_on_connect() {
        let state = MockState::new();
        let driver = Arc::new(WebDriver::new(MockBackend::factory(state)));

        for _ in 0..3 {
            let driver2 = Arc::clone(&driver);
            std::thread::spawn(move || {
                driver2.connect(&HashMap::new()).unwrap();
                driver2.teardown().unwrap();
            })
            .join()
            .unwrap();
        }
        driver.connect(&HashMap::new()).unwrap();

        let states = driver.states.lock().unwrap();
        assert_eq!(states.len(), 1);
    }

    #[test]
    fn read_dispatches_on_locator_shape() {
        let (driver, state) = driver();
        driver.connect(&HashMap::new()).unwrap();
        state.stub("count: __nodes.length", json!({ "ok": true, "count": 1 }));
        state.stub("getAttribute", json!({ "ok": true, "value": "/home" }));
        state.stub("t.length ? t : null", json!({ "ok": true, "text": "Home" }));

        assert_eq!(
            driver.read(&Locator::with_attribute("//a[1]", "href")).unwrap(),
            Some("/home".to_string())
        );
        assert_eq!(
            driver.read(&Locator::new("//a[1]")).unwrap(),
            Some("Home".to_string())
        );
    }

    #[test]
    fn operations_fail_fast_without_a_session() {
        let (driver, _state) = driver();
        assert!(matches!(
            driver.click(&Locator::new("#x")).unwrap_err(),
            DriverError::NotInitialized
        ));
        assert!(matches!(
            driver.current_url().unwrap_err(),
            DriverError::NotInitialized
        ));
    }

    #[test]
    fn concurrent_connects_yield_distinct_sessions() {
        let state = MockState::new();
        let driver = Arc::new(WebDriver::new(MockBackend::factory(state)));
        let main_id = driver.connect(&HashMap::new()).unwrap();

        let driver2 = Arc::clone(&driver);
        let other_id = std::thread::spawn(move || {
            let id = driver2.connect(&HashMap::new()).unwrap();
            driver2.teardown().unwrap();
            id
        })
        .join()
        .unwrap();

        assert_ne!(main_id, other_id);
        // The other thread's teardown did not disturb this thread's session.
        assert_eq!(driver.session_id(), Some(main_id));
    }

    #[test]
    fn double_connect_is_rejected_and_original_survives() {
        let (driver, _state) = driver();
        let id = driver.connect(&HashMap::new()).unwrap();
        assert!(matches!(
            driver.connect(&HashMap::new()).unwrap_err(),
            DriverError::AlreadyInitialized
        ));
        assert_eq!(driver.session_id(), Some(id));
        assert_eq!(driver.lifecycle_state(), LifecycleState::Connected);
    }

    #[test]
    fn teardown_releases_the_session_and_permits_reconnect() {
        let (driver, state) = driver();
        driver.connect(&HashMap::new()).unwrap();
        driver.teardown().unwrap();

        assert!(!driver.is_initialized());
        assert_eq!(driver.session_id(), None);
        assert!(state.was_closed());
        assert_eq!(driver.lifecycle_state(), LifecycleState::TornDown);

        driver.connect(&HashMap::new()).unwrap();
        assert_eq!(driver.lifecycle_state(), LifecycleState::Connected);
    }

    #[test]
    fn teardown_without_session_is_a_noop() {
        let (driver, _state) = driver();
        driver.teardown().unwrap();
        driver.teardown().unwrap();
    }

    #[test]
    fn listener_sees_connect_and_teardown_in_order() {
        use crate::testing::RecordingListener;

        let state = MockState::new();
        let listener = Arc::new(RecordingListener::new());
        let driver = WebDriver::new(MockBackend::factory(state))
            .with_listener(Arc::clone(&listener) as Arc<dyn DriverListener>);

        let id = driver.connect(&HashMap::new()).unwrap();
        driver.teardown().unwrap();

        assert_eq!(
            listener.events(),
            vec![format!("connect:{id}"), format!("teardown:{id}")]
        );
    }

    #[test]
    fn failed_connect_reverts_to_uninitialized_and_notifies() {
        use crate::testing::RecordingListener;

        let state = MockState::new();
        let listener = Arc::new(RecordingListener::new());
        let driver = WebDriver::new(MockBackend::factory(Arc::clone(&state)))
            .with_listener(Arc::clone(&listener) as Arc<dyn DriverListener>);

        state.fail_next_launch();
        assert!(matches!(
            driver.connect(&HashMap::new()).unwrap_err(),
            DriverError::ConnectionFailed(_)
        ));
        assert_eq!(driver.lifecycle_state(), LifecycleState::Uninitialized);
        assert!(!driver.is_initialized());
        assert_eq!(listener.events(), vec!["error:CONNECTION_FAILED".to_string()]);

        // The failure was transient; a fresh connect works.
        driver.connect(&HashMap::new()).unwrap();
    }

    #[test]
    fn connect_reads_config_from_the_source() {
        let (driver, _state) = driver();
        let mut params = HashMap::new();
        params.insert("implicit_wait".to_string(), "3".to_string());
        params.insert("headless".to_string(), "false".to_string());
        driver.connect(&params).unwrap();

        let session = driver.registry.active().unwrap();
        assert_eq!(session.config().implicit_wait, Duration::from_secs(3));
        assert!(!session.config().headless);
    }

    #[test]
    fn parent_window_handle_is_the_starting_window() {
        let (driver, state) = driver();
        driver.connect(&HashMap::new()).unwrap();
        state.set_windows(vec!["win-0".to_string(), "win-1".to_string()]);
        driver.switch_to_window("win-1").unwrap();

        assert_eq!(driver.parent_window_handle().unwrap(), "win-0");
        assert_eq!(
            driver.window_handles().unwrap(),
            vec!["win-0".to_string(), "win-1".to_string()]
        );
    }

    #[test]
    fn network_offline_is_unsupported() {
        let (driver, _state) = driver();
        driver.connect(&HashMap::new()).unwrap();
        assert!(matches!(
            driver.set_network_offline(true).unwrap_err(),
            DriverError::UnsupportedOperation("set_network_offline")
        ));
    }
}
