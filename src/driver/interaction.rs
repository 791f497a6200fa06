use crate::core::Backend;
use crate::driver::locator::LocatorResolver;
use crate::driver::session::{object_ok, script_error, Session};
use crate::errors::{DriverError, Result};
use crate::types::Locator;
use crate::utils::js;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Bounded retry for interactions that can hit a mid-operation re-render.
const STALE_RETRY_ATTEMPTS: u32 = 3;
const STALE_RETRY_PAUSE: Duration = Duration::from_millis(200);

/// Click, type, hover and read operations against resolved elements.
///
/// Every operation resolves its locator fresh; nothing caches element handles
/// across calls. Clicks run under a [`HighlightGuard`] so the debug highlight
/// is removed on every exit path, including failures of the click itself.
pub struct Interactor;

impl Interactor {
    pub fn click<B: Backend>(session: &Session<B>, locator: &Locator) -> Result<()> {
        LocatorResolver::wait_for_visible(session, locator, session.config().implicit_wait)?;
        let guard = HighlightGuard::apply(session, locator)?;
        let outcome = Self::click_resolved(session, locator);
        drop(guard);
        outcome
    }

    /// Click `count` times with `delay` between clicks. The locator is
    /// re-resolved on every iteration: each click may trigger navigation or
    /// DOM replacement, so a handle from the previous pass cannot be trusted.
    pub fn click_times<B: Backend>(
        session: &Session<B>,
        locator: &Locator,
        count: u32,
        delay: Duration,
    ) -> Result<()> {
        for i in 0..count {
            Self::click(session, locator)?;
            if i + 1 < count {
                std::thread::sleep(delay);
            }
        }
        Ok(())
    }

    fn click_resolved<B: Backend>(session: &Session<B>, locator: &Locator) -> Result<()> {
        let map = session.eval_object(&native_click_body(locator))?;
        if object_ok(&map) {
            return Ok(());
        }
        if map.get("intercepted").and_then(Value::as_bool).unwrap_or(false) {
            debug!(locator = %locator.expression, "native click intercepted, dispatching scripted click");
            session.expect_ok(&scripted_click_body(locator))?;
            return Ok(());
        }
        match script_error(&map).as_str() {
            "not-found" => Err(DriverError::ElementNotFound(locator.expression.clone())),
            other => Err(DriverError::Script(other.to_string())),
        }
    }

    pub fn hover<B: Backend>(session: &Session<B>, locator: &Locator) -> Result<()> {
        LocatorResolver::wait_for_visible(session, locator, session.config().implicit_wait)?;
        let body = format!(
            "var __nodes = {finder};\
             if (!__nodes.length) {{ return {{ ok: false, error: 'not-found' }}; }}\
             var el = __nodes[0];\
             el.scrollIntoView({{ block: 'center', inline: 'nearest' }});\
             ['mouseover', 'mouseenter', 'mousemove'].forEach(function(type) {{\
               el.dispatchEvent(new MouseEvent(type, {{ bubbles: true, cancelable: true, view: __win }}));\
             }});\
             return {{ ok: true }};",
            finder = js::find_all(locator)
        );
        session.expect_ok(&body).map(|_| ())
    }

    /// Clear the element's current content, then type `text`. Clearing and
    /// typing are one injected script, so nothing on this thread can
    /// interleave between them.
    pub fn set_text<B: Backend>(session: &Session<B>, locator: &Locator, text: &str) -> Result<()> {
        LocatorResolver::wait_for_visible(session, locator, session.config().implicit_wait)?;
        let body = format!(
            "var __nodes = {finder};\
             if (!__nodes.length) {{ return {{ ok: false, error: 'not-found' }}; }}\
             var el = __nodes[0];\
             el.focus();\
             if ('value' in el) {{\
               el.value = '';\
               el.value = '{text}';\
             }} else if (el.isContentEditable) {{\
               el.textContent = '{text}';\
             }} else {{\
               return {{ ok: false, error: 'not-editable' }};\
             }}\
             el.dispatchEvent(new Event('input', {{ bubbles: true }}));\
             el.dispatchEvent(new Event('change', {{ bubbles: true }}));\
             return {{ ok: true, value: ('value' in el) ? el.value : el.textContent }};",
            finder = js::find_all(locator),
            text = js::escape(text)
        );
        let map = session.eval_object(&body)?;
        if object_ok(&map) {
            return Ok(());
        }
        match script_error(&map).as_str() {
            "not-found" => Err(DriverError::ElementNotFound(locator.expression.clone())),
            other => Err(DriverError::Script(other.to_string())),
        }
    }

    /// Visible text of the first match; `None` when it has none.
    pub fn get_text<B: Backend>(
        session: &Session<B>,
        locator: &Locator,
    ) -> Result<Option<String>> {
        LocatorResolver::wait_for_present(session, locator, session.config().implicit_wait)?;
        let body = format!(
            "var __nodes = {finder};\
             if (!__nodes.length) {{ return {{ ok: false, error: 'not-found' }}; }}\
             var el = __nodes[0];\
             var t = (el.innerText || el.textContent || '').trim();\
             return {{ ok: true, text: t.length ? t : null }};",
            finder = js::find_all(locator)
        );
        let map = session.expect_ok(&body)?;
        Ok(map
            .get("text")
            .and_then(Value::as_str)
            .map(|t| t.to_string()))
    }

    /// Attribute of the first match; `None` when absent. The DOM's
    /// `getAttribute` semantics pass through untouched, so whether an empty
    /// value differs from a missing one is whatever the platform says.
    pub fn get_attribute<B: Backend>(
        session: &Session<B>,
        locator: &Locator,
        name: &str,
    ) -> Result<Option<String>> {
        LocatorResolver::wait_for_present(session, locator, session.config().implicit_wait)?;
        let body = format!(
            "var __nodes = {finder};\
             if (!__nodes.length) {{ return {{ ok: false, error: 'not-found' }}; }}\
             var v = __nodes[0].getAttribute('{name}');\
             return {{ ok: true, value: v }};",
            finder = js::find_all(locator),
            name = js::escape(name)
        );
        let map = session.expect_ok(&body)?;
        Ok(map
            .get("value")
            .and_then(Value::as_str)
            .map(|v| v.to_string()))
    }

    /// Attribute read when the locator names one, text read otherwise.
    pub fn read<B: Backend>(session: &Session<B>, locator: &Locator) -> Result<Option<String>> {
        match locator.attribute.clone() {
            Some(name) => Self::get_attribute(session, locator, &name),
            None => Self::get_text(session, locator),
        }
    }

    /// Select a radio button inside `container` by its visible label text.
    /// A re-render can replace the label mid-interaction; the whole operation
    /// is retried a bounded number of times before `StaleElement` surfaces.
    pub fn set_radio_button_value<B: Backend>(
        session: &Session<B>,
        container: &Locator,
        label: &str,
    ) -> Result<()> {
        for attempt in 1..=STALE_RETRY_ATTEMPTS {
            LocatorResolver::wait_for_present(session, container, session.config().implicit_wait)?;
            let map = session.eval_object(&radio_body(container, label))?;
            if object_ok(&map) {
                return Ok(());
            }
            if map.get("stale").and_then(Value::as_bool).unwrap_or(false) {
                warn!(
                    container = %container.expression,
                    label,
                    attempt,
                    "radio label went stale, retrying"
                );
                std::thread::sleep(STALE_RETRY_PAUSE);
                continue;
            }
            return match script_error(&map).as_str() {
                "not-found" => Err(DriverError::ElementNotFound(container.expression.clone())),
                "label-not-found" => Err(DriverError::ElementNotFound(format!(
                    "radio label '{label}' in {}",
                    container.expression
                ))),
                other => Err(DriverError::Script(other.to_string())),
            };
        }
        Err(DriverError::StaleElement(format!(
            "radio label '{label}' in {} after {STALE_RETRY_ATTEMPTS} attempts",
            container.expression
        )))
    }
}

fn native_click_body(locator: &Locator) -> String {
    format!(
        "var __nodes = {finder};\
         if (!__nodes.length) {{ return {{ ok: false, error: 'not-found' }}; }}\
         var el = __nodes[0];\
         el.scrollIntoView({{ block: 'center', inline: 'nearest' }});\
         var r = el.getBoundingClientRect();\
         var top = __doc.elementFromPoint(r.left + r.width / 2, r.top + r.height / 2);\
         if (top && top !== el && !el.contains(top) && !top.contains(el)) {{\
           return {{ ok: false, intercepted: true, error: 'click-intercepted' }};\
         }}\
         el.click();\
         return {{ ok: true }};",
        finder = js::find_all(locator)
    )
}

fn scripted_click_body(locator: &Locator) -> String {
    format!(
        "var __nodes = {finder};\
         if (!__nodes.length) {{ return {{ ok: false, error: 'not-found' }}; }}\
         var el = __nodes[0];\
         ['mousedown', 'mouseup', 'click'].forEach(function(type) {{\
           el.dispatchEvent(new MouseEvent(type, {{ bubbles: true, cancelable: true, view: __win }}));\
         }});\
         return {{ ok: true }};",
        finder = js::find_all(locator)
    )
}

fn radio_body(container: &Locator, label: &str) -> String {
    format!(
        "var __nodes = {finder};\
         if (!__nodes.length) {{ return {{ ok: false, error: 'not-found' }}; }}\
         var root = __nodes[0];\
         var labels = root.querySelectorAll('label');\
         var target = null;\
         for (var i = 0; i < labels.length; i++) {{\
           if ((labels[i].innerText || labels[i].textContent || '').trim() === '{label}') {{\
             target = labels[i];\
             break;\
           }}\
         }}\
         if (!target) {{ return {{ ok: false, error: 'label-not-found' }}; }}\
         try {{\
           var input = null;\
           if (target.htmlFor) {{ input = __doc.getElementById(target.htmlFor); }}\
           if (!input) {{ input = target.querySelector('input[type=\"radio\"]'); }}\
           (input || target).click();\
           if (!__doc.contains(target) && (!input || !__doc.contains(input))) {{\
             return {{ ok: false, stale: true, error: 'label-detached' }};\
           }}\
           return {{ ok: true }};\
         }} catch (e) {{\
           return {{ ok: false, stale: true, error: String(e) }};\
         }}",
        finder = js::find_all(container),
        label = js::escape(label)
    )
}

/// Scoped debug highlight: applies a visible border to the element on
/// construction, captures the prior inline style on the node itself, and
/// restores it when dropped, whatever path the interaction took.
pub struct HighlightGuard<'a, B: Backend> {
    session: &'a Session<B>,
    locator: &'a Locator,
}

impl<'a, B: Backend> HighlightGuard<'a, B> {
    pub fn apply(session: &'a Session<B>, locator: &'a Locator) -> Result<Self> {
        let body = format!(
            "var __nodes = {finder};\
             if (!__nodes.length) {{ return {{ ok: false, error: 'not-found' }}; }}\
             var el = __nodes[0];\
             el.__rig_style = el.style.cssText;\
             el.style.outline = '3px solid #e8710a';\
             return {{ ok: true }};",
            finder = js::find_all(locator)
        );
        let map = session.eval_object(&body)?;
        if object_ok(&map) {
            Ok(Self { session, locator })
        } else {
            Err(DriverError::ElementNotFound(locator.expression.clone()))
        }
    }
}

impl<B: Backend> Drop for HighlightGuard<'_, B> {
    fn drop(&mut self) {
        let body = format!(
            "var __nodes = {finder};\
             if (!__nodes.length) {{ return {{ ok: true, missing: true }}; }}\
             var el = __nodes[0];\
             el.style.cssText = el.__rig_style || '';\
             delete el.__rig_style;\
             return {{ ok: true }};",
            finder = js::find_all(self.locator)
        );
        if let Err(err) = self.session.eval_object(&body) {
            debug!(locator = %self.locator.expression, %err, "highlight restore failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mock_session;
    use serde_json::json;

    fn present(state: &crate::testing::MockState) {
        state.stub("count: __nodes.length", json!({ "ok": true, "count": 1 }));
        state.stub("count: visible", json!({ "ok": true, "count": 1 }));
    }

    #[test]
    fn click_happy_path_restores_highlight() {
        let (session, state) = mock_session();
        present(&state);
        state.stub("elementFromPoint", json!({ "ok": true }));

        Interactor::click(&session, &Locator::new("#save")).unwrap();

        assert_eq!(state.scripts_matching("el.__rig_style = el.style.cssText"), 1);
        assert_eq!(state.scripts_matching("el.__rig_style || ''"), 1);
    }

    #[test]
    fn intercepted_click_falls_back_to_scripted_dispatch() {
        let (session, state) = mock_session();
        present(&state);
        state.stub(
            "elementFromPoint",
            json!({ "ok": false, "intercepted": true, "error": "click-intercepted" }),
        );
        state.stub("'mousedown', 'mouseup', 'click'", json!({ "ok": true }));

        Interactor::click(&session, &Locator::new("//button[@id='pay']")).unwrap();

        assert_eq!(state.scripts_matching("'mousedown', 'mouseup', 'click'"), 1);
        // Highlight removed on the fallback path too.
        assert_eq!(state.scripts_matching("el.__rig_style || ''"), 1);
    }

    #[test]
    fn failed_click_still_restores_highlight() {
        let (session, state) = mock_session();
        present(&state);
        state.stub(
            "elementFromPoint",
            json!({ "ok": false, "error": "not-found" }),
        );

        let err = Interactor::click(&session, &Locator::new("#gone")).unwrap_err();
        assert!(matches!(err, DriverError::ElementNotFound(_)));
        assert_eq!(state.scripts_matching("el.__rig_style || ''"), 1);
    }

    #[test]
    fn click_times_resolves_fresh_each_iteration() {
        let (session, state) = mock_session();
        present(&state);
        state.stub("elementFromPoint", json!({ "ok": true }));

        Interactor::click_times(&session, &Locator::new("#next"), 3, Duration::from_millis(1))
            .unwrap();

        assert_eq!(state.scripts_matching("elementFromPoint"), 3);
        assert_eq!(state.scripts_matching("el.__rig_style || ''"), 3);
    }

    #[test]
    fn get_text_returns_none_for_empty_text() {
        let (session, state) = mock_session();
        present(&state);
        state.stub("t.length ? t : null", json!({ "ok": true, "text": null }));
        let text = Interactor::get_text(&session, &Locator::new("span.badge")).unwrap();
        assert_eq!(text, None);
    }

    #[test]
    fn get_attribute_preserves_empty_vs_absent() {
        let (session, state) = mock_session();
        present(&state);

        state.stub("getAttribute", json!({ "ok": true, "value": null }));
        assert_eq!(
            Interactor::get_attribute(&session, &Locator::new("#f"), "data-id").unwrap(),
            None
        );

        state.stub("getAttribute", json!({ "ok": true, "value": "" }));
        assert_eq!(
            Interactor::get_attribute(&session, &Locator::new("#f"), "data-id").unwrap(),
            Some(String::new())
        );
    }

    #[test]
    fn read_dispatches_on_locator_attribute() {
        let (session, state) = mock_session();
        present(&state);
        state.stub("getAttribute", json!({ "ok": true, "value": "https://x.test" }));
        let value = Interactor::read(&session, &Locator::with_attribute("//a[1]", "href")).unwrap();
        assert_eq!(value, Some("https://x.test".to_string()));
    }

    #[test]
    fn set_text_round_trip() {
        let (session, state) = mock_session();
        present(&state);
        state.stub(
            "el.dispatchEvent(new Event('input'",
            json!({ "ok": true, "value": "abc" }),
        );
        Interactor::set_text(&session, &Locator::new("input[name='q']"), "abc").unwrap();
        // The clear and the typed value travel in the same script.
        let scripts = state.scripts();
        let typing = scripts
            .iter()
            .find(|s| s.contains("el.value = 'abc'"))
            .expect("typing script");
        assert!(typing.contains("el.value = '';"));

        state.stub("t.length ? t : null", json!({ "ok": true, "text": "abc" }));
        assert_eq!(
            Interactor::get_text(&session, &Locator::new("input[name='q']")).unwrap(),
            Some("abc".to_string())
        );
    }

    #[test]
    fn radio_select_retries_once_on_stale_then_succeeds() {
        let (session, state) = mock_session();
        present(&state);
        state.stub_seq(
            "querySelectorAll('label')",
            vec![
                json!({ "ok": false, "stale": true, "error": "label-detached" }),
                json!({ "ok": true }),
            ],
        );

        Interactor::set_radio_button_value(&session, &Locator::new("#gender"), "Male").unwrap();
        assert_eq!(state.scripts_matching("querySelectorAll('label')"), 2);
    }

    #[test]
    fn radio_select_surfaces_stale_after_bound() {
        let (session, state) = mock_session();
        present(&state);
        state.stub(
            "querySelectorAll('label')",
            json!({ "ok": false, "stale": true, "error": "label-detached" }),
        );

        let err =
            Interactor::set_radio_button_value(&session, &Locator::new("#gender"), "Male")
                .unwrap_err();
        assert!(matches!(err, DriverError::StaleElement(_)));
        assert_eq!(state.scripts_matching("querySelectorAll('label')"), 3);
    }

    #[test]
    fn radio_select_missing_label_is_not_found() {
        let (session, state) = mock_session();
        present(&state);
        state.stub(
            "querySelectorAll('label')",
            json!({ "ok": false, "error": "label-not-found" }),
        );
        let err =
            Interactor::set_radio_button_value(&session, &Locator::new("#gender"), "Other")
                .unwrap_err();
        assert!(matches!(err, DriverError::ElementNotFound(_)));
    }
}
