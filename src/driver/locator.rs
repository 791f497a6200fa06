use crate::core::Backend;
use crate::driver::session::Session;
use crate::errors::{DriverError, Result};
use crate::types::Locator;
use crate::utils::js;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

/// Poll interval for element waits.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Resolves symbolic locators against the session's active context.
///
/// Waits are bounded polling loops: they either observe at least one match
/// (rendered, for visibility waits) or fail with `ElementNotFound` once the
/// timeout elapses. Retrying a failed wait is the caller's decision, never
/// taken here.
pub struct LocatorResolver;

impl LocatorResolver {
    /// Number of matches right now, without waiting.
    pub fn count_now<B: Backend>(session: &Session<B>, locator: &Locator) -> Result<u64> {
        let body = format!(
            "var __nodes = {finder};\
             return {{ ok: true, count: __nodes.length }};",
            finder = js::find_all(locator)
        );
        let map = session.expect_ok(&body)?;
        Ok(map.get("count").and_then(Value::as_u64).unwrap_or(0))
    }

    /// Number of rendered matches right now, without waiting.
    pub fn visible_count_now<B: Backend>(session: &Session<B>, locator: &Locator) -> Result<u64> {
        let body = format!(
            "var __nodes = {finder};\
             var visible = 0;\
             for (var i = 0; i < __nodes.length; i++) {{\
               if (__vis(__nodes[i])) {{ visible++; }}\
             }}\
             return {{ ok: true, count: visible }};",
            finder = js::find_all(locator)
        );
        let map = session.expect_ok(&body)?;
        Ok(map.get("count").and_then(Value::as_u64).unwrap_or(0))
    }

    /// Wait until at least one match exists.
    pub fn wait_for_present<B: Backend>(
        session: &Session<B>,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<()> {
        Self::wait(session, locator, timeout, Self::count_now)
    }

    /// Wait until at least one match exists and is rendered.
    pub fn wait_for_visible<B: Backend>(
        session: &Session<B>,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<()> {
        Self::wait(session, locator, timeout, Self::visible_count_now)
    }

    fn wait<B: Backend>(
        session: &Session<B>,
        locator: &Locator,
        timeout: Duration,
        probe: fn(&Session<B>, &Locator) -> Result<u64>,
    ) -> Result<()> {
        let start = Instant::now();
        loop {
            if probe(session, locator)? > 0 {
                return Ok(());
            }
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                debug!(locator = %locator.expression, ?timeout, "element wait exhausted");
                return Err(DriverError::ElementNotFound(format!(
                    "{} (waited {}ms)",
                    locator.expression,
                    timeout.as_millis()
                )));
            }
            std::thread::sleep(POLL_INTERVAL.min(timeout - elapsed));
        }
    }

    /// Trimmed visible text of every match, in document order, with blank
    /// entries dropped.
    pub fn visible_texts<B: Backend>(
        session: &Session<B>,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Vec<String>> {
        Self::wait_for_present(session, locator, timeout)?;
        let body = format!(
            "var __nodes = {finder};\
             var texts = [];\
             for (var i = 0; i < __nodes.length; i++) {{\
               if (!__vis(__nodes[i])) {{ continue; }}\
               texts.push((__nodes[i].innerText || __nodes[i].textContent || '').trim());\
             }}\
             return {{ ok: true, texts: texts }};",
            finder = js::find_all(locator)
        );
        let map = session.expect_ok(&body)?;
        let texts: Vec<String> =
            serde_json::from_value(map.get("texts").cloned().unwrap_or(Value::Array(Vec::new())))?;
        Ok(drop_blank(texts))
    }
}

fn drop_blank(texts: Vec<String>) -> Vec<String> {
    texts.into_iter().filter(|t| !t.trim().is_empty()).collect()
}
