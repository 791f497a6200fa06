use crate::core::{Backend, BrowserKind, DriverConfig};
use crate::errors::{DriverError, Result};
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::ffi::OsStr;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Chrome binding over the DevTools protocol.
///
/// Window handles are DevTools target ids. The active tab is tracked here;
/// the driver never touches `Tab` directly.
pub struct ChromeBackend {
    browser: Mutex<Option<Browser>>,
    active: Mutex<Option<Arc<Tab>>>,
}

impl ChromeBackend {
    pub fn new() -> Self {
        Self {
            browser: Mutex::new(None),
            active: Mutex::new(None),
        }
    }

    fn active_tab(&self) -> Result<Arc<Tab>> {
        self.lock_active()
            .clone()
            .ok_or_else(|| DriverError::Backend("browser not launched".to_string()))
    }

    fn lock_browser(&self) -> std::sync::MutexGuard<'_, Option<Browser>> {
        self.browser
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<Arc<Tab>>> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ChromeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for ChromeBackend {
    fn launch(&mut self, config: &DriverConfig) -> Result<()> {
        if config.browser != BrowserKind::Chrome {
            return Err(DriverError::UnsupportedOperation(
                "only the chrome browser kind is supported by this backend",
            ));
        }
        let window_size_arg = format!(
            "--window-size={},{}",
            config.viewport.width, config.viewport.height
        );

        let mut args = vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new(&window_size_arg),
        ];
        for arg in &config.args {
            args.push(OsStr::new(arg));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .args(args)
            .build()
            .map_err(|e| DriverError::ConnectionFailed(e.to_string()))?;

        let browser =
            Browser::new(launch_options).map_err(|e| DriverError::ConnectionFailed(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| DriverError::ConnectionFailed(e.to_string()))?;

        info!(
            headless = config.headless,
            width = config.viewport.width,
            height = config.viewport.height,
            "chrome launched"
        );
        *self.lock_active() = Some(tab);
        *self.lock_browser() = Some(browser);
        Ok(())
    }

    fn navigate(&self, url: &str) -> Result<()> {
        let tab = self.active_tab()?;
        tab.navigate_to(url)
            .map_err(|e| DriverError::Backend(e.to_string()))?;
        tab.wait_until_navigated()
            .map_err(|e| DriverError::Timeout(e.to_string()))?;
        Ok(())
    }

    fn evaluate(&self, script: &str) -> Result<Value> {
        let result = self
            .active_tab()?
            .evaluate(script, true)
            .map_err(|e| DriverError::Script(e.to_string()))?;
        Ok(result.value.unwrap_or(Value::Null))
    }

    fn screenshot(&self) -> Result<Vec<u8>> {
        self.active_tab()?
            .capture_screenshot(
                headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption::Png,
                None,
                None,
                true,
            )
            .map_err(|e| DriverError::Backend(e.to_string()))
    }

    fn current_url(&self) -> Result<String> {
        Ok(self.active_tab()?.get_url())
    }

    fn active_window(&self) -> Result<String> {
        Ok(self.active_tab()?.get_target_id().to_string())
    }

    fn window_handles(&self) -> Result<Vec<String>> {
        let guard = self.lock_browser();
        let browser = guard
            .as_ref()
            .ok_or_else(|| DriverError::Backend("browser not launched".to_string()))?;
        let tabs = browser
            .get_tabs()
            .lock()
            .map_err(|e| DriverError::Backend(e.to_string()))?;
        Ok(tabs.iter().map(|tab| tab.get_target_id().to_string()).collect())
    }

    fn activate_window(&self, handle: &str) -> Result<()> {
        let tab = {
            let guard = self.lock_browser();
            let browser = guard
                .as_ref()
                .ok_or_else(|| DriverError::Backend("browser not launched".to_string()))?;
            let tabs = browser
                .get_tabs()
                .lock()
                .map_err(|e| DriverError::Backend(e.to_string()))?;
            tabs.iter()
                .find(|tab| tab.get_target_id().as_str() == handle)
                .cloned()
                .ok_or_else(|| DriverError::Backend(format!("no window with handle {handle}")))?
        };
        tab.activate().map_err(|e| DriverError::Backend(e.to_string()))?;
        *self.lock_active() = Some(tab);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        *self.lock_active() = None;
        *self.lock_browser() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_chrome_kind_is_rejected_at_launch() {
        let mut backend = ChromeBackend::new();
        let config = DriverConfig {
            browser: BrowserKind::Firefox,
            ..DriverConfig::default()
        };
        assert!(matches!(
            backend.launch(&config).unwrap_err(),
            DriverError::UnsupportedOperation(_)
        ));
    }

    #[test]
    fn operations_before_launch_fail_cleanly() {
        let backend = ChromeBackend::new();
        assert!(backend.current_url().is_err());
        assert!(backend.window_handles().is_err());
        assert!(backend.close().is_ok());
    }
}
