use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

/// Read-only key/value accessor the driver consults once, at connect time.
///
/// Test harnesses usually back this with their own parameter store; a plain
/// `HashMap` works for programmatic use.
pub trait ConfigSource {
    fn get_param(&self, key: &str, default: &str) -> String;
}

impl ConfigSource for HashMap<String, String> {
    fn get_param(&self, key: &str, default: &str) -> String {
        self.get(key).cloned().unwrap_or_else(|| default.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrowserKind {
    Chrome,
    Firefox,
    Edge,
    Safari,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Session configuration, immutable after connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    pub browser: BrowserKind,
    pub headless: bool,
    pub viewport: Viewport,
    /// Default bound for element-presence and visibility waits.
    pub implicit_wait: Duration,
    /// Bound for navigation and page-ready waits.
    pub page_load_timeout: Duration,
    /// Extra arguments passed through to the browser binary.
    pub args: Vec<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chrome,
            headless: true,
            viewport: Viewport::default(),
            implicit_wait: Duration::from_secs(10),
            page_load_timeout: Duration::from_secs(30),
            args: Vec::new(),
        }
    }
}

impl DriverConfig {
    /// Build a configuration from an external source, falling back to the
    /// defaults for anything absent or unparsable.
    pub fn from_source(source: &dyn ConfigSource) -> Self {
        let defaults = DriverConfig::default();

        let browser = match source.get_param("browser", "chrome").to_lowercase().as_str() {
            "chrome" => BrowserKind::Chrome,
            "firefox" => BrowserKind::Firefox,
            "edge" => BrowserKind::Edge,
            "safari" => BrowserKind::Safari,
            other => {
                warn!(browser = other, "unknown browser kind, using chrome");
                BrowserKind::Chrome
            }
        };

        let headless = source.get_param("headless", "true") == "true";
        let implicit_wait = parse_secs(
            &source.get_param("implicit_wait", ""),
            defaults.implicit_wait,
        );
        let page_load_timeout = parse_secs(
            &source.get_param("page_load_timeout", ""),
            defaults.page_load_timeout,
        );

        Self {
            browser,
            headless,
            implicit_wait,
            page_load_timeout,
            ..defaults
        }
    }
}

fn parse_secs(raw: &str, default: Duration) -> Duration {
    if raw.is_empty() {
        return default;
    }
    match raw.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => {
            warn!(value = raw, "unparsable timeout, keeping default");
            default
        }
    }
}
