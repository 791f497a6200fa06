use crate::core::config::ConfigSource;
use crate::errors::{DriverError, Result};
use crate::types::{LinkReport, Locator, ScrollDirection, ScrollTarget};
use std::time::Duration;
use uuid::Uuid;

/// The capability surface every platform driver implements.
///
/// Each operation acts on the calling thread's session. Operations a platform
/// cannot provide must fail with [`DriverError::UnsupportedOperation`] rather
/// than silently doing nothing; defaults below do exactly that for the
/// platform-optional capabilities.
pub trait TestInterface {
    // Lifecycle

    /// Create a session for the calling thread. Fails with
    /// `AlreadyInitialized` when the thread already owns one and with
    /// `ConnectionFailed` when the endpoint cannot be reached.
    fn connect(&self, config: &dyn ConfigSource) -> Result<Uuid>;

    /// Whether the calling thread owns a live session. Never fails.
    fn is_initialized(&self) -> bool;

    /// Release the calling thread's session. No-op without one.
    fn teardown(&self) -> Result<()>;

    /// Session id of the calling thread, `None` when uninitialized.
    fn session_id(&self) -> Option<Uuid>;

    // Navigation

    fn navigate_to_url(&self, url: &str) -> Result<()>;

    fn current_url(&self) -> Result<String>;

    /// Poll until the document reports itself ready or the timeout elapses.
    /// Returns whether the page became ready; exhaustion is not an error.
    fn wait_for_page_ready(&self, timeout: Duration) -> Result<bool>;

    // Interaction

    fn click(&self, locator: &Locator) -> Result<()>;

    /// Click `count` times with `delay` between clicks, resolving the locator
    /// fresh on every iteration.
    fn click_times(&self, locator: &Locator, count: u32, delay: Duration) -> Result<()>;

    fn hover(&self, locator: &Locator) -> Result<()>;

    /// Clear the element's current content, then type `text`.
    fn set_text(&self, locator: &Locator, text: &str) -> Result<()>;

    /// Visible text of the first match; `None` when the element has none.
    fn get_text(&self, locator: &Locator) -> Result<Option<String>>;

    /// Attribute value of the first match; `None` when absent. Whether an
    /// empty value is distinguishable from an absent one is left to the
    /// platform.
    fn get_attribute(&self, locator: &Locator, name: &str) -> Result<Option<String>>;

    /// Trimmed visible text of every match, document order, empties dropped.
    fn visible_texts(&self, locator: &Locator) -> Result<Vec<String>>;

    /// Select a radio button inside `container` by its visible label text.
    fn set_radio_button_value(&self, container: &Locator, label: &str) -> Result<()>;

    /// Probe every anchor on the page and classify it. Best-effort: one
    /// unreachable link never stops the rest of the scan.
    fn check_broken_links(&self) -> Result<Vec<LinkReport>>;

    fn take_screenshot(&self) -> Result<Vec<u8>>;

    // Scrolling

    /// `count` mechanical scroll steps with `delay` between them.
    fn scroll(&self, direction: ScrollDirection, count: u32, delay: Duration) -> Result<()>;

    /// Scroll stepwise until the target resolves or its bound is exhausted.
    /// Returns whether it was found; exhaustion is a failed search, not an
    /// error.
    fn scroll_until_visible(&self, direction: ScrollDirection, target: &ScrollTarget)
        -> Result<bool>;

    /// Two-level rail/card search. Brings the rail into view when given, then
    /// searches within it for a card matching the locator and/or text filter.
    /// With neither filter this degrades to "rail into view".
    fn scroll_to_card_view(
        &self,
        max_scrolls: u32,
        rail: Option<&Locator>,
        card: Option<&Locator>,
        text: Option<&str>,
    ) -> Result<bool>;

    /// Repeatedly scroll to the document bottom (to trigger lazy-loaded
    /// content), then search for the footer locator.
    fn scroll_to_footer(&self, footer: &Locator, max_scrolls: u32) -> Result<bool>;

    // Context

    /// Wait for the frame element (bounded), then scope subsequent locator
    /// resolution on this thread to that frame's document.
    fn switch_to_frame(&self, frame: &Locator) -> Result<()>;

    /// Return to the top-level document, regardless of frame depth reached.
    fn switch_to_default_content(&self) -> Result<()>;

    fn switch_to_window(&self, handle: &str) -> Result<()>;

    fn window_handles(&self) -> Result<Vec<String>>;

    /// Handle of the window the session started in.
    fn parent_window_handle(&self) -> Result<String>;

    // Platform-optional capabilities

    /// Toggle simulated offline mode. Platforms without a network-condition
    /// backend keep this default.
    fn set_network_offline(&self, _offline: bool) -> Result<()> {
        Err(DriverError::UnsupportedOperation("set_network_offline"))
    }
}
