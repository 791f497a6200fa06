use crate::core::Backend;
use crate::driver::locator::LocatorResolver;
use crate::driver::session::Session;
use crate::errors::Result;
use crate::types::Locator;
use crate::utils::js;
use std::time::Duration;
use tracing::debug;

/// Default bound for the frame-presence wait.
pub const FRAME_WAIT: Duration = Duration::from_secs(10);

/// Frame and window/tab context management.
///
/// A thread has exactly one active context. The frame stack has depth 1:
/// switching frames always starts from the top-level document, and
/// `switch_to_default_content` returns there no matter how the frame was
/// reached.
pub struct ContextSwitcher;

impl ContextSwitcher {
    /// Wait for the frame element (bounded), verify its document is
    /// reachable, then scope the thread's locator resolution to it.
    pub fn switch_to_frame<B: Backend>(session: &Session<B>, frame: &Locator) -> Result<()> {
        // Frames are always resolved against the top-level document.
        session.set_frame(None);
        LocatorResolver::wait_for_present(session, frame, FRAME_WAIT)?;
        let body = format!(
            "var __frames = {finder};\
             if (!__frames.length) {{ return {{ ok: false, error: 'frame-not-found' }}; }}\
             if (!__frames[0].contentDocument) {{ return {{ ok: false, error: 'frame-not-reachable' }}; }}\
             return {{ ok: true }};",
            finder = js::find_all(frame)
        );
        session.expect_ok(&body)?;
        session.set_frame(Some(frame.clone()));
        debug!(frame = %frame.expression, "entered frame context");
        Ok(())
    }

    /// Return to the top-level document.
    pub fn switch_to_default_content<B: Backend>(session: &Session<B>) -> Result<()> {
        session.set_frame(None);
        Ok(())
    }

    /// Make the window with the given handle the thread's active context.
    /// The frame context is dropped: it belonged to the previous window.
    pub fn switch_to_window<B: Backend>(session: &Session<B>, handle: &str) -> Result<()> {
        session.set_frame(None);
        session.backend().activate_window(handle)?;
        debug!(handle, "switched window context");
        Ok(())
    }
}
