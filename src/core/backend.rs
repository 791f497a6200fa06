use crate::core::config::DriverConfig;
use crate::errors::Result;
use serde_json::Value;

/// Seam between driver logic and the underlying automation endpoint.
///
/// Everything element-level goes through [`Backend::evaluate`]: the driver
/// injects scripts that return JSON objects and inspects those, so an
/// implementation only has to provide page-level primitives. Window handles
/// are opaque strings owned by the backend (target ids for the Chrome
/// binding).
pub trait Backend: Send + Sync + 'static {
    /// Launch or attach to the automation endpoint.
    fn launch(&mut self, config: &DriverConfig) -> Result<()>;

    /// Navigate the active window to a URL and wait for the load to settle.
    fn navigate(&self, url: &str) -> Result<()>;

    /// Evaluate a script in the active window, returning its JSON value.
    fn evaluate(&self, script: &str) -> Result<Value>;

    /// PNG screenshot of the active window.
    fn screenshot(&self) -> Result<Vec<u8>>;

    /// URL of the active window.
    fn current_url(&self) -> Result<String>;

    /// Handle of the active window.
    fn active_window(&self) -> Result<String>;

    /// Handles of every open window, in opening order.
    fn window_handles(&self) -> Result<Vec<String>>;

    /// Make the window with the given handle the active one.
    fn activate_window(&self, handle: &str) -> Result<()>;

    /// Release the endpoint. Idempotent.
    fn close(&self) -> Result<()>;
}
