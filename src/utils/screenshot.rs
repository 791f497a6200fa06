use crate::core::Backend;
use crate::driver::session::Session;
use crate::errors::Result;
use crate::types::{ElementRegion, Locator};
use crate::utils::js;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

/// Screenshot helpers layered over the backend's raw PNG capture.
pub struct Screenshots;

impl Screenshots {
    /// PNG of the active window.
    pub fn capture<B: Backend>(session: &Session<B>) -> Result<Vec<u8>> {
        session.backend().screenshot()
    }

    /// PNG of the active window, base64-encoded for report formats that
    /// embed images as text.
    pub fn capture_base64<B: Backend>(session: &Session<B>) -> Result<String> {
        Ok(STANDARD.encode(Self::capture(session)?))
    }

    /// Viewport-relative bounding box of the first match, `None` when the
    /// locator resolves to nothing.
    pub fn element_region<B: Backend>(
        session: &Session<B>,
        locator: &Locator,
    ) -> Result<Option<ElementRegion>> {
        let body = format!(
            "var __nodes = {finder};\
             if (!__nodes.length) {{ return {{ ok: true, region: null }}; }}\
             var r = __nodes[0].getBoundingClientRect();\
             return {{ ok: true, region: {{ x: r.left, y: r.top, width: r.width, height: r.height }} }};",
            finder = js::find_all(locator)
        );
        let map = session.expect_ok(&body)?;
        match map.get("region") {
            Some(Value::Object(_)) => {
                let region: ElementRegion =
                    serde_json::from_value(map.get("region").cloned().unwrap_or(Value::Null))?;
                Ok(Some(region))
            }
            _ => Ok(None),
        }
    }
}
