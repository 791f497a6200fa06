use crate::core::Backend;
use crate::driver::locator::LocatorResolver;
use crate::driver::session::Session;
use crate::errors::{DriverError, Result};
use crate::types::{Locator, ScrollDirection, ScrollTarget};
use crate::utils::js;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Magnitude of one mechanical scroll step.
pub const SCROLL_STEP_PX: u32 = 400;

/// Bottom passes used to trigger lazy-loaded content before a footer search.
const BOTTOM_PASSES: u32 = 3;
const LAZY_LOAD_PAUSE: Duration = Duration::from_millis(300);

/// Directional and search scrolling.
///
/// Search variants are bounded: at most `max_scrolls` steps, each followed by
/// a presence probe. Exhausting the bound is a failed search reported as
/// `Ok(false)`, never an error; whether that fails the test is the caller's
/// call.
pub struct Scroller;

impl Scroller {
    /// `count` fixed-magnitude steps with `delay` between them. Purely
    /// mechanical, no target condition.
    pub fn scroll<B: Backend>(
        session: &Session<B>,
        direction: ScrollDirection,
        count: u32,
        delay: Duration,
    ) -> Result<()> {
        for i in 0..count {
            Self::step(session, direction, SCROLL_STEP_PX)?;
            if i + 1 < count {
                std::thread::sleep(delay);
            }
        }
        Ok(())
    }

    fn step<B: Backend>(
        session: &Session<B>,
        direction: ScrollDirection,
        step: u32,
    ) -> Result<()> {
        let (dx, dy) = direction.delta(step);
        session
            .expect_ok(&format!("__win.scrollBy({dx}, {dy}); return {{ ok: true }};"))
            .map(|_| ())
    }

    /// Scroll stepwise until the target locator resolves or the bound is
    /// exhausted. The found element is centered in the viewport.
    pub fn search<B: Backend>(
        session: &Session<B>,
        direction: ScrollDirection,
        target: &ScrollTarget,
    ) -> Result<bool> {
        if LocatorResolver::count_now(session, &target.locator)? > 0 {
            Self::center(session, &target.locator)?;
            return Ok(true);
        }
        for _ in 0..target.max_scrolls {
            Self::step(session, direction, target.step)?;
            std::thread::sleep(target.delay);
            if LocatorResolver::count_now(session, &target.locator)? > 0 {
                Self::center(session, &target.locator)?;
                return Ok(true);
            }
        }
        debug!(
            locator = %target.locator.expression,
            max_scrolls = target.max_scrolls,
            "search scroll exhausted without a match"
        );
        Ok(false)
    }

    /// Center the first match in the viewport.
    pub fn center<B: Backend>(session: &Session<B>, locator: &Locator) -> Result<()> {
        let body = format!(
            "var __nodes = {finder};\
             if (!__nodes.length) {{ return {{ ok: false, error: 'not-found' }}; }}\
             __nodes[0].scrollIntoView({{ block: 'center', inline: 'center' }});\
             return {{ ok: true }};",
            finder = js::find_all(locator)
        );
        let map = session.eval_object(&body)?;
        if crate::driver::session::object_ok(&map) {
            Ok(())
        } else {
            Err(DriverError::ElementNotFound(locator.expression.clone()))
        }
    }

    /// Two-level rail/card search: bring the rail into view when given, then
    /// search within it for a card matching the locator and/or text filter.
    /// With neither card filter this degrades to "rail into view".
    pub fn to_card_view<B: Backend>(
        session: &Session<B>,
        max_scrolls: u32,
        rail: Option<&Locator>,
        card: Option<&Locator>,
        text: Option<&str>,
    ) -> Result<bool> {
        if let Some(rail_locator) = rail {
            let target = ScrollTarget::new(rail_locator.clone()).max_scrolls(max_scrolls);
            if !Self::search(session, ScrollDirection::Down, &target)? {
                return Ok(false);
            }
        }
        if card.is_none() && text.is_none() {
            return Ok(true);
        }
        if Self::card_probe(session, rail, card, text)? {
            return Ok(true);
        }
        for _ in 0..max_scrolls {
            Self::card_step(session, rail)?;
            std::thread::sleep(LAZY_LOAD_PAUSE);
            if Self::card_probe(session, rail, card, text)? {
                return Ok(true);
            }
        }
        debug!(max_scrolls, "card search exhausted without a match");
        Ok(false)
    }

    /// One probe for a matching card; centers and reports `found` when hit.
    fn card_probe<B: Backend>(
        session: &Session<B>,
        rail: Option<&Locator>,
        card: Option<&Locator>,
        text: Option<&str>,
    ) -> Result<bool> {
        let scope = match rail {
            Some(rail_locator) => format!(
                "var __rails = {finder};\
                 if (!__rails.length) {{ return {{ ok: true, found: false }}; }}\
                 var scope = __rails[0];",
                finder = js::find_all(rail_locator)
            ),
            None => "var scope = __doc;".to_string(),
        };
        let candidates = match card {
            Some(card_locator) => js::find_all_in(card_locator, "scope"),
            // No card locator: the rail's direct children are the cards.
            None => "Array.prototype.slice.call(scope.children || [])".to_string(),
        };
        let filter = match text {
            Some(text) => format!(
                "(c.innerText || c.textContent || '').trim() === '{}'",
                js::escape(text)
            ),
            None => "true".to_string(),
        };
        let body = format!(
            "{scope}\
             var cards = {candidates};\
             for (var i = 0; i < cards.length; i++) {{\
               var c = cards[i];\
               if ({filter}) {{\
                 c.scrollIntoView({{ block: 'center', inline: 'center' }});\
                 return {{ ok: true, found: true }};\
               }}\
             }}\
             return {{ ok: true, found: false }};"
        );
        let map = session.expect_ok(&body)?;
        Ok(map.get("found").and_then(Value::as_bool).unwrap_or(false))
    }

    /// Advance the card search: sideways within the rail, downward otherwise.
    fn card_step<B: Backend>(session: &Session<B>, rail: Option<&Locator>) -> Result<()> {
        match rail {
            Some(rail_locator) => {
                let body = format!(
                    "var __rails = {finder};\
                     if (!__rails.length) {{ return {{ ok: false, error: 'not-found' }}; }}\
                     __rails[0].scrollBy({step}, 0);\
                     return {{ ok: true }};",
                    finder = js::find_all(rail_locator),
                    step = SCROLL_STEP_PX
                );
                session.expect_ok(&body).map(|_| ())
            }
            None => Self::step(session, ScrollDirection::Down, SCROLL_STEP_PX),
        }
    }

    /// Repeatedly jump to the document bottom so lazy-loaded content gets a
    /// chance to render, then fall back to a generic search scroll for the
    /// footer locator.
    pub fn to_footer<B: Backend>(
        session: &Session<B>,
        footer: &Locator,
        max_scrolls: u32,
    ) -> Result<bool> {
        let mut last_height = -1i64;
        for _ in 0..BOTTOM_PASSES {
            let map = session.expect_ok(
                "__win.scrollTo(0, __doc.body.scrollHeight);\
                 return { ok: true, height: __doc.body.scrollHeight };",
            )?;
            let height = map.get("height").and_then(Value::as_i64).unwrap_or(0);
            if height == last_height {
                break;
            }
            last_height = height;
            std::thread::sleep(LAZY_LOAD_PAUSE);
        }
        let target = ScrollTarget::new(footer.clone()).max_scrolls(max_scrolls);
        Self::search(session, ScrollDirection::Down, &target)
    }
}
