use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Symbolic element locator: an XPath or CSS expression, plus an optional
/// attribute name for attribute reads.
///
/// The expression kind is detected from its shape, the way most test
/// frameworks accept mixed locator tables: anything starting with `//`, `(`,
/// `./` or `.//` is treated as XPath, everything else as a CSS selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub expression: String,
    pub attribute: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorKind {
    XPath,
    Css,
}

impl Locator {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            attribute: None,
        }
    }

    /// Locator intended for an attribute read.
    pub fn with_attribute(expression: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            attribute: Some(attribute.into()),
        }
    }

    pub fn kind(&self) -> LocatorKind {
        let e = self.expression.as_str();
        if e.starts_with("//") || e.starts_with('(') || e.starts_with("./") {
            LocatorKind::XPath
        } else {
            LocatorKind::Css
        }
    }
}

impl From<&str> for Locator {
    fn from(expression: &str) -> Self {
        Locator::new(expression)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrollDirection {
    Down,
    Up,
    Left,
    Right,
}

impl ScrollDirection {
    /// Pixel delta `(dx, dy)` for one scroll step of the given magnitude.
    pub fn delta(self, step: u32) -> (i64, i64) {
        let step = i64::from(step);
        match self {
            ScrollDirection::Down => (0, step),
            ScrollDirection::Up => (0, -step),
            ScrollDirection::Left => (-step, 0),
            ScrollDirection::Right => (step, 0),
        }
    }
}

/// Target of a search scroll: the locator to look for plus the search bounds.
/// Constructed per call and discarded afterwards.
#[derive(Debug, Clone)]
pub struct ScrollTarget {
    pub locator: Locator,
    pub max_scrolls: u32,
    pub step: u32,
    pub delay: Duration,
}

impl ScrollTarget {
    pub fn new(locator: Locator) -> Self {
        Self {
            locator,
            max_scrolls: 10,
            step: 400,
            delay: Duration::from_millis(300),
        }
    }

    pub fn max_scrolls(mut self, max_scrolls: u32) -> Self {
        self.max_scrolls = max_scrolls;
        self
    }

    pub fn step(mut self, step: u32) -> Self {
        self.step = step;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Outcome of probing one anchor during a broken-link scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkHealth {
    /// Probe answered with a status below 400. `None` when the scheme is not
    /// probeable (mailto:, tel:, javascript:) and the link was passed through.
    Healthy(Option<u16>),
    /// Status 400 or above, or the endpoint was unreachable (`None`).
    Broken(Option<u16>),
    /// Anchor without an href, or with a blank one.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReport {
    pub href: Option<String>,
    pub health: LinkHealth,
}

impl LinkReport {
    pub fn is_broken(&self) -> bool {
        matches!(self.health, LinkHealth::Broken(_))
    }
}

/// Viewport-relative bounding box of an element, attached alongside
/// screenshots so report sinks can mark the acted-on region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_kind_detection() {
        assert_eq!(Locator::new("//div[@id='x']").kind(), LocatorKind::XPath);
        assert_eq!(Locator::new("(//a)[2]").kind(), LocatorKind::XPath);
        assert_eq!(Locator::new("./span").kind(), LocatorKind::XPath);
        assert_eq!(Locator::new(".//span").kind(), LocatorKind::XPath);
        assert_eq!(Locator::new("#login .button").kind(), LocatorKind::Css);
        assert_eq!(Locator::new("input[name='q']").kind(), LocatorKind::Css);
    }

    #[test]
    fn scroll_deltas() {
        assert_eq!(ScrollDirection::Down.delta(400), (0, 400));
        assert_eq!(ScrollDirection::Up.delta(400), (0, -400));
        assert_eq!(ScrollDirection::Left.delta(250), (-250, 0));
        assert_eq!(ScrollDirection::Right.delta(250), (250, 0));
    }

    #[test]
    fn scroll_target_builder() {
        let t = ScrollTarget::new(Locator::new("#footer"))
            .max_scrolls(5)
            .step(200)
            .delay(Duration::from_millis(50));
        assert_eq!(t.max_scrolls, 5);
        assert_eq!(t.step, 200);
        assert_eq!(t.delay, Duration::from_millis(50));
    }
}
