//! Thread-scoped UI-automation driver with a Chrome binding.
//!
//! The [`TestInterface`] trait is the capability surface test code programs
//! against; [`WebDriver`] implements it over any [`Backend`], and
//! [`ChromeDriver`] binds it to Chrome through the DevTools protocol. Every
//! thread owns at most one session, so a shared driver instance serves a
//! whole parallel suite.
//!
//! ```no_run
//! use std::collections::HashMap;
//! use testrig::{ChromeDriver, Locator, TestInterface};
//!
//! let driver = ChromeDriver::chrome();
//! driver.connect(&HashMap::new())?;
//! driver.navigate_to_url("https://example.com")?;
//! driver.click(&Locator::new("#start"))?;
//! driver.teardown()?;
//! # Ok::<(), testrig::DriverError>(())
//! ```

pub mod core;
pub mod driver;
pub mod errors;
pub mod testing;
pub mod types;
pub mod utils;

pub use crate::core::{
    Backend, BrowserKind, ConfigSource, DriverConfig, DriverListener, LifecycleState, ReportSink,
    TestInterface, Viewport,
};
pub use crate::driver::{ChromeBackend, ChromeDriver, WebDriver};
pub use crate::errors::{DriverError, Result};
pub use crate::types::{
    ElementRegion, LinkHealth, LinkReport, Locator, ScrollDirection, ScrollTarget,
};
pub use crate::utils::Screenshots;
