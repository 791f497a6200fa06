pub mod chrome;
pub mod context;
pub mod interaction;
pub mod links;
pub mod locator;
pub mod registry;
pub mod scroll;
pub mod session;
pub mod web;

pub use chrome::ChromeBackend;
pub use context::ContextSwitcher;
pub use interaction::Interactor;
pub use links::{HttpProber, LinkProber, LinkScanner};
pub use locator::LocatorResolver;
pub use registry::SessionRegistry;
pub use scroll::Scroller;
pub use session::Session;
pub use web::{ChromeDriver, WebDriver};
