pub mod backend;
pub mod config;
pub mod interface;
pub mod listener;
pub mod report;

pub use backend::Backend;
pub use config::{BrowserKind, ConfigSource, DriverConfig, Viewport};
pub use interface::TestInterface;
pub use listener::{DriverListener, LifecycleState};
pub use report::ReportSink;
