pub mod js;
pub mod screenshot;

pub use screenshot::Screenshots;
