pub mod engine;
pub mod features;

pub use engine::*;
pub use features::*;
