pub mod markers;
pub mod stage;

pub use markers::*;
pub use stage::*;
