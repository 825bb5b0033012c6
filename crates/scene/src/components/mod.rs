pub mod light;
pub mod transform;

pub use light::*;
pub use transform::*;
