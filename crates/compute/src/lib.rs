pub mod analysis;
pub mod filters;

pub use analysis::*;
pub use filters::*;
