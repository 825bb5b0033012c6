pub mod config;
pub mod convert;
pub mod csv_loader;
pub mod palette;
pub mod records;

pub use config::*;
pub use csv_loader::*;
pub use records::*;
