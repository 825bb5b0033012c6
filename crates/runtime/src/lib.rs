pub mod budget;
pub mod cancel;
pub mod event_bus;
pub mod frame;
pub mod progressive;
pub mod pump;

pub use budget::*;
pub use cancel::*;
pub use event_bus::*;
pub use frame::*;
pub use progressive::*;
pub use pump::*;
