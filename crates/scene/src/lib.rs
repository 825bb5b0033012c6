pub mod animation;
pub mod arcs;
pub mod camera;
pub mod components;
pub mod markers;
pub mod picking;
pub mod positions;
pub mod prefabs;
pub mod primitives;
pub mod session;
pub mod world;

pub use session::{SceneSession, SelectionChange, SessionConfig, SessionError};
pub use world::*;
