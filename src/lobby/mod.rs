//! Room lobby: join codes and the registry of live rooms

pub mod code;
pub mod registry;

pub use registry::RoomRegistry;
