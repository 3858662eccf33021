//! Room simulation modules

pub mod combat;
pub mod error;
pub mod geometry;
pub mod physics;
pub mod room;
pub mod rules;
pub mod runner;
pub mod simulation;
pub mod snapshot;
pub mod state;
pub mod visibility;

pub use error::{IntentError, RoomError};
pub use room::{Room, RoomEffect, RoomPhase};
pub use runner::{RoomCommand, RoomHandle, RoomTask};

use geometry::Vec2;

/// In-room intent from an occupant
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    /// Queue movement for the next tick
    Move { dx: f32, dy: f32, dt: f32 },
    /// Face toward a point immediately
    Aim { target: Vec2 },
    /// Fire toward a point
    Shoot { target: Vec2 },
    /// Activate a powerup by wire id
    UsePowerup { powerup: u8 },
    /// Ask for a rematch
    RematchVote,
}
