//! Gameplay tuning constants
//!
//! Distances are in arena units, durations in milliseconds, speeds in units per second.

use super::geometry::{Rect, Vec2};

/// Arena width
pub const ARENA_WIDTH: f32 = 1200.0;
/// Arena height
pub const ARENA_HEIGHT: f32 = 800.0;

/// Player hit radius (players are 40x40 squares for movement collision)
pub const PLAYER_RADIUS: f32 = 20.0;
/// Maximum health
pub const MAX_HEALTH: i32 = 100;
/// Movement speed
pub const PLAYER_SPEED: f32 = 250.0;

/// Projectile travel speed
pub const PROJECTILE_SPEED: f32 = 600.0;
/// Projectile hit radius
pub const PROJECTILE_RADIUS: f32 = 5.0;
/// Damage of a normal shot
pub const NORMAL_DAMAGE: i32 = 10;
/// Base (epicenter) damage of an explosion
pub const EXPLOSIVE_DAMAGE: i32 = 40;
/// Explosion radius
pub const EXPLOSION_RADIUS: f32 = 100.0;
/// Explosive projectiles detonate on their own after this long
pub const EXPLOSIVE_FUSE_MS: u64 = 2_000;

/// Laser damage
pub const LASER_DAMAGE: i32 = 30;
/// Distance between laser samples
pub const LASER_STEP: f32 = 5.0;

/// Time between shots
pub const RELOAD_MS: u64 = 1_000;

/// Powerup costs, in points
pub const LASER_COST: u32 = 30;
pub const EXPLOSIVE_COST: u32 = 20;
pub const SHIELD_COST: u32 = 15;

/// Absorption granted by the shield powerup
pub const SHIELD_AMOUNT: i32 = 50;
/// Shield lifetime
pub const SHIELD_DURATION_MS: u64 = 5_000;

/// Projectile colors (render hints only)
pub const NORMAL_COLOR: &str = "#ffffff";
pub const EXPLOSIVE_COLOR: &str = "#ff8800";
pub const LASER_COLOR: &str = "#ff0044";

/// Spawn points, indexed by seat (join order)
pub fn spawn_point(seat: usize) -> Vec2 {
    match seat {
        0 => Vec2::new(100.0, ARENA_HEIGHT / 2.0),
        _ => Vec2::new(ARENA_WIDTH - 100.0, ARENA_HEIGHT / 2.0),
    }
}

/// Initial facing per seat: toward the opponent
pub fn spawn_angle(seat: usize) -> f32 {
    match seat {
        0 => 0.0,
        _ => std::f32::consts::PI,
    }
}

/// Static cover layout restored at every match start
pub fn cover_layout() -> Vec<Rect> {
    vec![
        Rect::new(300.0, 150.0, 60.0, 160.0),
        Rect::new(300.0, 490.0, 60.0, 160.0),
        Rect::new(570.0, 340.0, 60.0, 120.0),
        Rect::new(840.0, 150.0, 60.0, 160.0),
        Rect::new(840.0, 490.0, 60.0, 160.0),
        Rect::new(520.0, 80.0, 160.0, 40.0),
        Rect::new(520.0, 680.0, 160.0, 40.0),
    ]
}
