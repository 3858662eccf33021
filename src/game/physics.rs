//! Player movement and collision response

use super::geometry::{rect_overlap, Rect, Vec2};
use super::rules::{PLAYER_RADIUS, PLAYER_SPEED};
use super::state::{Arena, Cover};

/// Physics system for moving players through the arena
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Clamp an untrusted direction to at most unit length.
    /// Non-finite input becomes zero.
    pub fn sanitize_direction(dx: f32, dy: f32) -> Vec2 {
        let dir = Vec2::new(dx, dy);
        if !dir.is_finite() {
            return Vec2::ZERO;
        }
        if dir.length() > 1.0 {
            dir.normalized()
        } else {
            dir
        }
    }

    /// True if a player body centered at `center` may stand there
    pub fn is_position_free(center: Vec2, arena: &Arena, covers: &[Cover]) -> bool {
        let body = Rect::around(center, PLAYER_RADIUS);
        arena.contains_rect(&body) && !covers.iter().any(|c| rect_overlap(&body, &c.rect))
    }

    /// Move a player along `direction` for `dt` seconds.
    ///
    /// Axis-separated: X is tried at the old Y, then Y at the resulting X, so a diagonal
    /// push into a wall slides along it instead of stopping.
    pub fn step_player(
        position: Vec2,
        direction: Vec2,
        dt: f32,
        arena: &Arena,
        covers: &[Cover],
    ) -> Vec2 {
        let displacement = direction * (PLAYER_SPEED * dt);
        let mut next = position;

        let try_x = Vec2::new(position.x + displacement.x, next.y);
        if displacement.x != 0.0 && Self::is_position_free(try_x, arena, covers) {
            next.x = try_x.x;
        }

        let try_y = Vec2::new(next.x, position.y + displacement.y);
        if displacement.y != 0.0 && Self::is_position_free(try_y, arena, covers) {
            next.y = try_y.y;
        }

        next
    }
}
