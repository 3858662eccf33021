//! Line-of-sight between the two occupants

use super::geometry::{segment_intersects_rect, Vec2};
use super::state::Cover;

/// True iff no live cover blocks the segment between `a` and `b`.
/// Symmetric: the sightline has no direction.
pub fn line_of_sight(a: Vec2, b: Vec2, covers: &[Cover]) -> bool {
    !covers.iter().any(|cover| segment_intersects_rect(a, b, &cover.rect))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::geometry::Rect;

    fn wall() -> Vec<Cover> {
        vec![Cover {
            id: 0,
            rect: Rect::new(100.0, 0.0, 20.0, 200.0),
        }]
    }

    #[test]
    fn test_blocked_by_cover() {
        let a = Vec2::new(50.0, 100.0);
        let b = Vec2::new(200.0, 100.0);
        assert!(!line_of_sight(a, b, &wall()));
        assert!(!line_of_sight(b, a, &wall()));
    }

    #[test]
    fn test_clear_around_cover() {
        let a = Vec2::new(50.0, 300.0);
        let b = Vec2::new(200.0, 300.0);
        assert!(line_of_sight(a, b, &wall()));
        assert!(line_of_sight(a, b, &[]));
    }

    #[test]
    fn test_destroyed_cover_restores_sight() {
        let a = Vec2::new(50.0, 100.0);
        let b = Vec2::new(200.0, 100.0);
        let mut covers = wall();
        covers.clear();
        assert!(line_of_sight(a, b, &covers));
    }
}
