//! Collision and intersection primitives
//!
//! Everything here is pure; the combat, visibility and movement code composes these.

use serde::{Deserialize, Serialize};

/// Near-parallel threshold for segment intersection
const PARALLEL_EPSILON: f32 = 1e-10;

/// 2D point / vector
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle` (radians)
    pub fn from_angle(angle: f32) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    /// Angle of this vector in radians
    pub fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Unit vector in the same direction, or zero for a zero vector
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len > 0.0 {
            self * (1.0 / len)
        } else {
            Self::ZERO
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned rectangle, corner-based (`x`, `y` is the top-left corner)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Square of side `2 * half_size` centered on `center`
    pub fn around(center: Vec2, half_size: f32) -> Self {
        Self::new(
            center.x - half_size,
            center.y - half_size,
            half_size * 2.0,
            half_size * 2.0,
        )
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Inclusive point containment
    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Distance from `p` to the closest point of the rectangle (0 inside)
    pub fn distance_to(&self, p: Vec2) -> f32 {
        let closest = Vec2::new(p.x.clamp(self.x, self.right()), p.y.clamp(self.y, self.bottom()));
        p.distance(closest)
    }

    /// The four boundary edges as (start, end) pairs
    fn edges(&self) -> [(Vec2, Vec2); 4] {
        let tl = Vec2::new(self.x, self.y);
        let tr = Vec2::new(self.right(), self.y);
        let br = Vec2::new(self.right(), self.bottom());
        let bl = Vec2::new(self.x, self.bottom());
        [(tl, tr), (tr, br), (br, bl), (bl, tl)]
    }
}

/// True iff the rectangles share positive-area overlap. Touching edges do not count.
pub fn rect_overlap(a: &Rect, b: &Rect) -> bool {
    a.x < b.right() && a.right() > b.x && a.y < b.bottom() && a.bottom() > b.y
}

/// Cheap square hit test: `point` lies within `half_size` of the rectangle's anchor
/// corner (`square.x`, `square.y`) on both axes.
///
/// Looser than a true circle test at the corners.
pub fn circle_in_square(point: Vec2, square: &Rect, half_size: f32) -> bool {
    (point.x - square.x).abs() <= half_size && (point.y - square.y).abs() <= half_size
}

/// True iff two circles whose centers are `distance` apart touch or overlap
pub fn circle_vs_circle(distance: f32, r1: f32, r2: f32) -> bool {
    distance <= r1 + r2
}

/// Parametric segment intersection with `t, u ∈ [0, 1]`.
/// Parallel and near-parallel segments never intersect.
pub fn segment_intersects_segment(p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2) -> bool {
    let det = (p2.x - p1.x) * (p4.y - p3.y) - (p2.y - p1.y) * (p4.x - p3.x);
    if det.abs() < PARALLEL_EPSILON {
        return false;
    }

    let t = ((p3.x - p1.x) * (p4.y - p3.y) - (p3.y - p1.y) * (p4.x - p3.x)) / det;
    let u = ((p3.x - p1.x) * (p2.y - p1.y) - (p3.y - p1.y) * (p2.x - p1.x)) / det;

    (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)
}

/// True iff the segment crosses any of the rectangle's four edges
pub fn segment_intersects_rect(p1: Vec2, p2: Vec2, rect: &Rect) -> bool {
    rect.edges()
        .iter()
        .any(|&(a, b)| segment_intersects_segment(p1, p2, a, b))
}
