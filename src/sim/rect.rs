//! Axis-aligned rectangle geometry
//!
//! Screen space: x grows right, y grows down. A rectangle spans
//! `left..right` horizontally and `top..bottom` vertically.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

/// Penetration depth of one rectangle into another, per side
///
/// `left` is how far the mover has pushed past the obstacle's left edge,
/// and so on. The smallest value is the cheapest way out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlap {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

/// Side of an obstacle a mover gets pushed out through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

impl Rect {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Build from a top-left corner and a size
    pub fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self::new(origin.x, origin.y, origin.x + size.x, origin.y + size.y)
    }

    /// Build a square centered on `center`
    pub fn around(center: Vec2, half_extent: f32) -> Self {
        Self::new(
            center.x - half_extent,
            center.y - half_extent,
            center.x + half_extent,
            center.y + half_extent,
        )
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new((self.left + self.right) * 0.5, (self.top + self.bottom) * 0.5)
    }

    /// Strict intersection test: rectangles that only share an edge do not intersect
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    /// Grow (positive) or shrink (negative) on every side
    pub fn inflate(&self, amount: f32) -> Self {
        Self::new(
            self.left - amount,
            self.top - amount,
            self.right + amount,
            self.bottom + amount,
        )
    }

    /// Penetration of `mover` into `self` along each side
    pub fn overlap_of(&self, mover: &Rect) -> Overlap {
        Overlap {
            left: mover.right - self.left,
            right: self.right - mover.left,
            top: mover.bottom - self.top,
            bottom: self.bottom - mover.top,
        }
    }
}

impl Overlap {
    /// Side with the smallest penetration, and that penetration
    ///
    /// Ties resolve in the order left, right, top, bottom.
    pub fn min_side(&self) -> (Side, f32) {
        let mut best = (Side::Left, self.left);
        for candidate in [
            (Side::Right, self.right),
            (Side::Top, self.top),
            (Side::Bottom, self.bottom),
        ] {
            if candidate.1 < best.1 {
                best = candidate;
            }
        }
        best
    }

    /// Smaller of the two horizontal penetrations
    pub fn min_x(&self) -> f32 {
        self.left.min(self.right)
    }

    /// Smaller of the two vertical penetrations
    pub fn min_y(&self) -> f32 {
        self.top.min(self.bottom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersects_is_strict() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let touching = Rect::new(10.0, 0.0, 20.0, 10.0);
        let overlapping = Rect::new(9.0, 9.0, 20.0, 20.0);
        assert!(!a.intersects(&touching));
        assert!(a.intersects(&overlapping));
        assert!(overlapping.intersects(&a));
    }

    #[test]
    fn test_geometry() {
        let r = Rect::from_origin_size(Vec2::new(10.0, 20.0), Vec2::new(30.0, 40.0));
        assert_eq!(r.width(), 30.0);
        assert_eq!(r.height(), 40.0);
        assert_eq!(r.center(), Vec2::new(25.0, 40.0));

        let grown = r.inflate(5.0);
        assert_eq!(grown, Rect::new(5.0, 15.0, 45.0, 65.0));
        assert_eq!(Rect::around(Vec2::ZERO, 2.0), Rect::new(-2.0, -2.0, 2.0, 2.0));
    }

    #[test]
    fn test_overlap_min_side() {
        let obstacle = Rect::new(100.0, 100.0, 200.0, 120.0);
        // Ball dipping 4px into the top of the obstacle
        let ball = Rect::new(140.0, 86.0, 158.0, 104.0);
        let overlap = obstacle.overlap_of(&ball);
        assert_eq!(overlap.top, 4.0);
        assert_eq!(overlap.min_side(), (Side::Top, 4.0));
        assert_eq!(overlap.min_y(), 4.0);

        // Ball grazing the right edge
        let ball = Rect::new(197.0, 105.0, 215.0, 123.0);
        assert_eq!(obstacle.overlap_of(&ball).min_side().0, Side::Right);
    }
}
