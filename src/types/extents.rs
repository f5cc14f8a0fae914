//! Axis-aligned 2D extents.

use glam::DVec2;

/// An axis-aligned 2D bounding box that can start out empty ("invalid").
///
/// Updating is a min/max fold, so merging boxes is commutative and associative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extents2 {
    /// Lower-left corner.
    pub ll: DVec2,
    /// Upper-right corner.
    pub ur: DVec2,
}

impl Extents2 {
    pub fn new(ll: DVec2, ur: DVec2) -> Self {
        Self { ll, ur }
    }

    /// Extents containing nothing. Any update makes them valid.
    pub fn invalid() -> Self {
        Self {
            ll: DVec2::splat(f64::INFINITY),
            ur: DVec2::splat(f64::NEG_INFINITY),
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = DVec2>) -> Self {
        let mut extents = Self::invalid();
        for p in points {
            extents.update(p);
        }
        extents
    }

    /// True once at least one point has been folded in.
    pub fn is_valid(&self) -> bool {
        self.ll.x <= self.ur.x && self.ll.y <= self.ur.y
    }

    /// Grow to contain the given point.
    pub fn update(&mut self, point: DVec2) {
        self.ll = self.ll.min(point);
        self.ur = self.ur.max(point);
    }

    /// Grow to contain another box. Invalid boxes are ignored.
    pub fn merge(&mut self, other: &Extents2) {
        if other.is_valid() {
            self.update(other.ll);
            self.update(other.ur);
        }
    }

    pub fn size(&self) -> DVec2 {
        self.ur - self.ll
    }

    /// Midpoint of the box, `None` for invalid extents.
    pub fn center(&self) -> Option<DVec2> {
        self.is_valid().then(|| (self.ll + self.ur) * 0.5)
    }
}

impl Default for Extents2 {
    fn default() -> Self {
        Self::invalid()
    }
}
