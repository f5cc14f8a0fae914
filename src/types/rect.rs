//! Integer pixel rectangles.

use glam::IVec2;

/// Size in whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size2 {
    pub width: u32,
    pub height: u32,
}

impl Size2 {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A pixel rectangle: top-left point plus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub point: IVec2,
    pub size: Size2,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            point: IVec2::new(x, y),
            size: Size2::new(width, height),
        }
    }

    /// Smallest pixel rectangle covering the continuous span `[min, max]`.
    /// Degenerate spans still cover one pixel.
    pub fn covering(min: glam::DVec2, max: glam::DVec2) -> Self {
        let x0 = min.x.floor();
        let y0 = min.y.floor();
        let width = (max.x.ceil() - x0).max(1.0);
        let height = (max.y.ceil() - y0).max(1.0);
        Self::new(x0 as i32, y0 as i32, width as u32, height as u32)
    }

    pub fn right(&self) -> i64 {
        self.point.x as i64 + self.size.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.point.y as i64 + self.size.height as i64
    }

    /// Whether two rectangles share at least one pixel.
    pub fn overlaps(&self, other: &Rect) -> bool {
        (self.point.x as i64) < other.right()
            && (other.point.x as i64) < self.right()
            && (self.point.y as i64) < other.bottom()
            && (other.point.y as i64) < self.bottom()
    }
}
