//! Rectangle packing of texture patches using simple shelf packing.

use crate::error::{ConvertError, Result};
use crate::types::{Extents2, Rect, Size2};
use glam::{DVec2, IVec2};

/// Bounding box of the texture coordinates one region actually uses,
/// in the region's pixel space. Only ever grows.
#[derive(Debug, Clone, Copy, Default)]
pub struct UvPatch {
    extents: Extents2,
}

impl UvPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, tc: DVec2) {
        self.extents.update(tc);
    }

    pub fn is_empty(&self) -> bool {
        !self.extents.is_valid()
    }

    /// Pixel rectangle covering the patch. An unused patch is a single pixel at the origin.
    pub fn rect(&self) -> Rect {
        if self.is_empty() {
            return Rect::new(0, 0, 1, 1);
        }
        Rect::covering(self.extents.ll, self.extents.ur)
    }
}

/// A rectangle moved from its source placement to a packed destination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Patch {
    src: Rect,
    dst: Rect,
}

impl Patch {
    /// A patch that has not been placed yet (destination equals source).
    pub fn new(src: Rect) -> Self {
        Self { src, dst: src }
    }

    pub fn src(&self) -> &Rect {
        &self.src
    }

    pub fn dst(&self) -> &Rect {
        &self.dst
    }

    pub fn size(&self) -> Size2 {
        self.src.size
    }

    /// Place the patch; the destination keeps the source size.
    pub fn place(&mut self, point: IVec2) {
        self.dst = Rect {
            point,
            size: self.src.size,
        };
    }

    /// Translate a point from source placement to destination placement.
    pub fn map(&self, point: DVec2) -> DVec2 {
        point - self.src.point.as_dvec2() + self.dst.point.as_dvec2()
    }
}

impl From<&UvPatch> for Patch {
    fn from(uv_patch: &UvPatch) -> Self {
        Patch::new(uv_patch.rect())
    }
}

/// Places patches into a canvas.
///
/// Implementations must keep every patch's size, never overlap two
/// destinations, return a canvas bounding all of them and be deterministic.
pub trait RectPacker {
    fn pack(&self, patches: &mut [Patch]) -> Result<Size2>;
}

/// Shelf packer: tallest patches first, rows of power-of-two width.
#[derive(Debug, Clone)]
pub struct ShelfPacker {
    max_size: u32,
}

impl ShelfPacker {
    pub fn new(max_size: u32) -> Self {
        Self { max_size }
    }
}

impl Default for ShelfPacker {
    fn default() -> Self {
        Self::new(16384)
    }
}

impl RectPacker for ShelfPacker {
    fn pack(&self, patches: &mut [Patch]) -> Result<Size2> {
        if patches.is_empty() {
            return Ok(Size2::default());
        }

        // Sort by height (tallest first); stable, so ties keep input order
        let mut order: Vec<usize> = (0..patches.len()).collect();
        order.sort_by(|&a, &b| patches[b].size().height.cmp(&patches[a].size().height));

        let widest = patches.iter().map(|p| p.size().width).max().unwrap_or(1);
        let tallest = patches.iter().map(|p| p.size().height).max().unwrap_or(1);
        if widest > self.max_size || tallest > self.max_size {
            return Err(ConvertError::Packing(format!(
                "{}x{} px patch exceeds maximum atlas size {}",
                widest, tallest, self.max_size
            )));
        }

        let total_area = patches
            .iter()
            .fold(0u64, |area, p| area.saturating_add(p.size().area()));
        let shelf_width = ((total_area as f64).sqrt().ceil() as u32)
            .max(widest)
            .max(1)
            .min(self.max_size)
            .checked_next_power_of_two()
            .ok_or_else(|| {
                ConvertError::Packing(format!("maximum atlas size {} is too large", self.max_size))
            })?
            .min(self.max_size) as u64;
        let max_size = self.max_size as u64;

        let mut current_x = 0u64;
        let mut current_y = 0u64;
        let mut row_height = 0u64;
        let mut canvas = Size2::default();

        for index in order {
            let size = patches[index].size();
            let (width, height) = (size.width as u64, size.height as u64);

            // Check if we need to start a new row
            if current_x > 0 && current_x + width > shelf_width {
                current_x = 0;
                current_y += row_height;
                row_height = 0;
            }

            if current_y + height > max_size {
                return Err(ConvertError::Packing(format!(
                    "{} patches do not fit into a {}x{} atlas",
                    patches.len(),
                    shelf_width,
                    max_size
                )));
            }

            let point = match (i32::try_from(current_x), i32::try_from(current_y)) {
                (Ok(x), Ok(y)) => IVec2::new(x, y),
                _ => {
                    return Err(ConvertError::Packing(format!(
                        "placement {}x{} is out of range",
                        current_x, current_y
                    )))
                }
            };
            patches[index].place(point);

            // both bounded by max_size
            canvas.width = canvas.width.max((current_x + width) as u32);
            canvas.height = canvas.height.max((current_y + height) as u32);

            current_x += width;
            row_height = row_height.max(height);
        }

        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patches(sizes: &[(u32, u32)]) -> Vec<Patch> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, &(w, h))| Patch::new(Rect::new(i as i32 * 7, 3, w, h)))
            .collect()
    }

    fn assert_valid_packing(patches: &[Patch], canvas: Size2) {
        for (i, a) in patches.iter().enumerate() {
            assert_eq!(a.dst().size, a.src().size);
            assert!(a.dst().point.x >= 0 && a.dst().point.y >= 0);
            assert!(a.dst().right() <= canvas.width as i64);
            assert!(a.dst().bottom() <= canvas.height as i64);
            for b in &patches[i + 1..] {
                assert!(!a.dst().overlaps(b.dst()), "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_two_squares_side_by_side() {
        let mut p = patches(&[(100, 100), (100, 100)]);
        let canvas = ShelfPacker::default().pack(&mut p).unwrap();

        assert_eq!(canvas, Size2::new(200, 100));
        assert_eq!(p[0].dst().point, IVec2::new(0, 0));
        assert_eq!(p[1].dst().point, IVec2::new(100, 0));
    }

    #[test]
    fn test_mixed_sizes_do_not_overlap() {
        let mut p = patches(&[(30, 10), (5, 50), (64, 64), (1, 1), (17, 33), (100, 3), (12, 12)]);
        let canvas = ShelfPacker::default().pack(&mut p).unwrap();
        assert_valid_packing(&p, canvas);
    }

    #[test]
    fn test_deterministic() {
        let sizes = [(8, 8), (8, 8), (20, 4), (3, 9)];
        let mut a = patches(&sizes);
        let mut b = patches(&sizes);
        let packer = ShelfPacker::default();
        assert_eq!(packer.pack(&mut a).unwrap(), packer.pack(&mut b).unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn test_too_large() {
        let mut p = patches(&[(64, 64), (64, 64), (64, 64)]);
        let result = ShelfPacker::new(100).pack(&mut p);
        assert!(matches!(result, Err(ConvertError::Packing(_))));

        let mut p = patches(&[(200, 1)]);
        assert!(ShelfPacker::new(100).pack(&mut p).is_err());
    }

    #[test]
    fn test_huge_patches_are_rejected() {
        let mut p = patches(&[(u32::MAX, 10), (10, 10)]);
        let result = ShelfPacker::default().pack(&mut p);
        assert!(matches!(result, Err(ConvertError::Packing(_))));

        let mut p = patches(&[(10, u32::MAX)]);
        let result = ShelfPacker::default().pack(&mut p);
        assert!(matches!(result, Err(ConvertError::Packing(_))));

        // fits the limit, but no power-of-two shelf does
        let mut p = patches(&[(u32::MAX, 1)]);
        let result = ShelfPacker::new(u32::MAX).pack(&mut p);
        assert!(matches!(result, Err(ConvertError::Packing(_))));
    }

    #[test]
    fn test_patch_map() {
        let mut patch = Patch::new(Rect::new(10, 20, 5, 5));
        patch.place(IVec2::new(0, 100));
        assert_eq!(patch.map(DVec2::new(12.5, 21.0)), DVec2::new(2.5, 101.0));
    }

    #[test]
    fn test_uv_patch_rect() {
        let mut uv = UvPatch::new();
        assert!(uv.is_empty());
        assert_eq!(uv.rect(), Rect::new(0, 0, 1, 1));

        uv.update(DVec2::new(3.2, 4.0));
        uv.update(DVec2::new(10.0, 8.5));
        assert_eq!(uv.rect(), Rect::new(3, 4, 7, 5));
    }
}
