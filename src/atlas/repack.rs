//! Rebuilding a region-atlased submesh into its own compact atlas.

use super::packer::{Patch, RectPacker, UvPatch};
use crate::error::{ConvertError, Result};
use crate::slpk::{Region, SubMesh};
use crate::types::{Extents2, Rect, Size2};
use glam::DVec2;
use image::RgbImage;

/// Fixed-point coordinate to pixels.
fn remap(size: u32, coord: u16) -> f64 {
    size as f64 * (coord as f64 / 65535.0)
}

/// Pixel-space extents of a region within a texture of the given size.
pub fn region_extents(size: Size2, region: &Region) -> Extents2 {
    Extents2::new(
        DVec2::new(remap(size.width, region.ll[0]), remap(size.height, region.ll[1])),
        DVec2::new(remap(size.width, region.ur[0]), remap(size.height, region.ur[1])),
    )
}

fn validate(submesh: &SubMesh) -> Result<()> {
    let tc_count = submesh.tex_coords.len();
    for face in &submesh.faces {
        if face.image_id as usize >= submesh.regions.len() {
            return Err(ConvertError::InvalidArchive(format!(
                "face references region {} but submesh has {}",
                face.image_id,
                submesh.regions.len()
            )));
        }
        if face.tex_coords.iter().any(|&tc| tc as usize >= tc_count) {
            return Err(ConvertError::InvalidArchive(format!(
                "face references texture coordinate outside {} available",
                tc_count
            )));
        }
    }
    Ok(())
}

/// Repack the regions of `submesh` into a new atlas built from `texture`.
///
/// Texture coordinates are rewritten in place to address the returned
/// raster, every face ends up with image id 0 and the region list is cleared.
pub fn repack_submesh<P: RectPacker + ?Sized>(
    submesh: &mut SubMesh,
    texture: &RgbImage,
    packer: &P,
) -> Result<RgbImage> {
    validate(submesh)?;

    let tx_size = Size2::new(texture.width(), texture.height());

    let regions: Vec<Extents2> = submesh
        .regions
        .iter()
        .map(|region| region_extents(tx_size, region))
        .collect();
    let region_rects: Vec<Rect> = regions
        .iter()
        .map(|region| Rect::covering(region.ll, region.ur))
        .collect();

    // Grow one UV patch per region from the coordinates faces actually use.
    // Coordinates move to region pixel space here.
    let mut uv_patches = vec![UvPatch::new(); regions.len()];
    let mut seen = vec![false; submesh.tex_coords.len()];

    for face in &submesh.faces {
        let id = face.image_id as usize;
        let rsize = regions[id].size();
        for &index in &face.tex_coords {
            let index = index as usize;
            if seen[index] {
                continue;
            }
            let tc = &mut submesh.tex_coords[index];
            *tc *= rsize;
            uv_patches[id].update(*tc);
            seen[index] = true;
        }
    }

    let mut patches: Vec<Patch> = uv_patches.iter().map(Patch::from).collect();
    let canvas = packer.pack(&mut patches)?;
    if canvas.width == 0 || canvas.height == 0 {
        return Err(ConvertError::Packing(format!(
            "packing {} patches produced an empty canvas",
            patches.len()
        )));
    }

    // Map texture coordinates to the new atlas and normalize.
    let scale = DVec2::new(canvas.width as f64, canvas.height as f64);
    seen.fill(false);

    for face in &mut submesh.faces {
        let patch = &patches[face.image_id as usize];
        for &index in &face.tex_coords {
            let index = index as usize;
            if seen[index] {
                continue;
            }
            let tc = &mut submesh.tex_coords[index];
            *tc = patch.map(*tc) / scale;
            seen[index] = true;
        }

        face.image_id = 0;
    }
    submesh.regions.clear();

    let mut atlas = RgbImage::new(canvas.width, canvas.height);
    for (patch, region) in patches.iter().zip(&region_rects) {
        copy_patch(texture, region, patch, &mut atlas);
    }

    Ok(atlas)
}

/// Copy a patch's pixels from the source texture into the atlas.
///
/// Patch source coordinates are relative to the region and may run past it
/// (repeated texturing); they wrap back into the region on each axis.
/// Pixels falling outside either raster are left as background.
fn copy_patch(texture: &RgbImage, region: &Rect, patch: &Patch, atlas: &mut RgbImage) {
    let src = patch.src();
    let dst = patch.dst();
    let region_w = region.size.width as i64;
    let region_h = region.size.height as i64;

    for dy in 0..dst.size.height as i64 {
        let j = dst.point.y as i64 + dy;
        if j < 0 || j >= atlas.height() as i64 {
            continue;
        }

        let jsrc = region.point.y as i64 + (src.point.y as i64 + dy).rem_euclid(region_h);
        if jsrc < 0 || jsrc >= texture.height() as i64 {
            continue;
        }

        for dx in 0..dst.size.width as i64 {
            let i = dst.point.x as i64 + dx;
            if i < 0 || i >= atlas.width() as i64 {
                continue;
            }

            let isrc = region.point.x as i64 + (src.point.x as i64 + dx).rem_euclid(region_w);
            if isrc < 0 || isrc >= texture.width() as i64 {
                continue;
            }

            atlas.put_pixel(i as u32, j as u32, *texture.get_pixel(isrc as u32, jsrc as u32));
        }
    }
}
