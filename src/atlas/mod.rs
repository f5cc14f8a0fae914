//! Texture atlas repacking.
//!
//! Submeshes whose faces sample regions of one shared texture are rebuilt
//! into a compact atlas of their own, with texture coordinates remapped
//! accordingly.

mod packer;
mod repack;
mod texture;

pub use packer::{Patch, RectPacker, ShelfPacker, UvPatch};
pub use repack::{region_extents, repack_submesh};
pub use texture::{decode_texture, encode_jpeg, sniff_extension, DEFAULT_JPEG_QUALITY};
