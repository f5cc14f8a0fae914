//! # SLPK Mesher
//!
//! A Rust library for turning SLPK scene layer packages into standalone
//! textured OBJ meshes.
//!
//! ## Overview
//!
//! Every geometry resource of every node becomes one OBJ mesh with its own
//! material and its own texture. Submeshes drawing from sub-rectangles of a
//! shared texture atlas get a freshly packed, compact atlas of just the
//! regions they use; everything else keeps its texture as-is. Vertices are
//! reprojected to a destination SRS and centred on the middle of the
//! coarsest level of detail so exported coordinates stay small.
//!
//! ## Quick Start
//!
//! ```ignore
//! use slpk_mesher::{convert, ConvertConfig};
//!
//! let stats = convert("city.slpk", "out", &ConvertConfig::default())?;
//! println!("{} submeshes written", stats.submeshes);
//! ```
//!
//! ## Library Integration
//!
//! The pieces are usable on their own; for example, repacking one submesh:
//!
//! ```ignore
//! use slpk_mesher::{open_archive, atlas::{decode_texture, repack_submesh, ShelfPacker}};
//!
//! let archive = open_archive("city.slpk")?;
//! let tree = archive.load_tree()?;
//! let node = &tree.nodes["42"];
//! let mut submeshes = archive.load_submeshes(node)?;
//! let texture = decode_texture(&archive.texture(node, 0)?)?;
//! let atlas = repack_submesh(&mut submeshes[0], &texture, &ShelfPacker::default())?;
//! ```

pub mod error;
pub mod types;
pub mod slpk;
pub mod crs;
pub mod atlas;
pub mod export;
pub mod convert;

// Re-export main types for convenience
pub use error::{ConvertError, Result};
pub use types::{Extents2, Rect, Size2};
pub use slpk::{Archive, Node, SubMesh, Tree};
pub use crs::{ConvertorSpec, CsConvertor, SrsDefinition};
pub use atlas::{repack_submesh, RectPacker, ShelfPacker};
pub use export::{write_mtl, write_obj};
pub use convert::{convert, convert_archive, ConvertConfig, ConvertStats};

/// Open an SLPK archive from a file path (`.slpk` zip or extracted directory).
pub fn open_archive<P: AsRef<std::path::Path>>(path: P) -> Result<Archive> {
    Archive::open(path)
}

/// Open an SLPK archive held in memory.
pub fn open_archive_from_bytes(data: Vec<u8>) -> Result<Archive> {
    Archive::from_reader(std::io::Cursor::new(data))
}
