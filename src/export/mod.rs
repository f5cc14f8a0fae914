//! Mesh export formats.

pub mod obj;

pub use obj::{write_mtl, write_obj, MATERIAL_NAME};
