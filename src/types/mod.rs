//! Shared geometric types used throughout the library.

mod extents;
mod rect;

pub use extents::Extents2;
pub use rect::{Rect, Size2};
