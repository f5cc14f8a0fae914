//! Error types for SLPK conversion.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using ConvertError.
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Main error type for conversion operations.
///
/// Every variant is fatal: a conversion run stops at the first error.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Failed to read or parse a ZIP archive.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Failed to parse JSON data.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to read, decode or encode an image.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A resource inside the archive could not be decoded.
    #[error("Cannot decode {path}: {reason}")]
    Decode {
        /// Archive-relative path of the offending resource.
        path: String,
        /// What went wrong.
        reason: String,
    },

    /// Resource not found in the archive.
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Invalid archive structure or metadata.
    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    /// Texture regions could not be packed into a new atlas.
    #[error("Packing error: {0}")]
    Packing(String),

    /// Coordinate system conversion failed.
    #[error("Projection error: {0}")]
    Projection(String),

    /// Converting one node failed.
    #[error("Failed to convert node <{id}>: {source}")]
    Node {
        id: String,
        #[source]
        source: Box<ConvertError>,
    },

    /// Output directory exists and overwriting was not requested.
    #[error("Output {0:?} already exists (use --overwrite to write into it)")]
    OutputExists(PathBuf),
}

impl ConvertError {
    /// Build a decode error for the given archive path.
    pub fn decode(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Attach the id of the node being processed.
    pub fn in_node(self, id: &str) -> Self {
        match self {
            err @ ConvertError::Node { .. } => err,
            err => ConvertError::Node {
                id: id.to_string(),
                source: Box::new(err),
            },
        }
    }
}
