//! SLPK to OBJ conversion.
//!
//! A run has two parallel passes over the node tree:
//!
//! 1. measure the top level geometry in the destination SRS to find a
//!    centre that keeps exported coordinates small,
//! 2. export every node, converting and centring its vertices and giving
//!    each submesh a texture of its own.

mod exporter;
mod extents;

pub use exporter::{add_extension, export_node, NodeStats};
pub use extents::measure_extents;

use crate::atlas::DEFAULT_JPEG_QUALITY;
use crate::crs::{ConvertorSpec, SrsDefinition};
use crate::error::{ConvertError, Result};
use crate::slpk::{Archive, Node};
use glam::DVec2;
use rayon::prelude::*;
use std::path::Path;
use tracing::{info, warn};

/// Conversion configuration.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Destination spatial reference of the meshes.
    pub srs: SrsDefinition,
    /// Write into an existing output directory.
    pub overwrite: bool,
    /// Worker threads (0 = one per CPU).
    pub threads: usize,
    /// JPEG quality of rebuilt atlas textures.
    pub jpeg_quality: u8,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            srs: SrsDefinition::WEB_MERCATOR,
            overwrite: false,
            threads: 0,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Totals of a conversion run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConvertStats {
    /// Nodes in the tree.
    pub nodes: usize,
    /// Submeshes written.
    pub submeshes: usize,
    /// Submeshes with rebuilt atlases.
    pub repacked: usize,
    /// Centre subtracted from every vertex.
    pub center: DVec2,
}

/// Check the output location and create it.
pub fn prepare_output(output: &Path, overwrite: bool) -> Result<()> {
    if output.exists() && !overwrite {
        return Err(ConvertError::OutputExists(output.to_path_buf()));
    }
    std::fs::create_dir_all(output)?;
    Ok(())
}

/// Convert an SLPK file (or extracted directory) into OBJ meshes under `output`.
pub fn convert<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    config: &ConvertConfig,
) -> Result<ConvertStats> {
    let (input, output) = (input.as_ref(), output.as_ref());

    info!("Opening SLPK archive at {:?}.", input);
    let archive = Archive::open(input)?;
    prepare_output(output, config.overwrite)?;

    info!("Generating textured meshes at {:?}.", output);
    convert_archive(&archive, output, config)
}

/// Convert an opened archive into an existing output directory.
pub fn convert_archive(
    archive: &Archive,
    output: &Path,
    config: &ConvertConfig,
) -> Result<ConvertStats> {
    let src = archive.scene_layer_info().spatial_reference.srs()?;
    let spec = ConvertorSpec::new(src, config.srs.clone());
    // fail early on unsupported SRS pairs
    spec.build()?;
    info!("Converting from {} to {}.", spec.src, spec.dst);

    let tree = archive.load_tree()?;
    if let Some(metadata) = archive.metadata() {
        info!(
            "SLPK metadata: I3S version {}.",
            metadata.i3s_version.as_deref().unwrap_or("unknown")
        );
        match metadata.node_count {
            Some(count) if count != tree.nodes.len() as u64 => {
                warn!("Metadata lists {} nodes, the tree has {}.", count, tree.nodes.len())
            }
            _ => {}
        }
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .map_err(std::io::Error::other)?;

    pool.install(|| {
        // find extents in destination SRS to localize mesh
        let extents = measure_extents(&tree, archive, &spec)?;
        let center = match extents.center() {
            Some(center) => {
                info!(
                    "Top level extents {:?} .. {:?}, centre {:?}.",
                    extents.ll, extents.ur, center
                );
                center
            }
            None => {
                info!("No geometry at the top level, meshes are not centred.");
                DVec2::ZERO
            }
        };

        let nodes: Vec<&Node> = tree.nodes.values().collect();
        let totals = nodes
            .par_iter()
            .map_init(
                || spec.build(),
                |conv, node| -> Result<NodeStats> {
                    let conv = conv
                        .as_ref()
                        .map_err(|e| ConvertError::Projection(e.to_string()))?;
                    export_node(archive, node, conv, center, output, config)
                        .map_err(|e| e.in_node(&node.id))
                },
            )
            .try_reduce(NodeStats::default, |a, b| Ok(a + b))?;

        info!(
            "Wrote {} submeshes ({} with rebuilt atlases) from {} nodes.",
            totals.submeshes,
            totals.repacked,
            nodes.len()
        );

        Ok(ConvertStats {
            nodes: nodes.len(),
            submeshes: totals.submeshes,
            repacked: totals.repacked,
            center,
        })
    })
}
