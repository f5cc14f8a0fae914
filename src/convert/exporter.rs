//! Per-node mesh export.

use super::ConvertConfig;
use crate::atlas::{decode_texture, encode_jpeg, repack_submesh, sniff_extension, ShelfPacker};
use crate::crs::CsConvertor;
use crate::error::Result;
use crate::export::{write_mtl, write_obj};
use crate::slpk::{Archive, Node};
use glam::{DVec2, DVec3};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// What one node contributed to the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeStats {
    /// Submeshes written.
    pub submeshes: usize,
    /// Submeshes whose texture was rebuilt from atlas regions.
    pub repacked: usize,
}

impl std::ops::Add for NodeStats {
    type Output = NodeStats;

    fn add(self, other: NodeStats) -> NodeStats {
        NodeStats {
            submeshes: self.submeshes + other.submeshes,
            repacked: self.repacked + other.repacked,
        }
    }
}

/// Append an extension, keeping whatever the file name already has.
pub fn add_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Convert all submeshes of one node and write their mesh, material and texture.
///
/// Vertices become `convert(v) - center`; output paths mirror the geometry hrefs under `output`.
pub fn export_node(
    archive: &Archive,
    node: &Node,
    conv: &CsConvertor,
    center: DVec2,
    output: &Path,
    config: &ConvertConfig,
) -> Result<NodeStats> {
    debug!("Converting <{}>.", node.id);

    let mut stats = NodeStats::default();
    let offset = DVec3::new(center.x, center.y, 0.0);
    let submeshes = archive.load_submeshes(node)?;

    for (index, (mut submesh, href)) in submeshes.into_iter().zip(&node.geometry_data).enumerate() {
        for v in &mut submesh.vertices {
            *v = conv.convert(*v)? - offset;
        }

        let path = output.join(href);
        let mesh_path = add_extension(&path, "obj");
        let mtl_path = add_extension(&path, "mtl");
        if let Some(parent) = mesh_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let texture = archive.texture(node, index)?;

        let tex_path = if !submesh.is_atlased() {
            // copy texture as-is
            let tex_path = add_extension(&path, sniff_extension(&texture.bytes));
            fs::write(&tex_path, &texture.bytes)?;
            tex_path
        } else {
            // texture atlas, rebuild it for this submesh alone
            let tex_path = add_extension(&path, "jpg");
            let raster = decode_texture(&texture)?;
            let atlas = repack_submesh(&mut submesh, &raster, &ShelfPacker::default())?;
            fs::write(&tex_path, encode_jpeg(&atlas, config.jpeg_quality)?)?;
            stats.repacked += 1;
            tex_path
        };
        debug!("Writing {:?}", tex_path);

        {
            debug!("Writing {:?} ({} faces)", mesh_path, submesh.face_count());
            let mut out = BufWriter::new(File::create(&mesh_path)?);
            write_obj(&mut out, &submesh, &file_name(&mtl_path))?;
            out.flush()?;
        }

        debug!("Writing {:?}", mtl_path);
        let mut out = BufWriter::new(File::create(&mtl_path)?);
        write_mtl(&mut out, &file_name(&tex_path))?;
        out.flush()?;

        stats.submeshes += 1;
    }

    Ok(stats)
}
