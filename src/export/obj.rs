//! Wavefront OBJ export.
//!
//! Each submesh is written as one OBJ body referencing a single material,
//! whose MTL file binds the material to one texture.

use crate::slpk::SubMesh;
use std::io::{self, Write};

/// Name of the only material of every exported mesh.
pub const MATERIAL_NAME: &str = "0";

/// Write a submesh as OBJ: positions, texture coordinates and faces.
///
/// Texture coordinates are stored with a top-left origin and flipped to
/// OBJ's bottom-left origin here. Indices are 1-based.
pub fn write_obj<W: Write>(out: &mut W, mesh: &SubMesh, mtl_name: &str) -> io::Result<()> {
    // OBJ header
    writeln!(out, "# SLPK Mesher OBJ Export")?;
    writeln!(out, "# Vertices: {}", mesh.vertices.len())?;
    writeln!(out, "# Triangles: {}", mesh.faces.len())?;
    writeln!(out)?;

    writeln!(out, "mtllib {}", mtl_name)?;
    writeln!(out)?;

    for v in &mesh.vertices {
        writeln!(out, "v {} {} {}", v.x, v.y, v.z)?;
    }
    writeln!(out)?;

    for tc in &mesh.tex_coords {
        writeln!(out, "vt {} {}", tc.x, 1.0 - tc.y)?;
    }
    writeln!(out)?;

    writeln!(out, "usemtl {}", MATERIAL_NAME)?;
    for face in &mesh.faces {
        let [a, b, c] = face.vertices.map(|i| i as u64 + 1);
        let [ta, tb, tc] = face.tex_coords.map(|i| i as u64 + 1);
        writeln!(out, "f {}/{} {}/{} {}/{}", a, ta, b, tb, c, tc)?;
    }

    Ok(())
}

/// Write an MTL file binding [`MATERIAL_NAME`] to a texture file.
pub fn write_mtl<W: Write>(out: &mut W, texture_name: &str) -> io::Result<()> {
    writeln!(out, "newmtl {}", MATERIAL_NAME)?;
    writeln!(out, "map_Kd {}", texture_name)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slpk::Face;
    use glam::{DVec2, DVec3};

    fn triangle() -> SubMesh {
        let mut mesh = SubMesh::new();
        mesh.vertices = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.5, 0.0, 0.0),
            DVec3::new(0.0, -2.0, 1.0),
        ];
        mesh.tex_coords = vec![DVec2::new(0.0, 0.0), DVec2::new(1.0, 0.25)];
        mesh.faces = vec![Face {
            vertices: [0, 1, 2],
            tex_coords: [0, 1, 1],
            normals: None,
            image_id: 0,
        }];
        mesh
    }

    #[test]
    fn test_export_simple_obj() {
        let mut obj = Vec::new();
        write_obj(&mut obj, &triangle(), "0.mtl").unwrap();
        let obj = String::from_utf8(obj).unwrap();

        assert!(obj.contains("mtllib 0.mtl\n"));
        assert!(obj.contains("usemtl 0\n"));
        assert!(obj.contains("v 1.5 0 0\n"));
        assert!(obj.contains("v 0 -2 1\n"));
        assert!(obj.contains("vt 0 1\n"));
        assert!(obj.contains("vt 1 0.75\n"));
        assert!(obj.contains("f 1/1 2/2 3/2\n"));
    }

    #[test]
    fn test_export_mtl() {
        let mut mtl = Vec::new();
        write_mtl(&mut mtl, "0.jpg").unwrap();
        assert_eq!(String::from_utf8(mtl).unwrap(), "newmtl 0\nmap_Kd 0.jpg\n");
    }
}
