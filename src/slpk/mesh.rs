//! Submesh data and the sink interfaces geometry is decoded into.

use crate::error::Result;
use glam::{DVec2, DVec3};

/// Sub-rectangle of a shared texture, in fixed point `[0, 65535]` per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    /// Lower (left, top) corner.
    pub ll: [u16; 2],
    /// Upper (right, bottom) corner.
    pub ur: [u16; 2],
}

impl Region {
    pub fn new(umin: u16, vmin: u16, umax: u16, vmax: u16) -> Self {
        Self {
            ll: [umin, vmin],
            ur: [umax, vmax],
        }
    }
}

/// A triangle referencing shared vertex, texture coordinate and normal slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face {
    pub vertices: [u32; 3],
    pub tex_coords: [u32; 3],
    pub normals: Option<[u32; 3]>,
    /// Index into the submesh regions; meaningless when there are none.
    pub image_id: u32,
}

/// One mesh body plus the texture regions its faces sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubMesh {
    pub vertices: Vec<DVec3>,
    pub tex_coords: Vec<DVec2>,
    pub normals: Vec<DVec3>,
    pub faces: Vec<Face>,
    /// Empty for submeshes using their whole texture.
    pub regions: Vec<Region>,
}

impl SubMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_atlased(&self) -> bool {
        !self.regions.is_empty()
    }
}

/// Receives the indexed data of one decoded mesh.
///
/// Only vertices are mandatory; sinks that do not care about the rest keep
/// the default no-op implementations.
pub trait MeshSink {
    fn add_vertex(&mut self, vertex: DVec3) -> Result<()>;

    fn add_tex_coord(&mut self, _tc: DVec2) {}

    fn add_normal(&mut self, _normal: DVec3) {}

    fn add_region(&mut self, _region: Region) {}

    fn add_face(&mut self, _face: Face) {}
}

/// Hands out one mesh sink per geometry resource of a node.
pub trait GeometrySink {
    fn next(&mut self) -> &mut dyn MeshSink;
}

impl MeshSink for SubMesh {
    fn add_vertex(&mut self, vertex: DVec3) -> Result<()> {
        self.vertices.push(vertex);
        Ok(())
    }

    fn add_tex_coord(&mut self, tc: DVec2) {
        self.tex_coords.push(tc);
    }

    fn add_normal(&mut self, normal: DVec3) {
        self.normals.push(normal);
    }

    fn add_region(&mut self, region: Region) {
        self.regions.push(region);
    }

    fn add_face(&mut self, face: Face) {
        self.faces.push(face);
    }
}

/// Collects every decoded geometry resource as a [`SubMesh`].
#[derive(Debug, Default)]
pub struct SubMeshCollector {
    pub submeshes: Vec<SubMesh>,
}

impl SubMeshCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_submeshes(self) -> Vec<SubMesh> {
        self.submeshes
    }
}

impl GeometrySink for SubMeshCollector {
    fn next(&mut self) -> &mut dyn MeshSink {
        self.submeshes.push(SubMesh::new());
        let last = self.submeshes.len() - 1;
        &mut self.submeshes[last]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_creates_one_submesh_per_next() {
        let mut collector = SubMeshCollector::new();
        collector.next().add_vertex(DVec3::ONE).unwrap();
        let second = collector.next();
        second.add_vertex(DVec3::ZERO).unwrap();
        second.add_region(Region::new(0, 0, 65535, 65535));

        let submeshes = collector.into_submeshes();
        assert_eq!(submeshes.len(), 2);
        assert_eq!(submeshes[0].vertices, vec![DVec3::ONE]);
        assert!(!submeshes[0].is_atlased());
        assert!(submeshes[1].is_atlased());
    }
}
