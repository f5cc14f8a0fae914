//! SLPK (I3S scene layer package) reading.
//!
//! An SLPK is a zip (or an extracted directory) holding a scene layer
//! description, a tree of node index documents and per-node geometry and
//! texture resources. This module exposes just enough of it for conversion:
//! the node tree, decoded submeshes and raw texture bytes.

pub mod archive;
pub mod geometry;
pub mod mesh;

pub use archive::{Archive, TextureStream};
pub use geometry::decode_geometry;
pub use mesh::{Face, GeometrySink, MeshSink, Region, SubMesh, SubMeshCollector};

use crate::crs::SrsDefinition;
use crate::error::{ConvertError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Spatial reference of the scene layer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialReference {
    #[serde(default)]
    pub wkid: Option<u32>,
    #[serde(default)]
    pub latest_wkid: Option<u32>,
    #[serde(default)]
    pub wkt: Option<String>,
}

impl SpatialReference {
    /// Horizontal SRS of the layer. Prefers `latestWkid`, then `wkid`, then `wkt`.
    pub fn srs(&self) -> Result<SrsDefinition> {
        if let Some(code) = self.latest_wkid.or(self.wkid) {
            return Ok(SrsDefinition::Epsg(code));
        }
        match &self.wkt {
            Some(wkt) if !wkt.trim().is_empty() => Ok(SrsDefinition::Custom(wkt.clone())),
            _ => Err(ConvertError::InvalidArchive(
                "scene layer has no usable spatial reference".to_string(),
            )),
        }
    }
}

/// Primitive value type of a binary attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ValueType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
}

impl ValueType {
    /// Size of one value in bytes.
    pub fn size(self) -> usize {
        match self {
            ValueType::Int8 | ValueType::UInt8 => 1,
            ValueType::Int16 | ValueType::UInt16 => 2,
            ValueType::Int32 | ValueType::UInt32 | ValueType::Float32 => 4,
            ValueType::Int64 | ValueType::UInt64 | ValueType::Float64 => 8,
        }
    }
}

/// One field of the geometry buffer header.
#[derive(Debug, Clone, Deserialize)]
pub struct HeaderAttribute {
    pub property: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
}

/// Layout of a per-vertex or per-feature attribute array.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeLayout {
    pub value_type: ValueType,
    pub values_per_element: usize,
}

/// Binary layout shared by every geometry resource of the layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometrySchema {
    #[serde(default = "default_geometry_type")]
    pub geometry_type: String,
    pub header: Vec<HeaderAttribute>,
    pub ordering: Vec<String>,
    pub vertex_attributes: HashMap<String, AttributeLayout>,
    #[serde(default)]
    pub feature_attribute_order: Vec<String>,
    #[serde(default)]
    pub feature_attributes: HashMap<String, AttributeLayout>,
}

fn default_geometry_type() -> String {
    "triangles".to_string()
}

/// Storage section of the scene layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreInfo {
    #[serde(default = "default_root_node")]
    pub root_node: String,
    pub default_geometry_schema: GeometrySchema,
}

fn default_root_node() -> String {
    "./nodes/root".to_string()
}

/// Parsed `3dSceneLayer.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneLayerInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub layer_type: Option<String>,
    pub spatial_reference: SpatialReference,
    pub store: StoreInfo,
}

/// Parsed `metadata.json` (optional in older packages).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(rename = "I3SVersion", default)]
    pub i3s_version: Option<String>,
    #[serde(default)]
    pub node_count: Option<u64>,
}

/// A node of the scene tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    /// Detail level; lower is coarser.
    pub level: i32,
    /// Minimum bounding sphere: centre x, y, z and radius.
    pub mbs: [f64; 4],
    /// Archive-relative directory of the node.
    pub path: String,
    /// Archive-relative geometry resource references (without extension).
    pub geometry_data: Vec<String>,
    /// Archive-relative texture resource references (without extension).
    pub texture_data: Vec<String>,
    /// Ids of child nodes.
    pub children: Vec<String>,
}

impl Node {
    pub fn has_geometry(&self) -> bool {
        !self.geometry_data.is_empty()
    }

    /// Centre of the bounding sphere; vertex positions are stored relative to it.
    pub fn origin(&self) -> glam::DVec3 {
        glam::DVec3::new(self.mbs[0], self.mbs[1], self.mbs[2])
    }
}

/// Node tree keyed by node id.
pub type NodeMap = BTreeMap<String, Node>;

/// The whole scene tree.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    pub root: String,
    pub nodes: NodeMap,
}

impl Tree {
    /// Coarsest level among nodes carrying geometry.
    pub fn top_level(&self) -> Option<i32> {
        self.nodes
            .values()
            .filter(|node| node.has_geometry())
            .map(|node| node.level)
            .min()
    }

    /// Nodes with geometry at the top level.
    pub fn top_level_nodes(&self) -> Vec<&Node> {
        match self.top_level() {
            Some(level) => self
                .nodes
                .values()
                .filter(|node| node.has_geometry() && node.level == level)
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Resolve a (possibly relative) href against an archive directory.
///
/// `.` and `..` components are folded; the result never starts with `/`.
pub fn resolve_href(base: &str, href: &str) -> String {
    let mut parts: Vec<&str> = if href.starts_with('/') {
        Vec::new()
    } else {
        base.split('/').filter(|p| !p.is_empty()).collect()
    };

    for part in href.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, level: i32, geometry: bool) -> Node {
        Node {
            id: id.to_string(),
            level,
            mbs: [0.0; 4],
            path: format!("nodes/{}", id),
            geometry_data: if geometry {
                vec![format!("nodes/{}/geometries/0", id)]
            } else {
                Vec::new()
            },
            texture_data: Vec::new(),
            children: Vec::new(),
        }
    }

    #[test]
    fn test_resolve_href() {
        assert_eq!(resolve_href("", "./nodes/root"), "nodes/root");
        assert_eq!(resolve_href("nodes/0-1", "./geometries/0"), "nodes/0-1/geometries/0");
        assert_eq!(resolve_href("nodes/0-1", "../0-1-2"), "nodes/0-1-2");
        assert_eq!(resolve_href("nodes/0-1", "/nodes/x"), "nodes/x");
    }

    #[test]
    fn test_top_level_ignores_nodes_without_geometry() {
        let mut tree = Tree::default();
        for n in [
            node("root", 0, false),
            node("a", 1, true),
            node("b", 1, true),
            node("c", 2, true),
        ] {
            tree.nodes.insert(n.id.clone(), n);
        }

        assert_eq!(tree.top_level(), Some(1));
        let ids: Vec<_> = tree.top_level_nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_no_top_level_without_geometry() {
        let mut tree = Tree::default();
        tree.nodes.insert("root".to_string(), node("root", 0, false));
        assert_eq!(tree.top_level(), None);
        assert!(tree.top_level_nodes().is_empty());
    }

    #[test]
    fn test_spatial_reference_preference() {
        let sr: SpatialReference =
            serde_json::from_str(r#"{"wkid": 102100, "latestWkid": 3857}"#).unwrap();
        assert_eq!(sr.srs().unwrap(), SrsDefinition::Epsg(3857));

        let sr: SpatialReference = serde_json::from_str(r#"{"wkid": 4326}"#).unwrap();
        assert_eq!(sr.srs().unwrap(), SrsDefinition::Epsg(4326));

        let sr: SpatialReference = serde_json::from_str("{}").unwrap();
        assert!(sr.srs().is_err());
    }
}
