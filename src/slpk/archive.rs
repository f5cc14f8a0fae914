//! SLPK archive access from ZIP files and directories.

use super::geometry::decode_geometry;
use super::mesh::{GeometrySink, SubMesh, SubMeshCollector};
use super::{resolve_href, Metadata, Node, SceneLayerInfo, Tree};
use crate::error::{ConvertError, Result};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Extensions tried, in order, for texture resources. DDS variants are never used.
const TEXTURE_EXTENSIONS: [&str; 3] = [".jpg", ".png", ".bin"];

trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

enum Store {
    Zip(Mutex<zip::ZipArchive<Box<dyn ReadSeek>>>),
    Directory(PathBuf),
}

impl Store {
    /// Raw bytes of an entry, `None` if there is no such entry.
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        match self {
            Store::Zip(archive) => {
                let mut archive = archive.lock();
                let mut file = match archive.by_name(path) {
                    Ok(file) => file,
                    Err(zip::result::ZipError::FileNotFound) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };
                let mut data = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut data)?;
                Ok(Some(data))
            }
            Store::Directory(root) => {
                let full = root.join(path);
                if !full.is_file() {
                    return Ok(None);
                }
                Ok(Some(std::fs::read(full)?))
            }
        }
    }

    /// Resource contents, inflating `<path>.gz` when present.
    fn resource(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let gz_path = format!("{}.gz", path);
        if let Some(compressed) = self.read(&gz_path)? {
            let mut data = Vec::new();
            flate2::read::GzDecoder::new(compressed.as_slice())
                .read_to_end(&mut data)
                .map_err(|e| ConvertError::decode(&gz_path, e.to_string()))?;
            return Ok(Some(data));
        }
        self.read(path)
    }
}

/// Encoded texture bytes together with their archive path.
#[derive(Debug, Clone)]
pub struct TextureStream {
    pub path: String,
    pub bytes: Vec<u8>,
}

/// An opened SLPK archive.
///
/// Safe to share between worker threads: entry reads are serialized, while
/// inflating and decoding happen outside the lock.
pub struct Archive {
    store: Store,
    sli: SceneLayerInfo,
    metadata: Option<Metadata>,
}

impl Archive {
    /// Open an `.slpk` file or an extracted SLPK directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            Self::with_store(Store::Directory(path.to_path_buf()))
        } else {
            let file = File::open(path)?;
            Self::from_reader(BufReader::new(file))
        }
    }

    /// Open an SLPK zip from any seekable reader.
    pub fn from_reader<R: Read + Seek + Send + 'static>(reader: R) -> Result<Self> {
        let reader: Box<dyn ReadSeek> = Box::new(reader);
        let archive = zip::ZipArchive::new(reader)?;
        Self::with_store(Store::Zip(Mutex::new(archive)))
    }

    fn with_store(store: Store) -> Result<Self> {
        let metadata: Option<Metadata> = match store.resource("metadata.json")? {
            Some(data) => Some(parse_json("metadata.json", &data)?),
            None => None,
        };
        let data = store
            .resource("3dSceneLayer.json")?
            .ok_or_else(|| ConvertError::ResourceNotFound("3dSceneLayer.json".to_string()))?;
        let sli = parse_json("3dSceneLayer.json", &data)?;

        Ok(Self {
            store,
            sli,
            metadata,
        })
    }

    /// Scene layer description.
    pub fn scene_layer_info(&self) -> &SceneLayerInfo {
        &self.sli
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    /// Read a resource, inflating `<path>.gz` when present.
    pub fn istream(&self, path: &str) -> Result<Vec<u8>> {
        self.store
            .resource(path)?
            .ok_or_else(|| ConvertError::ResourceNotFound(path.to_string()))
    }

    /// Load a node index document from an archive directory.
    pub fn load_node_index(&self, dir: &str) -> Result<Node> {
        let path = format!("{}/3dNodeIndexDocument.json", dir);
        let data = self.istream(&path)?;
        let doc: NodeIndexDocument = parse_json(&path, &data)?;

        let resolve = |resources: &[ResourceReference]| -> Vec<String> {
            resources.iter().map(|r| resolve_href(dir, &r.href)).collect()
        };

        Ok(Node {
            id: doc.id,
            level: doc.level,
            mbs: doc.mbs.unwrap_or_default(),
            path: dir.to_string(),
            geometry_data: resolve(doc.geometry_data.as_deref().unwrap_or_default()),
            texture_data: resolve(doc.texture_data.as_deref().unwrap_or_default()),
            children: doc
                .children
                .unwrap_or_default()
                .into_iter()
                .map(|child| match child.href {
                    Some(href) => resolve_href(dir, &href),
                    None => format!("nodes/{}", child.id),
                })
                .collect(),
        })
    }

    /// Load the root node (from the path stated in the scene layer).
    pub fn load_root_node_index(&self) -> Result<Node> {
        self.load_node_index(&resolve_href("", &self.sli.store.root_node))
    }

    /// Load the whole node tree, breadth first from the root.
    pub fn load_tree(&self) -> Result<Tree> {
        let root = self.load_root_node_index()?;
        let mut tree = Tree {
            root: root.id.clone(),
            nodes: BTreeMap::new(),
        };

        let mut visited = HashSet::new();
        visited.insert(root.path.clone());
        let mut queue = VecDeque::from([root]);

        while let Some(node) = queue.pop_front() {
            for child_dir in &node.children {
                if visited.insert(child_dir.clone()) {
                    queue.push_back(self.load_node_index(child_dir)?);
                }
            }
            if tree.nodes.insert(node.id.clone(), node).is_some() {
                warn!("Duplicate node id in tree, keeping the last one");
            }
        }

        info!("Loaded tree with {} nodes", tree.nodes.len());
        Ok(tree)
    }

    /// Decode every geometry resource of a node into `sink`, in order.
    pub fn load_geometry(&self, node: &Node, sink: &mut dyn GeometrySink) -> Result<()> {
        let schema = &self.sli.store.default_geometry_schema;
        for href in &node.geometry_data {
            let path = format!("{}.bin", href);
            let data = self.istream(&path)?;
            decode_geometry(&data, schema, node.origin(), &path, sink.next())?;
        }
        Ok(())
    }

    /// Node geometry as submeshes, one per geometry resource.
    pub fn load_submeshes(&self, node: &Node) -> Result<Vec<SubMesh>> {
        let mut collector = SubMeshCollector::new();
        self.load_geometry(node, &mut collector)?;
        Ok(collector.into_submeshes())
    }

    /// Encoded texture for the `index`-th geometry of a node. JPEG or PNG only.
    pub fn texture(&self, node: &Node, index: usize) -> Result<TextureStream> {
        let href = node.texture_data.get(index).ok_or_else(|| {
            ConvertError::ResourceNotFound(format!("texture #{} of node <{}>", index, node.id))
        })?;

        for ext in TEXTURE_EXTENSIONS {
            let path = format!("{}{}", href, ext);
            if let Some(bytes) = self.store.resource(&path)? {
                return Ok(TextureStream { path, bytes });
            }
        }

        if self.store.resource(&format!("{}.bin.dds", href))?.is_some() {
            warn!("Texture {} is only available as DDS, which is not supported", href);
        }
        Err(ConvertError::ResourceNotFound(href.clone()))
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(path: &str, data: &[u8]) -> Result<T> {
    serde_json::from_slice(data).map_err(|e| ConvertError::decode(path, e.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeIndexDocument {
    id: String,
    level: i32,
    #[serde(default)]
    mbs: Option<[f64; 4]>,
    #[serde(default)]
    children: Option<Vec<NodeReference>>,
    #[serde(default)]
    geometry_data: Option<Vec<ResourceReference>>,
    #[serde(default)]
    texture_data: Option<Vec<ResourceReference>>,
}

#[derive(Debug, Deserialize)]
struct NodeReference {
    id: String,
    #[serde(default)]
    href: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResourceReference {
    href: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    const LAYER: &str = r#"{
        "spatialReference": {"wkid": 4326},
        "store": {
            "rootNode": "./nodes/root",
            "defaultGeometrySchema": {
                "header": [{"property": "vertexCount", "type": "UInt32"}],
                "ordering": ["position"],
                "vertexAttributes": {"position": {"valueType": "Float32", "valuesPerElement": 3}}
            }
        }
    }"#;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn zip_archive(entries: &[(&str, Vec<u8>)]) -> Archive {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        let cursor = writer.finish().unwrap();
        Archive::from_reader(Cursor::new(cursor.into_inner())).unwrap()
    }

    #[test]
    fn test_tree_and_gzip_resources() {
        let root = r#"{"id": "root", "level": 0, "children": [{"id": "1", "href": "../1"}]}"#;
        let child = r#"{"id": "1", "level": 1, "mbs": [1, 2, 3, 4],
            "geometryData": [{"href": "./geometries/0"}],
            "textureData": [{"href": "./textures/0"}]}"#;

        let archive = zip_archive(&[
            ("metadata.json", br#"{"I3SVersion": "1.7", "nodeCount": 2}"#.to_vec()),
            ("3dSceneLayer.json.gz", gzip(LAYER.as_bytes())),
            ("nodes/root/3dNodeIndexDocument.json.gz", gzip(root.as_bytes())),
            ("nodes/1/3dNodeIndexDocument.json", child.as_bytes().to_vec()),
            ("nodes/1/textures/0.png", vec![1, 2, 3]),
        ]);

        let metadata = archive.metadata().unwrap();
        assert_eq!(metadata.i3s_version.as_deref(), Some("1.7"));
        assert_eq!(metadata.node_count, Some(2));

        let tree = archive.load_tree().unwrap();
        assert_eq!(tree.root, "root");
        assert_eq!(tree.nodes.len(), 2);

        let node = &tree.nodes["1"];
        assert_eq!(node.geometry_data, vec!["nodes/1/geometries/0".to_string()]);
        assert_eq!(node.origin(), glam::DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(tree.top_level(), Some(1));

        let texture = archive.texture(node, 0).unwrap();
        assert_eq!(texture.path, "nodes/1/textures/0.png");
        assert_eq!(texture.bytes, vec![1, 2, 3]);

        assert!(matches!(archive.texture(node, 1), Err(ConvertError::ResourceNotFound(_))));
    }

    #[test]
    fn test_missing_scene_layer() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("metadata.json", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"{}").unwrap();
        let cursor = writer.finish().unwrap();

        let result = Archive::from_reader(Cursor::new(cursor.into_inner()));
        assert!(matches!(result, Err(ConvertError::ResourceNotFound(_))));
    }

    #[test]
    fn test_corrupt_gzip_is_decode_error() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("3dSceneLayer.json.gz", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"not gzip").unwrap();
        let cursor = writer.finish().unwrap();

        match Archive::from_reader(Cursor::new(cursor.into_inner())) {
            Err(ConvertError::Decode { path, .. }) => assert_eq!(path, "3dSceneLayer.json.gz"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }
}
