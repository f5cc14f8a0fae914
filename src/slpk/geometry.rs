//! Decoding of binary geometry resources (I3S default geometry schema).
//!
//! A geometry buffer is a header followed by one array per vertex attribute,
//! in schema order. Vertices form a triangle soup; this decoder folds equal
//! positions, texture coordinates, normals and regions into shared slots and
//! feeds the indexed result into a [`MeshSink`].

use super::mesh::{Face, MeshSink, Region};
use super::{AttributeLayout, GeometrySchema, ValueType};
use crate::error::{ConvertError, Result};
use glam::{DVec2, DVec3};
use std::collections::HashMap;
use std::hash::Hash;

/// A typed view of one attribute array.
struct AttributeView<'a> {
    data: &'a [u8],
    layout: &'a AttributeLayout,
}

impl AttributeView<'_> {
    fn get(&self, element: usize, component: usize) -> f64 {
        let size = self.layout.value_type.size();
        let offset = (element * self.layout.values_per_element + component) * size;
        read_value(&self.data[offset..offset + size], self.layout.value_type)
    }
}

/// Read one little-endian value. `bytes` must hold exactly one value.
fn read_value(bytes: &[u8], value_type: ValueType) -> f64 {
    let mut buf = [0u8; 8];
    buf[..bytes.len()].copy_from_slice(bytes);
    match value_type {
        ValueType::Int8 => bytes[0] as i8 as f64,
        ValueType::UInt8 => bytes[0] as f64,
        ValueType::Int16 => i16::from_le_bytes([buf[0], buf[1]]) as f64,
        ValueType::UInt16 => u16::from_le_bytes([buf[0], buf[1]]) as f64,
        ValueType::Int32 => i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
        ValueType::UInt32 => u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
        ValueType::Float32 => f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as f64,
        ValueType::Int64 => i64::from_le_bytes(buf) as f64,
        ValueType::UInt64 => u64::from_le_bytes(buf) as f64,
        ValueType::Float64 => f64::from_le_bytes(buf),
    }
}

/// Assigns a stable slot index to every distinct key.
struct SlotIndex<K> {
    slots: HashMap<K, u32>,
}

impl<K: Eq + Hash> SlotIndex<K> {
    fn new() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }

    /// Returns the slot for `key` and whether it was just created.
    fn slot(&mut self, key: K) -> (u32, bool) {
        let next = self.slots.len() as u32;
        match self.slots.entry(key) {
            std::collections::hash_map::Entry::Occupied(e) => (*e.get(), false),
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(next);
                (next, true)
            }
        }
    }
}

fn bits3(v: DVec3) -> [u64; 3] {
    [v.x.to_bits(), v.y.to_bits(), v.z.to_bits()]
}

fn attribute<'a>(
    attributes: &HashMap<&str, AttributeView<'a>>,
    name: &str,
    min_components: usize,
    path: &str,
) -> Result<Option<&'a AttributeLayout>> {
    match attributes.get(name) {
        Some(view) if view.layout.values_per_element < min_components => Err(ConvertError::decode(
            path,
            format!(
                "attribute {} has {} values per element, expected at least {}",
                name, view.layout.values_per_element, min_components
            ),
        )),
        Some(view) => Ok(Some(view.layout)),
        None => Ok(None),
    }
}

/// Decode one geometry buffer into `sink`.
///
/// Positions are stored relative to `origin` (the node's bounding sphere centre).
/// `path` names the resource in error messages.
pub fn decode_geometry(
    data: &[u8],
    schema: &GeometrySchema,
    origin: DVec3,
    path: &str,
    sink: &mut dyn MeshSink,
) -> Result<()> {
    if schema.geometry_type != "triangles" {
        return Err(ConvertError::decode(
            path,
            format!("unsupported geometry type {:?}", schema.geometry_type),
        ));
    }

    // header
    let mut offset = 0usize;
    let mut vertex_count = None;
    for field in &schema.header {
        let size = field.value_type.size();
        let bytes = data
            .get(offset..offset + size)
            .ok_or_else(|| ConvertError::decode(path, "truncated header"))?;
        let value = read_value(bytes, field.value_type);
        if field.property == "vertexCount" {
            vertex_count = Some(value as usize);
        }
        offset += size;
    }

    let vertex_count =
        vertex_count.ok_or_else(|| ConvertError::decode(path, "header has no vertexCount"))?;
    if vertex_count % 3 != 0 {
        return Err(ConvertError::decode(
            path,
            format!("vertex count {} is not a multiple of 3", vertex_count),
        ));
    }

    // attribute arrays
    let mut attributes: HashMap<&str, AttributeView> = HashMap::new();
    for name in &schema.ordering {
        let layout = schema.vertex_attributes.get(name).ok_or_else(|| {
            ConvertError::decode(path, format!("attribute {} has no layout", name))
        })?;
        let len = vertex_count
            .checked_mul(layout.values_per_element)
            .and_then(|n| n.checked_mul(layout.value_type.size()))
            .ok_or_else(|| ConvertError::decode(path, "attribute size overflow"))?;
        let bytes = data.get(offset..offset + len).ok_or_else(|| {
            ConvertError::decode(path, format!("truncated {} attribute", name))
        })?;
        attributes.insert(name.as_str(), AttributeView { data: bytes, layout });
        offset += len;
    }

    if attribute(&attributes, "position", 3, path)?.is_none() {
        return Err(ConvertError::decode(path, "geometry has no positions"));
    }
    attribute(&attributes, "uv0", 2, path)?;
    attribute(&attributes, "normal", 3, path)?;
    attribute(&attributes, "region", 4, path)?;

    let positions = &attributes["position"];
    let uvs = attributes.get("uv0");
    let normals = attributes.get("normal");
    let regions = attributes.get("region");

    let mut vertex_slots = SlotIndex::new();
    // texture coordinates are only shared within the same region
    let mut tc_slots = SlotIndex::new();
    let mut normal_slots = SlotIndex::new();
    let mut region_slots = SlotIndex::new();

    for triangle in 0..vertex_count / 3 {
        let first = triangle * 3;

        let image_id = match regions {
            Some(view) => {
                let region = Region::new(
                    view.get(first, 0) as u16,
                    view.get(first, 1) as u16,
                    view.get(first, 2) as u16,
                    view.get(first, 3) as u16,
                );
                let (slot, created) = region_slots.slot(region);
                if created {
                    sink.add_region(region);
                }
                slot
            }
            None => 0,
        };

        let mut face = Face {
            vertices: [0; 3],
            tex_coords: [0; 3],
            normals: normals.map(|_| [0; 3]),
            image_id,
        };

        for k in 0..3 {
            let i = first + k;

            let vertex = origin
                + DVec3::new(positions.get(i, 0), positions.get(i, 1), positions.get(i, 2));
            let (slot, created) = vertex_slots.slot(bits3(vertex));
            if created {
                sink.add_vertex(vertex)?;
            }
            face.vertices[k] = slot;

            let tc = match uvs {
                Some(view) => DVec2::new(view.get(i, 0), view.get(i, 1)),
                None => DVec2::ZERO,
            };
            let (slot, created) = tc_slots.slot((tc.x.to_bits(), tc.y.to_bits(), image_id));
            if created {
                sink.add_tex_coord(tc);
            }
            face.tex_coords[k] = slot;

            if let (Some(view), Some(indices)) = (normals, face.normals.as_mut()) {
                let normal = DVec3::new(view.get(i, 0), view.get(i, 1), view.get(i, 2));
                let (slot, created) = normal_slots.slot(bits3(normal));
                if created {
                    sink.add_normal(normal);
                }
                indices[k] = slot;
            }
        }

        sink.add_face(face);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slpk::mesh::SubMesh;
    use crate::slpk::HeaderAttribute;

    fn layout(value_type: ValueType, values_per_element: usize) -> AttributeLayout {
        AttributeLayout {
            value_type,
            values_per_element,
        }
    }

    fn schema(ordering: &[&str]) -> GeometrySchema {
        let mut vertex_attributes = HashMap::new();
        vertex_attributes.insert("position".to_string(), layout(ValueType::Float32, 3));
        vertex_attributes.insert("normal".to_string(), layout(ValueType::Float32, 3));
        vertex_attributes.insert("uv0".to_string(), layout(ValueType::Float32, 2));
        vertex_attributes.insert("color".to_string(), layout(ValueType::UInt8, 4));
        vertex_attributes.insert("region".to_string(), layout(ValueType::UInt16, 4));
        GeometrySchema {
            geometry_type: "triangles".to_string(),
            header: vec![
                HeaderAttribute {
                    property: "vertexCount".to_string(),
                    value_type: ValueType::UInt32,
                },
                HeaderAttribute {
                    property: "featureCount".to_string(),
                    value_type: ValueType::UInt32,
                },
            ],
            ordering: ordering.iter().map(|s| s.to_string()).collect(),
            vertex_attributes,
            feature_attribute_order: Vec::new(),
            feature_attributes: HashMap::new(),
        }
    }

    /// Two triangles sharing an edge (a quad), all in one region.
    fn quad_buffer(with_region: bool) -> Vec<u8> {
        let positions = [
            [0.0f32, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ];
        let uvs = [[0.0f32, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

        let mut buf = Vec::new();
        buf.extend_from_slice(&6u32.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        for p in positions {
            for c in p {
                buf.extend_from_slice(&c.to_le_bytes());
            }
        }
        for uv in uvs {
            for c in uv {
                buf.extend_from_slice(&c.to_le_bytes());
            }
        }
        if with_region {
            for _ in 0..6 {
                for c in [0u16, 0, 32767, 65535] {
                    buf.extend_from_slice(&c.to_le_bytes());
                }
            }
        }
        buf
    }

    #[test]
    fn test_decode_shares_slots() {
        let schema = schema(&["position", "uv0"]);
        let mut mesh = SubMesh::new();
        decode_geometry(&quad_buffer(false), &schema, DVec3::new(10.0, 20.0, 0.0), "g", &mut mesh)
            .unwrap();

        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.tex_coords.len(), 4);
        assert_eq!(mesh.faces.len(), 2);
        assert!(mesh.regions.is_empty());
        assert_eq!(mesh.vertices[1], DVec3::new(11.0, 20.0, 0.0));

        // shared edge 0-2 reuses the same slots
        assert_eq!(mesh.faces[0].vertices[0], mesh.faces[1].vertices[0]);
        assert_eq!(mesh.faces[0].vertices[2], mesh.faces[1].vertices[1]);
        assert_eq!(mesh.faces[0].tex_coords[2], mesh.faces[1].tex_coords[1]);
        assert_eq!(mesh.faces[0].normals, None);
    }

    #[test]
    fn test_decode_regions() {
        let schema = schema(&["position", "uv0", "region"]);
        let mut mesh = SubMesh::new();
        decode_geometry(&quad_buffer(true), &schema, DVec3::ZERO, "g", &mut mesh).unwrap();

        assert_eq!(mesh.regions, vec![Region::new(0, 0, 32767, 65535)]);
        assert!(mesh.faces.iter().all(|f| f.image_id == 0));
    }

    #[test]
    fn test_truncated_buffer_names_path() {
        let schema = schema(&["position", "uv0", "region"]);
        let mut mesh = SubMesh::new();
        let err = decode_geometry(
            &quad_buffer(false),
            &schema,
            DVec3::ZERO,
            "nodes/1/geometries/0.bin",
            &mut mesh,
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("nodes/1/geometries/0.bin"), "{}", message);
        assert!(message.contains("region"), "{}", message);
    }

    #[test]
    fn test_vertex_count_must_form_triangles() {
        let schema = schema(&["position"]);
        let mut buf = Vec::new();
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&[0u8; 24]);

        let mut mesh = SubMesh::new();
        assert!(decode_geometry(&buf, &schema, DVec3::ZERO, "g", &mut mesh).is_err());
    }
}
