//! Extent reduction over the top level of the tree.

use crate::crs::{ConvertorSpec, CsConvertor};
use crate::error::{ConvertError, Result};
use crate::slpk::{Archive, GeometrySink, MeshSink, Tree};
use crate::types::Extents2;
use glam::DVec3;
use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::debug;

/// Converts vertices and folds them into a 2D box; ignores everything else.
struct ExtentsSink<'a> {
    conv: &'a CsConvertor,
    extents: Extents2,
}

impl MeshSink for ExtentsSink<'_> {
    fn add_vertex(&mut self, vertex: DVec3) -> Result<()> {
        let converted = self.conv.convert(vertex)?;
        self.extents.update(converted.truncate());
        Ok(())
    }
}

impl GeometrySink for ExtentsSink<'_> {
    fn next(&mut self) -> &mut dyn MeshSink {
        self
    }
}

/// Extents, in the destination SRS, of all geometry at the tree's top level.
///
/// Nodes are measured in parallel on the current rayon pool, each worker with
/// its own convertor. Returns invalid extents when no node has geometry.
pub fn measure_extents(tree: &Tree, archive: &Archive, spec: &ConvertorSpec) -> Result<Extents2> {
    let nodes = tree.top_level_nodes();
    debug!("Measuring {} top level nodes", nodes.len());

    let extents = Mutex::new(Extents2::invalid());

    nodes.par_iter().try_for_each_init(
        || spec.build(),
        |conv, node| -> Result<()> {
            let conv = conv
                .as_ref()
                .map_err(|e| ConvertError::Projection(e.to_string()))?;

            let mut sink = ExtentsSink {
                conv,
                extents: Extents2::invalid(),
            };
            archive
                .load_geometry(node, &mut sink)
                .map_err(|e| e.in_node(&node.id))?;

            extents.lock().merge(&sink.extents);
            Ok(())
        },
    )?;

    Ok(extents.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::SrsDefinition;
    use glam::DVec2;

    #[test]
    fn test_sink_converts_before_folding() {
        let conv =
            CsConvertor::new(SrsDefinition::Epsg(4326), SrsDefinition::WEB_MERCATOR).unwrap();
        let mut sink = ExtentsSink {
            conv: &conv,
            extents: Extents2::invalid(),
        };

        let mesh = sink.next();
        mesh.add_vertex(DVec3::new(0.0, 0.0, 10.0)).unwrap();
        mesh.add_vertex(DVec3::new(180.0, 0.0, -10.0)).unwrap();

        assert_eq!(sink.extents.ll, DVec2::ZERO);
        assert!((sink.extents.ur.x - 20_037_508.342_789_244).abs() < 1e-6);
        assert_eq!(sink.extents.ur.y, 0.0);
    }

    #[test]
    fn test_sink_propagates_projection_errors() {
        let conv =
            CsConvertor::new(SrsDefinition::Epsg(4326), SrsDefinition::WEB_MERCATOR).unwrap();
        let mut sink = ExtentsSink {
            conv: &conv,
            extents: Extents2::invalid(),
        };
        let result = sink.add_vertex(DVec3::new(0.0, 89.5, 0.0));
        assert!(matches!(result, Err(ConvertError::Projection(_))));
        assert!(!sink.extents.is_valid());
    }
}
