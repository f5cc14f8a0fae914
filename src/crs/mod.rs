//! Coordinate system conversion.
//!
//! A [`CsConvertor`] converts points between a source and a destination
//! spatial reference. Engines are not shared between threads: workers build
//! their own convertor from a [`ConvertorSpec`].

mod builtin;

use crate::error::{ConvertError, Result};
use glam::DVec3;
use std::fmt;
use std::str::FromStr;

/// Definition of a spatial reference system.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SrsDefinition {
    /// An EPSG code.
    Epsg(u32),
    /// Anything else (WKT, PROJ string); only usable with the `proj` feature.
    Custom(String),
}

impl SrsDefinition {
    /// Web mercator, the default destination.
    pub const WEB_MERCATOR: SrsDefinition = SrsDefinition::Epsg(3857);

    /// Normalize aliases of the same system (ESRI 102100/102113 are web mercator).
    fn canonical(&self) -> SrsDefinition {
        match self {
            SrsDefinition::Epsg(102100)
            | SrsDefinition::Epsg(102113)
            | SrsDefinition::Epsg(900913) => SrsDefinition::WEB_MERCATOR,
            other => other.clone(),
        }
    }
}

impl Default for SrsDefinition {
    fn default() -> Self {
        Self::WEB_MERCATOR
    }
}

impl FromStr for SrsDefinition {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConvertError::Projection("empty SRS definition".to_string()));
        }
        let code = s
            .strip_prefix("EPSG:")
            .or_else(|| s.strip_prefix("epsg:"))
            .unwrap_or(s);
        match code.parse::<u32>() {
            Ok(code) => Ok(SrsDefinition::Epsg(code)),
            Err(_) => Ok(SrsDefinition::Custom(s.to_string())),
        }
    }
}

impl fmt::Display for SrsDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SrsDefinition::Epsg(code) => write!(f, "EPSG:{}", code),
            SrsDefinition::Custom(def) => f.write_str(def),
        }
    }
}

enum Engine {
    Builtin(builtin::Transform),
    #[cfg(feature = "proj")]
    Proj(proj::Proj),
}

/// Source and destination definitions; builds identical convertors by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertorSpec {
    pub src: SrsDefinition,
    pub dst: SrsDefinition,
}

impl ConvertorSpec {
    pub fn new(src: SrsDefinition, dst: SrsDefinition) -> Self {
        Self { src, dst }
    }

    pub fn build(&self) -> Result<CsConvertor> {
        CsConvertor::new(self.src.clone(), self.dst.clone())
    }
}

/// Point-wise converter between two spatial references.
pub struct CsConvertor {
    src: SrsDefinition,
    dst: SrsDefinition,
    engine: Engine,
}

impl CsConvertor {
    pub fn new(src: SrsDefinition, dst: SrsDefinition) -> Result<Self> {
        let engine = build_engine(&src, &dst)?;
        Ok(Self { src, dst, engine })
    }

    pub fn src(&self) -> &SrsDefinition {
        &self.src
    }

    pub fn dst(&self) -> &SrsDefinition {
        &self.dst
    }

    /// Definitions this convertor was built from.
    pub fn spec(&self) -> ConvertorSpec {
        ConvertorSpec::new(self.src.clone(), self.dst.clone())
    }

    /// Convert one point. Points outside the valid domain are an error.
    pub fn convert(&self, point: DVec3) -> Result<DVec3> {
        match &self.engine {
            Engine::Builtin(transform) => transform.apply(point),
            #[cfg(feature = "proj")]
            Engine::Proj(proj) => {
                let (x, y) = proj
                    .convert((point.x, point.y))
                    .map_err(|e| ConvertError::Projection(format!("{}: {}", point, e)))?;
                Ok(DVec3::new(x, y, point.z))
            }
        }
    }
}

impl fmt::Debug for CsConvertor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsConvertor")
            .field("src", &self.src)
            .field("dst", &self.dst)
            .finish()
    }
}

fn build_engine(src: &SrsDefinition, dst: &SrsDefinition) -> Result<Engine> {
    if let Some(transform) = builtin::Transform::between(&src.canonical(), &dst.canonical()) {
        return Ok(Engine::Builtin(transform));
    }
    external_engine(src, dst)
}

#[cfg(feature = "proj")]
fn external_engine(src: &SrsDefinition, dst: &SrsDefinition) -> Result<Engine> {
    let proj = proj::Proj::new_known_crs(&src.to_string(), &dst.to_string(), None)
        .map_err(|e| ConvertError::Projection(format!("{} -> {}: {}", src, dst, e)))?;
    Ok(Engine::Proj(proj))
}

#[cfg(not(feature = "proj"))]
fn external_engine(src: &SrsDefinition, dst: &SrsDefinition) -> Result<Engine> {
    Err(ConvertError::Projection(format!(
        "conversion {} -> {} requires the `proj` feature",
        src, dst
    )))
}
