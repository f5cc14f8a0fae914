//! Closed-form transforms between the systems scene layers commonly use.

use super::SrsDefinition;
use crate::error::{ConvertError, Result};
use glam::DVec3;

/// WGS84 semi-major axis (also the web mercator sphere radius).
const WGS84_A: f64 = 6_378_137.0;
/// WGS84 first eccentricity squared.
const WGS84_E2: f64 = 6.694_379_990_141_316e-3;
/// Latitude limit of web mercator.
const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum Transform {
    Identity,
    GeographicToMercator,
    MercatorToGeographic,
    GeographicToGeocentric,
}

impl Transform {
    pub(super) fn between(src: &SrsDefinition, dst: &SrsDefinition) -> Option<Transform> {
        if src == dst {
            return Some(Transform::Identity);
        }
        match (src, dst) {
            (SrsDefinition::Epsg(4326), SrsDefinition::Epsg(3857)) => {
                Some(Transform::GeographicToMercator)
            }
            (SrsDefinition::Epsg(3857), SrsDefinition::Epsg(4326)) => {
                Some(Transform::MercatorToGeographic)
            }
            (SrsDefinition::Epsg(4326), SrsDefinition::Epsg(4978)) => {
                Some(Transform::GeographicToGeocentric)
            }
            _ => None,
        }
    }

    pub(super) fn apply(&self, p: DVec3) -> Result<DVec3> {
        match self {
            Transform::Identity => Ok(p),
            Transform::GeographicToMercator => {
                check_geographic(p)?;
                if p.y.abs() > MERCATOR_MAX_LAT {
                    return Err(ConvertError::Projection(format!(
                        "latitude {} outside web mercator domain",
                        p.y
                    )));
                }
                let x = WGS84_A * p.x.to_radians();
                let y = WGS84_A * (std::f64::consts::FRAC_PI_4 + p.y.to_radians() / 2.0).tan().ln();
                Ok(DVec3::new(x, y, p.z))
            }
            Transform::MercatorToGeographic => {
                if !p.is_finite() {
                    return Err(ConvertError::Projection(format!("non-finite point {}", p)));
                }
                let lon = (p.x / WGS84_A).to_degrees();
                let lat = (2.0 * (p.y / WGS84_A).exp().atan() - std::f64::consts::FRAC_PI_2)
                    .to_degrees();
                Ok(DVec3::new(lon, lat, p.z))
            }
            Transform::GeographicToGeocentric => {
                check_geographic(p)?;
                let (lon, lat) = (p.x.to_radians(), p.y.to_radians());
                let n = WGS84_A / (1.0 - WGS84_E2 * lat.sin().powi(2)).sqrt();
                Ok(DVec3::new(
                    (n + p.z) * lat.cos() * lon.cos(),
                    (n + p.z) * lat.cos() * lon.sin(),
                    (n * (1.0 - WGS84_E2) + p.z) * lat.sin(),
                ))
            }
        }
    }
}

fn check_geographic(p: DVec3) -> Result<()> {
    if !p.is_finite() || p.y.abs() > 90.0 || p.x.abs() > 360.0 {
        return Err(ConvertError::Projection(format!(
            "point {} outside geographic domain",
            p
        )));
    }
    Ok(())
}
