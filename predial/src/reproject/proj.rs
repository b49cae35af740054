//! Reprojection via PROJ
//!
//! Disponible uniquement avec le feature `reproject`. Couvre les paires que
//! [`ReprojectorLite`](super::ReprojectorLite) ne sait pas traiter.

use anyhow::{Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use ::proj::Proj;

use crate::types::{Areal, Crs};

/// Reprojection entre deux systèmes EPSG quelconques
pub struct Reprojector {
    proj: Proj,
    source: Crs,
    target: Crs,
}

impl Reprojector {
    pub fn new(source: Crs, target: Crs) -> Result<Self> {
        let proj = Proj::new_known_crs(&source.to_string(), &target.to_string(), None)
            .with_context(|| format!("Failed to create projection from {} to {}", source, target))?;

        Ok(Self {
            proj,
            source,
            target,
        })
    }

    pub(crate) fn crs_pair(&self) -> (String, String) {
        (self.source.to_string(), self.target.to_string())
    }

    /// Transforme une géométrie surfacique
    pub fn transform_areal(&self, areal: &Areal) -> Result<Areal> {
        Ok(match areal {
            Areal::Polygon(p) => Areal::Polygon(self.transform_polygon(p)?),
            Areal::MultiPolygon(mp) => {
                let polys: Result<Vec<Polygon>> =
                    mp.0.iter().map(|p| self.transform_polygon(p)).collect();
                Areal::MultiPolygon(MultiPolygon::new(polys?))
            }
        })
    }

    /// Transforme un anneau (conversion batch)
    fn transform_ring(&self, ls: &LineString) -> Result<LineString> {
        let mut coords: Vec<(f64, f64)> = ls.0.iter().map(|c| (c.x, c.y)).collect();

        self.proj
            .convert_array(&mut coords)
            .context("Batch coordinate transformation failed")?;

        if coords.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            anyhow::bail!("Coordinates outside the domain of {}", self.source);
        }

        Ok(LineString::new(
            coords.into_iter().map(|(x, y)| Coord { x, y }).collect(),
        ))
    }

    fn transform_polygon(&self, p: &Polygon) -> Result<Polygon> {
        let exterior = self.transform_ring(p.exterior())?;
        let interiors: Result<Vec<LineString>> = p
            .interiors()
            .iter()
            .map(|ls| self.transform_ring(ls))
            .collect();
        Ok(Polygon::new(exterior, interiors?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_lcc_mexico_to_wgs84() {
        let reproj = Reprojector::new(Crs::new(6372), Crs::WGS84).unwrap();
        let areal = Areal::Polygon(polygon![
            (x: 2_800_000.0, y: 829_000.0),
            (x: 2_800_100.0, y: 829_000.0),
            (x: 2_800_100.0, y: 829_100.0),
        ]);

        let Areal::Polygon(p) = reproj.transform_areal(&areal).unwrap() else {
            panic!("Expected Polygon");
        };
        let c = p.exterior().0[0];
        assert!((c.x - (-99.13)).abs() < 0.1, "x={}", c.x);
        assert!((c.y - 19.43).abs() < 0.1, "y={}", c.y);
    }
}
