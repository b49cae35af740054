//! Reprojection légère en Rust pur (sans dépendances externes)
//!
//! Supporte les systèmes rencontrés sur les couches réglementaires mexicaines :
//! - WGS84 (EPSG:4326)
//! - Web Mercator (EPSG:3857)
//! - Mexico ITRF2008 / LCC (EPSG:6372), Mexico ITRF92 / LCC (EPSG:6362)
//! - WGS 84 / UTM 11N-16N (EPSG:32611-32616)
//! - Mexico ITRF2008 / UTM 11N-16N (EPSG:6366-6371)
//!
//! Cibles supportées :
//! - WGS84 (EPSG:4326)
//! - Web Mercator (EPSG:3857)
//!
//! Les cadres ITRF sont assimilés à WGS84 (écart submétrique).

mod ellipsoid;
mod lcc;
mod mercator;
#[cfg(feature = "reproject")]
mod proj;
mod smart;
mod utm;

pub use lcc::LambertConic;
pub use smart::SmartReprojector;

#[cfg(feature = "reproject")]
pub use self::proj::Reprojector;

use anyhow::{bail, Result};
use geo::Coord;

use crate::types::{Areal, Crs};

/// Point en coordonnées géographiques (radians)
#[derive(Debug, Clone, Copy)]
pub struct Geographic {
    /// Longitude en radians
    pub lon: f64,
    /// Latitude en radians
    pub lat: f64,
}

impl Geographic {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Convertit en degrés
    pub fn to_degrees(self) -> (f64, f64) {
        (self.lon.to_degrees(), self.lat.to_degrees())
    }

    /// Crée depuis des degrés
    pub fn from_degrees(lon_deg: f64, lat_deg: f64) -> Self {
        Self {
            lon: lon_deg.to_radians(),
            lat: lat_deg.to_radians(),
        }
    }
}

/// Reprojection légère
#[derive(Debug, Clone, Copy)]
pub struct ReprojectorLite {
    source: Crs,
    target: Crs,
}

impl ReprojectorLite {
    /// Crée un nouveau reprojector
    pub fn new(source: Crs, target: Crs) -> Result<Self> {
        if !Self::is_supported_source(source.epsg) {
            bail!(
                "EPSG:{} non supporté. Sources supportées: 4326, 3857, 6362, 6372, 6366-6371, 32611-32616",
                source.epsg
            );
        }
        if !Self::is_supported_target(target.epsg) {
            bail!(
                "EPSG:{} non supporté. Cibles supportées: 4326, 3857",
                target.epsg
            );
        }

        Ok(Self { source, target })
    }

    /// Vérifie si l'EPSG source est supporté
    pub fn is_supported_source(epsg: u32) -> bool {
        matches!(epsg, 4326 | 3857 | 6362 | 6372 | 6366..=6371 | 32611..=32616)
    }

    /// Vérifie si l'EPSG cible est supporté
    pub fn is_supported_target(epsg: u32) -> bool {
        matches!(epsg, 4326 | 3857)
    }

    /// Vérifie si la reprojection est supportée
    pub fn is_supported(source: Crs, target: Crs) -> bool {
        Self::is_supported_source(source.epsg) && Self::is_supported_target(target.epsg)
    }

    /// Transforme un point (x, y) de la source vers la cible
    pub fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        // Étape 1: Source → Géographique (WGS84)
        let geo = self.source_to_geographic(x, y)?;

        // Étape 2: Géographique → Cible
        let (tx, ty) = self.geographic_to_target(geo)?;
        if !tx.is_finite() || !ty.is_finite() {
            bail!("Coordonnée ({}, {}) hors du domaine de {}", x, y, self.source);
        }
        Ok((tx, ty))
    }

    /// Convertit les coordonnées source en géographique (WGS84)
    fn source_to_geographic(&self, x: f64, y: f64) -> Result<Geographic> {
        Ok(match self.source.epsg {
            4326 => Geographic::from_degrees(x, y),
            3857 => mercator::web_mercator_to_geographic(x, y),
            6362 | 6372 => LambertConic::mexico().to_geographic(x, y),
            epsg @ 6366..=6371 => utm::utm_to_geographic(x, y, epsg - 6366 + 11, false),
            epsg @ 32611..=32616 => utm::utm_to_geographic(x, y, epsg - 32600, false),
            epsg => bail!("EPSG:{} non supporté", epsg),
        })
    }

    /// Convertit les coordonnées géographiques vers la cible
    fn geographic_to_target(&self, geo: Geographic) -> Result<(f64, f64)> {
        match self.target.epsg {
            4326 => Ok(geo.to_degrees()),
            3857 => Ok(mercator::geographic_to_web_mercator(geo)),
            epsg => bail!("EPSG:{} non supporté", epsg),
        }
    }

    pub(crate) fn crs_pair(&self) -> (String, String) {
        (self.source.to_string(), self.target.to_string())
    }

    /// Transforme une géométrie surfacique
    pub fn transform_areal(&self, areal: &Areal) -> Result<Areal> {
        areal.try_map_coords(|c| {
            let (x, y) = self.transform_point(c.x, c.y)?;
            Ok(Coord { x, y })
        })
    }
}
