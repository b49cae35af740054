//! Projection conique conforme de Lambert à deux parallèles (LCC 2SP)
//!
//! Paramétrée pour la projection nationale mexicaine (INEGI) :
//! - Mexico ITRF2008 / LCC (EPSG:6372)
//! - Mexico ITRF92 / LCC (EPSG:6362), mêmes paramètres

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use super::ellipsoid::GRS80;
use super::Geographic;

/// Paramètres d'une LCC 2SP sur GRS80
#[derive(Debug, Clone, Copy)]
pub struct LambertConic {
    /// Méridien central
    lon0: f64,
    /// Latitude origine
    lat0: f64,
    /// Premier parallèle standard
    lat1: f64,
    /// Deuxième parallèle standard
    lat2: f64,
    /// False easting
    x0: f64,
    /// False northing
    y0: f64,
}

/// Constantes dérivées, calculées une fois
struct Derived {
    n: f64,
    c: f64,
    r0: f64,
}

impl LambertConic {
    /// Projection INEGI (EPSG:6372 / 6362)
    pub fn mexico() -> Self {
        Self {
            lon0: (-102.0_f64).to_radians(),
            lat0: 12.0_f64.to_radians(),
            lat1: 17.5_f64.to_radians(),
            lat2: 29.5_f64.to_radians(),
            x0: 2_500_000.0,
            y0: 0.0,
        }
    }

    fn derived(&self) -> Derived {
        let e = GRS80::E;
        let e2 = GRS80::E2;
        let a = GRS80::A;

        let n1 = grande_normale(self.lat1, a, e2);
        let n2 = grande_normale(self.lat2, a, e2);

        let iso_lat1 = isometric_latitude(self.lat1, e);
        let iso_lat2 = isometric_latitude(self.lat2, e);
        let iso_lat0 = isometric_latitude(self.lat0, e);

        // Exposant de la projection
        let n = ((n1 * self.lat1.cos()).ln() - (n2 * self.lat2.cos()).ln()) / (iso_lat2 - iso_lat1);

        // Constante C
        let c = (n1 * self.lat1.cos() / n) * (n * iso_lat1).exp();

        // Rayon à l'origine
        let r0 = c * (-n * iso_lat0).exp();

        Derived { n, c, r0 }
    }

    /// Coordonnées projetées vers géographiques
    pub fn to_geographic(&self, x: f64, y: f64) -> Geographic {
        let Derived { n, c, r0 } = self.derived();

        let dx = x - self.x0;
        let dy = y - self.y0;

        let r = (dx.powi(2) + (r0 - dy).powi(2)).sqrt();
        let r = if n < 0.0 { -r } else { r };
        let gamma = (dx / (r0 - dy)).atan();

        let iso_lat = -(r / c).ln() / n;
        let lat = latitude_from_isometric(iso_lat, GRS80::E);
        let lon = self.lon0 + gamma / n;

        Geographic::new(lon, lat)
    }

    /// Coordonnées géographiques vers projetées
    pub fn from_geographic(&self, geo: Geographic) -> (f64, f64) {
        let Derived { n, c, r0 } = self.derived();

        let r = c * (-n * isometric_latitude(geo.lat, GRS80::E)).exp();
        let gamma = n * (geo.lon - self.lon0);

        (self.x0 + r * gamma.sin(), self.y0 + r0 - r * gamma.cos())
    }
}

/// Calcule la latitude isométrique
fn isometric_latitude(lat: f64, e: f64) -> f64 {
    let sin_lat = lat.sin();
    let term = ((1.0 - e * sin_lat) / (1.0 + e * sin_lat)).powf(e / 2.0);
    ((FRAC_PI_4 + lat / 2.0).tan() * term).ln()
}

/// Calcule la latitude depuis la latitude isométrique (itératif)
fn latitude_from_isometric(iso_lat: f64, e: f64) -> f64 {
    let mut lat = 2.0 * iso_lat.exp().atan() - FRAC_PI_2;

    for _ in 0..10 {
        let sin_lat = lat.sin();
        let term = ((1.0 + e * sin_lat) / (1.0 - e * sin_lat)).powf(e / 2.0);
        let new_lat = 2.0 * (iso_lat.exp() * term).atan() - FRAC_PI_2;

        if (new_lat - lat).abs() < 1e-12 {
            return new_lat;
        }
        lat = new_lat;
    }
    lat
}

/// Calcule le grand normal (rayon de courbure dans le plan vertical)
fn grande_normale(lat: f64, a: f64, e2: f64) -> f64 {
    a / (1.0 - e2 * lat.sin().powi(2)).sqrt()
}
