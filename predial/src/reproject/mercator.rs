//! Projection Web Mercator (EPSG:3857)
//!
//! Aussi connu sous le nom de Pseudo-Mercator. Format de sortie fréquent des
//! serveurs WFS quand le CRS n'est pas imposé.

use std::f64::consts::FRAC_PI_4;

use super::ellipsoid::WGS84;
use super::Geographic;

/// Convertit coordonnées géographiques vers Web Mercator (EPSG:3857)
pub fn geographic_to_web_mercator(geo: Geographic) -> (f64, f64) {
    // Modèle sphérique avec le rayon équatorial
    let r = WGS84::A;

    // Limiter la latitude pour éviter l'infini
    let lat = geo.lat.clamp(-85.0_f64.to_radians(), 85.0_f64.to_radians());

    (r * geo.lon, r * (FRAC_PI_4 + lat / 2.0).tan().ln())
}

/// Convertit Web Mercator vers coordonnées géographiques
pub fn web_mercator_to_geographic(x: f64, y: f64) -> Geographic {
    let r = WGS84::A;

    let lon = x / r;
    let lat = 2.0 * (y / r).exp().atan() - std::f64::consts::FRAC_PI_2;

    Geographic::new(lon, lat)
}
