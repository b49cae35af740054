//! Estimation d'aire métrique à partir d'une aire en degrés carrés
//!
//! Conversion linéaire fixe : un degré carré vaut `111 km × 111 km`, valeur
//! calibrée à l'équateur. Ce n'est pas un calcul géodésique. L'erreur croît
//! avec la latitude (un degré de longitude raccourcit en `cos φ`) et avec
//! l'étendue du polygone. Toute sortie destinée à un utilisateur porte le
//! qualificatif "(estimated)" et le texte [`AREA_DISCLAIMER`].

use serde::Serialize;

/// Mètres carrés par unité d'aire du système de référence (111 000 m)²
pub const SCALE_CONSTANT: f64 = 12_321_000_000.0;

/// Unité métrique affichée
pub const UNIT_SUFFIX: &str = "m²";

/// Qualificatif obligatoire de toute aire métrique
pub const QUALIFIER: &str = "(estimated)";

/// Avertissement repris dans les rapports
pub const AREA_DISCLAIMER: &str = "Metric areas are estimated with a fixed factor of \
12,321,000,000 m² per square degree (111 km x 111 km, calibrated at the equator). \
They are not geodesic: the estimate overstates true area by roughly 1/cos(latitude) \
(about +6% at 20°, +15% at 30°) and degrades further for polygons spanning large extents.";

/// Aire brute et son estimation métrique formatée
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaEstimate {
    /// Aire dans les unités du système de référence
    #[serde(rename = "area_raw")]
    pub raw: f64,

    /// Ex. `"12321000000.00 m² (estimated)"`
    #[serde(rename = "area_m2")]
    pub estimated: String,
}

/// Valeur métrique estimée, non arrondie
pub fn metric_value(raw: f64) -> f64 {
    raw * SCALE_CONSTANT
}

/// Estime l'aire métrique d'une aire brute
///
/// Seule implémentation utilisée pour les intersections comme pour les
/// superpositions, afin que l'arrondi et le format restent identiques.
pub fn estimate(raw: f64) -> AreaEstimate {
    AreaEstimate {
        raw,
        estimated: format!("{:.2} {} {}", metric_value(raw), UNIT_SUFFIX, QUALIFIER),
    }
}

/// Facteur de surestimation pour un petit polygone à la latitude donnée
///
/// Vaut environ `1 / cos φ` ; infini au pôle.
pub fn latitude_distortion(latitude_deg: f64) -> f64 {
    let cos = latitude_deg.clamp(-90.0, 90.0).to_radians().cos();
    if cos <= f64::EPSILON {
        f64::INFINITY
    } else {
        1.0 / cos
    }
}
