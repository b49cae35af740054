//! Normalisation du système de référence d'un jeu de features

use tracing::{debug, info};

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::reproject::SmartReprojector;
use crate::types::{Crs, FeatureSet, HasGeometry};
use crate::PredialError;

/// Ramène toutes les coordonnées du jeu dans `target`.
///
/// Un jeu sans système déclaré est lu en WGS 84 (RFC 7946). Si le système
/// déclaré est déjà `target`, le jeu est rendu tel quel : l'opération est
/// idempotente. En cas d'échec sur une feature, le jeu entier est rejeté.
pub fn normalize<F: HasGeometry>(
    mut set: FeatureSet<F>,
    target: Crs,
    scope: &str,
    sink: &mut dyn DiagnosticSink,
) -> Result<FeatureSet<F>, PredialError> {
    let source = set.crs.unwrap_or(Crs::WGS84);

    if source == target {
        debug!(scope, crs = %target, "Already in target frame");
        set.crs = Some(target);
        return Ok(set);
    }

    let reprojector = SmartReprojector::new(source, target)?;
    info!(
        scope,
        source = %source,
        target = %target,
        backend = reprojector.description(),
        features = set.len(),
        "Reprojecting"
    );

    for feature in set.features.iter_mut() {
        let transformed = reprojector.transform(feature.geometry())?;
        *feature.geometry_mut() = transformed;
    }
    set.crs = Some(target);

    sink.emit(Diagnostic::Reprojected {
        scope: scope.to_string(),
        source,
        target,
        features: set.len(),
    });

    Ok(set)
}

/// Précondition de toute comparaison entre deux jeux : même système, déclaré.
pub fn ensure_same_frame(a: Option<Crs>, b: Option<Crs>) -> Result<Crs, PredialError> {
    match (a, b) {
        (Some(a), Some(b)) if a == b => Ok(a),
        (Some(a), Some(b)) => Err(PredialError::crs(format!(
            "reference frames differ: {} vs {}",
            a, b
        ))),
        _ => Err(PredialError::crs(
            "feature set has no reference frame; normalize it first",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::types::{Areal, ParcelPolygon, ParcelSet};
    use geo::polygon;

    fn parcels(crs: Option<Crs>) -> ParcelSet {
        ParcelSet::new(
            crs,
            vec![ParcelPolygon {
                id: 1,
                predio_id: "P1".into(),
                subpoligono_id: "P1_subpoligono_1".into(),
                geometry: Areal::Polygon(polygon![
                    (x: -99.2, y: 19.3),
                    (x: -99.1, y: 19.3),
                    (x: -99.1, y: 19.4),
                    (x: -99.2, y: 19.4),
                ]),
            }],
        )
    }

    #[test]
    fn test_same_frame_is_unchanged() {
        let mut sink = Diagnostics::new();
        let input = parcels(Some(Crs::WGS84));
        let out = normalize(input.clone(), Crs::WGS84, "parcels", &mut sink).unwrap();

        assert_eq!(out, input);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_unset_frame_is_tagged_wgs84() {
        let mut sink = Diagnostics::new();
        let out = normalize(parcels(None), Crs::WGS84, "parcels", &mut sink).unwrap();

        assert_eq!(out.crs, Some(Crs::WGS84));
        assert_eq!(out.features, parcels(None).features);
    }

    #[test]
    fn test_reprojection_is_idempotent() {
        let mut sink = Diagnostics::new();
        let once = normalize(parcels(None), Crs::WEB_MERCATOR, "parcels", &mut sink).unwrap();
        let twice = normalize(once.clone(), Crs::WEB_MERCATOR, "parcels", &mut sink).unwrap();

        assert_eq!(once, twice);
        assert_eq!(once.crs, Some(Crs::WEB_MERCATOR));
        assert_eq!(sink.events.len(), 1);
        assert!(once.features[0].geometry.bounding_rect().unwrap().min().x < -11_000_000.0);
    }

    #[cfg(not(feature = "reproject"))]
    #[test]
    fn test_unsupported_frame_is_error() {
        let mut sink = Diagnostics::new();
        let err = normalize(parcels(Some(Crs::new(2154))), Crs::WGS84, "parcels", &mut sink)
            .unwrap_err();
        assert!(matches!(err, PredialError::Crs(_)));
    }

    #[test]
    fn test_ensure_same_frame() {
        assert_eq!(
            ensure_same_frame(Some(Crs::WGS84), Some(Crs::WGS84)).unwrap(),
            Crs::WGS84
        );
        assert!(matches!(
            ensure_same_frame(Some(Crs::WGS84), Some(Crs::WEB_MERCATOR)),
            Err(PredialError::Crs(_))
        ));
        assert!(matches!(
            ensure_same_frame(None, Some(Crs::WGS84)),
            Err(PredialError::Crs(_))
        ));
    }
}
