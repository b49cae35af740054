//! Chargement des FeatureCollection GeoJSON en jeux typés
//!
//! Les parcelles passent par le [`GeometryValidator`] ; les features des
//! couches externes ne sont filtrées que sur leur type (surfacique ou non).

use geojson::{feature::Id, Feature, FeatureCollection, GeoJson, JsonObject, JsonValue};
use tracing::{debug, info};

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::types::{Areal, Attributes, Crs, ExternalFeature, Layer, ParcelPolygon, ParcelSet, UNKNOWN};
use crate::validate::{geometry_kind, GeometryValidator};
use crate::PredialError;

/// Clé de predio quand la propriété `predio_id` est absente
pub const DEFAULT_PREDIO_ID: &str = UNKNOWN;

/// Construit les parcelles d'une requête.
///
/// Le compteur ne progresse qu'à chaque parcelle acceptée : il fournit à la
/// fois l'`id` 1-based et le `n` des clés `{predio}_subpoligono_{n}`.
#[derive(Debug, Default)]
pub struct ParcelLoader {
    accepted: usize,
}

impl ParcelLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nombre de parcelles acceptées jusqu'ici
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Charge une FeatureCollection de parcelles
    pub fn load(
        &mut self,
        text: &str,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<ParcelSet, PredialError> {
        let collection = parse_collection(text)?;
        let crs = declared_crs(&collection)?;
        let total = collection.features.len();

        let mut validator = GeometryValidator::new(sink);
        let mut parcels = Vec::with_capacity(total);

        for (index, feature) in collection.features.iter().enumerate() {
            let props = feature.properties.as_ref();
            let predio_id = props
                .and_then(|p| p.get("predio_id"))
                .and_then(key_string)
                .unwrap_or_else(|| DEFAULT_PREDIO_ID.to_string());
            let poligono = props.and_then(|p| p.get("poligono")).and_then(key_string);
            let label = poligono.as_deref().unwrap_or(&predio_id);

            let Some(geometry) = to_geo(feature) else {
                validator.reject(index, Some(label), "missing or unreadable geometry");
                continue;
            };
            let Some(areal) = validator.accept(index, Some(label), &geometry) else {
                continue;
            };

            self.accepted += 1;
            let n = self.accepted;
            let subpoligono_id =
                poligono.unwrap_or_else(|| format!("{}_subpoligono_{}", predio_id, n));

            debug!(id = n, predio_id = %predio_id, subpoligono_id = %subpoligono_id, "Parcel accepted");
            parcels.push(ParcelPolygon {
                id: n,
                predio_id,
                subpoligono_id,
                geometry: areal,
            });
        }

        info!(
            accepted = parcels.len(),
            rejected = total - parcels.len(),
            crs = ?crs.map(|c| c.to_string()),
            "Parcels loaded"
        );
        Ok(ParcelSet::new(crs, parcels))
    }
}

/// Charge les parcelles d'une requête avec un compteur neuf
pub fn load_parcels(text: &str, sink: &mut dyn DiagnosticSink) -> Result<ParcelSet, PredialError> {
    ParcelLoader::new().load(text, sink)
}

/// Charge les features d'une couche externe.
///
/// Identifiant : `id` de la feature, sinon propriété `id`, sinon la position
/// 1-based dans la collection. Les features non surfaciques sont écartées.
pub fn load_layer(text: &str, sink: &mut dyn DiagnosticSink) -> Result<Layer, PredialError> {
    let collection = parse_collection(text)?;
    let crs = declared_crs(&collection)?;
    let total = collection.features.len();

    let mut features = Vec::with_capacity(total);
    for (index, feature) in collection.features.into_iter().enumerate() {
        let id = feature_id(&feature).unwrap_or_else(|| (index + 1).to_string());

        let Some(geometry) = to_geo(&feature) else {
            sink.emit(Diagnostic::rejected(
                index,
                Some(&id),
                "missing or unreadable geometry",
            ));
            continue;
        };
        let kind = geometry_kind(&geometry);
        let Some(areal) = Areal::from_geometry(geometry) else {
            sink.emit(Diagnostic::rejected(
                index,
                Some(&id),
                format!("unsupported geometry type {}", kind),
            ));
            continue;
        };

        let attributes = feature
            .properties
            .map(|props| props.into_iter().collect::<Attributes>())
            .unwrap_or_default();

        features.push(ExternalFeature {
            id,
            geometry: areal,
            attributes,
        });
    }

    debug!(kept = features.len(), dropped = total - features.len(), "Layer loaded");
    Ok(Layer::new(crs, features))
}

fn parse_collection(text: &str) -> Result<FeatureCollection, PredialError> {
    match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => Ok(fc),
        GeoJson::Feature(_) => Err(PredialError::input(
            "expected a FeatureCollection, got a Feature",
        )),
        GeoJson::Geometry(_) => Err(PredialError::input(
            "expected a FeatureCollection, got a Geometry",
        )),
    }
}

/// Membre `crs` hérité (GeoJSON 2008) : `{"type":"name","properties":{"name":...}}`
fn declared_crs(collection: &FeatureCollection) -> Result<Option<Crs>, PredialError> {
    let name = collection
        .foreign_members
        .as_ref()
        .and_then(|m| m.get("crs"))
        .and_then(|crs| crs.get("properties"))
        .and_then(|p| p.get("name"))
        .and_then(JsonValue::as_str);

    name.map(Crs::parse).transpose()
}

fn to_geo(feature: &Feature) -> Option<geo::Geometry> {
    let geometry = feature.geometry.as_ref()?;
    geo::Geometry::<f64>::try_from(geometry.value.clone()).ok()
}

/// Une clé textuelle ou numérique, rendue en chaîne
fn key_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn feature_id(feature: &Feature) -> Option<String> {
    match &feature.id {
        Some(Id::String(s)) => Some(s.clone()),
        Some(Id::Number(n)) => Some(n.to_string()),
        None => feature
            .properties
            .as_ref()
            .and_then(|p: &JsonObject| p.get("id"))
            .and_then(key_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::types::AttributeValue;

    const SQUARE: &str = r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}"#;
    const BOWTIE: &str = r#"{"type":"Polygon","coordinates":[[[0,0],[1,1],[1,0],[0,1],[0,0]]]}"#;

    fn collection(features: &[String]) -> String {
        format!(
            r#"{{"type":"FeatureCollection","features":[{}]}}"#,
            features.join(",")
        )
    }

    fn feature(geometry: &str, properties: &str) -> String {
        format!(
            r#"{{"type":"Feature","geometry":{},"properties":{}}}"#,
            geometry, properties
        )
    }

    #[test]
    fn test_default_keys() {
        let text = collection(&[
            feature(SQUARE, "{}"),
            feature(SQUARE, r#"{"predio_id":"P9"}"#),
            feature(SQUARE, r#"{"predio_id":42,"poligono":"A"}"#),
        ]);
        let mut sink = Diagnostics::new();
        let set = load_parcels(&text, &mut sink).unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(set.crs, None);
        assert_eq!(set.features[0].predio_id, "unknown");
        assert_eq!(set.features[0].subpoligono_id, "unknown_subpoligono_1");
        assert_eq!(set.features[1].subpoligono_id, "P9_subpoligono_2");
        assert_eq!(set.features[2].predio_id, "42");
        assert_eq!(set.features[2].subpoligono_id, "A");
        let ids: Vec<usize> = set.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_counter_skips_rejected() {
        let text = collection(&[
            feature(BOWTIE, r#"{"predio_id":"P1"}"#),
            feature(SQUARE, r#"{"predio_id":"P1"}"#),
            feature(r#"{"type":"Point","coordinates":[0,0]}"#, "{}"),
            feature("null", "{}"),
        ]);
        let mut sink = Diagnostics::new();
        let set = load_parcels(&text, &mut sink).unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.features[0].id, 1);
        assert_eq!(set.features[0].subpoligono_id, "P1_subpoligono_1");
        assert_eq!(sink.rejection_count(), 3);
    }

    #[test]
    fn test_counter_continues_across_loads() {
        let text = collection(&[feature(SQUARE, "{}")]);
        let mut sink = Diagnostics::new();
        let mut loader = ParcelLoader::new();
        loader.load(&text, &mut sink).unwrap();
        let second = loader.load(&text, &mut sink).unwrap();

        assert_eq!(second.features[0].id, 2);
        assert_eq!(loader.accepted(), 2);
    }

    #[test]
    fn test_declared_crs() {
        let text = r#"{"type":"FeatureCollection",
            "crs":{"type":"name","properties":{"name":"urn:ogc:def:crs:EPSG::6372"}},
            "features":[]}"#;
        let set = load_parcels(text, &mut Diagnostics::new()).unwrap();
        assert_eq!(set.crs, Some(Crs::new(6372)));
        assert!(set.is_empty());
    }

    #[test]
    fn test_unknown_crs_is_error() {
        let text = r#"{"type":"FeatureCollection",
            "crs":{"type":"name","properties":{"name":"LOCAL_GRID"}},
            "features":[]}"#;
        let err = load_parcels(text, &mut Diagnostics::new()).unwrap_err();
        assert!(matches!(err, PredialError::Crs(_)));
    }

    #[test]
    fn test_not_a_collection() {
        let err = load_parcels(SQUARE, &mut Diagnostics::new()).unwrap_err();
        assert!(matches!(err, PredialError::Input(_)));

        let err = load_parcels("not json", &mut Diagnostics::new()).unwrap_err();
        assert!(matches!(err, PredialError::Input(_)));
    }

    #[test]
    fn test_layer_ids_and_attributes() {
        let text = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","id":"anp.7","geometry":SQ,"properties":{"nombre":"Sian Ka'an","region":null}},
            {"type":"Feature","geometry":SQ,"properties":{"id":12}},
            {"type":"Feature","geometry":SQ,"properties":null},
            {"type":"Feature","geometry":{"type":"LineString","coordinates":[[0,0],[1,1]]},"properties":{}}
        ]}"#
        .replace("SQ", SQUARE);
        let mut sink = Diagnostics::new();
        let layer = load_layer(&text, &mut sink).unwrap();

        let ids: Vec<&str> = layer.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["anp.7", "12", "3"]);
        assert_eq!(
            layer.features[0].attributes.get("nombre"),
            AttributeValue::Known(serde_json::json!("Sian Ka'an"))
        );
        assert!(layer.features[0].attributes.get("region").is_unknown());
        assert!(layer.features[2].attributes.is_empty());
        assert_eq!(sink.rejection_count(), 1);
    }

    #[test]
    fn test_layer_keeps_invalid_topology() {
        let text = collection(&[feature(BOWTIE, "{}")]);
        let layer = load_layer(&text, &mut Diagnostics::new()).unwrap();
        assert_eq!(layer.len(), 1);
    }
}
