//! Enregistrements produits par le moteur

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::area::AreaEstimate;
use crate::types::{AttributeValue, ParcelPolygon};

/// Identité d'une parcelle dans un enregistrement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParcelRef {
    pub id: usize,
    pub predio_id: String,
    pub subpoligono_id: String,
}

impl From<&ParcelPolygon> for ParcelRef {
    fn from(p: &ParcelPolygon) -> Self {
        Self {
            id: p.id,
            predio_id: p.predio_id.clone(),
            subpoligono_id: p.subpoligono_id.clone(),
        }
    }
}

/// Clés fixes d'un [`IntersectionRecord`] sérialisé ; un attribut projeté ne
/// peut pas porter l'un de ces noms
pub const RECORD_FIELDS: &[&str] = &[
    "parcel_id",
    "predio_id",
    "subpoligono_id",
    "layer",
    "feature_id",
    "area_raw",
    "area_m2",
    "category",
];

/// Intersection de surface positive entre une parcelle et une feature de couche
///
/// Sérialisé à plat : champs fixes puis attributs projetés, dans l'ordre des clés
/// demandées.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionRecord {
    pub parcel: ParcelRef,
    /// Nom de la couche
    pub layer: String,
    pub feature_id: String,
    pub area: AreaEstimate,
    pub category: Option<String>,
    pub attributes: Vec<(String, AttributeValue)>,
}

impl IntersectionRecord {
    /// Valeur d'un attribut projeté ; `Unknown` si la clé n'a pas été demandée
    pub fn attribute(&self, key: &str) -> AttributeValue {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .unwrap_or(AttributeValue::Unknown)
    }
}

impl Serialize for IntersectionRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = 7 + usize::from(self.category.is_some()) + self.attributes.len();
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("parcel_id", &self.parcel.id)?;
        map.serialize_entry("predio_id", &self.parcel.predio_id)?;
        map.serialize_entry("subpoligono_id", &self.parcel.subpoligono_id)?;
        map.serialize_entry("layer", &self.layer)?;
        map.serialize_entry("feature_id", &self.feature_id)?;
        map.serialize_entry("area_raw", &self.area.raw)?;
        map.serialize_entry("area_m2", &self.area.estimated)?;
        if let Some(category) = &self.category {
            map.serialize_entry("category", category)?;
        }
        for (key, value) in &self.attributes {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Superposition de surface positive entre deux parcelles (`first.id < second.id`
/// dans l'ordre d'énumération)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlapRecord {
    pub first: ParcelRef,
    pub second: ParcelRef,
    #[serde(flatten)]
    pub area: AreaEstimate,
}
