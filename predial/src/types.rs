//! Types de données pour le crate predial

use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;

use geo::{
    Area, BoundingRect, Coord, EuclideanLength, Geometry, Intersects, MultiPolygon, Polygon, Rect,
};
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::PredialError;

/// Valeur sentinelle pour une clé ou un attribut absent
pub const UNKNOWN: &str = "unknown";

/// Système de référence, identifié par son code EPSG
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Crs {
    pub epsg: u32,
}

impl Crs {
    /// WGS 84 géographique (défaut GeoJSON, RFC 7946)
    pub const WGS84: Crs = Crs { epsg: 4326 };

    /// Web Mercator
    pub const WEB_MERCATOR: Crs = Crs { epsg: 3857 };

    pub const fn new(epsg: u32) -> Self {
        Self { epsg }
    }

    /// Parse un nom de CRS tel qu'on le trouve dans un membre `crs` GeoJSON.
    ///
    /// Formes acceptées : `EPSG:4326`, `urn:ogc:def:crs:EPSG::4326`,
    /// `urn:ogc:def:crs:EPSG:6.6:4326`, `http://www.opengis.net/def/crs/EPSG/0/4326`
    /// et `urn:ogc:def:crs:OGC:1.3:CRS84` (équivalent à 4326 en ordre lon/lat).
    pub fn parse(name: &str) -> Result<Self, PredialError> {
        static EPSG: OnceLock<Regex> = OnceLock::new();
        static CRS84: OnceLock<Regex> = OnceLock::new();

        let name = name.trim();
        let crs84 = CRS84.get_or_init(|| {
            Regex::new(r"(?i)^urn:ogc:def:crs:ogc:(?:1\.3:)?crs84$").expect("valid regex")
        });
        if crs84.is_match(name) {
            return Ok(Self::WGS84);
        }

        let epsg = EPSG.get_or_init(|| {
            Regex::new(
                r"(?i)^(?:(?:urn:ogc:def:crs:)?epsg:(?:[0-9.]*:)?|https?://www\.opengis\.net/def/crs/epsg/[0-9.]+/)(\d+)$",
            )
            .expect("valid regex")
        });
        epsg.captures(name)
            .and_then(|c| c[1].parse().ok())
            .map(Self::new)
            .ok_or_else(|| PredialError::crs(format!("unrecognised reference frame '{}'", name)))
    }

    /// Forme URN OGC, utilisée à l'export GeoJSON
    pub fn urn(&self) -> String {
        format!("urn:ogc:def:crs:EPSG::{}", self.epsg)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

/// Géométrie surfacique : seules variantes admises dans le moteur
#[derive(Debug, Clone, PartialEq)]
pub enum Areal {
    Polygon(Polygon),
    MultiPolygon(MultiPolygon),
}

impl Areal {
    /// Nom du type GeoJSON
    pub fn kind(&self) -> &'static str {
        match self {
            Areal::Polygon(_) => "Polygon",
            Areal::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Les polygones constitutifs (un seul pour un Polygon)
    pub fn polygons(&self) -> &[Polygon] {
        match self {
            Areal::Polygon(p) => std::slice::from_ref(p),
            Areal::MultiPolygon(mp) => &mp.0,
        }
    }

    /// Vue MultiPolygon, sans copie quand c'est déjà le cas
    pub fn as_multi_polygon(&self) -> Cow<'_, MultiPolygon> {
        match self {
            Areal::Polygon(p) => Cow::Owned(MultiPolygon::new(vec![p.clone()])),
            Areal::MultiPolygon(mp) => Cow::Borrowed(mp),
        }
    }

    pub fn bounding_rect(&self) -> Option<Rect> {
        match self {
            Areal::Polygon(p) => p.bounding_rect(),
            Areal::MultiPolygon(mp) => mp.bounding_rect(),
        }
    }

    /// Aire plane dans les unités du système de référence
    pub fn unsigned_area(&self) -> f64 {
        match self {
            Areal::Polygon(p) => p.unsigned_area(),
            Areal::MultiPolygon(mp) => mp.unsigned_area(),
        }
    }

    /// Longueur cumulée de tous les rings, trous compris
    pub fn perimeter(&self) -> f64 {
        self.polygons()
            .iter()
            .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
            .map(|ring| ring.euclidean_length())
            .sum()
    }

    /// Prédicat d'intersection (contact de bord inclus)
    pub fn intersects(&self, other: &Areal) -> bool {
        match (self, other) {
            (Areal::Polygon(a), Areal::Polygon(b)) => a.intersects(b),
            _ => self.polygons().iter().any(|a| {
                let Some(rect) = a.bounding_rect() else {
                    return false;
                };
                other.polygons().iter().any(|b| {
                    b.bounding_rect()
                        .is_some_and(|rb| rect.intersects(&rb) && a.intersects(b))
                })
            }),
        }
    }

    /// Garde les seules variantes surfaciques
    pub fn from_geometry(geometry: Geometry) -> Option<Areal> {
        match geometry {
            Geometry::Polygon(p) => Some(Areal::Polygon(p)),
            Geometry::MultiPolygon(mp) => Some(Areal::MultiPolygon(mp)),
            _ => None,
        }
    }

    pub fn to_geometry(&self) -> Geometry {
        match self {
            Areal::Polygon(p) => Geometry::Polygon(p.clone()),
            Areal::MultiPolygon(mp) => Geometry::MultiPolygon(mp.clone()),
        }
    }

    /// Applique une transformation faillible à chaque coordonnée
    pub fn try_map_coords<E>(
        &self,
        f: impl Fn(Coord) -> Result<Coord, E> + Copy,
    ) -> Result<Areal, E> {
        use geo::MapCoords;

        Ok(match self {
            Areal::Polygon(p) => Areal::Polygon(p.try_map_coords(f)?),
            Areal::MultiPolygon(mp) => Areal::MultiPolygon(mp.try_map_coords(f)?),
        })
    }
}

/// Valeur d'attribut d'une feature externe
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Known(serde_json::Value),
    /// Attribut absent ou nul
    Unknown,
}

impl AttributeValue {
    pub fn is_unknown(&self) -> bool {
        matches!(self, AttributeValue::Unknown)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Known(serde_json::Value::String(s)) => f.write_str(s),
            AttributeValue::Known(v) => write!(f, "{}", v),
            AttributeValue::Unknown => f.write_str(UNKNOWN),
        }
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AttributeValue::Known(v) => v.serialize(serializer),
            AttributeValue::Unknown => serializer.serialize_str(UNKNOWN),
        }
    }
}

/// Attributs d'une feature, dans l'ordre de la source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<(String, serde_json::Value)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.0.push((key, value)),
        }
    }

    /// Recherche explicite ; `null` et absence donnent [`AttributeValue::Unknown`]
    pub fn get(&self, key: &str) -> AttributeValue {
        match self.0.iter().find(|(k, _)| k == key) {
            Some((_, serde_json::Value::Null)) | None => AttributeValue::Unknown,
            Some((_, v)) => AttributeValue::Known(v.clone()),
        }
    }

    /// Projection sur une liste de clés
    pub fn project(&self, keys: &[String]) -> Vec<(String, AttributeValue)> {
        keys.iter().map(|k| (k.clone(), self.get(k))).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, serde_json::Value)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
        let mut attributes = Attributes::new();
        for (k, v) in iter {
            attributes.insert(k, v);
        }
        attributes
    }
}

/// Accès à la géométrie d'une feature
pub trait HasGeometry {
    fn geometry(&self) -> &Areal;
    fn geometry_mut(&mut self) -> &mut Areal;
}

/// Un polygone soumis par l'utilisateur
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelPolygon {
    /// Identifiant séquentiel (1-based), unique dans la requête
    pub id: usize,

    /// Clé du predio (défaut "unknown")
    pub predio_id: String,

    /// Clé du sous-polygone
    pub subpoligono_id: String,

    pub geometry: Areal,
}

impl HasGeometry for ParcelPolygon {
    fn geometry(&self) -> &Areal {
        &self.geometry
    }

    fn geometry_mut(&mut self) -> &mut Areal {
        &mut self.geometry
    }
}

/// Une feature d'une couche réglementaire externe
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalFeature {
    pub id: String,
    pub geometry: Areal,
    pub attributes: Attributes,
}

impl HasGeometry for ExternalFeature {
    fn geometry(&self) -> &Areal {
        &self.geometry
    }

    fn geometry_mut(&mut self) -> &mut Areal {
        &mut self.geometry
    }
}

/// Jeu de features partageant un même système de référence
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet<F> {
    /// Système de référence ; `None` tant que le jeu n'est pas normalisé
    /// et que la source ne l'a pas déclaré
    pub crs: Option<Crs>,

    pub features: Vec<F>,
}

/// Les polygones d'une requête
pub type ParcelSet = FeatureSet<ParcelPolygon>;

/// Les features d'une couche externe
pub type Layer = FeatureSet<ExternalFeature>;

impl<F> FeatureSet<F> {
    pub fn new(crs: Option<Crs>, features: Vec<F>) -> Self {
        Self { crs, features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, F> {
        self.features.iter()
    }
}

impl<F> Default for FeatureSet<F> {
    fn default() -> Self {
        Self {
            crs: None,
            features: Vec::new(),
        }
    }
}

impl<F: HasGeometry> FeatureSet<F> {
    /// Rectangle englobant de tout le jeu (bbox des requêtes de couches)
    pub fn bounding_rect(&self) -> Option<Rect> {
        self.features
            .iter()
            .filter_map(|f| f.geometry().bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    Coord {
                        x: a.min().x.min(b.min().x),
                        y: a.min().y.min(b.min().y),
                    },
                    Coord {
                        x: a.max().x.max(b.max().x),
                        y: a.max().y.max(b.max().y),
                    },
                )
            })
    }
}
