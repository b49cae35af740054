//! Intersections entre les parcelles et une couche externe
//!
//! Pour chaque paire (parcelle, feature) : prédicat d'intersection, puis calcul
//! exact de l'intersection. Un contact réduit au bord ou à un point (aire
//! nulle) ne produit aucun enregistrement.
//!
//! Les paires candidates viennent d'un [`EnvelopeIndex`] ; elles sont
//! énumérées parcelle par parcelle, features triées, ce qui donne exactement
//! l'ordre de la double boucle exhaustive. Le calcul exact tourne en parallèle
//! (`rayon`), la collecte ordonnée conserve cet ordre.

use geo::{Area, BooleanOps};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::area::estimate;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::index::EnvelopeIndex;
use crate::normalize::ensure_same_frame;
use crate::record::{IntersectionRecord, ParcelRef};
use crate::types::{Areal, Layer, ParcelSet};
use crate::PredialError;

/// Description d'une couche pour le calcul
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerSpec {
    /// Nom porté par chaque enregistrement
    pub name: String,
    /// Attributs à projeter, dans cet ordre
    pub attribute_keys: Vec<String>,
    pub category: Option<String>,
}

impl LayerSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attributes<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attribute_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Plafond du nombre de paires candidates d'un calcul
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairBudget {
    /// `None` : pas de limite
    pub max_candidate_pairs: Option<usize>,
}

impl PairBudget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn limited(max: usize) -> Self {
        Self {
            max_candidate_pairs: Some(max),
        }
    }

    /// Vérifié avant tout prédicat exact
    pub fn check(&self, scope: &str, candidates: usize) -> Result<(), PredialError> {
        match self.max_candidate_pairs {
            Some(limit) if candidates > limit => Err(PredialError::PairLimit {
                scope: scope.to_string(),
                candidates,
                limit,
            }),
            _ => Ok(()),
        }
    }
}

/// Résultat du calcul exact sur une paire
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PairOutcome {
    Disjoint,
    /// Contact de bord ou ponctuel
    Boundary,
    Overlap(f64),
}

/// Aire de l'intersection de deux géométries surfaciques
pub(crate) fn intersection_area(a: &Areal, b: &Areal) -> f64 {
    match (a, b) {
        (Areal::Polygon(pa), Areal::Polygon(pb)) => pa.intersection(pb).unsigned_area(),
        _ => {
            let (ma, mb) = (a.as_multi_polygon(), b.as_multi_polygon());
            ma.intersection(&*mb).unsigned_area()
        }
    }
}

pub(crate) fn classify_pair(a: &Areal, b: &Areal) -> PairOutcome {
    if !a.intersects(b) {
        return PairOutcome::Disjoint;
    }
    let area = intersection_area(a, b);
    if area > 0.0 {
        PairOutcome::Overlap(area)
    } else {
        PairOutcome::Boundary
    }
}

/// Calcule les intersections entre toutes les parcelles et une couche.
///
/// Les deux jeux doivent porter le même système de référence. Une couche
/// vide donne une séquence vide. Un attribut absent vaut `"unknown"` et ne
/// rejette jamais l'enregistrement.
pub fn calculate_intersections(
    parcels: &ParcelSet,
    layer: &Layer,
    spec: &LayerSpec,
    budget: PairBudget,
    sink: &mut dyn DiagnosticSink,
) -> Result<Vec<IntersectionRecord>, PredialError> {
    let crs = ensure_same_frame(parcels.crs, layer.crs)?;

    if parcels.is_empty() || layer.is_empty() {
        debug!(layer = %spec.name, "Nothing to intersect");
        return Ok(Vec::new());
    }

    let index = EnvelopeIndex::build(&layer.features);
    let pairs: Vec<(usize, usize)> = parcels
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.geometry.bounding_rect().map(|r| (i, r)))
        .flat_map(|(i, rect)| index.candidates(&rect).into_iter().map(move |j| (i, j)))
        .collect();

    budget.check(&spec.name, pairs.len())?;
    debug!(layer = %spec.name, candidates = pairs.len(), "Candidate pairs");

    let outcomes: Vec<PairOutcome> = pairs
        .par_iter()
        .map(|&(i, j)| classify_pair(&parcels.features[i].geometry, &layer.features[j].geometry))
        .collect();

    let mut records = Vec::new();
    let mut boundary = 0;
    for (&(i, j), outcome) in pairs.iter().zip(outcomes) {
        let area = match outcome {
            PairOutcome::Overlap(area) => area,
            PairOutcome::Boundary => {
                boundary += 1;
                continue;
            }
            PairOutcome::Disjoint => continue,
        };

        let parcel = &parcels.features[i];
        let feature = &layer.features[j];
        let record = IntersectionRecord {
            parcel: ParcelRef::from(parcel),
            layer: spec.name.clone(),
            feature_id: feature.id.clone(),
            area: estimate(area),
            category: spec.category.clone(),
            attributes: feature.attributes.project(&spec.attribute_keys),
        };
        debug!(
            parcel = parcel.id,
            feature = %feature.id,
            area = %record.area.estimated,
            "Intersection"
        );
        records.push(record);
    }

    if boundary > 0 {
        sink.emit(Diagnostic::BoundaryContacts {
            scope: spec.name.clone(),
            pairs: boundary,
        });
    }

    info!(
        layer = %spec.name,
        crs = %crs,
        candidates = pairs.len(),
        records = records.len(),
        "Intersections computed"
    );
    Ok(records)
}
