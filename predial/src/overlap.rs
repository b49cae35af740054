//! Superpositions entre les parcelles d'une même requête

use rayon::prelude::*;
use tracing::{debug, info};

use crate::area::estimate;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::index::EnvelopeIndex;
use crate::overlay::{classify_pair, PairBudget, PairOutcome};
use crate::record::{OverlapRecord, ParcelRef};
use crate::types::ParcelSet;
use crate::PredialError;

const SCOPE: &str = "overlaps";

/// Détecte les superpositions de surface positive entre parcelles.
///
/// Chaque paire non ordonnée `(i, j)`, `i < j` en position, est examinée une
/// seule fois : une parcelle n'est jamais appariée avec elle-même et `(j, i)`
/// n'est jamais émis. Le jeu doit porter son système de référence.
pub fn detect_overlaps(
    parcels: &ParcelSet,
    budget: PairBudget,
    sink: &mut dyn DiagnosticSink,
) -> Result<Vec<OverlapRecord>, PredialError> {
    let Some(crs) = parcels.crs else {
        return Err(PredialError::crs(
            "parcel set has no reference frame; normalize it first",
        ));
    };

    let index = EnvelopeIndex::build(&parcels.features);
    let pairs: Vec<(usize, usize)> = parcels
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.geometry.bounding_rect().map(|r| (i, r)))
        .flat_map(|(i, rect)| {
            index
                .candidates(&rect)
                .into_iter()
                .filter(move |&j| j > i)
                .map(move |j| (i, j))
        })
        .collect();

    budget.check(SCOPE, pairs.len())?;
    debug!(candidates = pairs.len(), "Candidate parcel pairs");

    let outcomes: Vec<PairOutcome> = pairs
        .par_iter()
        .map(|&(i, j)| classify_pair(&parcels.features[i].geometry, &parcels.features[j].geometry))
        .collect();

    let mut records = Vec::new();
    let mut boundary = 0;
    for (&(i, j), outcome) in pairs.iter().zip(outcomes) {
        match outcome {
            PairOutcome::Overlap(area) => {
                let (first, second) = (&parcels.features[i], &parcels.features[j]);
                debug!(first = first.id, second = second.id, area, "Overlap");
                records.push(OverlapRecord {
                    first: ParcelRef::from(first),
                    second: ParcelRef::from(second),
                    area: estimate(area),
                });
            }
            PairOutcome::Boundary => boundary += 1,
            PairOutcome::Disjoint => {}
        }
    }

    if boundary > 0 {
        sink.emit(Diagnostic::BoundaryContacts {
            scope: SCOPE.to_string(),
            pairs: boundary,
        });
    }

    info!(
        crs = %crs,
        parcels = parcels.len(),
        candidates = pairs.len(),
        overlaps = records.len(),
        "Overlaps computed"
    );
    Ok(records)
}
