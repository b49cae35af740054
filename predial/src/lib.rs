//! # predial
//!
//! Moteur de croisement entre des polygones de parcelles (predios) et des
//! couches réglementaires vectorielles (usage du sol, aires protégées,
//! ordenamientos).
//!
//! ## Features
//!
//! - Validation topologique des géométries (Polygon / MultiPolygon uniquement)
//! - Normalisation du système de référence (reprojection pure Rust, PROJ en option)
//! - Intersections parcelle × couche, superpositions entre parcelles
//! - Élagage des paires par R-tree (`rstar`), calcul exact parallèle (`rayon`)
//! - Estimation d'aire métrique à facteur fixe, toujours qualifiée "(estimated)"
//!
//! ## Usage
//!
//! ```rust,ignore
//! use predial::{calculate_intersections, detect_overlaps, load_layer, load_parcels};
//! use predial::{normalize, Crs, Diagnostics, LayerSpec, PairBudget};
//!
//! let mut sink = Diagnostics::new();
//! let parcels = normalize(load_parcels(&text, &mut sink)?, Crs::WGS84, "parcels", &mut sink)?;
//! let layer = normalize(load_layer(&layer_text, &mut sink)?, Crs::WGS84, "anp", &mut sink)?;
//!
//! let spec = LayerSpec::new("anp").with_attributes(["nombre", "cat_manejo"]);
//! let records = calculate_intersections(&parcels, &layer, &spec, PairBudget::unlimited(), &mut sink)?;
//! let overlaps = detect_overlaps(&parcels, PairBudget::unlimited(), &mut sink)?;
//! ```

pub mod area;
pub mod diagnostics;
pub mod error;
pub mod index;
pub mod loader;
pub mod normalize;
pub mod overlap;
pub mod overlay;
pub mod record;
pub mod reproject;
pub mod types;
pub mod validate;

pub use area::{estimate, AreaEstimate, AREA_DISCLAIMER, SCALE_CONSTANT};
pub use diagnostics::{Diagnostic, DiagnosticSink, Diagnostics, TracingSink};
pub use error::PredialError;
pub use loader::{load_layer, load_parcels, ParcelLoader};
pub use normalize::{ensure_same_frame, normalize};
pub use overlap::detect_overlaps;
pub use overlay::{calculate_intersections, LayerSpec, PairBudget};
pub use record::{IntersectionRecord, OverlapRecord, ParcelRef, RECORD_FIELDS};
pub use types::{
    Areal, AttributeValue, Attributes, Crs, ExternalFeature, FeatureSet, HasGeometry, Layer,
    ParcelPolygon, ParcelSet,
};
pub use validate::{validate, GeometryValidator, Invalidity};
