//! # predial-cruces
//!
//! Croisement de polygones de parcelles avec des couches réglementaires.
//!
//! ## Features
//!
//! - Catalogue de couches embarqué (preset `semarnat`) ou fichier JSON
//! - Récupération concurrente des couches, délai par couche
//! - Intersections parcelle × couche et superpositions entre parcelles
//! - Export JSON des enregistrements, GeoJSON des parcelles normalisées
//!
//! ## Usage CLI
//!
//! ```bash
//! # Analyse complète
//! predial-cruces analyze --input predios.geojson --layers-dir ./capas --output ./resultados
//!
//! # Validation seule des parcelles
//! predial-cruces validate --input predios.geojson
//! ```

pub mod config;
pub mod export;
pub mod pipeline;
pub mod report;
pub mod source;

pub use config::{Config, LayerConfig, Settings};
pub use pipeline::{analyze, Analysis, LayerResult};
pub use report::{AnalysisReport, AnalysisStatus};
pub use source::{Bbox, DirectorySource, LayerSource, SourceError};
