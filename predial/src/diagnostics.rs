//! Événements non fataux et leur collecte
//!
//! Chaque composant reçoit un `&mut dyn DiagnosticSink` plutôt que d'écrire
//! dans un état global : la requête décide où vont ses diagnostics.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::types::Crs;
use crate::validate::Invalidity;

/// Un événement non fatal
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Feature écartée (type non supporté, topologie invalide, géométrie absente)
    Rejected {
        /// Position de la feature dans la collection source (0-based)
        index: usize,
        feature_id: Option<String>,
        reason: String,
    },

    /// Jeu reprojeté vers le système cible
    Reprojected {
        scope: String,
        source: Crs,
        target: Crs,
        features: usize,
    },

    /// Paires dont le contact se limite au bord (aucun enregistrement)
    BoundaryContacts { scope: String, pairs: usize },
}

impl Diagnostic {
    pub fn rejected(index: usize, feature_id: Option<&str>, reason: impl fmt::Display) -> Self {
        Self::Rejected {
            index,
            feature_id: feature_id.map(str::to_string),
            reason: reason.to_string(),
        }
    }

    pub fn invalid(index: usize, feature_id: Option<&str>, invalidity: &Invalidity) -> Self {
        Self::rejected(index, feature_id, invalidity)
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, Diagnostic::Rejected { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Rejected {
                index,
                feature_id,
                reason,
            } => write!(
                f,
                "feature #{} ({}) rejected: {}",
                index,
                feature_id.as_deref().unwrap_or("no id"),
                reason
            ),
            Diagnostic::Reprojected {
                scope,
                source,
                target,
                features,
            } => write!(
                f,
                "{}: {} features reprojected {} -> {}",
                scope, features, source, target
            ),
            Diagnostic::BoundaryContacts { scope, pairs } => {
                write!(f, "{}: {} boundary-only contacts skipped", scope, pairs)
            }
        }
    }
}

/// Destination des diagnostics
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: Diagnostic);
}

/// Se contente de journaliser via `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&mut self, diagnostic: Diagnostic) {
        log(&diagnostic);
    }
}

/// Journalise et conserve les diagnostics pour le rapport
#[derive(Debug, Default, Clone, Serialize)]
pub struct Diagnostics {
    pub events: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejections(&self) -> impl Iterator<Item = &Diagnostic> {
        self.events.iter().filter(|d| d.is_rejection())
    }

    pub fn rejection_count(&self) -> usize {
        self.rejections().count()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl DiagnosticSink for Diagnostics {
    fn emit(&mut self, diagnostic: Diagnostic) {
        log(&diagnostic);
        self.events.push(diagnostic);
    }
}

fn log(diagnostic: &Diagnostic) {
    match diagnostic {
        Diagnostic::Rejected {
            index,
            feature_id,
            reason,
        } => warn!(
            index = *index,
            feature_id = feature_id.as_deref().unwrap_or("-"),
            reason = %reason,
            "Feature dropped"
        ),
        Diagnostic::Reprojected {
            scope,
            source,
            target,
            features,
        } => info!(
            scope = %scope,
            source = %source,
            target = %target,
            features = *features,
            "Feature set reprojected"
        ),
        Diagnostic::BoundaryContacts { scope, pairs } => info!(
            scope = %scope,
            pairs = *pairs,
            "Boundary-only contacts skipped"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink() {
        let mut sink = Diagnostics::new();
        sink.emit(Diagnostic::rejected(3, Some("P-7"), "unsupported geometry type Point"));
        sink.emit(Diagnostic::BoundaryContacts {
            scope: "overlaps".into(),
            pairs: 2,
        });

        assert_eq!(sink.events.len(), 2);
        assert_eq!(sink.rejection_count(), 1);
        assert_eq!(
            sink.events[0].to_string(),
            "feature #3 (P-7) rejected: unsupported geometry type Point"
        );
    }

    #[test]
    fn test_tracing_sink_through_trait_object() {
        let mut sink = TracingSink;
        let dyn_sink: &mut dyn DiagnosticSink = &mut sink;
        dyn_sink.emit(Diagnostic::rejected(1, None, "empty ring"));
    }

    #[test]
    fn test_serialize_tagged() {
        let json = serde_json::to_value(Diagnostic::rejected(0, None, "empty ring")).unwrap();
        assert_eq!(json["kind"], "rejected");
        assert_eq!(json["reason"], "empty ring");
    }
}
