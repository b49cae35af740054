//! Types d'erreurs pour le crate predial

use thiserror::Error;

/// Erreurs fatales : elles interrompent la requête en cours.
///
/// Les géométries invalides ne passent pas par ici, elles sont écartées et
/// signalées au [`DiagnosticSink`](crate::diagnostics::DiagnosticSink).
#[derive(Debug, Error)]
pub enum PredialError {
    /// Entrée illisible (JSON invalide, pas une FeatureCollection, ...)
    #[error("Invalid input: {0}")]
    Input(String),

    /// Système de référence inconnu, non supporté ou incohérent entre deux jeux
    #[error("Reference frame error: {0}")]
    Crs(String),

    /// Échec de la transformation de coordonnées
    #[error("Reprojection failed from {source_crs} to {target_crs}: {reason}")]
    Reprojection {
        source_crs: String,
        target_crs: String,
        reason: String,
    },

    /// Trop de paires candidates pour un calcul de recouvrement
    #[error("Candidate pair limit exceeded for {scope}: {candidates} pairs > {limit}")]
    PairLimit {
        scope: String,
        candidates: usize,
        limit: usize,
    },
}

impl PredialError {
    /// Crée une erreur d'entrée avec contexte
    pub fn input(reason: impl Into<String>) -> Self {
        Self::Input(reason.into())
    }

    /// Crée une erreur de système de référence
    pub fn crs(reason: impl Into<String>) -> Self {
        Self::Crs(reason.into())
    }
}

impl From<geojson::Error> for PredialError {
    fn from(e: geojson::Error) -> Self {
        Self::Input(e.to_string())
    }
}
