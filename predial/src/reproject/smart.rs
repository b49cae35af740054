//! Reprojection intelligente : reproject_lite en priorité, fallback sur proj
//!
//! Utilise automatiquement la meilleure option disponible.

use super::ReprojectorLite;
use crate::types::{Areal, Crs};
use crate::PredialError;

/// Reprojection intelligente
///
/// Essaie d'abord reproject_lite (pure Rust), puis fallback sur proj si disponible.
pub enum SmartReprojector {
    /// Reprojection légère (pure Rust)
    Lite(ReprojectorLite),
    /// Reprojection via PROJ (si feature activée)
    #[cfg(feature = "reproject")]
    Proj(super::Reprojector),
    /// Pas de reprojection (source == cible)
    Identity,
}

impl SmartReprojector {
    /// Crée un nouveau reprojector
    ///
    /// Une paire non supportée est une erreur de système de référence : aucune
    /// comparaison ne doit se faire entre deux cadres différents.
    pub fn new(source: Crs, target: Crs) -> Result<Self, PredialError> {
        if source == target {
            return Ok(Self::Identity);
        }

        if ReprojectorLite::is_supported(source, target) {
            let lite = ReprojectorLite::new(source, target)
                .map_err(|e| PredialError::crs(e.to_string()))?;
            return Ok(Self::Lite(lite));
        }

        #[cfg(feature = "reproject")]
        {
            let proj = super::Reprojector::new(source, target)
                .map_err(|e| PredialError::crs(format!("{:#}", e)))?;
            return Ok(Self::Proj(proj));
        }

        #[cfg(not(feature = "reproject"))]
        return Err(PredialError::crs(format!(
            "reprojection {} -> {} not supported. Built-in sources: 4326, 3857, 6362, 6372, \
             6366-6371, 32611-32616; targets: 4326, 3857. Build with --features reproject for PROJ",
            source, target
        )));
    }

    /// Transforme une géométrie
    pub fn transform(&self, areal: &Areal) -> Result<Areal, PredialError> {
        let result = match self {
            Self::Identity => return Ok(areal.clone()),
            Self::Lite(lite) => lite.transform_areal(areal),
            #[cfg(feature = "reproject")]
            Self::Proj(proj) => proj.transform_areal(areal),
        };
        result.map_err(|e| self.error(e))
    }

    fn error(&self, e: anyhow::Error) -> PredialError {
        let (source_crs, target_crs) = match self {
            Self::Lite(lite) => lite.crs_pair(),
            #[cfg(feature = "reproject")]
            Self::Proj(proj) => proj.crs_pair(),
            Self::Identity => (String::new(), String::new()),
        };
        PredialError::Reprojection {
            source_crs,
            target_crs,
            reason: format!("{:#}", e),
        }
    }

    /// Retourne une description du reprojector utilisé
    pub fn description(&self) -> &'static str {
        match self {
            Self::Identity => "identity (no reprojection)",
            Self::Lite(_) => "reproject_lite (pure Rust)",
            #[cfg(feature = "reproject")]
            Self::Proj(_) => "proj (PROJ library)",
        }
    }
}
