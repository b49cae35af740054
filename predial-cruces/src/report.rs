//! Rapport d'analyse
//!
//! Ce module collecte les compteurs d'une analyse, les features écartées et
//! les avertissements, pour l'affichage console et la sauvegarde JSON.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use predial::{estimate, AreaEstimate, Diagnostic, ParcelPolygon, AREA_DISCLAIMER};
use serde::Serialize;

use crate::pipeline::Analysis;

/// Statut global de l'analyse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnalysisStatus {
    /// Toutes les parcelles ont été retenues
    Success,
    /// Des parcelles ont été écartées, les autres ont été analysées
    PartialSuccess,
    /// Aucune parcelle valide
    NoValidParcels,
}

/// Statistiques par catégorie de couche
#[derive(Debug, Clone, Serialize)]
pub struct LayerStats {
    pub key: String,
    pub title: String,
    /// Features reçues
    pub features: usize,
    /// Enregistrements d'intersection
    pub intersections: usize,
    /// Somme des aires brutes
    pub area_raw: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<String>,
}

/// Mesures d'un sous-polygone retenu
#[derive(Debug, Clone, Serialize)]
pub struct ParcelStats {
    pub id: usize,
    pub predio_id: String,
    pub subpoligono_id: String,
    #[serde(flatten)]
    pub area: AreaEstimate,
    /// Dans les unités du système de référence
    pub perimeter: f64,
}

impl From<&ParcelPolygon> for ParcelStats {
    fn from(p: &ParcelPolygon) -> Self {
        Self {
            id: p.id,
            predio_id: p.predio_id.clone(),
            subpoligono_id: p.subpoligono_id.clone(),
            area: estimate(p.geometry.unsigned_area()),
            perimeter: p.geometry.perimeter(),
        }
    }
}

/// Feature écartée au chargement
#[derive(Debug, Clone, Serialize)]
pub struct Rejection {
    pub index: usize,
    pub feature_id: Option<String>,
    pub reason: String,
}

/// Rapport complet d'une analyse
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub status: AnalysisStatus,
    pub duration_secs: f64,
    /// Système de référence des sorties, ex. "EPSG:4326"
    pub crs: String,

    pub parcels_accepted: usize,
    pub parcels_rejected: usize,
    pub intersections: usize,
    pub overlaps: usize,

    pub parcels: Vec<ParcelStats>,
    pub layers: Vec<LayerStats>,
    pub rejections: Vec<Rejection>,
    pub warnings: Vec<String>,

    /// Limites de l'estimation des aires métriques
    pub area_disclaimer: &'static str,
}

impl Default for AnalysisReport {
    fn default() -> Self {
        Self {
            status: AnalysisStatus::Success,
            duration_secs: 0.0,
            crs: String::new(),
            parcels_accepted: 0,
            parcels_rejected: 0,
            intersections: 0,
            overlaps: 0,
            parcels: Vec::new(),
            layers: Vec::new(),
            rejections: Vec::new(),
            warnings: Vec::new(),
            area_disclaimer: AREA_DISCLAIMER,
        }
    }
}

impl AnalysisReport {
    /// Construit le rapport d'une analyse terminée
    pub fn from_analysis(analysis: &Analysis) -> Self {
        let mut report = Self {
            crs: analysis.target.to_string(),
            parcels_accepted: analysis.parcels.len(),
            overlaps: analysis.overlaps.len(),
            parcels: analysis.parcels.iter().map(ParcelStats::from).collect(),
            ..Default::default()
        };

        for layer in &analysis.layers {
            report.record_layer(LayerStats {
                key: layer.config.key.clone(),
                title: layer.config.title.clone(),
                features: layer.feature_count,
                intersections: layer.records.len(),
                area_raw: layer.records.iter().map(|r| r.area.raw).sum(),
                duplicate_of: layer.duplicate_of.clone(),
            });
        }

        for diagnostic in &analysis.diagnostics.events {
            report.record_diagnostic(diagnostic);
        }

        report.set_duration(analysis.duration);
        report.finalize();
        report
    }

    /// Enregistre le résultat d'une catégorie
    pub fn record_layer(&mut self, stats: LayerStats) {
        if let Some(original) = &stats.duplicate_of {
            self.warnings.push(format!(
                "Layer '{}' queries the same source as '{}'; not recomputed",
                stats.key, original
            ));
        }
        self.intersections += stats.intersections;
        self.layers.push(stats);
    }

    /// Enregistre un diagnostic ; seuls les rejets de parcelles sont comptés
    pub fn record_diagnostic(&mut self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::Rejected {
                index,
                feature_id,
                reason,
            } => {
                self.rejections.push(Rejection {
                    index: *index,
                    feature_id: feature_id.clone(),
                    reason: reason.clone(),
                });
            }
            Diagnostic::BoundaryContacts { .. } | Diagnostic::Reprojected { .. } => {
                self.warnings.push(diagnostic.to_string());
            }
        }
    }

    /// Définit la durée de l'analyse
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        self.parcels_rejected = self.rejections.len();
        self.status = if self.parcels_accepted == 0 {
            AnalysisStatus::NoValidParcels
        } else if self.parcels_rejected > 0 {
            AnalysisStatus::PartialSuccess
        } else {
            AnalysisStatus::Success
        };
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("ANALYSIS REPORT - {}", self.crs);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- SUMMARY ---");
        println!(
            "Parcels: {} accepted, {} rejected",
            self.parcels_accepted, self.parcels_rejected
        );
        println!(
            "Records: {} intersections, {} overlaps",
            self.intersections, self.overlaps
        );

        if !self.parcels.is_empty() {
            println!("\n--- BY PARCEL ---");
            for p in self.parcels.iter().take(20) {
                println!(
                    "  {} / {}: {:.6} ({}), perimeter {:.2}",
                    p.predio_id, p.subpoligono_id, p.area.raw, p.area.estimated, p.perimeter
                );
            }
            if self.parcels.len() > 20 {
                println!("  ... and {} more", self.parcels.len() - 20);
            }
        }

        if !self.layers.is_empty() {
            println!("\n--- BY LAYER ---");
            for l in &self.layers {
                match &l.duplicate_of {
                    Some(original) => println!("  {}: same source as {}", l.key, original),
                    None => println!(
                        "  {}: {} features, {} intersections",
                        l.key, l.features, l.intersections
                    ),
                }
            }
        }

        if !self.warnings.is_empty() {
            println!("\n--- WARNINGS ({}) ---", self.warnings.len());
            for w in self.warnings.iter().take(10) {
                println!("  {}", w);
            }
            if self.warnings.len() > 10 {
                println!("  ... and {} more", self.warnings.len() - 10);
            }
        }

        if !self.rejections.is_empty() {
            println!("\n--- REJECTED ({}) ---", self.rejections.len());
            for r in self.rejections.iter().take(20) {
                println!(
                    "  #{} [{}] {}",
                    r.index,
                    r.feature_id.as_deref().unwrap_or("-"),
                    r.reason
                );
            }
            if self.rejections.len() > 20 {
                println!("  ... and {} more", self.rejections.len() - 20);
            }
        }

        println!("\n{}", self.area_disclaimer);
        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{} parcels ({} rejected), {} intersections, {} overlaps",
            self.parcels_accepted, self.parcels_rejected, self.intersections, self.overlaps
        )
    }
}
