//! Déroulé d'une analyse : parcelles → couches → croisements
//!
//! 1. Chargement et validation des parcelles, normalisation vers le système cible
//! 2. Récupération concurrente des couches (ordre conservé, délai par couche)
//! 3. Normalisation de chaque couche, intersections, puis superpositions

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use predial::{
    calculate_intersections, detect_overlaps, load_parcels, normalize, Crs, Diagnostics,
    IntersectionRecord, Layer, OverlapRecord, ParcelSet,
};
use tracing::{info, warn};

use crate::config::{Config, LayerConfig, Settings};
use crate::source::{Bbox, LayerSource};

/// Résultat du croisement avec une catégorie de couche
#[derive(Debug, Clone)]
pub struct LayerResult {
    pub config: LayerConfig,

    /// Features reçues (après filtrage par type)
    pub feature_count: usize,

    pub records: Vec<IntersectionRecord>,

    /// Clé de la catégorie qui interroge déjà la même source ; dans ce cas
    /// la couche n'est ni récupérée ni recalculée
    pub duplicate_of: Option<String>,
}

/// Tout ce qu'une analyse produit
#[derive(Debug)]
pub struct Analysis {
    pub target: Crs,
    pub parcels: ParcelSet,
    pub layers: Vec<LayerResult>,
    pub overlaps: Vec<OverlapRecord>,
    pub diagnostics: Diagnostics,
    pub duration: Duration,
}

impl Analysis {
    pub fn intersection_count(&self) -> usize {
        self.layers.iter().map(|l| l.records.len()).sum()
    }
}

/// Couche récupérée, avec les diagnostics émis pendant son chargement
struct Fetched {
    layer: Layer,
    diagnostics: Diagnostics,
}

/// Exécute une analyse complète sur une FeatureCollection de parcelles
pub async fn analyze(
    input: &str,
    config: &Config,
    source: Arc<dyn LayerSource>,
    settings: &Settings,
) -> Result<Analysis> {
    let start = Instant::now();
    let mut diagnostics = Diagnostics::new();

    let parcels = load_parcels(input, &mut diagnostics).context("Failed to load parcels")?;
    let parcels = normalize(parcels, settings.target, "parcels", &mut diagnostics)
        .context("Failed to normalize parcels")?;
    info!(
        parcels = parcels.len(),
        rejected = diagnostics.rejection_count(),
        crs = %settings.target,
        "Parcels ready"
    );

    let duplicates = config.duplicates();
    for (layer, dup) in config.layers.iter().zip(&duplicates) {
        if let Some(original) = dup {
            warn!(
                layer = %layer.key,
                same_as = %original,
                endpoint = %layer.endpoint,
                source_layer = %layer.layer,
                "Layer queries the same source as an earlier category, skipped"
            );
        }
    }

    let bbox = parcels.bounding_rect().map(|rect| Bbox {
        rect,
        crs: settings.target,
    });
    let fetched = if parcels.is_empty() {
        warn!("No valid parcel, layers are not fetched");
        config.layers.iter().map(|_| None).collect()
    } else {
        fetch_layers(&config.layers, &duplicates, bbox, source, settings).await?
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.jobs)
        .build()
        .context("Failed to build thread pool")?;

    let layers = config.layers.clone();
    let settings = settings.clone();
    let mut analysis = tokio::task::spawn_blocking(move || {
        pool.install(|| cross(parcels, layers, duplicates, fetched, diagnostics, &settings))
    })
    .await
    .context("Overlay task failed")??;

    analysis.duration = start.elapsed();
    info!(
        intersections = analysis.intersection_count(),
        overlaps = analysis.overlaps.len(),
        duration_ms = analysis.duration.as_millis() as u64,
        "Analysis complete"
    );
    Ok(analysis)
}

/// Récupère les couches non dupliquées, en parallèle et dans l'ordre du catalogue
async fn fetch_layers(
    layers: &[LayerConfig],
    duplicates: &[Option<String>],
    bbox: Option<Bbox>,
    source: Arc<dyn LayerSource>,
    settings: &Settings,
) -> Result<Vec<Option<Fetched>>> {
    let timeout = settings.fetch_timeout;
    let concurrency = settings.jobs.max(1);

    stream::iter(layers.iter().cloned().zip(duplicates.iter().cloned()))
        .map(|(layer, dup)| {
            let source = Arc::clone(&source);
            async move {
                if dup.is_some() {
                    return Ok(None);
                }

                let key = layer.key.clone();
                let task = tokio::task::spawn_blocking(move || {
                    let mut diagnostics = Diagnostics::new();
                    source
                        .query(&layer, bbox, &mut diagnostics)
                        .map(|layer| Fetched { layer, diagnostics })
                });

                let fetched = tokio::time::timeout(timeout, task)
                    .await
                    .map_err(|_| {
                        anyhow::anyhow!(
                            "Fetching layer '{}' timed out after {}s",
                            key,
                            timeout.as_secs()
                        )
                    })?
                    .with_context(|| format!("Fetch task for layer '{}' failed", key))?
                    .with_context(|| format!("Failed to fetch layer '{}'", key))?;

                info!(layer = %key, features = fetched.layer.len(), "Layer fetched");
                Ok::<_, anyhow::Error>(Some(fetched))
            }
        })
        .buffered(concurrency)
        .try_collect()
        .await
}

/// Calcul synchrone : normalisation des couches, intersections, superpositions
fn cross(
    parcels: ParcelSet,
    layers: Vec<LayerConfig>,
    duplicates: Vec<Option<String>>,
    fetched: Vec<Option<Fetched>>,
    mut diagnostics: Diagnostics,
    settings: &Settings,
) -> Result<Analysis> {
    let budget = settings.budget();
    let mut results = Vec::with_capacity(layers.len());

    for ((config, duplicate_of), fetched) in layers.into_iter().zip(duplicates).zip(fetched) {
        let Some(Fetched {
            layer,
            diagnostics: layer_diagnostics,
        }) = fetched
        else {
            results.push(LayerResult {
                config,
                feature_count: 0,
                records: Vec::new(),
                duplicate_of,
            });
            continue;
        };
        diagnostics.events.extend(layer_diagnostics.events);

        let layer = normalize(layer, settings.target, &config.key, &mut diagnostics)
            .with_context(|| format!("Failed to normalize layer '{}'", config.key))?;
        let records =
            calculate_intersections(&parcels, &layer, &config.spec(), budget, &mut diagnostics)
                .with_context(|| format!("Intersections failed for layer '{}'", config.key))?;

        results.push(LayerResult {
            feature_count: layer.len(),
            config,
            records,
            duplicate_of,
        });
    }

    let overlaps =
        detect_overlaps(&parcels, budget, &mut diagnostics).context("Overlap detection failed")?;

    Ok(Analysis {
        target: settings.target,
        parcels,
        layers: results,
        overlaps,
        diagnostics,
        duration: Duration::ZERO,
    })
}
