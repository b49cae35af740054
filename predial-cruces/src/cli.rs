//! Définition et implémentation des commandes CLI
//!
//! - `analyze` : parcelles × couches → enregistrements JSON + rapport
//! - `validate` : chargement et validation des parcelles seulement

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;
use predial::{load_parcels, Diagnostics};
use tracing::info;

use predial_cruces::export::{export_parcels, save_records};
use predial_cruces::{analyze, AnalysisReport, Config, DirectorySource, Settings};

#[derive(Subcommand)]
pub enum Commands {
    /// Cross parcels with every configured layer
    Analyze {
        /// GeoJSON FeatureCollection of parcel polygons
        #[arg(short, long)]
        input: PathBuf,

        /// Directory holding one `<key>.geojson` file per layer
        #[arg(short, long)]
        layers_dir: PathBuf,

        /// Output directory for records and report
        #[arg(short, long)]
        output: PathBuf,

        /// Layer catalogue preset (semarnat) or path to a JSON config
        #[arg(long, default_value = "semarnat")]
        config: String,

        /// Target EPSG code (défaut : env PREDIAL_TARGET_EPSG / 4326)
        #[arg(long)]
        srid: Option<u32>,

        /// Maximum candidate pairs per computation (défaut : env PREDIAL_MAX_PAIRS / illimité)
        #[arg(long)]
        max_pairs: Option<usize>,

        /// Per-layer fetch timeout in seconds (défaut : env PREDIAL_FETCH_TIMEOUT_SECS / 30)
        #[arg(long)]
        timeout: Option<u64>,

        /// Worker threads for fetch and overlay (défaut : env PREDIAL_JOBS / nombre de CPU)
        #[arg(long, alias = "threads")]
        jobs: Option<usize>,
    },

    /// Load and validate parcels without fetching any layer
    Validate {
        /// GeoJSON FeatureCollection of parcel polygons
        #[arg(short, long)]
        input: PathBuf,
    },
}

/// Exécute la commande analyze
#[allow(clippy::too_many_arguments)]
pub async fn cmd_analyze(
    input: &Path,
    layers_dir: &Path,
    output: &Path,
    config_spec: &str,
    srid: Option<u32>,
    max_pairs: Option<usize>,
    timeout: Option<u64>,
    jobs: Option<usize>,
) -> Result<()> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read input: {}", input.display()))?;
    let config = Config::resolve(config_spec)?;
    let settings = Settings::from_env().with_overrides(srid, max_pairs, timeout, jobs);
    info!(
        layers = config.layers.len(),
        target = %settings.target,
        jobs = settings.jobs,
        "Configuration loaded"
    );

    let source = Arc::new(DirectorySource::new(layers_dir));
    let analysis = analyze(&text, &config, source, &settings).await?;

    std::fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output dir: {}", output.display()))?;

    for layer in analysis.layers.iter().filter(|l| l.duplicate_of.is_none()) {
        let path = output.join(format!("intersecciones_{}.json", layer.config.key));
        save_records(&layer.records, &path)?;
    }
    save_records(&analysis.overlaps, &output.join("superposiciones.json"))?;
    export_parcels(&analysis.parcels, &output.join("predios.geojson"))?;

    let report = AnalysisReport::from_analysis(&analysis);
    report.save_to_file(&output.join("report.json"))?;
    report.display();
    info!(output = %output.display(), "{}", report.summary());

    Ok(())
}

/// Exécute la commande validate
pub fn cmd_validate(input: &Path) -> Result<()> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read input: {}", input.display()))?;

    let mut diagnostics = Diagnostics::new();
    let parcels = load_parcels(&text, &mut diagnostics)?;

    println!(
        "{} parcel polygons accepted, {} rejected",
        parcels.len(),
        diagnostics.rejection_count()
    );
    if let Some(crs) = parcels.crs {
        println!("Declared CRS: {}", crs);
    }
    for rejection in diagnostics.rejections() {
        println!("  {}", rejection);
    }

    Ok(())
}
