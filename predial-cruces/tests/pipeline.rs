//! Analyses complètes sur des couches stockées en fichiers

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use predial::{AttributeValue, Crs, DiagnosticSink, Layer};
use predial_cruces::export::save_records;
use predial_cruces::{
    analyze, AnalysisReport, AnalysisStatus, Bbox, Config, DirectorySource, LayerConfig,
    LayerSource, Settings, SourceError,
};

fn square(x: f64, y: f64, size: f64) -> String {
    format!(
        r#"{{"type":"Polygon","coordinates":[[[{x0},{y0}],[{x1},{y0}],[{x1},{y1}],[{x0},{y1}],[{x0},{y0}]]]}}"#,
        x0 = x,
        y0 = y,
        x1 = x + size,
        y1 = y + size
    )
}

fn collection(features: &[(String, &str)]) -> String {
    let features: Vec<String> = features
        .iter()
        .map(|(geometry, properties)| {
            format!(
                r#"{{"type":"Feature","geometry":{},"properties":{}}}"#,
                geometry, properties
            )
        })
        .collect();
    format!(
        r#"{{"type":"FeatureCollection","features":[{}]}}"#,
        features.join(",")
    )
}

fn parcels() -> String {
    collection(&[
        (square(0.0, 0.0, 1.0), r#"{"predio_id":"P1"}"#),
        (square(0.8, 0.1, 1.0), r#"{"predio_id":"P2"}"#),
    ])
}

fn config() -> Config {
    let config: Config = serde_json::from_str(
        r#"{"layers":[
            {"key":"zonas","title":"Zonificación","endpoint":"local","layer":"zonas",
             "fields":["clave","nivel"],"category":"Ordenamiento Local"},
            {"key":"zonas_copia","title":"Zonificación (copia)","endpoint":"local","layer":"zonas",
             "fields":["clave"]}
        ]}"#,
    )
    .unwrap();
    config.validate().unwrap();
    config
}

fn settings() -> Settings {
    Settings {
        target: Crs::WGS84,
        max_pairs: None,
        fetch_timeout: Duration::from_secs(5),
        jobs: 2,
    }
}

fn layers_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("predial_pipeline_{}", name));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_zonas(dir: &Path) {
    let text = collection(&[
        (square(0.3, 0.3, 0.3), r#"{"id":"Z-1","clave":"UGA-12","nivel":null}"#),
        (square(10.0, 10.0, 1.0), r#"{"id":"Z-2","clave":"UGA-99","nivel":3}"#),
    ]);
    std::fs::write(dir.join("zonas.geojson"), text).unwrap();
}

#[tokio::test]
async fn test_full_analysis() {
    let dir = layers_dir("full");
    write_zonas(&dir);

    let source = Arc::new(DirectorySource::new(&dir));
    let analysis = analyze(&parcels(), &config(), source, &settings())
        .await
        .unwrap();

    assert_eq!(analysis.parcels.len(), 2);
    assert_eq!(analysis.layers.len(), 2);

    let zonas = &analysis.layers[0];
    assert_eq!(zonas.feature_count, 1);
    assert_eq!(zonas.records.len(), 1);

    let record = &zonas.records[0];
    assert_eq!(record.parcel.subpoligono_id, "P1_subpoligono_1");
    assert_eq!(record.layer, "Zonificación");
    assert_eq!(record.feature_id, "Z-1");
    assert_eq!(record.category.as_deref(), Some("Ordenamiento Local"));
    assert!((record.area.raw - 0.09).abs() < 1e-9);
    assert_eq!(
        record.attribute("clave"),
        AttributeValue::Known(serde_json::json!("UGA-12"))
    );
    assert!(record.attribute("nivel").is_unknown());

    // Même source que "zonas" : ni récupérée ni recalculée
    let copia = &analysis.layers[1];
    assert_eq!(copia.duplicate_of.as_deref(), Some("zonas"));
    assert!(copia.records.is_empty());

    assert_eq!(analysis.overlaps.len(), 1);
    assert!((analysis.overlaps[0].area.raw - 0.18).abs() < 1e-9);

    let report = AnalysisReport::from_analysis(&analysis);
    assert_eq!(report.status, AnalysisStatus::Success);
    assert_eq!(report.intersections, 1);
    assert_eq!(report.overlaps, 1);
    assert_eq!(report.parcels.len(), 2);
    assert_eq!(report.parcels[0].subpoligono_id, "P1_subpoligono_1");
    assert!((report.parcels[0].perimeter - 4.0).abs() < 1e-9);

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn test_records_written_as_json() {
    let dir = layers_dir("json");
    write_zonas(&dir);

    let source = Arc::new(DirectorySource::new(&dir));
    let analysis = analyze(&parcels(), &config(), source, &settings())
        .await
        .unwrap();

    let path = dir.join("intersecciones_zonas.json");
    save_records(&analysis.layers[0].records, &path).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let first = &value[0];
    assert_eq!(first["predio_id"], "P1");
    assert_eq!(first["clave"], "UGA-12");
    assert_eq!(first["nivel"], "unknown");
    assert!(first["area_m2"].as_str().unwrap().ends_with("m² (estimated)"));

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn test_rejected_parcels_reported() {
    let dir = layers_dir("partial");
    write_zonas(&dir);

    let input = collection(&[
        (square(0.0, 0.0, 1.0), r#"{"predio_id":"P1"}"#),
        (
            r#"{"type":"Polygon","coordinates":[[[0,0],[2,2],[2,0],[0,2],[0,0]]]}"#.to_string(),
            r#"{"predio_id":"P-bowtie"}"#,
        ),
        (
            r#"{"type":"Point","coordinates":[0.5,0.5]}"#.to_string(),
            r#"{"predio_id":"P-point"}"#,
        ),
    ]);

    let source = Arc::new(DirectorySource::new(&dir));
    let analysis = analyze(&input, &config(), source, &settings())
        .await
        .unwrap();
    assert_eq!(analysis.parcels.len(), 1);
    assert_eq!(analysis.diagnostics.rejection_count(), 2);

    let report = AnalysisReport::from_analysis(&analysis);
    assert_eq!(report.status, AnalysisStatus::PartialSuccess);
    assert_eq!(report.parcels_rejected, 2);

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn test_no_valid_parcels_skips_fetch() {
    // Répertoire vide : toute récupération échouerait
    let dir = layers_dir("empty");
    let input = collection(&[(
        r#"{"type":"LineString","coordinates":[[0,0],[1,1]]}"#.to_string(),
        r#"{"predio_id":"P1"}"#,
    )]);

    let source = Arc::new(DirectorySource::new(&dir));
    let analysis = analyze(&input, &config(), source, &settings())
        .await
        .unwrap();

    assert!(analysis.parcels.is_empty());
    assert_eq!(analysis.intersection_count(), 0);
    assert!(analysis.overlaps.is_empty());

    let report = AnalysisReport::from_analysis(&analysis);
    assert_eq!(report.status, AnalysisStatus::NoValidParcels);

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn test_missing_layer_fails() {
    let dir = layers_dir("missing");

    let source = Arc::new(DirectorySource::new(&dir));
    let err = analyze(&parcels(), &config(), source, &settings())
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("zonas"));

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn test_invalid_input_fails() {
    let source = Arc::new(DirectorySource::new(layers_dir("invalid")));
    let err = analyze(r#"{"type":"Point","coordinates":[0,0]}"#, &config(), source, &settings())
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to load parcels"));
}

/// Source qui répond après un délai fixe
struct SlowSource {
    delay: Duration,
}

impl LayerSource for SlowSource {
    fn query(
        &self,
        _layer: &LayerConfig,
        _bbox: Option<Bbox>,
        _sink: &mut dyn DiagnosticSink,
    ) -> Result<Layer, SourceError> {
        std::thread::sleep(self.delay);
        Ok(Layer::default())
    }
}

#[tokio::test]
async fn test_fetch_timeout() {
    let source = Arc::new(SlowSource {
        delay: Duration::from_millis(500),
    });
    let settings = Settings {
        fetch_timeout: Duration::from_millis(20),
        ..settings()
    };

    let err = analyze(&parcels(), &config(), source, &settings)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("timed out"));
}
