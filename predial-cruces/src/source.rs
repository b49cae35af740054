//! Sources de features pour les couches externes

use std::path::{Path, PathBuf};

use geo::{Intersects, Rect};
use predial::{load_layer, Crs, DiagnosticSink, HasGeometry, Layer, PredialError};
use thiserror::Error;
use tracing::debug;

use crate::config::LayerConfig;

/// Emprise d'une requête, exprimée dans un système donné
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    pub rect: Rect,
    pub crs: Crs,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("No data for layer '{key}': {path} not found")]
    NotFound { key: String, path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid data for layer '{key}': {source}")]
    Data {
        key: String,
        #[source]
        source: PredialError,
    },
}

/// Fournit les features d'une couche intersectant une emprise.
///
/// Le système de référence du résultat n'est pas garanti : l'appelant
/// normalise toujours la couche avant de la croiser.
pub trait LayerSource: Send + Sync {
    fn query(
        &self,
        layer: &LayerConfig,
        bbox: Option<Bbox>,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<Layer, SourceError>;
}

/// Couches stockées en fichiers : `<dir>/<key>.geojson`
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, layer: &LayerConfig) -> PathBuf {
        self.dir.join(format!("{}.geojson", layer.key))
    }
}

impl LayerSource for DirectorySource {
    fn query(
        &self,
        layer: &LayerConfig,
        bbox: Option<Bbox>,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<Layer, SourceError> {
        let path = self.path_for(layer);
        if !path.exists() {
            return Err(SourceError::NotFound {
                key: layer.key.clone(),
                path,
            });
        }

        let text = std::fs::read_to_string(&path).map_err(|source| SourceError::Io {
            path: path.clone(),
            source,
        })?;
        let mut data = load_layer(&text, sink).map_err(|source| SourceError::Data {
            key: layer.key.clone(),
            source,
        })?;

        // Filtrage par emprise seulement si les deux systèmes coïncident
        if let Some(bbox) = bbox {
            if data.crs.unwrap_or(Crs::WGS84) == bbox.crs {
                let before = data.len();
                data.features.retain(|f| {
                    f.geometry()
                        .bounding_rect()
                        .is_some_and(|r| r.intersects(&bbox.rect))
                });
                debug!(
                    layer = %layer.key,
                    kept = data.len(),
                    outside = before - data.len(),
                    "Bbox filter"
                );
            }
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;
    use predial::Diagnostics;

    fn config(key: &str) -> LayerConfig {
        LayerConfig {
            key: key.to_string(),
            title: key.to_uppercase(),
            endpoint: "file".into(),
            layer: key.to_string(),
            fields: vec![],
            category: None,
        }
    }

    fn write_layer(dir: &Path, key: &str) {
        let text = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","id":1,"geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]},"properties":{}},
            {"type":"Feature","id":2,"geometry":{"type":"Polygon","coordinates":[[[10,10],[11,10],[11,11],[10,11],[10,10]]]},"properties":{}}
        ]}"#;
        std::fs::write(dir.join(format!("{}.geojson", key)), text).unwrap();
    }

    #[test]
    fn test_bbox_filter() {
        let dir = std::env::temp_dir().join("predial_source_bbox");
        std::fs::create_dir_all(&dir).unwrap();
        write_layer(&dir, "zonas");

        let source = DirectorySource::new(&dir);
        let bbox = Bbox {
            rect: Rect::new(coord! { x: 0.5, y: 0.5 }, coord! { x: 2.0, y: 2.0 }),
            crs: Crs::WGS84,
        };
        let layer = source
            .query(&config("zonas"), Some(bbox), &mut Diagnostics::new())
            .unwrap();
        assert_eq!(layer.len(), 1);
        assert_eq!(layer.features[0].id, "1");

        let all = source
            .query(&config("zonas"), None, &mut Diagnostics::new())
            .unwrap();
        assert_eq!(all.len(), 2);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_missing_layer() {
        let source = DirectorySource::new(std::env::temp_dir().join("predial_source_missing"));
        let err = source
            .query(&config("nada"), None, &mut Diagnostics::new())
            .unwrap_err();
        assert!(matches!(err, SourceError::NotFound { .. }));
    }
}
