//! Catalogue des couches réglementaires

mod settings;

pub use settings::Settings;

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use predial::{LayerSpec, RECORD_FIELDS};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Configuration principale
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub layers: Vec<LayerConfig>,
}

/// Une catégorie de couche à croiser avec les parcelles
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LayerConfig {
    /// Clé courte, utilisée dans les noms de fichiers de sortie
    pub key: String,

    /// Nom porté par les enregistrements
    pub title: String,

    /// Point d'accès du service de features
    pub endpoint: String,

    /// Nom de la couche côté service
    pub layer: String,

    /// Attributs projetés dans chaque enregistrement
    #[serde(default)]
    pub fields: Vec<String>,

    /// Étiquette ajoutée aux enregistrements (ex. "Ordenamiento Local")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl LayerConfig {
    /// Paramètres du calcul d'intersections
    pub fn spec(&self) -> LayerSpec {
        LayerSpec {
            name: self.title.clone(),
            attribute_keys: self.fields.clone(),
            category: self.category.clone(),
        }
    }

    /// Même service et même couche
    pub fn same_source(&self, other: &LayerConfig) -> bool {
        self.endpoint == other.endpoint && self.layer == other.layer
    }
}

impl Config {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_json::from_str(&content).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Charge une configuration depuis un preset embarqué
    pub fn from_preset(preset: &str) -> Result<Self> {
        match preset {
            "semarnat" => Self::load_embedded(include_str!("presets/semarnat.json")),
            _ => anyhow::bail!("Unknown preset: {}. Use: semarnat", preset),
        }
    }

    /// Nom de preset ou chemin vers un fichier JSON
    pub fn resolve(spec: &str) -> Result<Self> {
        if spec.ends_with(".json") || Path::new(spec).exists() {
            Self::load(Path::new(spec))
        } else {
            Self::from_preset(spec)
        }
    }

    fn load_embedded(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse embedded config")?;
        config.validate()?;
        Ok(config)
    }

    /// Clés uniques et utilisables dans un nom de fichier, attributs sans
    /// collision avec les champs fixes des enregistrements
    pub fn validate(&self) -> Result<()> {
        static KEY: OnceLock<Regex> = OnceLock::new();
        let key_re = KEY.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("valid regex"));

        let mut seen = HashMap::new();
        for (i, layer) in self.layers.iter().enumerate() {
            if !key_re.is_match(&layer.key) {
                anyhow::bail!(
                    "Invalid layer key '{}': use lowercase letters, digits, '_' or '-'",
                    layer.key
                );
            }
            if let Some(field) = layer
                .fields
                .iter()
                .find(|f| RECORD_FIELDS.contains(&f.as_str()))
            {
                anyhow::bail!(
                    "Layer '{}': field '{}' collides with a fixed record field",
                    layer.key,
                    field
                );
            }
            if let Some(first) = seen.insert(layer.key.as_str(), i) {
                anyhow::bail!(
                    "Duplicate layer key '{}' (entries {} and {})",
                    layer.key,
                    first,
                    i
                );
            }
        }
        Ok(())
    }

    /// Récupère la configuration d'une couche
    pub fn get(&self, key: &str) -> Option<&LayerConfig> {
        self.layers.iter().find(|l| l.key == key)
    }

    /// Pour chaque couche, la clé de la première couche interrogeant la même
    /// source, s'il y en a une avant elle
    pub fn duplicates(&self) -> Vec<Option<String>> {
        self.layers
            .iter()
            .enumerate()
            .map(|(i, layer)| {
                self.layers[..i]
                    .iter()
                    .find(|earlier| earlier.same_source(layer))
                    .map(|earlier| earlier.key.clone())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semarnat_preset() {
        let config = Config::from_preset("semarnat").unwrap();
        assert_eq!(config.layers.len(), 6);

        let locales = config.get("locales").unwrap();
        assert_eq!(locales.category.as_deref(), Some("Ordenamiento Local"));
        assert_eq!(locales.spec().name, "Ordenamientos Locales");
        assert_eq!(locales.fields.len(), 5);
    }

    #[test]
    fn test_duplicate_sources() {
        let config = Config::from_preset("semarnat").unwrap();
        let dups = config.duplicates();

        let flagged: Vec<(&str, &str)> = config
            .layers
            .iter()
            .zip(&dups)
            .filter_map(|(l, d)| d.as_deref().map(|d| (l.key.as_str(), d)))
            .collect();
        assert_eq!(flagged, vec![("municipales", "estatales")]);
    }

    #[test]
    fn test_unknown_preset() {
        assert!(Config::from_preset("full").is_err());
    }

    #[test]
    fn test_invalid_keys() {
        let json = r#"{"layers":[
            {"key":"a","title":"A","endpoint":"e","layer":"l"},
            {"key":"a","title":"B","endpoint":"e","layer":"m"}
        ]}"#;
        assert!(Config::load_embedded(json).is_err());

        let json = r#"{"layers":[{"key":"../x","title":"A","endpoint":"e","layer":"l"}]}"#;
        assert!(Config::load_embedded(json).is_err());
    }

    #[test]
    fn test_reserved_field_names() {
        for field in ["layer", "category", "feature_id", "area_m2"] {
            let json = format!(
                r#"{{"layers":[{{"key":"zonas","title":"Zonas","endpoint":"e","layer":"l","fields":["nombre","{}"]}}]}}"#,
                field
            );
            let err = Config::load_embedded(&json).unwrap_err();
            assert!(err.to_string().contains(field));
        }
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join("predial_test_config.json");
        std::fs::write(
            &path,
            r#"{"layers":[{"key":"zonas","title":"Zonas","endpoint":"local","layer":"zonas","fields":["clave"]}]}"#,
        )
        .unwrap();

        let config = Config::resolve(path.to_str().unwrap()).unwrap();
        assert_eq!(config.layers[0].fields, vec!["clave".to_string()]);
        assert!(config.layers[0].category.is_none());

        std::fs::remove_file(path).ok();
    }
}
