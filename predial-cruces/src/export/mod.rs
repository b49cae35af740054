//! Modules d'export (JSON, GeoJSON)

pub mod geojson;
pub mod json;

pub use self::geojson::export_parcels;
pub use self::json::save_records;
