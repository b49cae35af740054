//! Persistance des séquences d'enregistrements

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

/// Écrit une séquence d'enregistrements en JSON indenté, dans l'ordre reçu
pub fn save_records<T: Serialize>(records: &[T], path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, records)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use predial::{estimate, OverlapRecord, ParcelRef};

    #[test]
    fn test_save_records() {
        let parcel = |id: usize| ParcelRef {
            id,
            predio_id: "P1".into(),
            subpoligono_id: format!("P1_subpoligono_{}", id),
        };
        let records = vec![OverlapRecord {
            first: parcel(1),
            second: parcel(2),
            area: estimate(0.5),
        }];

        let path = std::env::temp_dir().join("predial_test_records.json");
        save_records(&records, &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value[0]["area_m2"], "6160500000.00 m² (estimated)");
        assert_eq!(value[0]["second"]["id"], 2);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_empty_sequence() {
        let path = std::env::temp_dir().join("predial_test_empty.json");
        save_records::<OverlapRecord>(&[], &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
        std::fs::remove_file(path).ok();
    }
}
