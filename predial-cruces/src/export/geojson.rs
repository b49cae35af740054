//! Export des parcelles normalisées en GeoJSON avec geozero (streaming)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;

use predial::{ParcelPolygon, ParcelSet};

/// Exporte les parcelles en FeatureCollection, CRS déclaré en en-tête
pub fn export_parcels(parcels: &ParcelSet, output_path: &Path) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create file: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);

    write!(writer, r#"{{"type":"FeatureCollection","#)?;
    if let Some(crs) = parcels.crs {
        write!(
            writer,
            r#""crs":{{"type":"name","properties":{{"name":"{}"}}}},"#,
            crs.urn()
        )?;
    }
    write!(writer, r#""features":["#)?;

    for (i, parcel) in parcels.iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        write_parcel(&mut writer, parcel)?;
    }

    write!(writer, "]}}")?;
    writer.flush()?;

    Ok(())
}

/// Écrit une parcelle en Feature GeoJSON
fn write_parcel<W: Write>(writer: &mut W, parcel: &ParcelPolygon) -> Result<()> {
    write!(writer, r#"{{"type":"Feature","id":{},"#, parcel.id)?;

    write!(writer, r#""geometry":"#)?;
    let mut geom_buf = Vec::new();
    let mut geom_writer = GeoJsonWriter::new(&mut geom_buf);
    parcel.geometry.to_geometry().process_geom(&mut geom_writer)?;
    writer.write_all(&geom_buf)?;

    write!(
        writer,
        r#","properties":{{"id":{},"predio_id":"{}","poligono":"{}"}}}}"#,
        parcel.id,
        escape_json(&parcel.predio_id),
        escape_json(&parcel.subpoligono_id)
    )?;

    Ok(())
}

/// Échappe une chaîne pour JSON
fn escape_json(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c.is_control() => {
                result.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => result.push(c),
        }
    }
    result
}
