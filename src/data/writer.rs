use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use super::model::{MetadataValue, Spectrum};

// ---------------------------------------------------------------------------
// Spectra
// ---------------------------------------------------------------------------

/// Write spectra in a layout [`load_file`](super::loader::load_file) reads back.
/// Dispatch by extension (`.json` or `.csv`).
pub fn write_spectra(path: &Path, spectra: &[Spectrum]) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "json" => write_json(path, spectra),
        "csv" => write_csv(path, spectra),
        other => bail!("Unsupported output extension: .{other}"),
    }
    .with_context(|| format!("writing {}", path.display()))
}

fn write_json(path: &Path, spectra: &[Spectrum]) -> Result<()> {
    let records: Vec<JsonValue> = spectra
        .iter()
        .map(|sp| {
            let mut obj = Map::new();
            obj.insert("wavelength".into(), JsonValue::from(sp.wavelength().to_vec()));
            obj.insert("flux".into(), JsonValue::from(sp.flux().to_vec()));
            for (key, val) in &sp.metadata {
                obj.insert(key.clone(), metadata_to_json(val));
            }
            JsonValue::Object(obj)
        })
        .collect();

    let file = std::fs::File::create(path).context("creating JSON file")?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), &records)
        .context("serializing spectra")?;
    Ok(())
}

fn metadata_to_json(val: &MetadataValue) -> JsonValue {
    match val {
        MetadataValue::String(s) => JsonValue::from(s.clone()),
        MetadataValue::Integer(i) => JsonValue::from(*i),
        MetadataValue::Float(f) => JsonValue::from(*f),
        MetadataValue::Bool(b) => JsonValue::from(*b),
        MetadataValue::Null => JsonValue::Null,
    }
}

fn write_csv(path: &Path, spectra: &[Spectrum]) -> Result<()> {
    let columns: BTreeSet<&str> = spectra
        .iter()
        .flat_map(|sp| sp.metadata.keys().map(|k| k.as_str()))
        .collect();

    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    let mut header = vec!["wavelength", "flux"];
    header.extend(columns.iter().copied());
    writer.write_record(&header).context("writing CSV header")?;

    for sp in spectra {
        let mut record = vec![join_floats(sp.wavelength()), join_floats(sp.flux())];
        for col in &columns {
            record.push(sp.metadata.get(*col).map(metadata_to_cell).unwrap_or_default());
        }
        writer.write_record(&record).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

fn join_floats(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(";")
}

/// Full-precision text for a metadata cell (`Display` rounds floats).
fn metadata_to_cell(val: &MetadataValue) -> String {
    match val {
        MetadataValue::Float(f) => f.to_string(),
        MetadataValue::Null => String::new(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Pretty-print `report` as JSON to `path`, or to stdout when `path` is `None`.
pub fn write_report<T: Serialize>(path: Option<&Path>, report: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(report).context("serializing report")?;
    match path {
        Some(path) => std::fs::write(path, text + "\n")
            .with_context(|| format!("writing report {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{text}").context("writing report to stdout")
        }
    }
}
