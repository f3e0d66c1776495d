use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    LargeListArray, ListArray, StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{MetadataValue, SpectralDataset, Spectrum};

/// Accepted names for the wavelength axis, in order of preference.
pub const WAVELENGTH_COLUMNS: [&str; 2] = ["wavelength", "x"];
/// Accepted names for the flux axis, in order of preference.
pub const FLUX_COLUMNS: [&str; 2] = ["flux", "y"];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a spectral dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – Parquet file with `wavelength` and `flux` list columns
/// * `.json`    – `[{ "wavelength": [...], "flux": [...], ...meta }, ...]`
/// * `.csv`     – columns `wavelength` and `flux` containing semicolon-separated floats
///
/// `x` / `y` are accepted in place of `wavelength` / `flux` everywhere.
pub fn load_file(path: &Path) -> Result<SpectralDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::debug!(
        "loaded {} spectra from {} (metadata columns: {:?})",
        dataset.len(),
        path.display(),
        dataset.column_names
    );
    Ok(dataset)
}

fn is_axis_column(name: &str) -> bool {
    WAVELENGTH_COLUMNS.contains(&name) || FLUX_COLUMNS.contains(&name)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   {
///     "wavelength": [1.00, 1.01, ...],
///     "flux":       [0.92, 0.95, ...],
///     "region": "A",
///     "exposure": 3
///   },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<SpectralDataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut spectra = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let wavelength = json_axis(obj, &WAVELENGTH_COLUMNS, i)?;
        let flux = json_axis(obj, &FLUX_COLUMNS, i)?;

        let mut metadata = BTreeMap::new();
        for (key, val) in obj {
            if is_axis_column(key) {
                continue;
            }
            metadata.insert(key.clone(), json_to_metadata(val));
        }

        let spectrum = Spectrum::new(wavelength, flux).with_context(|| format!("Row {i}"))?;
        spectra.push(spectrum.with_metadata(metadata));
    }

    Ok(SpectralDataset::from_spectra(spectra))
}

fn json_axis(
    obj: &serde_json::Map<String, JsonValue>,
    names: &[&str],
    row: usize,
) -> Result<Vec<f64>> {
    let (name, val) = names
        .iter()
        .find_map(|n| obj.get(*n).map(|v| (*n, v)))
        .with_context(|| format!("Row {row}: missing '{}' array", names[0]))?;

    let arr = val
        .as_array()
        .with_context(|| format!("Row {row}: '{name}' is not an array"))?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| {
            v.as_f64()
                .with_context(|| format!("Row {row}, {name}[{j}]: not a number"))
        })
        .collect()
}

fn json_to_metadata(val: &JsonValue) -> MetadataValue {
    match val {
        JsonValue::String(s) => MetadataValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                MetadataValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                MetadataValue::Float(f)
            } else {
                MetadataValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => MetadataValue::Bool(*b),
        JsonValue::Null => MetadataValue::Null,
        other => MetadataValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout:  header row with column names.
/// `wavelength` and `flux` columns contain semicolon-separated floats:
///   `"1.00;1.01;1.02"`, `"0.92;0.95;0.90"`
/// All other columns are treated as metadata.
fn load_csv(path: &Path) -> Result<SpectralDataset> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let w_idx = find_column(&headers, &WAVELENGTH_COLUMNS)
        .context("CSV missing 'wavelength' column")?;
    let f_idx = find_column(&headers, &FLUX_COLUMNS).context("CSV missing 'flux' column")?;

    let mut spectra = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let wavelength =
            parse_semicolon_floats(record.get(w_idx).unwrap_or(""), row_no, &headers[w_idx])?;
        let flux =
            parse_semicolon_floats(record.get(f_idx).unwrap_or(""), row_no, &headers[f_idx])?;

        let mut metadata = BTreeMap::new();
        for (col_idx, value) in record.iter().enumerate() {
            if col_idx == w_idx || col_idx == f_idx {
                continue;
            }
            let col_name = &headers[col_idx];
            metadata.insert(col_name.clone(), guess_metadata_type(value));
        }

        let spectrum =
            Spectrum::new(wavelength, flux).with_context(|| format!("CSV row {row_no}"))?;
        spectra.push(spectrum.with_metadata(metadata));
    }

    Ok(SpectralDataset::from_spectra(spectra))
}

fn find_column(headers: &[String], names: &[&str]) -> Option<usize> {
    names
        .iter()
        .find_map(|n| headers.iter().position(|h| h == n))
}

fn parse_semicolon_floats(s: &str, row: usize, col: &str) -> Result<Vec<f64>> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim()
                .parse::<f64>()
                .with_context(|| format!("Row {row}, {col}[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

/// Interpret a text cell as the narrowest matching metadata type.
///
/// Also used to parse `column=value` selection predicates so they compare
/// equal to loaded values.
pub fn guess_metadata_type(s: &str) -> MetadataValue {
    if s.is_empty() {
        return MetadataValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return MetadataValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return MetadataValue::Float(f);
    }
    if s == "true" || s == "false" {
        return MetadataValue::Bool(s == "true");
    }
    MetadataValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing spectral data.
///
/// Expected schema:
/// - `wavelength`: List<Float64|Float32> or LargeList – wavelength arrays
/// - `flux`: List<Float64|Float32> or LargeList – flux arrays
/// - Any other columns are treated as metadata (strings, ints, floats, bools)
fn load_parquet(path: &Path) -> Result<SpectralDataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut spectra = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let n_rows = batch.num_rows();

        let index_of = |names: &[&str]| names.iter().find_map(|n| schema.index_of(n).ok());
        let w_idx = index_of(&WAVELENGTH_COLUMNS[..])
            .context("Parquet file missing 'wavelength' column")?;
        let f_idx = index_of(&FLUX_COLUMNS[..]).context("Parquet file missing 'flux' column")?;

        let w_col = batch.column(w_idx);
        let f_col = batch.column(f_idx);

        // Everything except the two axes is metadata.
        let meta_cols: Vec<(usize, String)> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != w_idx && *i != f_idx)
            .map(|(i, f)| (i, f.name().clone()))
            .collect();

        for row in 0..n_rows {
            let wavelength = extract_f64_list(w_col, row)
                .with_context(|| format!("Row {row}: failed to read wavelength"))?;
            let flux = extract_f64_list(f_col, row)
                .with_context(|| format!("Row {row}: failed to read flux"))?;

            let mut metadata = BTreeMap::new();
            for (col_idx, col_name) in &meta_cols {
                let value = extract_metadata_value(batch.column(*col_idx), row);
                metadata.insert(col_name.clone(), value);
            }

            let spectrum = Spectrum::new(wavelength, flux).with_context(|| format!("Row {row}"))?;
            spectra.push(spectrum.with_metadata(metadata));
        }
    }

    Ok(SpectralDataset::from_spectra(spectra))
}

// -- Parquet / Arrow helpers --

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
/// Null list entries become NaN; [`Spectrum::finite`] drops them later.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

/// Extract a single metadata value from an Arrow column at a given row.
fn extract_metadata_value(col: &Arc<dyn Array>, row: usize) -> MetadataValue {
    if col.is_null(row) {
        return MetadataValue::Null;
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|s| MetadataValue::String(s.value(row).to_string())),
        DataType::LargeUtf8 => Some(MetadataValue::String(
            col.as_string::<i64>().value(row).to_string(),
        )),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| MetadataValue::Integer(a.value(row) as i64)),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| MetadataValue::Integer(a.value(row))),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| MetadataValue::Float(a.value(row) as f64)),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| MetadataValue::Float(a.value(row))),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| MetadataValue::Bool(a.value(row))),
        _ => None,
    };
    value.unwrap_or_else(|| MetadataValue::String(format!("{:?}", col.data_type())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_metadata_types() {
        assert_eq!(guess_metadata_type(""), MetadataValue::Null);
        assert_eq!(guess_metadata_type("42"), MetadataValue::Integer(42));
        assert_eq!(guess_metadata_type("1.5"), MetadataValue::Float(1.5));
        assert_eq!(guess_metadata_type("true"), MetadataValue::Bool(true));
        assert_eq!(guess_metadata_type("NRS1"), MetadataValue::String("NRS1".into()));
    }

    #[test]
    fn parses_semicolon_lists() {
        assert_eq!(parse_semicolon_floats("1; 2.5;3", 0, "flux").unwrap(), vec![1.0, 2.5, 3.0]);
        assert!(parse_semicolon_floats("", 0, "flux").unwrap().is_empty());
        let err = parse_semicolon_floats("1;abc", 4, "flux").unwrap_err();
        assert!(err.to_string().contains("Row 4, flux[1]"));
    }

    #[test]
    fn axis_columns_accept_aliases() {
        let headers = vec!["region".to_string(), "y".to_string(), "x".to_string()];
        assert_eq!(find_column(&headers, &WAVELENGTH_COLUMNS), Some(2));
        assert_eq!(find_column(&headers, &FLUX_COLUMNS), Some(1));
        assert!(is_axis_column("wavelength"));
        assert!(!is_axis_column("region"));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = load_file(Path::new("spectra.fits")).unwrap_err();
        assert!(err.to_string().contains("Unsupported file extension"));
    }
}
