mod common;

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use arrow::array::{Float64Builder, Int64Array, ListBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use tempfile::TempDir;

use common::synthetic::{grid, smooth_flux, spectrum};
use spectral_register::data::loader::load_file;
use spectral_register::data::writer::{write_report, write_spectra};
use spectral_register::{load_config, MetadataValue, Spectrum};

fn tagged(region: &str, exposure: i64) -> Spectrum {
    let mut meta = BTreeMap::new();
    meta.insert("region".to_string(), MetadataValue::String(region.to_string()));
    meta.insert("exposure".to_string(), MetadataValue::Integer(exposure));
    meta.insert("airmass".to_string(), MetadataValue::Float(1.25));
    spectrum(grid(25, 1.0, 2.0), smooth_flux).with_metadata(meta)
}

/// Text round trips may move a float by one ulp.
fn assert_same_spectra(got: &[Spectrum], want: &[Spectrum]) {
    assert_eq!(got.len(), want.len());
    for (g, w) in got.iter().zip(want) {
        assert_eq!(g.metadata, w.metadata);
        assert_eq!(g.len(), w.len());
        let axes = g.wavelength().iter().zip(w.wavelength());
        for (a, b) in axes.chain(g.flux().iter().zip(w.flux())) {
            assert!((a - b).abs() <= 1e-14 * b.abs().max(1.0), "{a} != {b}");
        }
    }
}

#[test]
fn json_round_trip_keeps_axes_and_metadata() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("spectra.json");
    let spectra = vec![tagged("A", 1), tagged("B", 2)];

    write_spectra(&path, &spectra).unwrap();
    let loaded = load_file(&path).unwrap();

    assert_same_spectra(&loaded.spectra, &spectra);
    assert_eq!(loaded.column_names, vec!["airmass", "exposure", "region"]);
}

#[test]
fn csv_round_trip_keeps_axes_and_metadata() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("spectra.csv");
    let spectra = vec![tagged("A", 1), tagged("B", 2)];

    write_spectra(&path, &spectra).unwrap();
    let loaded = load_file(&path).unwrap();

    assert_same_spectra(&loaded.spectra, &spectra);
}

#[test]
fn csv_accepts_xy_aliases() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("xy.csv");
    fs::write(&path, "x,y,detector\n\"1;2;3\",\"4;5;6\",NRS1\n").unwrap();

    let loaded = load_file(&path).unwrap();
    let sp = &loaded.spectra[0];
    assert_eq!(sp.wavelength(), &[1.0, 2.0, 3.0]);
    assert_eq!(sp.flux(), &[4.0, 5.0, 6.0]);
    assert_eq!(sp.metadata["detector"], MetadataValue::String("NRS1".into()));
}

#[test]
fn mismatched_row_lengths_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(&path, r#"[{ "wavelength": [1.0, 2.0], "flux": [1.0] }]"#).unwrap();

    let err = load_file(&path).unwrap_err();
    let chain = format!("{err:#}");
    assert!(chain.contains("wavelength has 2 values but flux has 1"), "{chain}");
}

#[test]
fn missing_flux_column_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("noflux.json");
    fs::write(&path, r#"[{ "wavelength": [1.0, 2.0] }]"#).unwrap();

    let err = load_file(&path).unwrap_err();
    assert!(format!("{err:#}").contains("missing 'flux' array"));
}

#[test]
fn parquet_lists_are_loaded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("spectra.parquet");

    let mut x = ListBuilder::new(Float64Builder::new());
    let mut y = ListBuilder::new(Float64Builder::new());
    x.values().append_slice(&[1.0, 1.5, 2.0]);
    x.append(true);
    y.values().append_slice(&[0.5, 0.0, 0.7]);
    y.append(true);

    let item = Arc::new(Field::new("item", DataType::Float64, true));
    let schema = Arc::new(Schema::new(vec![
        Field::new("x", DataType::List(item.clone()), false),
        Field::new("y", DataType::List(item), false),
        Field::new("exposure", DataType::Int64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(x.finish()),
            Arc::new(y.finish()),
            Arc::new(Int64Array::from(vec![7])),
        ],
    )
    .unwrap();
    let mut writer = ArrowWriter::try_new(fs::File::create(&path).unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let loaded = load_file(&path).unwrap();
    assert_eq!(loaded.len(), 1);
    let sp = &loaded.spectra[0];
    assert_eq!(sp.wavelength(), &[1.0, 1.5, 2.0]);
    assert_eq!(sp.flux(), &[0.5, 0.0, 0.7]);
    assert_eq!(sp.metadata["exposure"], MetadataValue::Integer(7));
}

#[test]
fn report_and_config_files() {
    let dir = TempDir::new().unwrap();

    let report_path = dir.path().join("report.json");
    write_report(Some(&report_path), &vec![1.5, 2.5]).unwrap();
    let text = fs::read_to_string(&report_path).unwrap();
    let parsed: Vec<f64> = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, vec![1.5, 2.5]);

    let config_path = dir.path().join("config.json");
    fs::write(&config_path, r#"{ "initial_warp": [0.0, 1.0], "continuum": { "degree": 1 } }"#)
        .unwrap();
    let config = load_config(&config_path).unwrap();
    assert_eq!(config.initial_warp, vec![0.0, 1.0]);
    assert_eq!(config.continuum.degree, 1);
    assert!(config.continuum.enabled);
}
