//! Write a synthetic reference / comparison pair to Parquet.
//!
//! The comparison shares the reference's absorption lines but reports its
//! wavelengths through a miscalibrated dispersion solution (scaled by
//! `DISPERSION_SCALE`) and carries a smooth continuum tilt, so
//! `spectral-register pair.parquet --reference-select role=reference`
//! should recover a linear warp coefficient of about `1 / DISPERSION_SCALE`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Float64Builder, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

const DISPERSION_SCALE: f64 = 1.002;

/// (centre µm, sigma µm, depth)
const LINES: [(f64, f64, f64); 5] = [
    (1.12, 0.004, 0.45),
    (1.28, 0.006, 0.30),
    (1.47, 0.003, 0.60),
    (1.64, 0.008, 0.25),
    (1.83, 0.005, 0.40),
];

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Line spectrum on a sloped continuum, evaluated at the true wavelengths.
fn intrinsic_flux(wavelength: f64) -> f64 {
    let continuum = 1.0 + 0.15 * (wavelength - 1.5);
    let absorption: f64 = LINES
        .iter()
        .map(|&(mu, sigma, depth)| gaussian(wavelength, mu, sigma, depth))
        .sum();
    continuum * (1.0 - absorption)
}

/// SplitMix64 stream of uniform noise; reproducible across runs.
struct Noise {
    state: u64,
}

impl Noise {
    fn new(seed: u64) -> Self {
        Noise { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[-amplitude, amplitude)`.
    fn sample(&mut self, amplitude: f64) -> f64 {
        let unit = (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        amplitude * (2.0 * unit - 1.0)
    }
}

fn list_array(rows: &[Vec<f64>]) -> arrow::array::ListArray {
    let mut builder = ListBuilder::new(Float64Builder::new());
    for row in rows {
        let values = builder.values();
        for &v in row {
            values.append_value(v);
        }
        builder.append(true);
    }
    builder.finish()
}

fn main() -> Result<()> {
    env_logger::init();
    let output_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("pair.parquet"));

    let mut noise = Noise::new(42);

    // True wavelengths: 1.0 → 2.0 µm, step 1 nm
    let truth: Vec<f64> = (0..=1000).map(|i| 1.0 + i as f64 * 0.001).collect();

    let reference_flux: Vec<f64> = truth
        .iter()
        .map(|&w| intrinsic_flux(w) + noise.sample(0.0035))
        .collect();

    let comparison_wavelength: Vec<f64> = truth.iter().map(|&w| w * DISPERSION_SCALE).collect();
    let mut comparison_flux: Vec<f64> = truth
        .iter()
        .map(|&w| {
            let tilt = 0.9 + 0.05 * (w - 1.5) - 0.02 * (w - 1.5).powi(2);
            intrinsic_flux(w) * tilt + noise.sample(0.0035)
        })
        .collect();
    // A few dead pixels, flagged with zero flux.
    for i in [100, 101, 640] {
        comparison_flux[i] = 0.0;
    }

    let wavelengths = list_array(&[truth.clone(), comparison_wavelength]);
    let fluxes = list_array(&[reference_flux, comparison_flux]);
    let roles = StringArray::from(vec!["reference", "comparison"]);
    let scales = Float64Array::from(vec![1.0, DISPERSION_SCALE]);

    let item = Arc::new(Field::new("item", DataType::Float64, true));
    let schema = Arc::new(Schema::new(vec![
        Field::new("wavelength", DataType::List(item.clone()), false),
        Field::new("flux", DataType::List(item), false),
        Field::new("role", DataType::Utf8, false),
        Field::new("dispersion_scale", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(wavelengths),
            Arc::new(fluxes),
            Arc::new(roles),
            Arc::new(scales),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(&output_path)
        .with_context(|| format!("creating {}", output_path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;

    println!(
        "Wrote reference + comparison ({} samples each, dispersion scale {DISPERSION_SCALE}) to {}",
        truth.len(),
        output_path.display()
    );
    Ok(())
}
