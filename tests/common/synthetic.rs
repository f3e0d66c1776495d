use spectral_register::Spectrum;

/// Evenly spaced grid from `start` to `end` inclusive.
pub fn grid(n: usize, start: f64, end: f64) -> Vec<f64> {
    let step = (end - start) / (n - 1) as f64;
    (0..n).map(|i| start + i as f64 * step).collect()
}

/// Smooth, non-periodic-looking flux used where a warp must be identifiable.
pub fn smooth_flux(wavelength: f64) -> f64 {
    1.0 + 0.3 * (6.0 * wavelength).sin() + 0.2 * (11.0 * wavelength).cos()
}

/// (centre µm, sigma µm, depth)
const LINES: [(f64, f64, f64); 5] = [
    (1.12, 0.004, 0.45),
    (1.28, 0.006, 0.30),
    (1.47, 0.003, 0.60),
    (1.64, 0.008, 0.25),
    (1.83, 0.005, 0.40),
];

/// Absorption-line spectrum on a sloped continuum.
pub fn line_flux(wavelength: f64) -> f64 {
    let continuum = 1.0 + 0.15 * (wavelength - 1.5);
    let absorption: f64 = LINES
        .iter()
        .map(|&(mu, sigma, depth)| depth * (-(wavelength - mu).powi(2) / (2.0 * sigma * sigma)).exp())
        .sum();
    continuum * (1.0 - absorption)
}

/// Sample `flux` on `wavelength`.
pub fn spectrum(wavelength: Vec<f64>, flux: impl Fn(f64) -> f64) -> Spectrum {
    let values = wavelength.iter().map(|&w| flux(w)).collect();
    Spectrum::new(wavelength, values).expect("equal lengths")
}

/// Copy of `flux` sampled at `truth` but reported at `truth · scale`,
/// i.e. a miscalibrated dispersion solution.
pub fn miscalibrated(truth: &[f64], scale: f64, flux: impl Fn(f64) -> f64) -> Spectrum {
    let wavelength = truth.iter().map(|&w| w * scale).collect();
    let values = truth.iter().map(|&w| flux(w)).collect();
    Spectrum::new(wavelength, values).expect("equal lengths")
}
