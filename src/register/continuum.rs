use log::debug;
use serde::{Deserialize, Serialize};

use super::error::{check_lengths, RegistrationError};
use super::interp::interp_linear;
use super::polynomial::Polynomial;

/// Settings for the continuum-normalization fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuumConfig {
    /// When false the pipeline uses a unit scale and skips the fit.
    pub enabled: bool,
    /// Degree of the flux-ratio polynomial.
    pub degree: usize,
    /// Only samples with wavelength strictly above this cutoff enter the fit.
    /// Keeps line-dominated regions out of the continuum shape.
    pub min_wavelength: Option<f64>,
}

impl Default for ContinuumConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            degree: 2,
            min_wavelength: None,
        }
    }
}

/// Smooth wavelength → flux-scale model (comparison / reference ratio).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuumModel {
    pub polynomial: Polynomial,
    /// Number of samples the fit used.
    pub samples: usize,
}

impl ContinuumModel {
    /// A model that leaves flux unchanged.
    pub fn unity() -> Self {
        Self {
            polynomial: Polynomial::new(vec![1.0]),
            samples: 0,
        }
    }

    pub fn scale_at(&self, wavelength: f64) -> f64 {
        self.polynomial.eval(wavelength)
    }

    /// Multiply `flux` by the scale evaluated at `wavelength`, pointwise.
    pub fn apply(&self, wavelength: &[f64], flux: &[f64]) -> Result<Vec<f64>, RegistrationError> {
        check_lengths(wavelength, flux)?;
        Ok(wavelength
            .iter()
            .zip(flux)
            .map(|(&w, &f)| f * self.scale_at(w))
            .collect())
    }
}

/// Fit the comparison / reference flux ratio with a low-order polynomial.
///
/// The comparison flux is first resampled onto the reference wavelengths
/// (linear, extrapolated). Only finite ratios above the configured
/// wavelength cutoff are fitted. Nothing is normalized here: the caller
/// multiplies the reference flux by the returned model.
pub fn fit_continuum(
    reference_wavelength: &[f64],
    reference_flux: &[f64],
    comparison_wavelength: &[f64],
    comparison_flux: &[f64],
    config: &ContinuumConfig,
) -> Result<ContinuumModel, RegistrationError> {
    check_lengths(reference_wavelength, reference_flux)?;
    let resampled = interp_linear(comparison_wavelength, comparison_flux, reference_wavelength)?;

    let cutoff = config.min_wavelength.unwrap_or(f64::NEG_INFINITY);
    let (x, y): (Vec<f64>, Vec<f64>) = reference_wavelength
        .iter()
        .zip(reference_flux.iter().zip(&resampled))
        .map(|(&w, (&reference, &comparison))| (w, comparison / reference))
        .filter(|&(w, ratio)| ratio.is_finite() && w > cutoff)
        .unzip();

    if x.is_empty() {
        return Err(RegistrationError::insufficient_normalization_samples());
    }

    let polynomial = Polynomial::fit(&x, &y, config.degree)?;
    debug!(
        "continuum fit (degree {}) on {} samples: {:?}",
        polynomial.degree(),
        x.len(),
        polynomial.coefficients()
    );
    Ok(ContinuumModel {
        polynomial,
        samples: x.len(),
    })
}
