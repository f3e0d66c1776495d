use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::error::{check_lengths, RegistrationError};
use super::interp::interp_linear;
use super::nelder_mead::{nelder_mead, NelderMeadOptions, OptimizerStatus};
use super::polynomial::{horner, Polynomial};

// ---------------------------------------------------------------------------
// WarpProblem – everything the registration objective depends on
// ---------------------------------------------------------------------------

/// Inputs of the dispersion fit, borrowed for the duration of one fit.
///
/// The reference flux is expected to be continuum-normalized already.
#[derive(Debug, Clone, Copy)]
pub struct WarpProblem<'a> {
    reference_wavelength: &'a [f64],
    reference_flux: &'a [f64],
    comparison_wavelength: &'a [f64],
    comparison_flux: &'a [f64],
}

impl<'a> WarpProblem<'a> {
    pub fn new(
        reference_wavelength: &'a [f64],
        reference_flux: &'a [f64],
        comparison_wavelength: &'a [f64],
        comparison_flux: &'a [f64],
    ) -> Result<Self, RegistrationError> {
        check_lengths(reference_wavelength, reference_flux)?;
        check_lengths(comparison_wavelength, comparison_flux)?;
        if reference_wavelength.is_empty() {
            return Err(RegistrationError::InvalidInput(
                "reference spectrum has no samples".to_string(),
            ));
        }
        if comparison_wavelength.len() < 2 {
            return Err(RegistrationError::InvalidInput(format!(
                "comparison spectrum needs at least two samples, got {}",
                comparison_wavelength.len()
            )));
        }
        Ok(Self {
            reference_wavelength,
            reference_flux,
            comparison_wavelength,
            comparison_flux,
        })
    }

    /// Comparison flux resampled onto the reference grid after warping the
    /// comparison wavelengths with `coefficients`.
    pub fn resample(&self, coefficients: &[f64]) -> Vec<f64> {
        let warped = warp_wavelengths(coefficients, self.comparison_wavelength);
        // Lengths and sample count were validated in `new`.
        interp_linear(&warped, self.comparison_flux, self.reference_wavelength)
            .unwrap_or_else(|_| vec![f64::NAN; self.reference_wavelength.len()])
    }

    /// Standard deviation of `resampled comparison − reference`.
    pub fn objective(&self, coefficients: &[f64]) -> f64 {
        let resampled = self.resample(coefficients);
        let difference: Vec<f64> = resampled
            .iter()
            .zip(self.reference_flux)
            .map(|(c, r)| c - r)
            .collect();
        std_dev(&difference)
    }
}

/// Evaluate the warp polynomial at every wavelength.
pub fn warp_wavelengths(coefficients: &[f64], wavelength: &[f64]) -> Vec<f64> {
    wavelength.iter().map(|&w| horner(coefficients, w)).collect()
}

/// Population standard deviation (divides by `n`). Empty input gives NaN.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

// ---------------------------------------------------------------------------
// DispersionFit
// ---------------------------------------------------------------------------

/// Best-effort dispersion warp plus the optimizer's report on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispersionFit {
    pub warp: Polynomial,
    pub status: OptimizerStatus,
}

/// Fit the warp polynomial minimizing [`WarpProblem::objective`].
///
/// The length of `initial` fixes the polynomial order (`[0, 1, 0]` is the
/// quadratic identity). A fit that does not converge is still returned,
/// with `status.converged == false`; retrying is the caller's decision.
pub fn fit_dispersion(
    problem: &WarpProblem<'_>,
    initial: &[f64],
    options: &NelderMeadOptions,
) -> Result<DispersionFit, RegistrationError> {
    let minimum = nelder_mead(|c: &[f64]| problem.objective(c), initial, options)?;

    if minimum.status.converged {
        debug!(
            "dispersion fit converged: {:?}, residual std {:.6e}",
            minimum.x, minimum.status.objective
        );
    } else {
        warn!(
            "dispersion fit did not converge ({:?} after {} iterations); returning best coefficients {:?}",
            minimum.status.termination, minimum.status.iterations, minimum.x
        );
    }

    Ok(DispersionFit {
        warp: Polynomial::new(minimum.x),
        status: minimum.status,
    })
}
