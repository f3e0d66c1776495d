//! Registration procedure: align a comparison spectrum to a reference.
//!
//! Pipeline:
//! ```text
//!  reference + comparison
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ overlap   │  common [lo, hi], drop zero-flux pixels
//!   └──────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ continuum  │  polyfit(comparison / reference) → scale for the reference
//!   └───────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ warp      │  Nelder-Mead on warp coefficients, objective = std(diff)
//!   └──────────┘
//! ```

pub mod continuum;
pub mod error;
pub mod interp;
pub mod nelder_mead;
pub mod overlap;
pub mod polynomial;
pub mod warp;

use log::info;
use serde::Serialize;

use crate::config::RegistrationConfig;
use crate::data::model::Spectrum;

use self::continuum::{fit_continuum, ContinuumModel};
use self::error::RegistrationError;
use self::overlap::{apply_mask, select_overlap, OverlapRegion};
use self::polynomial::Polynomial;
use self::warp::{fit_dispersion, warp_wavelengths, DispersionFit, WarpProblem};

// ---------------------------------------------------------------------------
// Registration – outcome of one reference/comparison pair
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Registration {
    pub overlap: OverlapRegion,
    /// Usable reference samples inside the overlap.
    pub reference_samples: usize,
    /// Usable comparison samples inside the overlap.
    pub comparison_samples: usize,
    pub continuum: ContinuumModel,
    pub dispersion: DispersionFit,
}

impl Registration {
    pub fn warp(&self) -> &Polynomial {
        &self.dispersion.warp
    }

    pub fn converged(&self) -> bool {
        self.dispersion.status.converged
    }

    /// Standard deviation of the residual after correction.
    pub fn residual(&self) -> f64 {
        self.dispersion.status.objective
    }

    /// The full comparison spectrum with the fitted warp applied to its
    /// wavelengths. Flux and metadata are carried over unchanged.
    pub fn corrected_comparison(&self, comparison: &Spectrum) -> Spectrum {
        let wavelength = warp_wavelengths(self.warp().coefficients(), comparison.wavelength());
        comparison.with_wavelength(wavelength)
    }
}

/// Run overlap selection, continuum normalization and the dispersion fit.
pub fn register(
    reference: &Spectrum,
    comparison: &Spectrum,
    config: &RegistrationConfig,
) -> Result<Registration, RegistrationError> {
    register_arrays(
        reference.wavelength(),
        reference.flux(),
        comparison.wavelength(),
        comparison.flux(),
        config,
    )
}

/// [`register`] on plain wavelength / flux slices.
pub fn register_arrays(
    reference_wavelength: &[f64],
    reference_flux: &[f64],
    comparison_wavelength: &[f64],
    comparison_flux: &[f64],
    config: &RegistrationConfig,
) -> Result<Registration, RegistrationError> {
    let overlap = select_overlap(
        reference_wavelength,
        reference_flux,
        comparison_wavelength,
        comparison_flux,
    )?;

    let ref_w = apply_mask(reference_wavelength, &overlap.reference_mask);
    let ref_f = apply_mask(reference_flux, &overlap.reference_mask);
    let cmp_w = apply_mask(comparison_wavelength, &overlap.comparison_mask);
    let cmp_f = apply_mask(comparison_flux, &overlap.comparison_mask);

    let continuum = if config.continuum.enabled {
        fit_continuum(&ref_w, &ref_f, &cmp_w, &cmp_f, &config.continuum)?
    } else {
        ContinuumModel::unity()
    };
    let normalized = continuum.apply(&ref_w, &ref_f)?;

    let problem = WarpProblem::new(&ref_w, &normalized, &cmp_w, &cmp_f)?;
    let dispersion = fit_dispersion(&problem, &config.initial_warp, &config.optimizer)?;

    info!(
        "registered over [{:.6}, {:.6}] ({} / {} samples): warp {:?}, residual {:.3e}, converged {}",
        overlap.lo,
        overlap.hi,
        ref_w.len(),
        cmp_w.len(),
        dispersion.warp.coefficients(),
        dispersion.status.objective,
        dispersion.status.converged
    );

    Ok(Registration {
        overlap,
        reference_samples: ref_w.len(),
        comparison_samples: cmp_w.len(),
        continuum,
        dispersion,
    })
}
