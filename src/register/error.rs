use thiserror::Error;

/// Errors raised by the registration procedure.
///
/// Optimizer non-convergence is deliberately absent: it is reported through
/// [`OptimizerStatus`](super::nelder_mead::OptimizerStatus) instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    /// The spectra share no wavelength range, or every overlapping sample is masked.
    #[error("spectra do not overlap (overlap bounds [{lo}, {hi}] select no usable samples)")]
    EmptyOverlap { lo: f64, hi: f64 },

    /// Not enough finite samples to fit a model.
    #[error("{0}")]
    Domain(String),

    /// Wavelength and flux arrays of one spectrum differ in length.
    #[error("wavelength has {wavelength} values but flux has {flux}")]
    LengthMismatch { wavelength: usize, flux: usize },

    /// The least-squares system has no usable solution.
    #[error("least-squares fit failed: singular system")]
    SingularFit,

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl RegistrationError {
    pub(crate) fn insufficient_normalization_samples() -> Self {
        RegistrationError::Domain("insufficient samples for normalization fit".to_string())
    }
}

/// Fail with [`RegistrationError::LengthMismatch`] unless both slices have the same length.
pub(crate) fn check_lengths(wavelength: &[f64], flux: &[f64]) -> Result<(), RegistrationError> {
    if wavelength.len() != flux.len() {
        return Err(RegistrationError::LengthMismatch {
            wavelength: wavelength.len(),
            flux: flux.len(),
        });
    }
    Ok(())
}
