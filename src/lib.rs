//! Spectral registration: align a comparison spectrum's dispersion solution
//! (wavelength grid) to a reference spectrum.
//!
//! ```no_run
//! use spectral_register::{register, RegistrationConfig, Spectrum};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let reference = Spectrum::new(vec![1.0, 2.0, 3.0, 4.0, 5.0], vec![1.0, 2.0, 3.0, 4.0, 5.0])?;
//! let comparison = Spectrum::new(vec![1.1, 2.2, 3.3, 4.4, 5.5], vec![1.0, 2.0, 3.0, 4.0, 5.0])?;
//!
//! let result = register(&reference, &comparison, &RegistrationConfig::default())?;
//! if !result.converged() {
//!     eprintln!("fit did not converge; try another initial warp");
//! }
//! println!("warp = {:?}", result.warp().coefficients());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod data;
pub mod register;

pub use crate::config::{load_config, RegistrationConfig};
pub use crate::data::model::{MetadataValue, SpectralDataset, Spectrum};
pub use crate::register::continuum::{fit_continuum, ContinuumConfig, ContinuumModel};
pub use crate::register::error::RegistrationError;
pub use crate::register::nelder_mead::{NelderMeadOptions, OptimizerStatus, TerminationReason};
pub use crate::register::overlap::{select_overlap, OverlapRegion};
pub use crate::register::polynomial::Polynomial;
pub use crate::register::warp::{fit_dispersion, DispersionFit, WarpProblem};
pub use crate::register::{register, register_arrays, Registration};
