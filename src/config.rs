use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::register::continuum::ContinuumConfig;
use crate::register::nelder_mead::NelderMeadOptions;
use crate::register::polynomial::Polynomial;

/// Everything a registration run can be tuned with.
///
/// Every field has a default, so a config file only needs the keys it changes:
///
/// ```json
/// { "continuum": { "min_wavelength": 1.2 }, "initial_warp": [0.0, 1.0] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    pub continuum: ContinuumConfig,
    /// Starting warp coefficients (ascending powers). Its length sets the
    /// warp polynomial's order.
    pub initial_warp: Vec<f64>,
    pub optimizer: NelderMeadOptions,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            continuum: ContinuumConfig::default(),
            initial_warp: Polynomial::identity(3).into_coefficients(),
            optimizer: NelderMeadOptions::default(),
        }
    }
}

/// Read a [`RegistrationConfig`] from a JSON file.
pub fn load_config(path: &Path) -> Result<RegistrationConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: RegistrationConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_quadratic_identity() {
        let config = RegistrationConfig::default();
        assert_eq!(config.initial_warp, vec![0.0, 1.0, 0.0]);
        assert!(config.continuum.enabled);
        assert_eq!(config.continuum.degree, 2);
        assert_eq!(config.continuum.min_wavelength, None);
        assert_eq!(config.optimizer.xatol, 1e-4);
        assert_eq!(config.optimizer.max_iterations, None);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: RegistrationConfig = serde_json::from_str(
            r#"{ "continuum": { "min_wavelength": 1.2 }, "optimizer": { "max_iterations": 50 } }"#,
        )
        .unwrap();
        assert_eq!(config.continuum.min_wavelength, Some(1.2));
        assert_eq!(config.continuum.degree, 2);
        assert_eq!(config.optimizer.max_iterations, Some(50));
        assert_eq!(config.optimizer.fatol, 1e-4);
        assert_eq!(config.initial_warp, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn load_config_reports_missing_file() {
        let err = load_config(Path::new("/nonexistent/registration.json")).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }
}
