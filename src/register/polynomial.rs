use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::error::{check_lengths, RegistrationError};

/// A polynomial in one variable, coefficients in ascending powers:
/// `p(x) = c[0] + c[1]·x + c[2]·x² + …`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polynomial {
    coefficients: Vec<f64>,
}

impl Polynomial {
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self { coefficients }
    }

    /// The identity mapping `p(x) = x` written with `terms` coefficients
    /// (`[0, 1, 0, …]`). With a single term this is the constant `0`.
    pub fn identity(terms: usize) -> Self {
        let mut coefficients = vec![0.0; terms];
        if terms > 1 {
            coefficients[1] = 1.0;
        }
        Self { coefficients }
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn into_coefficients(self) -> Vec<f64> {
        self.coefficients
    }

    /// Polynomial degree (number of coefficients minus one; `0` when empty).
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    pub fn eval(&self, x: f64) -> f64 {
        horner(&self.coefficients, x)
    }

    /// Ordinary linear least-squares fit of a degree-`degree` polynomial to `(x, y)`.
    ///
    /// Needs at least `degree + 1` samples. The Vandermonde columns are
    /// scaled to unit norm before the SVD solve so that wavelengths in
    /// Ångström do not wreck the conditioning.
    pub fn fit(x: &[f64], y: &[f64], degree: usize) -> Result<Self, RegistrationError> {
        check_lengths(x, y)?;
        let terms = degree + 1;
        if x.len() < terms {
            return Err(RegistrationError::Domain(format!(
                "insufficient samples for degree-{degree} fit: found {}, need {terms}",
                x.len()
            )));
        }

        let mut design = DMatrix::from_fn(x.len(), terms, |i, j| x[i].powi(j as i32));
        let scales: Vec<f64> = design
            .column_iter()
            .map(|col| {
                let norm = col.norm();
                if norm > 0.0 && norm.is_finite() {
                    norm
                } else {
                    1.0
                }
            })
            .collect();
        for (j, scale) in scales.iter().enumerate() {
            design.column_mut(j).unscale_mut(*scale);
        }

        let rhs = DVector::from_column_slice(y);
        let svd = design.svd(true, true);
        let eps = 1e-12 * svd.singular_values.max();
        let solution = svd
            .solve(&rhs, eps)
            .map_err(|_| RegistrationError::SingularFit)?;

        let coefficients: Vec<f64> = solution
            .iter()
            .zip(&scales)
            .map(|(c, scale)| c / scale)
            .collect();
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(RegistrationError::SingularFit);
        }
        Ok(Self { coefficients })
    }
}

/// Horner evaluation of ascending-power coefficients.
pub(crate) fn horner(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horner_matches_power_sum() {
        let c = [0.5, -2.0, 3.0];
        for &x in &[-1.5, 0.0, 2.0, 7.25] {
            let direct = c[0] + c[1] * x + c[2] * x * x;
            assert!((horner(&c, x) - direct).abs() < 1e-12);
        }
        assert_eq!(horner(&[], 3.0), 0.0);
    }

    #[test]
    fn identity_has_unit_linear_term() {
        assert_eq!(Polynomial::identity(3).coefficients(), &[0.0, 1.0, 0.0]);
        assert_eq!(Polynomial::identity(2).eval(4.5), 4.5);
        assert_eq!(Polynomial::identity(3).degree(), 2);
    }

    #[test]
    fn fit_recovers_exact_quadratic() {
        let x: Vec<f64> = (0..20).map(|i| 1.0 + i as f64 * 0.05).collect();
        let y: Vec<f64> = x.iter().map(|&v| 0.3 - 1.2 * v + 0.75 * v * v).collect();
        let p = Polynomial::fit(&x, &y, 2).unwrap();
        let expected = [0.3, -1.2, 0.75];
        for (got, want) in p.coefficients().iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "got {got}, want {want}");
        }
    }

    #[test]
    fn fit_handles_angstrom_scale_wavelengths() {
        let x: Vec<f64> = (0..50).map(|i| 4000.0 + i as f64 * 20.0).collect();
        let y: Vec<f64> = x.iter().map(|&v| 2.0 + 1e-4 * v - 1e-8 * v * v).collect();
        let p = Polynomial::fit(&x, &y, 2).unwrap();
        for (&xi, &yi) in x.iter().zip(&y) {
            assert!((p.eval(xi) - yi).abs() < 1e-8);
        }
    }

    #[test]
    fn fit_requires_enough_samples() {
        let err = Polynomial::fit(&[1.0, 2.0], &[1.0, 2.0], 2).unwrap_err();
        assert!(matches!(err, RegistrationError::Domain(_)));
        let err = Polynomial::fit(&[], &[], 0).unwrap_err();
        assert!(matches!(err, RegistrationError::Domain(_)));
    }
}
