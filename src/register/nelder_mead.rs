//! Derivative-free Nelder-Mead simplex minimizer.
//!
//! Coefficients and defaults follow the common reference implementation
//! (reflection 1, expansion 2, contraction 0.5, shrink 0.5; 5 % initial
//! perturbation, `xatol = fatol = 1e-4`, `200·n` iteration and evaluation caps),
//! so fits behave the way they do in the usual scientific Python tooling.

use log::debug;
use serde::{Deserialize, Serialize};

use super::error::RegistrationError;

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NelderMeadOptions {
    /// Absolute tolerance on the simplex spread in parameter space.
    pub xatol: f64,
    /// Absolute tolerance on the spread of objective values.
    pub fatol: f64,
    /// Iteration cap; `None` means `200 · n`.
    pub max_iterations: Option<usize>,
    /// Objective evaluation cap; `None` means `200 · n`.
    pub max_evaluations: Option<usize>,
    /// Relative perturbation of non-zero coordinates in the initial simplex.
    pub initial_step: f64,
    /// Absolute perturbation of zero coordinates in the initial simplex.
    ///
    /// The default suits unit-scale parameters. A zero quadratic warp term
    /// on an Ångström grid moves wavelengths by `zero_step · λ²`
    /// (thousands of Å at 5000 Å), so the simplex collapses back onto the
    /// starting point and reports convergence there. Pick a step of
    /// roughly `0.1 / λ²` for such a term, or fit a linear warp.
    pub zero_step: f64,
}

impl Default for NelderMeadOptions {
    fn default() -> Self {
        Self {
            xatol: 1e-4,
            fatol: 1e-4,
            max_iterations: None,
            max_evaluations: None,
            initial_step: 0.05,
            zero_step: 0.00025,
        }
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Converged,
    MaxIterations,
    MaxEvaluations,
}

/// What the optimizer reports alongside its best point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerStatus {
    pub converged: bool,
    /// Objective value at the returned point.
    pub objective: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub termination: TerminationReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub status: OptimizerStatus,
}

// ---------------------------------------------------------------------------
// Minimizer
// ---------------------------------------------------------------------------

struct Counted<F> {
    f: F,
    evaluations: usize,
}

impl<F: FnMut(&[f64]) -> f64> Counted<F> {
    fn call(&mut self, x: &[f64]) -> f64 {
        self.evaluations += 1;
        let value = (self.f)(x);
        if value.is_finite() {
            value
        } else {
            f64::INFINITY
        }
    }
}

/// Minimize `f` starting from `x0`.
///
/// Always returns the best vertex found. Hitting an iteration or
/// evaluation cap is reported through [`OptimizerStatus::converged`], never as
/// an error. Non-finite objective values are treated as `+inf`.
pub fn nelder_mead<F>(
    f: F,
    x0: &[f64],
    options: &NelderMeadOptions,
) -> Result<Minimum, RegistrationError>
where
    F: FnMut(&[f64]) -> f64,
{
    let n = x0.len();
    if n == 0 {
        return Err(RegistrationError::InvalidInput(
            "initial guess must have at least one coefficient".to_string(),
        ));
    }
    if x0.iter().any(|v| !v.is_finite()) {
        return Err(RegistrationError::InvalidInput(
            "initial guess contains non-finite values".to_string(),
        ));
    }

    let max_iterations = options.max_iterations.unwrap_or(200 * n);
    let max_evaluations = options.max_evaluations.unwrap_or(200 * n);
    let mut objective = Counted { f, evaluations: 0 };

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(x0.to_vec());
    for k in 0..n {
        let mut vertex = x0.to_vec();
        vertex[k] = if vertex[k] != 0.0 {
            (1.0 + options.initial_step) * vertex[k]
        } else {
            options.zero_step
        };
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| objective.call(v)).collect();
    sort_simplex(&mut simplex, &mut values);

    let mut iterations = 1;
    let mut converged = false;

    while objective.evaluations < max_evaluations && iterations < max_iterations {
        if within_tolerance(&simplex, &values, options) {
            converged = true;
            break;
        }

        let worst = n;
        let centroid = centroid(&simplex[..worst]);

        let reflected = blend(&centroid, &simplex[worst], 1.0 + REFLECTION, -REFLECTION);
        let f_reflected = objective.call(&reflected);
        let mut shrink = false;

        if f_reflected < values[0] {
            let expanded = blend(
                &centroid,
                &simplex[worst],
                1.0 + REFLECTION * EXPANSION,
                -REFLECTION * EXPANSION,
            );
            let f_expanded = objective.call(&expanded);
            if f_expanded < f_reflected {
                simplex[worst] = expanded;
                values[worst] = f_expanded;
            } else {
                simplex[worst] = reflected;
                values[worst] = f_reflected;
            }
        } else if f_reflected < values[worst - 1] {
            simplex[worst] = reflected;
            values[worst] = f_reflected;
        } else if f_reflected < values[worst] {
            // Outside contraction.
            let contracted = blend(
                &centroid,
                &simplex[worst],
                1.0 + CONTRACTION * REFLECTION,
                -CONTRACTION * REFLECTION,
            );
            let f_contracted = objective.call(&contracted);
            if f_contracted <= f_reflected {
                simplex[worst] = contracted;
                values[worst] = f_contracted;
            } else {
                shrink = true;
            }
        } else {
            // Inside contraction.
            let contracted = blend(&centroid, &simplex[worst], 1.0 - CONTRACTION, CONTRACTION);
            let f_contracted = objective.call(&contracted);
            if f_contracted < values[worst] {
                simplex[worst] = contracted;
                values[worst] = f_contracted;
            } else {
                shrink = true;
            }
        }

        if shrink {
            let best = simplex[0].clone();
            for j in 1..=n {
                simplex[j] = blend(&best, &simplex[j], 1.0 - SHRINK, SHRINK);
                values[j] = objective.call(&simplex[j]);
            }
        }

        iterations += 1;
        sort_simplex(&mut simplex, &mut values);
    }

    let termination = if converged {
        TerminationReason::Converged
    } else if objective.evaluations >= max_evaluations {
        TerminationReason::MaxEvaluations
    } else {
        TerminationReason::MaxIterations
    };
    debug!(
        "nelder-mead finished: {termination:?} after {iterations} iterations, {} evaluations, f = {:.6e}",
        objective.evaluations, values[0]
    );

    Ok(Minimum {
        x: simplex.swap_remove(0),
        status: OptimizerStatus {
            converged,
            objective: values[0],
            iterations,
            evaluations: objective.evaluations,
            termination,
        },
    })
}

fn within_tolerance(simplex: &[Vec<f64>], values: &[f64], options: &NelderMeadOptions) -> bool {
    let best = &simplex[0];
    let x_spread = simplex[1..]
        .iter()
        .flat_map(|v| v.iter().zip(best).map(|(a, b)| (a - b).abs()))
        .fold(0.0, f64::max);
    let f_spread = values[1..]
        .iter()
        .map(|v| (v - values[0]).abs())
        .fold(0.0, f64::max);
    // An all-infinite simplex has a NaN spread; it never counts as converged.
    values[0].is_finite() && x_spread <= options.xatol && f_spread <= options.fatol
}

fn centroid(vertices: &[Vec<f64>]) -> Vec<f64> {
    let n = vertices.len() as f64;
    let mut c = vec![0.0; vertices[0].len()];
    for v in vertices {
        for (ci, vi) in c.iter_mut().zip(v) {
            *ci += vi;
        }
    }
    c.iter_mut().for_each(|ci| *ci /= n);
    c
}

/// `a·wa + b·wb`, elementwise.
fn blend(a: &[f64], b: &[f64], wa: f64, wb: f64) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| wa * x + wb * y).collect()
}

fn sort_simplex(simplex: &mut Vec<Vec<f64>>, values: &mut Vec<f64>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    *simplex = order.iter().map(|&i| simplex[i].clone()).collect();
    *values = order.iter().map(|&i| values[i]).collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shifted_bowl(x: &[f64]) -> f64 {
        (x[0] - 1.5).powi(2) + 4.0 * (x[1] + 0.5).powi(2)
    }

    #[test]
    fn minimizes_shifted_quadratic() {
        let result = nelder_mead(shifted_bowl, &[0.0, 0.0], &NelderMeadOptions::default()).unwrap();
        assert!(result.status.converged);
        assert_eq!(result.status.termination, TerminationReason::Converged);
        assert!((result.x[0] - 1.5).abs() < 1e-2, "x0 = {}", result.x[0]);
        assert!((result.x[1] + 0.5).abs() < 1e-2, "x1 = {}", result.x[1]);
        assert!(result.status.objective < 1e-4);
    }

    #[test]
    fn reports_iteration_cap_without_failing() {
        let options = NelderMeadOptions {
            max_iterations: Some(3),
            ..Default::default()
        };
        let result = nelder_mead(shifted_bowl, &[10.0, 10.0], &options).unwrap();
        assert!(!result.status.converged);
        assert_eq!(result.status.termination, TerminationReason::MaxIterations);
        assert_eq!(result.status.iterations, 3);
        assert!(result.status.objective <= shifted_bowl(&[10.0, 10.0]));
    }

    #[test]
    fn reports_evaluation_cap() {
        let options = NelderMeadOptions {
            max_evaluations: Some(5),
            ..Default::default()
        };
        let result = nelder_mead(shifted_bowl, &[10.0, 10.0], &options).unwrap();
        assert!(!result.status.converged);
        assert_eq!(result.status.termination, TerminationReason::MaxEvaluations);
    }

    #[test]
    fn starting_at_minimum_stays_there() {
        let result = nelder_mead(shifted_bowl, &[1.5, -0.5], &NelderMeadOptions::default()).unwrap();
        assert!(result.status.converged);
        assert_eq!(result.x, vec![1.5, -0.5]);
        assert_eq!(result.status.objective, 0.0);
    }

    #[test]
    fn non_finite_objective_is_avoided() {
        let f = |x: &[f64]| {
            if x[0] < 0.0 {
                f64::NAN
            } else {
                (x[0] - 2.0).powi(2)
            }
        };
        let result = nelder_mead(f, &[1.0], &NelderMeadOptions::default()).unwrap();
        assert!(result.status.converged);
        assert!((result.x[0] - 2.0).abs() < 1e-2);
    }

    #[test]
    fn empty_initial_guess_is_rejected() {
        let err = nelder_mead(|_: &[f64]| 0.0, &[], &NelderMeadOptions::default()).unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidInput(_)));
    }
}
