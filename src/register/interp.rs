use std::borrow::Cow;

use super::error::{check_lengths, RegistrationError};

// ---------------------------------------------------------------------------
// 1-D linear interpolation with linear extrapolation
// ---------------------------------------------------------------------------

/// Piecewise-linear interpolation of the samples `(x, y)` at the points `xq`.
///
/// Queries outside `[min x, max x]` are extrapolated along the first or last
/// segment. `x` does not need to be sorted: warped wavelength grids may fold
/// over during optimization, so unsorted input is ordered first.
pub fn interp_linear(x: &[f64], y: &[f64], xq: &[f64]) -> Result<Vec<f64>, RegistrationError> {
    check_lengths(x, y)?;
    if x.len() < 2 {
        return Err(RegistrationError::InvalidInput(format!(
            "linear interpolation needs at least two samples, got {}",
            x.len()
        )));
    }

    let (xs, ys) = sorted_pairs(x, y);
    Ok(xq.iter().map(|&q| eval_sorted(&xs, &ys, q)).collect())
}

/// Return `(x, y)` ordered by increasing `x`, borrowing when already sorted.
fn sorted_pairs<'a>(x: &'a [f64], y: &'a [f64]) -> (Cow<'a, [f64]>, Cow<'a, [f64]>) {
    if x.windows(2).all(|w| w[0] <= w[1]) {
        return (Cow::Borrowed(x), Cow::Borrowed(y));
    }
    let mut order: Vec<usize> = (0..x.len()).collect();
    order.sort_by(|&a, &b| x[a].total_cmp(&x[b]));
    let xs = order.iter().map(|&i| x[i]).collect::<Vec<_>>();
    let ys = order.iter().map(|&i| y[i]).collect::<Vec<_>>();
    (Cow::Owned(xs), Cow::Owned(ys))
}

fn eval_sorted(xs: &[f64], ys: &[f64], q: f64) -> f64 {
    let n = xs.len();
    // Index of the segment [i, i + 1] used for q; end segments extrapolate.
    let upper = xs.partition_point(|&v| v <= q).clamp(1, n - 1);
    let i = upper - 1;
    let dx = xs[i + 1] - xs[i];
    if dx == 0.0 {
        return ys[i];
    }
    let t = (q - xs[i]) / dx;
    ys[i] + t * (ys[i + 1] - ys[i])
}
