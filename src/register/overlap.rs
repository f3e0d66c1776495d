use log::debug;
use serde::Serialize;

use super::error::{check_lengths, RegistrationError};

// ---------------------------------------------------------------------------
// OverlapRegion – common wavelength range of two spectra
// ---------------------------------------------------------------------------

/// The wavelength interval shared by a reference and a comparison spectrum,
/// plus per-spectrum masks of the usable samples inside it.
///
/// A sample is usable when its wavelength lies in `[lo, hi]` (inclusive) and
/// its flux is non-zero; zero flux marks a masked pixel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlapRegion {
    pub lo: f64,
    pub hi: f64,
    #[serde(skip)]
    pub reference_mask: Vec<bool>,
    #[serde(skip)]
    pub comparison_mask: Vec<bool>,
}

impl OverlapRegion {
    /// Compute bounds and masks without judging the result.
    ///
    /// Disjoint spectra give `lo > hi` and all-false masks; use
    /// [`select_overlap`] to turn that into an error.
    pub fn compute(
        reference_wavelength: &[f64],
        reference_flux: &[f64],
        comparison_wavelength: &[f64],
        comparison_flux: &[f64],
    ) -> Result<Self, RegistrationError> {
        check_lengths(reference_wavelength, reference_flux)?;
        check_lengths(comparison_wavelength, comparison_flux)?;

        let (ref_min, ref_max) = min_max(reference_wavelength);
        let (cmp_min, cmp_max) = min_max(comparison_wavelength);
        let lo = ref_min.max(cmp_min);
        let hi = ref_max.min(cmp_max);

        let mask = |w: &[f64], f: &[f64]| -> Vec<bool> {
            w.iter()
                .zip(f)
                .map(|(&wi, &fi)| wi >= lo && wi <= hi && fi != 0.0)
                .collect()
        };

        Ok(Self {
            lo,
            hi,
            reference_mask: mask(reference_wavelength, reference_flux),
            comparison_mask: mask(comparison_wavelength, comparison_flux),
        })
    }

    pub fn reference_count(&self) -> usize {
        self.reference_mask.iter().filter(|&&m| m).count()
    }

    pub fn comparison_count(&self) -> usize {
        self.comparison_mask.iter().filter(|&&m| m).count()
    }

    /// True when either spectrum has no usable sample in the overlap.
    pub fn is_empty(&self) -> bool {
        self.reference_count() == 0 || self.comparison_count() == 0
    }
}

/// Overlap selection that fails with [`RegistrationError::EmptyOverlap`]
/// when the spectra do not overlap or every overlapping sample is masked.
pub fn select_overlap(
    reference_wavelength: &[f64],
    reference_flux: &[f64],
    comparison_wavelength: &[f64],
    comparison_flux: &[f64],
) -> Result<OverlapRegion, RegistrationError> {
    let region = OverlapRegion::compute(
        reference_wavelength,
        reference_flux,
        comparison_wavelength,
        comparison_flux,
    )?;
    debug!(
        "overlap [{}, {}]: {} reference / {} comparison samples",
        region.lo,
        region.hi,
        region.reference_count(),
        region.comparison_count()
    );
    if region.is_empty() {
        return Err(RegistrationError::EmptyOverlap {
            lo: region.lo,
            hi: region.hi,
        });
    }
    Ok(region)
}

/// Keep the entries of `values` whose mask bit is set.
pub fn apply_mask(values: &[f64], mask: &[bool]) -> Vec<f64> {
    values
        .iter()
        .zip(mask)
        .filter(|(_, &keep)| keep)
        .map(|(&v, _)| v)
        .collect()
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_the_intersection() {
        let region = OverlapRegion::compute(
            &[1.0, 2.0, 3.0, 4.0, 5.0],
            &[1.0; 5],
            &[1.1, 2.2, 3.3, 4.4, 5.5],
            &[1.0; 5],
        )
        .unwrap();
        assert_eq!(region.lo, 1.1);
        assert_eq!(region.hi, 5.0);
        assert_eq!(region.reference_mask, vec![false, true, true, true, true]);
        assert_eq!(region.comparison_mask, vec![true, true, true, true, false]);
    }

    #[test]
    fn zero_flux_is_excluded_inside_range() {
        let region = select_overlap(
            &[1.0, 2.0, 3.0, 4.0],
            &[1.0, 0.0, 3.0, 4.0],
            &[1.0, 2.0, 3.0, 4.0],
            &[1.0, 2.0, 0.0, 4.0],
        )
        .unwrap();
        assert_eq!(region.reference_mask, vec![true, false, true, true]);
        assert_eq!(region.comparison_mask, vec![true, true, false, true]);
        assert_eq!(region.reference_count(), 3);
    }

    #[test]
    fn disjoint_ranges_compute_empty_masks() {
        let region =
            OverlapRegion::compute(&[1.0, 2.0], &[1.0, 1.0], &[3.0, 4.0], &[1.0, 1.0]).unwrap();
        assert!(region.lo > region.hi);
        assert!(region.is_empty());
        assert!(region.reference_mask.iter().all(|m| !m));
    }

    #[test]
    fn disjoint_ranges_raise_empty_overlap() {
        let err = select_overlap(&[1.0, 2.0], &[1.0, 1.0], &[3.0, 4.0], &[1.0, 1.0]).unwrap_err();
        assert_eq!(err, RegistrationError::EmptyOverlap { lo: 3.0, hi: 2.0 });
    }

    #[test]
    fn fully_masked_overlap_raises_empty_overlap() {
        let err = select_overlap(&[1.0, 2.0], &[0.0, 0.0], &[1.0, 2.0], &[1.0, 1.0]).unwrap_err();
        assert!(matches!(err, RegistrationError::EmptyOverlap { .. }));
    }

    #[test]
    fn apply_mask_keeps_selected() {
        assert_eq!(apply_mask(&[1.0, 2.0, 3.0], &[true, false, true]), vec![1.0, 3.0]);
    }
}
