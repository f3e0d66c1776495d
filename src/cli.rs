//! Plumbing behind the `spectral-register` binary: config overrides,
//! reference / comparison selection, and per-pair reporting.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{info, warn};
use serde::Serialize;

use crate::config::{load_config, RegistrationConfig};
use crate::data::filter::{filter_state, filtered_indices, unknown_columns, Selector};
use crate::data::model::{SpectralDataset, Spectrum};
use crate::data::writer::write_spectra;
use crate::register::{register, Registration};

// ---------------------------------------------------------------------------
// Config overrides
// ---------------------------------------------------------------------------

/// Registration settings taken from the command line. Flags win over the
/// config file, which wins over the defaults.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ConfigOverrides {
    /// JSON registration config; command line flags override it.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Initial warp coefficients, ascending powers (e.g. 0,1,0).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub initial: Option<Vec<f64>>,

    /// Degree of the continuum ratio polynomial.
    #[arg(long)]
    pub continuum_degree: Option<usize>,

    /// Only fit the continuum above this wavelength.
    #[arg(long)]
    pub continuum_min_wavelength: Option<f64>,

    /// Skip continuum normalization.
    #[arg(long)]
    pub no_continuum: bool,
}

impl ConfigOverrides {
    /// Load the config file (or defaults) and apply the flags on top.
    pub fn resolve(&self) -> Result<RegistrationConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => RegistrationConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    pub fn apply(&self, config: &mut RegistrationConfig) {
        if let Some(initial) = &self.initial {
            config.initial_warp = initial.clone();
        }
        if let Some(degree) = self.continuum_degree {
            config.continuum.degree = degree;
        }
        if let Some(cutoff) = self.continuum_min_wavelength {
            config.continuum.min_wavelength = Some(cutoff);
        }
        if self.no_continuum {
            config.continuum.enabled = false;
        }
    }
}

// ---------------------------------------------------------------------------
// Pair selection
// ---------------------------------------------------------------------------

/// Row indices of the reference spectrum and of the comparisons to register
/// against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairSelection {
    pub reference: usize,
    pub comparisons: Vec<usize>,
}

/// Pick the reference (first match) and the comparison rows.
///
/// `comparison_set` is `None` when both roles come from one file; the
/// reference row is then never registered against itself.
pub fn select_pairs(
    reference_set: &SpectralDataset,
    comparison_set: Option<&SpectralDataset>,
    reference_select: &[Selector],
    comparison_select: &[Selector],
) -> Result<PairSelection> {
    let reference = select(reference_set, reference_select, "reference")?
        .first()
        .copied()
        .context("no reference spectrum selected")?;

    let mut comparisons = select(
        comparison_set.unwrap_or(reference_set),
        comparison_select,
        "comparison",
    )?;
    if comparison_set.is_none() {
        comparisons.retain(|&i| i != reference);
    }
    if comparisons.is_empty() {
        bail!("no comparison spectra selected");
    }
    Ok(PairSelection {
        reference,
        comparisons,
    })
}

/// Indices of the spectra matching `selectors`, failing on unknown columns
/// or an empty match.
pub fn select(dataset: &SpectralDataset, selectors: &[Selector], role: &str) -> Result<Vec<usize>> {
    let filters = filter_state(selectors);
    let unknown = unknown_columns(dataset, &filters);
    if !unknown.is_empty() {
        bail!(
            "{role} selection uses unknown column(s) {unknown:?}; available: {:?}",
            dataset.column_names
        );
    }
    let indices = filtered_indices(dataset, &filters);
    if indices.is_empty() {
        let wanted: Vec<String> = selectors.iter().map(|s| s.to_string()).collect();
        bail!("no {role} spectrum matches {wanted:?}");
    }
    Ok(indices)
}

// ---------------------------------------------------------------------------
// Registering and reporting
// ---------------------------------------------------------------------------

/// One registered comparison, cleaned the way it was fitted.
#[derive(Debug, Clone)]
pub struct PairOutcome {
    pub index: usize,
    pub comparison: Spectrum,
    pub registration: Registration,
}

#[derive(Debug, Serialize)]
pub struct PairReport<'a> {
    pub reference: String,
    pub comparison: String,
    pub comparison_index: usize,
    #[serde(flatten)]
    pub registration: &'a Registration,
}

/// Register every selected comparison against the reference, in order.
/// Non-finite samples are dropped and wavelengths sorted first.
pub fn register_pairs(
    reference_set: &SpectralDataset,
    comparison_set: Option<&SpectralDataset>,
    selection: &PairSelection,
    config: &RegistrationConfig,
) -> Result<(Spectrum, Vec<PairOutcome>)> {
    let comparison_set = comparison_set.unwrap_or(reference_set);
    let reference = reference_set.spectra[selection.reference].finite().ascending();
    info!(
        "reference {} ({} samples), {} comparison spectra",
        reference.label(),
        reference.len(),
        selection.comparisons.len()
    );

    let mut outcomes = Vec::with_capacity(selection.comparisons.len());
    for &index in &selection.comparisons {
        let comparison = comparison_set.spectra[index].finite().ascending();
        let registration = register(&reference, &comparison, config)
            .with_context(|| format!("registering comparison {index} ({})", comparison.label()))?;
        if !registration.converged() {
            warn!(
                "comparison {index} ({}): optimizer did not converge, reporting best effort",
                comparison.label()
            );
        }
        outcomes.push(PairOutcome {
            index,
            comparison,
            registration,
        });
    }
    Ok((reference, outcomes))
}

pub fn reports<'a>(reference: &Spectrum, outcomes: &'a [PairOutcome]) -> Vec<PairReport<'a>> {
    let reference = reference.label();
    outcomes
        .iter()
        .map(|outcome| PairReport {
            reference: reference.clone(),
            comparison: outcome.comparison.label(),
            comparison_index: outcome.index,
            registration: &outcome.registration,
        })
        .collect()
}

/// Write each comparison with its fitted warp applied to the wavelengths.
pub fn write_corrected(path: &Path, outcomes: &[PairOutcome]) -> Result<()> {
    let corrected: Vec<Spectrum> = outcomes
        .iter()
        .map(|o| o.registration.corrected_comparison(&o.comparison))
        .collect();
    write_spectra(path, &corrected)?;
    info!("wrote {} corrected spectra to {}", corrected.len(), path.display());
    Ok(())
}
