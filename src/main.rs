use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use spectral_register::cli::{register_pairs, reports, select_pairs, write_corrected, ConfigOverrides};
use spectral_register::data::filter::Selector;
use spectral_register::data::loader::load_file;
use spectral_register::data::writer::write_report;

/// Register comparison spectra against a reference spectrum.
///
/// Prints one JSON report entry per comparison spectrum.
#[derive(Debug, Parser)]
#[command(name = "spectral-register", version, about)]
struct Args {
    /// Reference spectra file (.json, .csv, .parquet).
    reference: PathBuf,

    /// Comparison spectra file. Defaults to the reference file.
    comparison: Option<PathBuf>,

    /// Pick the reference spectrum by metadata (repeatable).
    #[arg(long = "reference-select", value_name = "COL=VAL")]
    reference_select: Vec<Selector>,

    /// Pick comparison spectra by metadata (repeatable).
    #[arg(long = "comparison-select", value_name = "COL=VAL")]
    comparison_select: Vec<Selector>,

    #[command(flatten)]
    overrides: ConfigOverrides,

    /// Write the JSON report here instead of stdout.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Write the wavelength-corrected comparison spectra (.json or .csv).
    #[arg(long)]
    corrected: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = args.overrides.resolve()?;

    let reference_set = load_file(&args.reference)?;
    let comparison_set = match &args.comparison {
        Some(path) => Some(load_file(path)?),
        None => None,
    };

    let selection = select_pairs(
        &reference_set,
        comparison_set.as_ref(),
        &args.reference_select,
        &args.comparison_select,
    )?;
    let (reference, outcomes) =
        register_pairs(&reference_set, comparison_set.as_ref(), &selection, &config)?;

    write_report(args.report.as_deref(), &reports(&reference, &outcomes))?;
    if let Some(path) = &args.corrected {
        write_corrected(path, &outcomes)?;
    }
    Ok(())
}
