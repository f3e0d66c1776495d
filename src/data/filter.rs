use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::loader::guess_metadata_type;
use super::model::{MetadataValue, SpectralDataset};

// ---------------------------------------------------------------------------
// Selector: one `column=value` predicate from the command line
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    pub column: String,
    pub value: MetadataValue,
}

impl FromStr for Selector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (column, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected COLUMN=VALUE, got '{s}'"))?;
        let column = column.trim();
        if column.is_empty() {
            return Err(format!("empty column name in '{s}'"));
        }
        Ok(Selector {
            column: column.to_string(),
            value: guess_metadata_type(value.trim()),
        })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.column, self.value)
    }
}

// ---------------------------------------------------------------------------
// Filter predicate: which values are accepted per column
// ---------------------------------------------------------------------------

/// Per-column selection state: maps column_name → set of accepted values.
/// Columns without an entry are not constrained.
pub type FilterState = BTreeMap<String, BTreeSet<MetadataValue>>;

/// Group selectors by column. Several selectors on one column accept any of
/// their values; selectors on different columns must all match.
pub fn filter_state(selectors: &[Selector]) -> FilterState {
    let mut state = FilterState::new();
    for sel in selectors {
        state
            .entry(sel.column.clone())
            .or_default()
            .insert(sel.value.clone());
    }
    state
}

/// Columns named in `filters` that the dataset does not have.
pub fn unknown_columns<'a>(dataset: &SpectralDataset, filters: &'a FilterState) -> Vec<&'a str> {
    filters
        .keys()
        .filter(|col| !dataset.unique_values.contains_key(*col))
        .map(|col| col.as_str())
        .collect()
}

/// Return indices of spectra that pass all active filters.
///
/// A spectrum passes a column filter when:
/// * The column is not present in `filters` → passes (no constraint)
/// * The filter set for that column is empty → nothing selected → fails
/// * The spectrum's value for that column is in the selected set → passes
/// * The spectrum lacks the column → passes only if `Null` is selected
pub fn filtered_indices(dataset: &SpectralDataset, filters: &FilterState) -> Vec<usize> {
    dataset
        .spectra
        .iter()
        .enumerate()
        .filter(|(_, sp)| {
            for (col, selected) in filters {
                if selected.is_empty() {
                    return false;
                }
                match sp.metadata.get(col) {
                    Some(val) => {
                        if !selected.contains(val) {
                            return false;
                        }
                    }
                    None => {
                        // spectrum doesn't have this column → include only if Null is selected
                        if !selected.contains(&MetadataValue::Null) {
                            return false;
                        }
                    }
                }
            }
            true
        })
        .map(|(i, _)| i)
        .collect()
}
