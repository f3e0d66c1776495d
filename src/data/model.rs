use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::register::error::{check_lengths, RegistrationError};

// ---------------------------------------------------------------------------
// MetadataValue – a single cell in a metadata column
// ---------------------------------------------------------------------------

/// A dynamically-typed metadata value (instrument, extraction region, exposure, …).
/// Using `BTreeMap` / `BTreeSet` downstream so `MetadataValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord so we can put MetadataValue in BTreeSet --

impl Eq for MetadataValue {}

impl PartialOrd for MetadataValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MetadataValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use MetadataValue::*;
        fn discriminant(v: &MetadataValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for MetadataValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            MetadataValue::String(s) => s.hash(state),
            MetadataValue::Integer(i) => i.hash(state),
            MetadataValue::Float(f) => f.to_bits().hash(state),
            MetadataValue::Bool(b) => b.hash(state),
            MetadataValue::Null => {}
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v:.4}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Null => write!(f, "<null>"),
        }
    }
}

// ---------------------------------------------------------------------------
// Spectrum – one row of the source table
// ---------------------------------------------------------------------------

/// A single 1-D spectrum: flux sampled on a wavelength grid.
///
/// Wavelength and flux always have the same length; [`Spectrum::new`] checks it.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    wavelength: Vec<f64>,
    flux: Vec<f64>,
    /// Dynamic metadata columns: column_name → value.
    pub metadata: BTreeMap<String, MetadataValue>,
}

impl Spectrum {
    pub fn new(wavelength: Vec<f64>, flux: Vec<f64>) -> Result<Self, RegistrationError> {
        check_lengths(&wavelength, &flux)?;
        Ok(Spectrum {
            wavelength,
            flux,
            metadata: BTreeMap::new(),
        })
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, MetadataValue>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn wavelength(&self) -> &[f64] {
        &self.wavelength
    }

    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }

    /// Same flux and metadata on a new wavelength grid of the same length.
    pub(crate) fn with_wavelength(&self, wavelength: Vec<f64>) -> Self {
        debug_assert_eq!(wavelength.len(), self.flux.len());
        Spectrum {
            wavelength,
            flux: self.flux.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// Drop samples whose wavelength or flux is NaN / infinite.
    pub fn finite(&self) -> Self {
        let (wavelength, flux) = self
            .wavelength
            .iter()
            .zip(&self.flux)
            .filter(|(w, f)| w.is_finite() && f.is_finite())
            .map(|(&w, &f)| (w, f))
            .unzip();
        Spectrum {
            wavelength,
            flux,
            metadata: self.metadata.clone(),
        }
    }

    /// Samples reordered by increasing wavelength (files often store
    /// descending grids).
    pub fn ascending(&self) -> Self {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| self.wavelength[a].total_cmp(&self.wavelength[b]));
        Spectrum {
            wavelength: order.iter().map(|&i| self.wavelength[i]).collect(),
            flux: order.iter().map(|&i| self.flux[i]).collect(),
            metadata: self.metadata.clone(),
        }
    }

    /// Short human-readable name built from the metadata.
    pub fn label(&self) -> String {
        if self.metadata.is_empty() {
            return "<unnamed>".to_string();
        }
        self.metadata
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

// ---------------------------------------------------------------------------
// SpectralDataset – every spectrum in one file
// ---------------------------------------------------------------------------

/// The full parsed dataset with pre-computed column indices.
#[derive(Debug, Clone)]
pub struct SpectralDataset {
    /// All spectra (rows).
    pub spectra: Vec<Spectrum>,
    /// Ordered list of metadata column names (excludes wavelength, flux).
    pub column_names: Vec<String>,
    /// For each metadata column the sorted set of unique values.
    pub unique_values: BTreeMap<String, BTreeSet<MetadataValue>>,
}

impl SpectralDataset {
    /// Build column indices from the loaded spectra.
    pub fn from_spectra(spectra: Vec<Spectrum>) -> Self {
        let mut column_names_set: BTreeSet<String> = BTreeSet::new();
        let mut unique_values: BTreeMap<String, BTreeSet<MetadataValue>> = BTreeMap::new();

        for sp in &spectra {
            for (col, val) in &sp.metadata {
                column_names_set.insert(col.clone());
                unique_values
                    .entry(col.clone())
                    .or_default()
                    .insert(val.clone());
            }
        }
        let column_names: Vec<String> = column_names_set.into_iter().collect();
        SpectralDataset {
            spectra,
            column_names,
            unique_values,
        }
    }

    /// Number of spectra.
    pub fn len(&self) -> usize {
        self.spectra.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.spectra.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_length_mismatch() {
        let err = Spectrum::new(vec![1.0, 2.0], vec![1.0]).unwrap_err();
        assert_eq!(
            err,
            RegistrationError::LengthMismatch {
                wavelength: 2,
                flux: 1
            }
        );
    }

    #[test]
    fn finite_drops_nan_samples() {
        let sp = Spectrum::new(vec![1.0, f64::NAN, 3.0, 4.0], vec![1.0, 2.0, f64::INFINITY, 4.0])
            .unwrap()
            .finite();
        assert_eq!(sp.wavelength(), &[1.0, 4.0]);
        assert_eq!(sp.flux(), &[1.0, 4.0]);
    }

    #[test]
    fn ascending_reorders_descending_grid() {
        let sp = Spectrum::new(vec![3.0, 2.0, 1.0], vec![30.0, 20.0, 10.0])
            .unwrap()
            .ascending();
        assert_eq!(sp.wavelength(), &[1.0, 2.0, 3.0]);
        assert_eq!(sp.flux(), &[10.0, 20.0, 30.0]);
    }

    #[test]
    fn label_joins_metadata() {
        let mut meta = BTreeMap::new();
        meta.insert("region".to_string(), MetadataValue::String("A".into()));
        meta.insert("exposure".to_string(), MetadataValue::Integer(3));
        let sp = Spectrum::new(vec![1.0], vec![1.0]).unwrap().with_metadata(meta);
        assert_eq!(sp.label(), "exposure=3,region=A");
        assert_eq!(Spectrum::new(vec![], vec![]).unwrap().label(), "<unnamed>");
    }

    #[test]
    fn dataset_indexes_unique_values() {
        let rows = ["A", "B", "A"]
            .iter()
            .map(|r| {
                let mut meta = BTreeMap::new();
                meta.insert("region".to_string(), MetadataValue::String(r.to_string()));
                Spectrum::new(vec![1.0], vec![1.0]).unwrap().with_metadata(meta)
            })
            .collect();
        let ds = SpectralDataset::from_spectra(rows);
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.column_names, vec!["region".to_string()]);
        assert_eq!(ds.unique_values["region"].len(), 2);
    }
}
