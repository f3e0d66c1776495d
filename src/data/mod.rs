//! Data layer: core types, loading, selection and writing.
//!
//! Architecture:
//! ```text
//!  .parquet / .json / .csv
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → SpectralDataset
//!   └──────────┘
//!        │
//!        ▼
//!   ┌───────────────┐
//!   │ SpectralDataset│  Vec<Spectrum>, column index
//!   └───────────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  column=value selectors → spectrum indices
//!   └──────────┘
//!        │
//!        ▼  (registration)
//!   ┌──────────┐
//!   │  writer   │  corrected spectra (.json / .csv), JSON reports
//!   └──────────┘
//! ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod writer;
