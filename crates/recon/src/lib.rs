//! `postwatch-recon`: Normalization and reconciliation of per-party post
//! counts and election results across two periods.
//!
//! Pure engine crate: receives parsed JSON payloads, returns a [`Report`].
//! No CLI or IO dependencies.

pub mod color;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod input;
pub mod model;
pub mod normalize;
pub mod reconcile;

pub use color::Rgb;
pub use config::{DuplicatePolicy, ReportConfig, COMPARISON_SHEET};
pub use engine::build_report;
pub use entity::{Entity, EntityResolver};
pub use error::ReconError;
pub use model::{CanonicalRow, ComparisonRow, Issue, PeriodTable, Report, SchemaGeneration};
pub use normalize::{Normalized, Normalizer, RawSection, SectionKind};
pub use reconcile::{NamedSection, Reconciled, ReconciledPeriods, Reconciler};
