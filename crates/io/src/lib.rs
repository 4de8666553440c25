//! `postwatch-io`: chart specs and the two renderers.
//!
//! A [`Report`](postwatch_recon::Report) plus its [`ReportCharts`] becomes
//! either an Excel workbook or a PDF document. Both layouts read the same
//! rows and chart specs, so they never disagree about order or colors.

pub mod assemble;
pub mod chart;
pub mod error;
pub mod format;
pub mod pdf;
pub mod xlsx;

pub use assemble::{assemble, ArtifactFormat};
pub use chart::{ChartBuilder, ChartSpec, ReportCharts};
pub use error::RenderError;
