use std::fmt;
use std::str::FromStr;

use postwatch_recon::model::Report;

use crate::chart::ReportCharts;
use crate::error::RenderError;
use crate::{pdf, xlsx};

/// Artifact kinds a report can be rendered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactFormat {
    Workbook,
    Document,
}

impl ArtifactFormat {
    pub const ALL: [ArtifactFormat; 2] = [ArtifactFormat::Workbook, ArtifactFormat::Document];

    pub fn extension(self) -> &'static str {
        match self {
            ArtifactFormat::Workbook => "xlsx",
            ArtifactFormat::Document => "pdf",
        }
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ArtifactFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xlsx" | "workbook" => Ok(ArtifactFormat::Workbook),
            "pdf" | "document" => Ok(ArtifactFormat::Document),
            other => Err(format!("unknown artifact format '{other}' (expected xlsx or pdf)")),
        }
    }
}

/// Render `report` to the bytes of one artifact. Charts are validated first so
/// a bad spec fails the same way for both formats.
pub fn assemble(
    report: &Report,
    charts: &ReportCharts,
    format: ArtifactFormat,
) -> Result<Vec<u8>, RenderError> {
    charts.validate()?;
    let bytes = match format {
        ArtifactFormat::Workbook => xlsx::render(report, charts)?,
        ArtifactFormat::Document => pdf::render(report, charts)?,
    };
    log::debug!("assembled {format}: {} bytes", bytes.len());
    Ok(bytes)
}
