//! `postwatch export`: write the workbook and/or the document.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::Serialize;

use postwatch_io::{assemble, ArtifactFormat, ReportCharts};
use postwatch_recon::config::OutputConfig;

use crate::util::{self, Prepared};
use crate::{CliError, InputArgs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Xlsx,
    Pdf,
    Both,
}

impl FormatArg {
    fn formats(self) -> &'static [ArtifactFormat] {
        match self {
            FormatArg::Xlsx => &[ArtifactFormat::Workbook],
            FormatArg::Pdf => &[ArtifactFormat::Document],
            FormatArg::Both => &ArtifactFormat::ALL,
        }
    }
}

fn file_name(output: &OutputConfig, format: ArtifactFormat) -> &str {
    match format {
        ArtifactFormat::Workbook => &output.workbook,
        ArtifactFormat::Document => &output.document,
    }
}

// ── Summary ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ExportSummary {
    title: String,
    generation: String,
    periods: [String; 2],
    entities: usize,
    issues: usize,
    artifacts: Vec<Artifact>,
}

#[derive(Debug, Serialize)]
struct Artifact {
    format: String,
    path: PathBuf,
    bytes: usize,
    hash: String,
}

// ── Implementation ──────────────────────────────────────────────────

pub fn cmd_export(
    inputs: &InputArgs,
    format: FormatArg,
    out_dir: &Path,
    json: bool,
    quiet: bool,
) -> Result<(), CliError> {
    if out_dir.exists() && !out_dir.is_dir() {
        return Err(CliError::usage(format!("{} is not a directory", out_dir.display())));
    }

    let Prepared { config, resolver, report } = util::prepare(inputs)?;
    let charts = ReportCharts::build(&report, &resolver);

    // Render everything before touching the filesystem.
    let mut rendered = Vec::with_capacity(2);
    for &artifact in format.formats() {
        let bytes = assemble(&report, &charts, artifact)?;
        rendered.push((artifact, bytes));
    }

    std::fs::create_dir_all(out_dir).map_err(|e| {
        CliError::write(format!("cannot create {}: {e}", out_dir.display()))
    })?;

    let mut artifacts = Vec::with_capacity(rendered.len());
    for (artifact, bytes) in rendered {
        let path = out_dir.join(file_name(&config.output, artifact));
        util::write_atomic(&path, &bytes)?;
        let hash = util::sha256_hex(&bytes);
        log::info!("wrote {} ({} bytes, {hash})", path.display(), bytes.len());
        artifacts.push(Artifact {
            format: artifact.to_string(),
            path,
            bytes: bytes.len(),
            hash,
        });
    }

    if json {
        let summary = ExportSummary {
            title: report.title.clone(),
            generation: report.generation.to_string(),
            periods: [report.period_a.label.clone(), report.period_b.label.clone()],
            entities: report.comparison.len(),
            issues: report.issues.len(),
            artifacts,
        };
        let text = serde_json::to_string_pretty(&summary)
            .map_err(|e| CliError::write(format!("JSON error: {e}")))?;
        util::print_line(&text)?;
    } else if !quiet {
        eprintln!(
            "export: {} entities, {} issue(s)",
            report.comparison.len(),
            report.issues.len()
        );
        for artifact in &artifacts {
            eprintln!("  {}", artifact.path.display());
        }
        if !report.issues.is_empty() {
            eprintln!("  run `postwatch inspect` to see the issues");
        }
    }

    Ok(())
}
