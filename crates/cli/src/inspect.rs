//! `postwatch inspect`: the reconciled report as JSON on stdout.

use serde::Serialize;

use postwatch_io::ReportCharts;
use postwatch_recon::model::Report;

use crate::util::{self, Prepared};
use crate::{CliError, InputArgs};

#[derive(Serialize)]
struct InspectOutput<'a> {
    #[serde(flatten)]
    report: &'a Report,
    #[serde(skip_serializing_if = "Option::is_none")]
    charts: Option<ReportCharts>,
}

pub fn cmd_inspect(inputs: &InputArgs, with_charts: bool) -> Result<(), CliError> {
    let Prepared { resolver, report, .. } = util::prepare(inputs)?;
    let charts = with_charts.then(|| ReportCharts::build(&report, &resolver));

    let output = InspectOutput { report: &report, charts };
    let text = serde_json::to_string_pretty(&output)
        .map_err(|e| CliError::write(format!("JSON error: {e}")))?;
    util::print_line(&text)
}
