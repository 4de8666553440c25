//! Excel workbook renderer.
//!
//! Sheets: latest period, earlier period, then the comparison sheet. Cell
//! values are the unrounded numbers; display rounding is left to the number
//! formats.

use rust_xlsxwriter::{
    Chart, ChartLegendPosition, ChartMarker, ChartMarkerType, ChartPoint, ChartSolidFill,
    ChartType, Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet,
};

use postwatch_recon::model::{PeriodTable, Report};
use postwatch_recon::{Rgb, COMPARISON_SHEET};

use crate::chart::{ChartSpec, EntityColors, PieChart, ReportCharts, ScatterChart};
use crate::error::RenderError;

const PERIOD_WIDTHS: [f64; 3] = [18.0, 12.0, 16.0];
const COMPARISON_WIDTHS: [f64; 7] = [18.0, 14.0, 18.0, 14.0, 20.0, 18.0, 20.0];

/// Charts sit one column right of the table, starting on the second row.
const CHART_ROW: u32 = 1;
const PERIOD_CHART_COL: u16 = 4;
const COMPARISON_CHART_COL: u16 = 8;

const PERCENT_FORMAT: &str = "0.0%";
const SIGNED_COUNT_FORMAT: &str = "+0;-0;0";
const SIGNED_POINTS_FORMAT: &str = "+0.0;-0.0;0.0";

pub fn period_headers() -> [&'static str; 3] {
    ["Party", "Posts", "Election (%)"]
}

pub fn comparison_headers(a: &str, b: &str) -> [String; 7] {
    [
        "Party".to_string(),
        format!("Posts {a}"),
        format!("Election {a} (%)"),
        format!("Posts {b}"),
        format!("Election {b} (%)"),
        format!("Diff Posts ({b}-{a})"),
        "Diff Election (pp)".to_string(),
    ]
}

fn xlsx_color(color: Rgb) -> Color {
    Color::RGB(color.as_u32())
}

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_align(FormatAlign::VerticalCenter)
        .set_border_bottom(FormatBorder::Thin)
}

/// Entity cell: filled with the entity color, text in the contrasting color.
fn entity_format(color: Rgb) -> Format {
    Format::new()
        .set_background_color(xlsx_color(color))
        .set_font_color(xlsx_color(color.contrast_text()))
}

/// Render the workbook to bytes.
pub fn render(report: &Report, charts: &ReportCharts) -> Result<Vec<u8>, RenderError> {
    let mut workbook = Workbook::new();

    for (table, period_charts) in report.periods_latest_first().into_iter().zip(&charts.periods) {
        let worksheet = workbook.add_worksheet().set_name(&table.label)?;
        write_period_sheet(worksheet, table, &charts.colors)?;
        if let ChartSpec::Pie(pie) = &period_charts.posts_pie {
            if !pie.slices.is_empty() {
                ensure_rows(&pie.title, pie.slices.len(), table.rows.len())?;
                let chart = pie_chart(pie, &table.label, table.rows.len());
                worksheet.insert_chart(CHART_ROW, PERIOD_CHART_COL, &chart)?;
            }
        }
    }

    let worksheet = workbook.add_worksheet().set_name(COMPARISON_SHEET)?;
    write_comparison_sheet(worksheet, report, &charts.colors)?;
    if let ChartSpec::Scatter(scatter) = &charts.comparison.delta_scatter {
        if !scatter.points.is_empty() {
            ensure_rows(&scatter.title, scatter.points.len(), report.comparison.len())?;
            let chart = scatter_chart(scatter);
            worksheet.insert_chart(CHART_ROW, COMPARISON_CHART_COL, &chart)?;
        }
    }

    let bytes = workbook.save_to_buffer()?;
    log::debug!("workbook: {} bytes", bytes.len());
    Ok(bytes)
}

/// Workbook charts reference sheet cells, so a chart must cover exactly the
/// rows written.
fn ensure_rows(chart: &str, points: usize, rows: usize) -> Result<(), RenderError> {
    if points == rows {
        return Ok(());
    }
    Err(RenderError::InvalidChart {
        chart: chart.to_string(),
        reason: format!("{points} points for {rows} sheet rows"),
    })
}

fn write_period_sheet(
    worksheet: &mut Worksheet,
    table: &PeriodTable,
    colors: &EntityColors,
) -> Result<(), RenderError> {
    let header = header_format();
    let percent = Format::new().set_num_format(PERCENT_FORMAT);

    for (col, title) in period_headers().iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, &header)?;
    }
    for (col, width) in PERIOD_WIDTHS.iter().enumerate() {
        worksheet.set_column_width(col as u16, *width)?;
    }

    for (idx, row) in table.rows.iter().enumerate() {
        let r = idx as u32 + 1;
        let fill = entity_format(colors.get(&row.entity));
        worksheet.write_string_with_format(r, 0, row.entity.as_str(), &fill)?;
        worksheet.write_number(r, 1, row.posts)?;
        worksheet.write_number_with_format(r, 2, row.election_pct / 100.0, &percent)?;
    }
    Ok(())
}

fn write_comparison_sheet(
    worksheet: &mut Worksheet,
    report: &Report,
    colors: &EntityColors,
) -> Result<(), RenderError> {
    let header = header_format();
    let percent = Format::new().set_num_format(PERCENT_FORMAT);
    let signed_count = Format::new().set_num_format(SIGNED_COUNT_FORMAT);
    let signed_points = Format::new().set_num_format(SIGNED_POINTS_FORMAT);

    let headers = comparison_headers(&report.period_a.label, &report.period_b.label);
    for (col, title) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, title.as_str(), &header)?;
    }
    for (col, width) in COMPARISON_WIDTHS.iter().enumerate() {
        worksheet.set_column_width(col as u16, *width)?;
    }

    for (idx, row) in report.comparison.iter().enumerate() {
        let r = idx as u32 + 1;
        let fill = entity_format(colors.get(&row.entity));
        worksheet.write_string_with_format(r, 0, row.entity.as_str(), &fill)?;
        worksheet.write_number(r, 1, row.posts_a)?;
        worksheet.write_number_with_format(r, 2, row.pct_a / 100.0, &percent)?;
        worksheet.write_number(r, 3, row.posts_b)?;
        worksheet.write_number_with_format(r, 4, row.pct_b / 100.0, &percent)?;
        worksheet.write_number_with_format(r, 5, row.diff_posts, &signed_count)?;
        worksheet.write_number_with_format(r, 6, row.diff_pct, &signed_points)?;
    }
    Ok(())
}

/// Posts pie over the period sheet's own cells, one colored point per slice.
fn pie_chart(spec: &PieChart, sheet: &str, rows: usize) -> Chart {
    let last = rows as u32;
    let points: Vec<ChartPoint> = spec
        .slices
        .iter()
        .map(|s| ChartPoint::new().set_format(ChartSolidFill::new().set_color(xlsx_color(s.color))))
        .collect();

    let mut chart = Chart::new(ChartType::Pie);
    chart.title().set_name(spec.title.as_str());
    chart
        .add_series()
        .set_name((sheet, 0, 1))
        .set_categories((sheet, 1, 0, last, 0))
        .set_values((sheet, 1, 1, last, 1))
        .set_points(&points);
    chart.legend().set_position(ChartLegendPosition::Right);
    chart
}

/// Delta scatter on the comparison sheet: one series per entity so every
/// marker carries the entity color. x is column F, y is column G.
fn scatter_chart(spec: &ScatterChart) -> Chart {
    let mut chart = Chart::new(ChartType::Scatter);
    chart.title().set_name(spec.title.as_str());
    chart.x_axis().set_name(spec.x_axis.as_str());
    chart.y_axis().set_name(spec.y_axis.as_str());

    for (idx, point) in spec.points.iter().enumerate() {
        let r = idx as u32 + 1;
        let fill = xlsx_color(point.color);
        chart
            .add_series()
            .set_name((COMPARISON_SHEET, r, 0))
            .set_categories((COMPARISON_SHEET, r, 5, r, 5))
            .set_values((COMPARISON_SHEET, r, 6, r, 6))
            .set_marker(
                ChartMarker::new()
                    .set_type(ChartMarkerType::Circle)
                    .set_size(9)
                    .set_format(ChartSolidFill::new().set_color(fill)),
            );
    }
    chart.legend().set_position(ChartLegendPosition::Right);
    chart.set_width(640).set_height(400);
    chart
}
