//! Chart rasters.
//!
//! plotters paints the shapes of a chart (wedges, bars, markers, grid) into
//! an RGB buffer that the document embeds as an image. Text never goes into
//! the raster: titles, tick labels and legend entries come back as
//! [`Label`]s and are set in Helvetica on top of the image, so they stay
//! selectable and use the same faces as the tables.

use std::f64::consts::{FRAC_PI_2, TAU};
use std::ops::Range;

use plotters::coord::ranged1d::Ranged;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::drawing::DrawingArea;
use plotters::prelude::*;

use postwatch_recon::Rgb;

use super::canvas::Align;
use super::font::Font;
use crate::chart::{ChartSpec, GroupedBarChart, PieChart, ScatterChart};
use crate::error::RenderError;
use crate::format;

/// Pixels per PDF point.
pub const SCALE: f32 = 2.0;

const TITLE_SIZE: f32 = 11.0;
const TITLE_BAND: f32 = 20.0;
const LABEL_SIZE: f32 = 7.0;
const LEGEND_SIZE: f32 = 8.0;
const LEGEND_ROW: f32 = 12.0;
const SWATCH: f32 = 8.0;

const AXIS: Rgb = Rgb::from_hex(0x333333);
const GRID: Rgb = Rgb::from_hex(0xCCCCCC);
const ZERO_LINE: Rgb = Rgb::from_hex(0x666666);
const MUTED: Rgb = Rgb::from_hex(0x9CA3AF);

/// Slices smaller than this share get no percentage label.
const MIN_LABELLED_SHARE: f64 = 0.04;
/// Upper bound on value axis ticks.
const TICKS: usize = 6;
/// Largest angle between two points of a wedge outline.
const ARC_STEP: f64 = TAU / 180.0;

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Uncompressed 8-bit RGB pixels, row-major from the top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Text to set over a raster.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub font: Font,
    pub size: f32,
    pub color: Rgb,
    pub align: Align,
    /// Baseline anchor in raster pixels, origin top-left. For vertical
    /// labels this is the center of the run.
    pub at: (i32, i32),
    pub vertical: bool,
}

impl Label {
    fn new(text: impl Into<String>, at: (i32, i32), size: f32) -> Self {
        Self {
            text: text.into(),
            font: Font::Regular,
            size,
            color: Rgb::BLACK,
            align: Align::Left,
            at,
            vertical: false,
        }
    }

    fn bold(mut self) -> Self {
        self.font = Font::Bold;
        self
    }

    fn color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    fn vertical(mut self) -> Self {
        self.vertical = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartImage {
    pub raster: Raster,
    pub labels: Vec<Label>,
}

fn px(points: f32) -> i32 {
    (points * SCALE).round() as i32
}

fn rgb(color: Rgb) -> RGBColor {
    RGBColor(color.r(), color.g(), color.b())
}

/// Pixel box, top-left inclusive, bottom-right exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
}

impl Frame {
    fn width(&self) -> i32 {
        (self.x1 - self.x0).max(0)
    }

    fn height(&self) -> i32 {
        (self.y1 - self.y0).max(0)
    }

    fn center(&self) -> (i32, i32) {
        ((self.x0 + self.x1) / 2, (self.y0 + self.y1) / 2)
    }

    /// Shrink by margins given in points.
    fn inset(&self, left: f32, top: f32, right: f32, bottom: f32) -> Frame {
        let x0 = self.x0 + px(left);
        let y0 = self.y0 + px(top);
        Frame {
            x0,
            y0,
            x1: (self.x1 - px(right)).max(x0),
            y1: (self.y1 - px(bottom)).max(y0),
        }
    }

    fn area<'a>(&self, root: &Area<'a>) -> Area<'a> {
        root.clone()
            .shrink((self.x0, self.y0), (self.width() as u32, self.height() as u32))
    }
}

/// Rasterize `spec` for a box of `width` x `height` points.
pub fn render(spec: &ChartSpec, width: f32, height: f32) -> Result<ChartImage, RenderError> {
    let size = (
        ((width * SCALE).round() as u32).max(1),
        ((height * SCALE).round() as u32).max(1),
    );
    let mut pixels = vec![0u8; size.0 as usize * size.1 as usize * 3];
    let mut labels = Vec::new();

    {
        let root = BitMapBackend::with_buffer(&mut pixels, size).into_drawing_area();
        root.fill(&WHITE)?;
        let plot = title(spec.title(), size, &mut labels);
        match spec {
            ChartSpec::Pie(c) => pie(&root, c, plot, &mut labels)?,
            ChartSpec::GroupedBar(c) => grouped_bar(&root, c, plot, &mut labels)?,
            ChartSpec::Scatter(c) => scatter(&root, c, plot, &mut labels)?,
        }
        root.present()?;
    }

    Ok(ChartImage {
        raster: Raster {
            width: size.0,
            height: size.1,
            pixels,
        },
        labels,
    })
}

fn title(text: &str, size: (u32, u32), labels: &mut Vec<Label>) -> Frame {
    let width = size.0 as i32;
    let text = Font::Bold.truncate(text, TITLE_SIZE, width as f32 / SCALE);
    labels.push(Label::new(text, (width / 2, px(13.0)), TITLE_SIZE).bold().align(Align::Center));
    Frame {
        x0: 0,
        y0: px(TITLE_BAND),
        x1: width,
        y1: size.1 as i32,
    }
}

fn no_data(plot: Frame, labels: &mut Vec<Label>) {
    labels.push(
        Label::new("Keine Daten", plot.center(), LEGEND_SIZE)
            .color(MUTED)
            .align(Align::Center),
    );
}

/// Legend rows from the top of `frame`; stops when out of room.
fn legend<'a>(
    root: &Area,
    entries: impl Iterator<Item = (&'a str, Rgb)>,
    frame: Frame,
    labels: &mut Vec<Label>,
) -> Result<(), RenderError> {
    let text_width = (frame.width() - px(SWATCH + 4.0)) as f32 / SCALE;
    let mut top = frame.y0;
    for (label, color) in entries {
        if top + px(LEGEND_ROW) > frame.y1 {
            break;
        }
        let swatch_top = top + px(2.0);
        let swatch_bottom = swatch_top + px(SWATCH);
        root.draw(&Rectangle::new(
            [(frame.x0, swatch_top), (frame.x0 + px(SWATCH), swatch_bottom)],
            rgb(color).filled(),
        ))?;
        let text = Font::Regular.truncate(label, LEGEND_SIZE, text_width.max(0.0));
        labels.push(Label::new(text, (frame.x0 + px(SWATCH + 4.0), swatch_bottom - px(1.0)), LEGEND_SIZE));
        top += px(LEGEND_ROW);
    }
    Ok(())
}

fn tick_label(value: f64, step: f64) -> String {
    if step >= 1.0 && value.fract().abs() < 1e-9 {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value)
    }
}

/// Nice tick positions inside `range`, with the distance between them.
fn ticks(range: &Range<f64>) -> (Vec<f64>, f64) {
    let points = RangedCoordf64::from(range.clone()).key_points(TICKS);
    let step = match points.as_slice() {
        [a, b, ..] => b - a,
        _ => 1.0,
    };
    (points, step)
}

// ---------------------------------------------------------------------------
// Pie
// ---------------------------------------------------------------------------

fn on_circle(center: (i32, i32), radius: f64, angle: f64) -> (i32, i32) {
    (
        center.0 + (radius * angle.cos()).round() as i32,
        center.1 - (radius * angle.sin()).round() as i32,
    )
}

/// Closed outline of a wedge sweeping counter-clockwise from `start`.
fn wedge(center: (i32, i32), radius: f64, start: f64, sweep: f64) -> Vec<(i32, i32)> {
    let steps = ((sweep / ARC_STEP).ceil() as usize).max(1);
    let full = sweep >= TAU - 1e-9;
    let mut points = Vec::with_capacity(steps + 3);
    if !full {
        points.push(center);
    }
    points.extend((0..=steps).map(|i| on_circle(center, radius, start + sweep * i as f64 / steps as f64)));
    if !full {
        points.push(center);
    }
    points
}

fn pie(root: &Area, spec: &PieChart, plot: Frame, labels: &mut Vec<Label>) -> Result<(), RenderError> {
    let total: f64 = spec.slices.iter().map(|s| s.value.max(0.0)).sum();
    if total <= 0.0 {
        no_data(plot, labels);
        return Ok(());
    }

    let legend_w = px((plot.width() as f32 / SCALE * 0.35).min(110.0));
    let pie_frame = Frame { x1: plot.x1 - legend_w, ..plot };
    let radius = (pie_frame.width().min(pie_frame.height()) as f64 / 2.0 - px(4.0) as f64).max(0.0);
    let center = pie_frame.center();

    // twelve o'clock, counter-clockwise
    let mut angle = FRAC_PI_2;
    for slice in &spec.slices {
        let share = slice.value.max(0.0) / total;
        if share <= 0.0 {
            continue;
        }
        let sweep = share * TAU;
        let outline = wedge(center, radius, angle, sweep);
        root.draw(&Polygon::new(outline.clone(), rgb(slice.color).filled()))?;
        root.draw(&PathElement::new(outline, WHITE.stroke_width(px(0.75) as u32)))?;

        if share >= MIN_LABELLED_SHARE {
            let (x, y) = on_circle(center, radius * 0.65, angle + sweep / 2.0);
            labels.push(
                Label::new(format::percent(share * 100.0), (x, y + px(LABEL_SIZE / 3.0)), LABEL_SIZE)
                    .color(slice.color.contrast_text())
                    .align(Align::Center),
            );
        }
        angle += sweep;
    }

    let legend_frame = Frame {
        x0: pie_frame.x1 + px(4.0),
        y1: plot.y1 - px(6.0),
        ..plot
    };
    legend(root, spec.slices.iter().map(|s| (s.label.as_str(), s.color)), legend_frame, labels)
}

// ---------------------------------------------------------------------------
// Grouped bars
// ---------------------------------------------------------------------------

/// Value range from 0 with room for the labels above the tallest bar.
fn bar_range(max: f64) -> Range<f64> {
    if max > 0.0 && max.is_finite() {
        0.0..max * 1.1
    } else {
        0.0..1.0
    }
}

fn grouped_bar(root: &Area, spec: &GroupedBarChart, plot: Frame, labels: &mut Vec<Label>) -> Result<(), RenderError> {
    if spec.categories.is_empty() || spec.series.is_empty() {
        no_data(plot, labels);
        return Ok(());
    }

    // legend band on top, one entry per series
    let legend_h = LEGEND_ROW * spec.series.len().min(4) as f32;
    let legend_color = spec.categories.first().map(|c| c.color).unwrap_or(MUTED);
    legend(
        root,
        spec.series.iter().map(|s| (s.name.as_str(), legend_color.tint(s.opacity))),
        Frame {
            x0: plot.x1 - px(150.0),
            y1: plot.y0 + px(legend_h),
            ..plot
        },
        labels,
    )?;

    let frame = plot.inset(38.0, legend_h + 6.0, 8.0, 34.0);
    let n = spec.categories.len() as f64;
    let y_range = bar_range(spec.max_value());
    let (y_ticks, y_step) = ticks(&y_range);
    let top = y_range.end;

    let area = frame.area(root);
    let mut chart = ChartBuilder::on(&area).build_cartesian_2d(0.0..n, y_range)?;

    chart.draw_series(
        y_ticks
            .iter()
            .map(|&t| PathElement::new(vec![(0.0, t), (n, t)], rgb(GRID).stroke_width(1))),
    )?;

    let group = 0.8;
    let bar_w = group / spec.series.len() as f64;
    let slot_pts = frame.width() as f32 / SCALE / n as f32;

    for (ci, category) in spec.categories.iter().enumerate() {
        let group_x = ci as f64 + (1.0 - group) / 2.0;
        for (si, series) in spec.series.iter().enumerate() {
            let value = series.values.get(ci).copied().unwrap_or(0.0).max(0.0);
            let x0 = group_x + bar_w * si as f64;
            let x1 = x0 + bar_w;
            if value > 0.0 {
                let corners = [(x0, 0.0), (x1, value)];
                chart.draw_series([
                    Rectangle::new(corners, rgb(category.color.tint(series.opacity)).filled()),
                    Rectangle::new(corners, rgb(category.color).stroke_width(1)),
                ])?;
            }
            if let Some(text) = series.value_labels.get(ci) {
                let (x, y) = chart.backend_coord(&((x0 + x1) / 2.0, value));
                labels.push(Label::new(text.clone(), (x, y - px(2.0)), 6.0).align(Align::Center));
            }
        }

        let (x, y) = chart.backend_coord(&(ci as f64 + 0.5, 0.0));
        let text = Font::Regular.truncate(&category.label, LABEL_SIZE, (slot_pts - 2.0).max(0.0));
        labels.push(Label::new(text, (x, y + px(10.0)), LABEL_SIZE).align(Align::Center));
    }

    chart.draw_series([
        PathElement::new(vec![(0.0, 0.0), (0.0, top)], rgb(AXIS).stroke_width(1)),
        PathElement::new(vec![(0.0, 0.0), (n, 0.0)], rgb(AXIS).stroke_width(2)),
    ])?;

    for &t in &y_ticks {
        let (x, y) = chart.backend_coord(&(0.0, t));
        labels.push(
            Label::new(tick_label(t, y_step), (x - px(4.0), y + px(2.5)), LABEL_SIZE)
                .color(AXIS)
                .align(Align::Right),
        );
    }
    if !spec.y_axis.is_empty() {
        let at = (frame.x0 - px(28.0), frame.center().1);
        labels.push(Label::new(spec.y_axis.clone(), at, LABEL_SIZE).color(AXIS).vertical());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Scatter
// ---------------------------------------------------------------------------

/// Range covering `values` and 0, padded by a tenth of the span on both sides.
fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo == hi {
        return -1.0..1.0;
    }
    let pad = (hi - lo) * 0.1;
    (lo - pad)..(hi + pad)
}

fn scatter(root: &Area, spec: &ScatterChart, plot: Frame, labels: &mut Vec<Label>) -> Result<(), RenderError> {
    if spec.points.is_empty() {
        no_data(plot, labels);
        return Ok(());
    }

    let legend_w = 110.0;
    let frame = plot.inset(44.0, 6.0, legend_w + 10.0, 30.0);
    let x_range = padded_range(spec.points.iter().map(|p| p.x));
    let y_range = padded_range(spec.points.iter().map(|p| p.y));
    let (x_ticks, x_step) = ticks(&x_range);
    let (y_ticks, y_step) = ticks(&y_range);
    let (x_lo, x_hi) = (x_range.start, x_range.end);
    let (y_lo, y_hi) = (y_range.start, y_range.end);

    let area = frame.area(root);
    let mut chart = ChartBuilder::on(&area).build_cartesian_2d(x_range, y_range)?;

    let grid = rgb(GRID).stroke_width(1);
    chart.draw_series(x_ticks.iter().map(|&t| PathElement::new(vec![(t, y_lo), (t, y_hi)], grid)))?;
    chart.draw_series(y_ticks.iter().map(|&t| PathElement::new(vec![(x_lo, t), (x_hi, t)], grid)))?;

    // zero reference lines
    let zero = rgb(ZERO_LINE).stroke_width(px(1.5) as u32);
    chart.draw_series([
        PathElement::new(vec![(0.0, y_lo), (0.0, y_hi)], zero),
        PathElement::new(vec![(x_lo, 0.0), (x_hi, 0.0)], zero),
    ])?;
    chart.draw_series([Rectangle::new([(x_lo, y_lo), (x_hi, y_hi)], rgb(AXIS).stroke_width(1))])?;

    let marker = px(4.5);
    for point in &spec.points {
        chart.draw_series([
            Circle::new((point.x, point.y), marker, rgb(point.color).filled()),
            Circle::new((point.x, point.y), marker, rgb(point.color.contrast_text()).stroke_width(1)),
        ])?;
        let (x, y) = chart.backend_coord(&(point.x, point.y));
        labels.push(Label::new(point.label.clone(), (x + px(6.0), y - px(3.0)), 6.5));
    }

    for &t in &x_ticks {
        let (x, y) = chart.backend_coord(&(t, y_lo));
        labels.push(
            Label::new(tick_label(t, x_step), (x, y + px(10.0)), LABEL_SIZE)
                .color(AXIS)
                .align(Align::Center),
        );
    }
    for &t in &y_ticks {
        let (x, y) = chart.backend_coord(&(x_lo, t));
        labels.push(
            Label::new(tick_label(t, y_step), (x - px(4.0), y + px(2.5)), LABEL_SIZE)
                .color(AXIS)
                .align(Align::Right),
        );
    }

    let (cx, cy) = frame.center();
    labels.push(
        Label::new(spec.x_axis.clone(), (cx, frame.y1 + px(24.0)), LABEL_SIZE + 1.0)
            .color(AXIS)
            .align(Align::Center),
    );
    labels.push(
        Label::new(spec.y_axis.clone(), (frame.x0 - px(34.0), cy), LABEL_SIZE + 1.0)
            .color(AXIS)
            .vertical(),
    );

    let legend_frame = Frame {
        x0: frame.x1 + px(10.0),
        x1: frame.x1 + px(10.0 + legend_w),
        ..frame
    };
    legend(root, spec.points.iter().map(|p| (p.label.as_str(), p.color)), legend_frame, labels)
}
