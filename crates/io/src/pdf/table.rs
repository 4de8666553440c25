use postwatch_recon::model::{ComparisonRow, PeriodTable};
use postwatch_recon::Rgb;

use super::canvas::{Align, Canvas, Rect};
use super::font::Font;
use crate::chart::EntityColors;
use crate::format;

pub const HEADER_HEIGHT: f32 = 22.0;
pub const ROW_HEIGHT: f32 = 17.0;

const HEADER_SIZE: f32 = 10.0;
const BODY_SIZE: f32 = 9.5;
const PADDING: f32 = 5.0;

const HEADER_FILL: Rgb = Rgb::from_hex(0x808080);
const HEADER_TEXT: Rgb = Rgb::from_hex(0xF5F5F5);
const BODY_FILL: Rgb = Rgb::from_hex(0xF5F5DC);
const GRID: Rgb = Rgb::BLACK;

/// A table ready to draw. The first column holds the entity and is filled
/// with its color; the other columns are right-aligned numbers.
#[derive(Debug, Clone)]
pub struct TableBlock {
    pub headers: Vec<String>,
    pub widths: Vec<f32>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone)]
pub struct TableRow {
    pub cells: Vec<String>,
    pub fill: Rgb,
}

impl TableBlock {
    pub fn width(&self) -> f32 {
        self.widths.iter().sum()
    }

    /// Draw the header with its top edge at `top`.
    pub fn draw_header(&self, canvas: &mut Canvas, x: f32, top: f32) {
        let row = Rect::new(x, top - HEADER_HEIGHT, self.width(), HEADER_HEIGHT);
        canvas.fill_rect(row, HEADER_FILL);
        canvas.fill_color(HEADER_TEXT);
        let mut cx = x;
        for (title, w) in self.headers.iter().zip(&self.widths) {
            let text = Font::Bold.truncate(title, HEADER_SIZE, w - 2.0 * PADDING);
            canvas.text(Font::Bold, HEADER_SIZE, cx + w / 2.0, row.y + 7.0, &text, Align::Center);
            cx += w;
        }
        self.grid(canvas, row);
    }

    /// Draw one body row with its top edge at `top`.
    pub fn draw_row(&self, canvas: &mut Canvas, row: &TableRow, x: f32, top: f32) {
        let rect = Rect::new(x, top - ROW_HEIGHT, self.width(), ROW_HEIGHT);
        canvas.fill_rect(rect, BODY_FILL);

        let first = self.widths.first().copied().unwrap_or(0.0);
        canvas.fill_rect(Rect::new(x, rect.y, first, ROW_HEIGHT), row.fill);

        let baseline = rect.y + 5.0;
        let mut cx = x;
        for (col, (cell, w)) in row.cells.iter().zip(&self.widths).enumerate() {
            let text = Font::Regular.truncate(cell, BODY_SIZE, w - 2.0 * PADDING);
            if col == 0 {
                canvas.fill_color(row.fill.contrast_text());
                canvas.text(Font::Regular, BODY_SIZE, cx + PADDING, baseline, &text, Align::Left);
            } else {
                canvas.fill_color(Rgb::BLACK);
                canvas.text(Font::Regular, BODY_SIZE, cx + w - PADDING, baseline, &text, Align::Right);
            }
            cx += w;
        }
        self.grid(canvas, rect);
    }

    fn grid(&self, canvas: &mut Canvas, row: Rect) {
        canvas.stroke_color(GRID);
        canvas.line_width(0.5);
        canvas.rect(row);
        canvas.stroke();
        let mut cx = row.x;
        for w in &self.widths[..self.widths.len().saturating_sub(1)] {
            cx += w;
            canvas.line(cx, row.y, cx, row.top());
        }
    }
}

pub fn period_table(table: &PeriodTable, colors: &EntityColors) -> TableBlock {
    TableBlock {
        headers: vec!["Party".into(), "Posts".into(), "Election (%)".into()],
        widths: vec![160.0, 90.0, 110.0],
        rows: table
            .rows
            .iter()
            .map(|r| TableRow {
                cells: vec![
                    r.entity.to_string(),
                    format::count(r.posts),
                    format::percent(r.election_pct),
                ],
                fill: colors.get(&r.entity),
            })
            .collect(),
    }
}

/// Comparison table, latest period first.
pub fn comparison_table(rows: &[ComparisonRow], a: &str, b: &str, colors: &EntityColors) -> TableBlock {
    TableBlock {
        headers: vec![
            "Party".into(),
            format!("Posts {b}"),
            format!("Election {b} (%)"),
            format!("Posts {a}"),
            format!("Election {a} (%)"),
            format!("Diff Posts ({b}-{a})"),
            "Diff Election (pp)".into(),
        ],
        widths: vec![130.0, 80.0, 110.0, 80.0, 110.0, 120.0, 120.0],
        rows: rows
            .iter()
            .map(|r| TableRow {
                cells: vec![
                    r.entity.to_string(),
                    format::count(r.posts_b),
                    format::percent(r.pct_b),
                    format::count(r.posts_a),
                    format::percent(r.pct_a),
                    format::signed_count(r.diff_posts),
                    format::signed_points(r.diff_pct),
                ],
                fill: colors.get(&r.entity),
            })
            .collect(),
    }
}
