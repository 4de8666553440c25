//! PDF document renderer.
//!
//! Landscape A4, standard Helvetica faces, charts embedded as RGB images
//! with their text set over them. The layout is a single flow: blocks are placed top to bottom and a block that
//! does not fit on the current page starts a new one. Tables split by row and
//! repeat their header.

mod canvas;
mod font;
mod plot;
mod table;

use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};

use postwatch_recon::model::Report;
use postwatch_recon::Rgb;

use crate::chart::{ChartSpec, ComparisonCharts, PeriodCharts, ReportCharts};
use crate::error::RenderError;

use canvas::{image_name, Align, Canvas, Rect};
use font::{encode_win_ansi, Font};
use plot::{ChartImage, Raster};
use table::{TableBlock, HEADER_HEIGHT, ROW_HEIGHT};

pub const PAGE_WIDTH: f32 = 842.0;
pub const PAGE_HEIGHT: f32 = 595.0;
const MARGIN: f32 = 40.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const GAP: f32 = 12.0;
const HALF_CHART: Size = Size { w: (CONTENT_WIDTH - GAP) / 2.0, h: 200.0 };
const WIDE_CHART: Size = Size { w: CONTENT_WIDTH * 0.75, h: 250.0 };
const CAPTION_HEIGHT: f32 = 16.0;

#[derive(Debug, Clone, Copy)]
struct Size {
    w: f32,
    h: f32,
}

/// Render the document to bytes.
pub fn render(report: &Report, charts: &ReportCharts) -> Result<Vec<u8>, RenderError> {
    let mut flow = Flow::new();
    flow.title(&report.title);

    for (period, period_charts) in report.periods_latest_first().into_iter().zip(&charts.periods) {
        flow.heading(&format!("Daten {}", period.label));
        flow.table(&table::period_table(period, &charts.colors));
        period_section(&mut flow, period_charts)?;
    }

    let (a, b) = (&report.period_a.label, &report.period_b.label);
    flow.heading(&format!("Vergleich {a} vs {b}"));
    flow.table(&table::comparison_table(&report.comparison, a, b, &charts.colors));
    comparison_section(&mut flow, &charts.comparison)?;

    let pages = flow.finish();
    log::debug!("document: {} pages", pages.len());
    write_document(&report.title, pages)
}

fn period_section(flow: &mut Flow, charts: &PeriodCharts) -> Result<(), RenderError> {
    if charts.all().iter().all(|c| c.is_empty()) {
        return Ok(());
    }
    let label = &charts.label;
    flow.subheading(&format!("Diagramme {label}"));
    flow.chart_pair(
        (&charts.posts_pie, &format!("1. Diagramm: Nur Posts ({label})")),
        (&charts.election_pie, &format!("2. Diagramm: Nur Wahlergebnisse ({label})")),
    )?;
    flow.wide_chart(
        &charts.combined_bar,
        &format!("3. Diagramm: Posts und Wahlergebnisse zusammen ({label})"),
    )
}

fn comparison_section(flow: &mut Flow, charts: &ComparisonCharts) -> Result<(), RenderError> {
    if charts.all().iter().all(|c| c.is_empty()) {
        return Ok(());
    }
    flow.subheading("Diagramme Vergleich");
    flow.chart_pair(
        (&charts.posts_bar, "1. Diagramm: Nur Posts"),
        (&charts.election_bar, "2. Diagramm: Nur Wahlergebnisse"),
    )?;
    flow.wide_chart(&charts.delta_scatter, "3. Diagramm: Diff Posts vs. Diff Election (pp)")?;
    flow.wide_chart(&charts.combined_bar, "4. Diagramm: Posts und Wahlergebnisse beider Perioden")
}

// ---------------------------------------------------------------------------
// Flow layout
// ---------------------------------------------------------------------------

struct Flow {
    pages: Vec<Canvas>,
    page: Canvas,
    /// Top of the free space on the current page.
    cursor: f32,
}

impl Flow {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            page: Canvas::new(),
            cursor: PAGE_HEIGHT - MARGIN,
        }
    }

    fn new_page(&mut self) {
        let full = std::mem::take(&mut self.page);
        self.pages.push(full);
        self.cursor = PAGE_HEIGHT - MARGIN;
    }

    /// Reserve `height` points, breaking the page first if they do not fit.
    /// Returns the top of the reserved band.
    fn reserve(&mut self, height: f32) -> f32 {
        if self.cursor - height < MARGIN && !self.page.is_empty() {
            self.new_page();
        }
        let top = self.cursor;
        self.cursor -= height;
        top
    }

    fn space(&mut self, height: f32) {
        self.cursor -= height;
    }

    fn title(&mut self, text: &str) {
        let top = self.reserve(30.0);
        self.page.fill_color(Rgb::BLACK);
        self.page.text(Font::Bold, 20.0, PAGE_WIDTH / 2.0, top - 20.0, text, Align::Center);
        self.space(10.0);
    }

    fn heading(&mut self, text: &str) {
        // keep a heading together with at least the table header below it
        if self.cursor - 26.0 - HEADER_HEIGHT - ROW_HEIGHT < MARGIN {
            self.new_page();
        }
        let top = self.reserve(26.0);
        self.page.fill_color(Rgb::BLACK);
        self.page.text(Font::Bold, 16.0, MARGIN, top - 18.0, text, Align::Left);
        self.space(4.0);
    }

    fn subheading(&mut self, text: &str) {
        if self.cursor - 22.0 - HALF_CHART.h < MARGIN {
            self.new_page();
        }
        let top = self.reserve(22.0);
        self.page.fill_color(Rgb::BLACK);
        self.page.text(Font::Bold, 13.0, MARGIN, top - 15.0, text, Align::Left);
        self.space(4.0);
    }

    fn table(&mut self, table: &TableBlock) {
        let top = self.reserve(HEADER_HEIGHT);
        table.draw_header(&mut self.page, MARGIN, top);
        for row in &table.rows {
            if self.cursor - ROW_HEIGHT < MARGIN {
                self.new_page();
                let top = self.reserve(HEADER_HEIGHT);
                table.draw_header(&mut self.page, MARGIN, top);
            }
            let top = self.reserve(ROW_HEIGHT);
            table.draw_row(&mut self.page, row, MARGIN, top);
        }
        self.space(14.0);
    }

    fn caption(&mut self, text: &str, center_x: f32, top: f32) {
        self.page.fill_color(Rgb::BLACK);
        self.page.text(Font::Regular, 9.0, center_x, top - 11.0, text, Align::Center);
    }

    /// Rasterize `spec` into `area` and set its labels on top.
    fn chart(&mut self, spec: &ChartSpec, area: Rect) -> Result<(), RenderError> {
        let ChartImage { raster, labels } = plot::render(spec, area.w, area.h)?;
        let (sx, sy) = (area.w / raster.width as f32, area.h / raster.height as f32);
        self.page.image(raster, area);
        for label in &labels {
            let x = area.x + label.at.0 as f32 * sx;
            let y = area.top() - label.at.1 as f32 * sy;
            self.page.fill_color(label.color);
            if label.vertical {
                self.page.text_vertical(label.font, label.size, x, y, &label.text);
            } else {
                self.page.text(label.font, label.size, x, y, &label.text, label.align);
            }
        }
        Ok(())
    }

    fn chart_pair(&mut self, left: (&ChartSpec, &str), right: (&ChartSpec, &str)) -> Result<(), RenderError> {
        let top = self.reserve(HALF_CHART.h + CAPTION_HEIGHT);
        for (i, (spec, caption)) in [left, right].into_iter().enumerate() {
            let x = MARGIN + i as f32 * (HALF_CHART.w + GAP);
            let area = Rect::new(x, top - HALF_CHART.h, HALF_CHART.w, HALF_CHART.h);
            self.chart(spec, area)?;
            self.caption(caption, x + HALF_CHART.w / 2.0, area.y);
        }
        self.space(GAP);
        Ok(())
    }

    fn wide_chart(&mut self, spec: &ChartSpec, caption: &str) -> Result<(), RenderError> {
        let top = self.reserve(WIDE_CHART.h + CAPTION_HEIGHT);
        let x = MARGIN + (CONTENT_WIDTH - WIDE_CHART.w) / 2.0;
        let area = Rect::new(x, top - WIDE_CHART.h, WIDE_CHART.w, WIDE_CHART.h);
        self.chart(spec, area)?;
        self.caption(caption, PAGE_WIDTH / 2.0, area.y);
        self.space(GAP);
        Ok(())
    }

    /// Close the last page and stamp page numbers.
    fn finish(mut self) -> Vec<Canvas> {
        if !self.page.is_empty() || self.pages.is_empty() {
            self.new_page();
        }
        let total = self.pages.len();
        for (i, page) in self.pages.iter_mut().enumerate() {
            page.fill_color(Rgb::from_hex(0x666666));
            page.text(
                Font::Regular,
                8.0,
                PAGE_WIDTH - MARGIN,
                MARGIN / 2.0,
                &format!("Seite {} / {}", i + 1, total),
                Align::Right,
            );
        }
        self.pages
    }
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

fn font_dictionary(font: Font) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font.base_font(),
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Image XObject for a raster. Left unfiltered here; `Document::compress`
/// deflates it with the content streams.
fn image_stream(raster: Raster) -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => raster.width as i64,
            "Height" => raster.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8_i64,
        },
        raster.pixels,
    )
}

fn write_document(title: &str, pages: Vec<Canvas>) -> Result<Vec<u8>, RenderError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(font_dictionary(Font::Regular));
    let bold_id = doc.add_object(font_dictionary(Font::Bold));
    let fonts_id = doc.add_object(dictionary! {
        Font::Regular.resource() => regular_id,
        Font::Bold.resource() => bold_id,
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let (content, images) = page.into_parts();
        let mut xobjects = Dictionary::new();
        for (i, raster) in images.into_iter().enumerate() {
            let image_id = doc.add_object(image_stream(raster));
            xobjects.set(image_name(i), image_id);
        }
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => fonts_id,
                "XObject" => xobjects,
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let created = chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string();
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(encode_win_ansi(title), StringFormat::Literal),
        "Producer" => Object::string_literal(concat!("postwatch ", env!("CARGO_PKG_VERSION"))),
        "CreationDate" => Object::string_literal(created),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| RenderError::Document(e.to_string()))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use postwatch_recon::{build_report, EntityResolver, ReportConfig};
    use serde_json::{json, Map, Value};

    fn report_with(parties: usize) -> Report {
        let mut a = Map::new();
        let mut b = Map::new();
        for i in 0..parties {
            a.insert(format!("Partei {i}"), json!(i * 3));
            b.insert(format!("Partei {i}"), json!(i * 4));
        }
        let posts = json!({ "electionPosts2021": Value::Object(a.clone()), "electionPosts2025": Value::Object(b.clone()) });
        let election = json!({ "election2021": Value::Object(a), "election2025": Value::Object(b) });
        build_report(&posts, &election, &ReportConfig::default(), EntityResolver::builtin())
    }

    fn page_count(bytes: &[u8]) -> usize {
        lopdf::Document::load_mem(bytes).unwrap().get_pages().len()
    }

    #[test]
    fn empty_report_is_one_page() {
        let report = report_with(0);
        let charts = ReportCharts::build(&report, EntityResolver::builtin());
        let bytes = render(&report, &charts).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        assert_eq!(page_count(&bytes), 1);
    }

    fn image_sizes(bytes: &[u8]) -> Vec<(i64, i64)> {
        let doc = lopdf::Document::load_mem(bytes).unwrap();
        doc.objects
            .values()
            .filter_map(|o| match o {
                Object::Stream(s) if matches!(s.dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Image") => Some((
                    s.dict.get(b"Width").and_then(Object::as_i64).unwrap(),
                    s.dict.get(b"Height").and_then(Object::as_i64).unwrap(),
                )),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn every_chart_is_one_image() {
        let report = report_with(3);
        let bytes = render(&report, &ReportCharts::build(&report, EntityResolver::builtin())).unwrap();
        let sizes = image_sizes(&bytes);
        // three per period, four for the comparison
        assert_eq!(sizes.len(), 10);
        assert!(sizes.contains(&(750, 400)));

        let empty = report_with(0);
        let bytes = render(&empty, &ReportCharts::build(&empty, EntityResolver::builtin())).unwrap();
        assert!(image_sizes(&bytes).is_empty());
    }

    #[test]
    fn long_tables_break_pages() {
        let small = report_with(3);
        let large = report_with(60);
        let small_pages = page_count(&render(&small, &ReportCharts::build(&small, EntityResolver::builtin())).unwrap());
        let large_pages = page_count(&render(&large, &ReportCharts::build(&large, EntityResolver::builtin())).unwrap());
        assert!(large_pages > small_pages);
    }

    #[test]
    fn reserve_breaks_only_non_empty_pages() {
        let mut flow = Flow::new();
        // a block taller than the page still lands on the first page
        flow.reserve(PAGE_HEIGHT * 2.0);
        assert!(flow.pages.is_empty());
        flow.page.line(0.0, 0.0, 1.0, 1.0);
        let top = flow.reserve(10.0);
        assert_eq!(flow.pages.len(), 1);
        assert_eq!(top, PAGE_HEIGHT - MARGIN);
    }

    #[test]
    fn footer_numbers_every_page() {
        let mut flow = Flow::new();
        flow.title("x");
        flow.new_page();
        flow.title("y");
        let pages = flow.finish();
        assert_eq!(pages.len(), 2);
        let (last, _) = pages.into_iter().last().unwrap().into_parts();
        let footer = last
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| op.operands.first())
            .any(|o| matches!(o, Object::String(s, _) if s == b"Seite 2 / 2"));
        assert!(footer);
    }
}
