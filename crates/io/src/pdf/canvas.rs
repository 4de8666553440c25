use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};

use postwatch_recon::Rgb;

use super::font::{encode_win_ansi, Font};
use super::plot::Raster;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// Axis-aligned box in PDF user space (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn top(&self) -> f32 {
        self.y + self.h
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    /// Shrink by the given margins.
    pub fn inset(&self, left: f32, bottom: f32, right: f32, top: f32) -> Rect {
        Rect::new(
            self.x + left,
            self.y + bottom,
            (self.w - left - right).max(0.0),
            (self.h - bottom - top).max(0.0),
        )
    }
}

/// Accumulates content-stream operations for one page, plus the images
/// those operations paint.
#[derive(Debug, Default)]
pub struct Canvas {
    ops: Vec<Operation>,
    images: Vec<Raster>,
}

/// Resource name of the page's `index`-th image.
pub fn image_name(index: usize) -> String {
    format!("Im{}", index + 1)
}

fn num(v: f32) -> Object {
    v.into()
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    fn op(&mut self, operator: &str, operands: Vec<Object>) {
        self.ops.push(Operation::new(operator, operands));
    }

    pub fn save(&mut self) {
        self.op("q", vec![]);
    }

    pub fn restore(&mut self) {
        self.op("Q", vec![]);
    }

    pub fn fill_color(&mut self, color: Rgb) {
        let (r, g, b) = color.unit();
        self.op("rg", vec![num(r), num(g), num(b)]);
    }

    pub fn stroke_color(&mut self, color: Rgb) {
        let (r, g, b) = color.unit();
        self.op("RG", vec![num(r), num(g), num(b)]);
    }

    pub fn line_width(&mut self, width: f32) {
        self.op("w", vec![num(width)]);
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.op("m", vec![num(x), num(y)]);
    }

    pub fn line_to(&mut self, x: f32, y: f32) {
        self.op("l", vec![num(x), num(y)]);
    }

    pub fn rect(&mut self, r: Rect) {
        self.op("re", vec![num(r.x), num(r.y), num(r.w), num(r.h)]);
    }

    pub fn fill(&mut self) {
        self.op("f", vec![]);
    }

    pub fn stroke(&mut self) {
        self.op("S", vec![]);
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.move_to(x1, y1);
        self.line_to(x2, y2);
        self.stroke();
    }

    pub fn fill_rect(&mut self, r: Rect, color: Rgb) {
        self.fill_color(color);
        self.rect(r);
        self.fill();
    }

    /// Paint `raster` stretched over `r`.
    pub fn image(&mut self, raster: Raster, r: Rect) {
        let name = image_name(self.images.len());
        self.images.push(raster);
        self.save();
        self.op("cm", vec![num(r.w), num(0.0), num(0.0), num(r.h), num(r.x), num(r.y)]);
        self.op("Do", vec![Object::Name(name.into_bytes())]);
        self.restore();
    }

    /// Single line of text with its baseline at `y`.
    pub fn text(&mut self, font: Font, size: f32, x: f32, y: f32, text: &str, align: Align) {
        let width = font.width(text, size);
        let x = match align {
            Align::Left => x,
            Align::Center => x - width / 2.0,
            Align::Right => x - width,
        };
        self.op("BT", vec![]);
        self.op("Tf", vec![Object::Name(font.resource().as_bytes().to_vec()), num(size)]);
        self.op("Td", vec![num(x), num(y)]);
        self.op("Tj", vec![Object::String(encode_win_ansi(text), StringFormat::Literal)]);
        self.op("ET", vec![]);
    }

    /// Text rotated a quarter turn counter-clockwise, centered on `y`.
    pub fn text_vertical(&mut self, font: Font, size: f32, x: f32, y: f32, text: &str) {
        let width = font.width(text, size);
        self.op("BT", vec![]);
        self.op("Tf", vec![Object::Name(font.resource().as_bytes().to_vec()), num(size)]);
        self.op(
            "Tm",
            vec![num(0.0), num(1.0), num(-1.0), num(0.0), num(x), num(y - width / 2.0)],
        );
        self.op("Tj", vec![Object::String(encode_win_ansi(text), StringFormat::Literal)]);
        self.op("ET", vec![]);
    }

    /// The content stream and the images it references, in resource order.
    pub fn into_parts(self) -> (Content, Vec<Raster>) {
        (Content { operations: self.ops }, self.images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operators(canvas: Canvas) -> Vec<String> {
        let (content, _) = canvas.into_parts();
        content.operations.into_iter().map(|op| op.operator).collect()
    }

    #[test]
    fn images_are_named_in_order() {
        let raster = Raster { width: 1, height: 1, pixels: vec![0, 0, 0] };
        let mut canvas = Canvas::new();
        canvas.image(raster.clone(), Rect::new(10.0, 20.0, 100.0, 50.0));
        canvas.image(raster, Rect::new(0.0, 0.0, 1.0, 1.0));

        let (content, images) = canvas.into_parts();
        assert_eq!(images.len(), 2);
        let ops: Vec<&str> = content.operations.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(ops, ["q", "cm", "Do", "Q", "q", "cm", "Do", "Q"]);
        assert!(matches!(content.operations[1].operands[0], Object::Real(w) if w == 100.0));
        assert!(matches!(&content.operations[2].operands[0], Object::Name(n) if n == b"Im1"));
        assert!(matches!(&content.operations[6].operands[0], Object::Name(n) if n == b"Im2"));
    }

    #[test]
    fn text_is_wrapped_in_text_object() {
        let mut canvas = Canvas::new();
        canvas.text(Font::Bold, 12.0, 100.0, 100.0, "SPD", Align::Right);
        assert_eq!(operators(canvas), vec!["BT", "Tf", "Td", "Tj", "ET"]);
    }

    #[test]
    fn inset_never_goes_negative() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0).inset(8.0, 8.0, 8.0, 8.0);
        assert_eq!(r.w, 0.0);
        assert_eq!(r.h, 0.0);
    }
}
