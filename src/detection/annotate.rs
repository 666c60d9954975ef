//! Bounding-box annotation.
//!
//! Draws each box as a red outline with a filled label tag reading
//! `"<label> <confidence>"`. Text uses a built-in 3x5 pixel font scaled up,
//! so rendering needs no font files on the board.
//!
//! # Tag Placement
//!
//! ```text
//!   ┌────────────┐ ← tag sits above the box, left-aligned with x_min
//!   │ SHIP 0.91  │
//!   ┏━━━━━━━━━━━━━━━━━┓
//!   ┃                 ┃
//!   ┗━━━━━━━━━━━━━━━━━┛
//! ```
//!
//! A tag that would overflow the right edge is right-aligned with `x_max`;
//! one that would overflow the top moves below the box.

use crate::protocol::BoundingBox;
use image::{Rgb, RgbImage};

/// Renders detections onto a copy of the source image
pub trait AnnotationRenderer {
    fn draw_boxes(&self, image: &RgbImage, boxes: &[BoundingBox]) -> RgbImage;
}

/// Default renderer: outlined boxes with text tags
#[derive(Debug, Clone)]
pub struct BoxPainter {
    pub box_color: Rgb<u8>,
    pub text_color: Rgb<u8>,
    /// Outline thickness in pixels
    pub thickness: u32,
    /// Font pixel scale (glyphs are 3x5 units)
    pub font_scale: u32,
    /// Gap between tag and box edge in pixels
    pub padding: i64,
}

impl Default for BoxPainter {
    fn default() -> Self {
        Self {
            box_color: Rgb([255, 0, 0]),
            text_color: Rgb([255, 255, 255]),
            thickness: 2,
            font_scale: 2,
            padding: 3,
        }
    }
}

impl AnnotationRenderer for BoxPainter {
    fn draw_boxes(&self, image: &RgbImage, boxes: &[BoundingBox]) -> RgbImage {
        let mut canvas = image.clone();
        for bbox in boxes {
            self.draw_box(&mut canvas, bbox);
        }
        canvas
    }
}

impl BoxPainter {
    fn draw_box(&self, canvas: &mut RgbImage, bbox: &BoundingBox) {
        let x0 = bbox.x_min as i64;
        let y0 = bbox.y_min as i64;
        let x1 = bbox.x_max as i64;
        let y1 = bbox.y_max as i64;

        for t in 0..self.thickness as i64 {
            draw_outline(canvas, x0 + t, y0 + t, x1 - t, y1 - t, self.box_color);
        }

        let text = tag_text(bbox);
        let (tag_w, tag_h) = self.text_size(&text);
        let (text_x, text_y) = self.tag_origin(bbox, tag_w, tag_h, canvas.width());

        fill_rect(
            canvas,
            text_x,
            text_y - tag_h,
            text_x + tag_w,
            text_y + self.padding,
            self.box_color,
        );
        self.draw_text(canvas, &text, text_x, text_y - tag_h);
    }

    /// Rendered size of `text` in pixels
    pub fn text_size(&self, text: &str) -> (i64, i64) {
        let scale = self.font_scale as i64;
        let chars = text.chars().count() as i64;
        if chars == 0 {
            return (0, GLYPH_HEIGHT * scale);
        }
        let width = chars * (GLYPH_WIDTH + 1) * scale - scale;
        (width, GLYPH_HEIGHT * scale)
    }

    /// Text baseline origin `(x, y)` for a tag of the given size
    pub fn tag_origin(&self, bbox: &BoundingBox, tag_w: i64, tag_h: i64, image_width: u32) -> (i64, i64) {
        let mut text_x = bbox.x_min as i64;
        if text_x + tag_w > image_width as i64 {
            text_x = bbox.x_max as i64 - tag_w;
        }
        let mut text_y = bbox.y_min as i64 - self.padding;
        if text_y - tag_h < 0 {
            text_y = bbox.y_max as i64 + self.padding + tag_h - 1;
        }
        (text_x, text_y)
    }

    fn draw_text(&self, canvas: &mut RgbImage, text: &str, left: i64, top: i64) {
        let scale = self.font_scale as i64;
        let advance = (GLYPH_WIDTH + 1) * scale;

        for (i, ch) in text.chars().enumerate() {
            let rows = glyph(ch);
            let gx = left + i as i64 * advance;
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                        continue;
                    }
                    let px = gx + col * scale;
                    let py = top + row as i64 * scale;
                    fill_rect(canvas, px, py, px + scale - 1, py + scale - 1, self.text_color);
                }
            }
        }
    }
}

fn tag_text(bbox: &BoundingBox) -> String {
    format!("{} {:.6}", bbox.label, bbox.confidence)
}

fn put_pixel(canvas: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < canvas.width() as i64 && y < canvas.height() as i64 {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}

/// Inclusive rectangle outline, clipped to the canvas
fn draw_outline(canvas: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    if x0 > x1 || y0 > y1 {
        return;
    }
    for x in x0..=x1 {
        put_pixel(canvas, x, y0, color);
        put_pixel(canvas, x, y1, color);
    }
    for y in y0..=y1 {
        put_pixel(canvas, x0, y, color);
        put_pixel(canvas, x1, y, color);
    }
}

/// Inclusive filled rectangle, clipped to the canvas
fn fill_rect(canvas: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    let x_start = x0.max(0);
    let y_start = y0.max(0);
    let x_end = x1.min(canvas.width() as i64 - 1);
    let y_end = y1.min(canvas.height() as i64 - 1);
    for y in y_start..=y_end {
        for x in x_start..=x_end {
            put_pixel(canvas, x, y, color);
        }
    }
}

const GLYPH_WIDTH: i64 = 3;
const GLYPH_HEIGHT: i64 = 5;

/// 3x5 bitmap, one row per entry, MSB on the left
fn glyph(ch: char) -> [u8; 5] {
    match ch.to_ascii_uppercase() {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'A' => [0b010, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b011, 0b100, 0b100, 0b100, 0b011],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'G' => [0b011, 0b100, 0b101, 0b101, 0b011],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'J' => [0b001, 0b001, 0b001, 0b101, 0b010],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'N' => [0b110, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'Q' => [0b010, 0b101, 0b101, 0b110, 0b011],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b011, 0b100, 0b010, 0b001, 0b110],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b101, 0b010],
        'W' => [0b101, 0b101, 0b111, 0b111, 0b101],
        'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'Y' => [0b101, 0b101, 0b010, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '_' => [0b000, 0b000, 0b000, 0b000, 0b111],
        ' ' => [0b000; 5],
        _ => [0b111, 0b001, 0b010, 0b000, 0b010],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb<u8> = Rgb([255, 0, 0]);
    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn bbox(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> BoundingBox {
        BoundingBox {
            label: "ship".into(),
            x_min,
            y_min,
            x_max,
            y_max,
            confidence: 0.5,
        }
    }

    #[test]
    fn test_outline_drawn_and_source_untouched() {
        let source = RgbImage::new(100, 100);
        let painted = BoxPainter::default().draw_boxes(&source, &[bbox(10.0, 40.0, 50.0, 80.0)]);

        assert_eq!(*painted.get_pixel(10, 60), RED);
        assert_eq!(*painted.get_pixel(11, 60), RED);
        assert_eq!(*painted.get_pixel(50, 60), RED);
        assert_eq!(*painted.get_pixel(30, 80), RED);
        assert_eq!(*painted.get_pixel(30, 60), BLACK);
        assert!(source.pixels().all(|p| *p == BLACK));
    }

    #[test]
    fn test_no_boxes_is_identity() {
        let source = RgbImage::from_pixel(5, 5, Rgb([1, 2, 3]));
        assert_eq!(BoxPainter::default().draw_boxes(&source, &[]), source);
    }

    #[test]
    fn test_text_size() {
        let painter = BoxPainter::default();
        assert_eq!(painter.text_size("AB"), (14, 10));
        assert_eq!(painter.text_size(""), (0, 10));
    }

    #[test]
    fn test_tag_above_box_by_default() {
        let painter = BoxPainter::default();
        let (x, y) = painter.tag_origin(&bbox(10.0, 40.0, 50.0, 80.0), 20, 10, 100);
        assert_eq!((x, y), (10, 37));
    }

    #[test]
    fn test_tag_shifts_left_on_right_overflow() {
        let painter = BoxPainter::default();
        let (x, _) = painter.tag_origin(&bbox(90.0, 40.0, 99.0, 80.0), 30, 10, 100);
        assert_eq!(x, 69);
    }

    #[test]
    fn test_tag_moves_below_on_top_overflow() {
        let painter = BoxPainter::default();
        let (_, y) = painter.tag_origin(&bbox(10.0, 5.0, 50.0, 30.0), 20, 10, 100);
        assert_eq!(y, 30 + 3 + 10 - 1);
    }

    #[test]
    fn test_boxes_past_edges_are_clipped() {
        let source = RgbImage::new(20, 20);
        // Must not panic on coordinates outside the canvas
        let painted = BoxPainter::default().draw_boxes(&source, &[bbox(-5.0, -5.0, 40.0, 40.0)]);
        assert_eq!(painted.dimensions(), (20, 20));
    }
}
