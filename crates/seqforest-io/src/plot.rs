//! ROC curve rasterization.

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{Rgb, RgbImage};

/// Image width in pixels.
pub const WIDTH: u32 = 640;
/// Image height in pixels.
pub const HEIGHT: u32 = 480;

const LEFT: u32 = 80;
const RIGHT: u32 = 620;
const TOP: u32 = 40;
const BOTTOM: u32 = 420;

const GLYPH: i64 = 8;
const PAD: i64 = 8;
const SAMPLE: i64 = 24;

const TITLE: &str = "Receiver Operating Characteristic (ROC) Curve";
const X_LABEL: &str = "False Positive Rate";
const Y_LABEL: &str = "True Positive Rate";
const CHANCE_LABEL: &str = "Random Guess";

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const GREY: Rgb<u8> = Rgb([160, 160, 160]);
const BLUE: Rgb<u8> = Rgb([31, 119, 180]);

/// Map unit-square coordinates to pixel coordinates inside the axes.
fn to_pixel(x: f64, y: f64) -> (i64, i64) {
    let x = x.clamp(0.0, 1.0);
    let y = y.clamp(0.0, 1.0);
    let px = f64::from(LEFT) + x * f64::from(RIGHT - LEFT);
    let py = f64::from(BOTTOM) - y * f64::from(BOTTOM - TOP);
    (px.round() as i64, py.round() as i64)
}

/// Render a ROC curve with title, axis labels, tick labels every 0.2, a
/// dashed grey chance diagonal, the curve as a 2-pixel blue polyline, and a
/// lower-right legend carrying `auc`.
#[must_use]
pub fn render_roc(points: &[(f64, f64)], auc: f64) -> RgbImage {
    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, WHITE);
    let (left, right) = (i64::from(LEFT), i64::from(RIGHT));
    let (top, bottom) = (i64::from(TOP), i64::from(BOTTOM));

    draw_rect(&mut img, (left, top), (right, bottom), BLACK);

    for i in 0..=5 {
        let t = f64::from(i) / 5.0;
        let label = format!("{t:.1}");
        let (tx, _) = to_pixel(t, 0.0);
        let (_, ty) = to_pixel(0.0, t);
        for d in 1..=5 {
            put(&mut img, tx, bottom + d, BLACK);
            put(&mut img, left - d, ty, BLACK);
        }
        draw_text(&mut img, tx - text_width(&label) / 2, bottom + 8, &label, BLACK);
        draw_text(
            &mut img,
            left - 8 - text_width(&label),
            ty - GLYPH / 2,
            &label,
            BLACK,
        );
    }

    let width = i64::from(WIDTH);
    draw_text(&mut img, (width - text_width(TITLE)) / 2, 14, TITLE, BLACK);
    draw_text(
        &mut img,
        (left + right - text_width(X_LABEL)) / 2,
        bottom + 24,
        X_LABEL,
        BLACK,
    );
    draw_text_vertical(
        &mut img,
        16,
        (top + bottom + text_width(Y_LABEL)) / 2,
        Y_LABEL,
        BLACK,
    );

    let (x0, y0) = to_pixel(0.0, 0.0);
    let (x1, y1) = to_pixel(1.0, 1.0);
    draw_line(&mut img, (x0, y0), (x1, y1), GREY, Some(6));

    for pair in points.windows(2) {
        let a = to_pixel(pair[0].0, pair[0].1);
        let b = to_pixel(pair[1].0, pair[1].1);
        draw_line(&mut img, a, b, BLUE, None);
        draw_line(&mut img, (a.0 + 1, a.1), (b.0 + 1, b.1), BLUE, None);
    }

    draw_legend(&mut img, auc);
    img
}

fn curve_label(auc: f64) -> String {
    format!("ROC curve (AUC = {auc:.2})")
}

/// Legend box corners `((x0, y0), (x1, y1))`, anchored to the lower right.
fn legend_rect(auc: f64) -> ((i64, i64), (i64, i64)) {
    let text_w = text_width(&curve_label(auc)).max(text_width(CHANCE_LABEL));
    let w = PAD + SAMPLE + PAD + text_w + PAD;
    let h = PAD + 2 * (GLYPH + PAD);
    let x1 = i64::from(RIGHT) - 10;
    let y1 = i64::from(BOTTOM) - 10;
    ((x1 - w, y1 - h), (x1, y1))
}

fn draw_legend(img: &mut RgbImage, auc: f64) {
    let ((lx0, ly0), (lx1, ly1)) = legend_rect(auc);
    for y in ly0..=ly1 {
        for x in lx0..=lx1 {
            put(img, x, y, WHITE);
        }
    }
    draw_rect(img, (lx0, ly0), (lx1, ly1), BLACK);

    let entries = [(curve_label(auc), BLUE, None), (CHANCE_LABEL.to_string(), GREY, Some(3))];
    for (k, (label, color, dash)) in entries.iter().enumerate() {
        let row_y = ly0 + PAD + k as i64 * (GLYPH + PAD);
        let line_y = row_y + GLYPH / 2;
        let sx = lx0 + PAD;
        draw_line(img, (sx, line_y), (sx + SAMPLE, line_y), *color, *dash);
        draw_line(img, (sx, line_y + 1), (sx + SAMPLE, line_y + 1), *color, *dash);
        draw_text(img, sx + SAMPLE + PAD, row_y, label, BLACK);
    }
}

fn text_width(text: &str) -> i64 {
    text.chars().count() as i64 * GLYPH
}

/// Draw `text` left to right with its top-left corner at `(x, y)`.
fn draw_text(img: &mut RgbImage, x: i64, y: i64, text: &str, color: Rgb<u8>) {
    for (i, ch) in text.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(ch) else {
            continue;
        };
        let gx = x + i as i64 * GLYPH;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..8 {
                if bits & (1 << col) != 0 {
                    put(img, gx + col, y + row as i64, color);
                }
            }
        }
    }
}

/// Draw `text` rotated a quarter turn counter-clockwise, reading upward
/// from `(x, y)`, the bottom-left corner of the first glyph.
fn draw_text_vertical(img: &mut RgbImage, x: i64, y: i64, text: &str, color: Rgb<u8>) {
    for (i, ch) in text.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(ch) else {
            continue;
        };
        let base = y - i as i64 * GLYPH;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..8 {
                if bits & (1 << col) != 0 {
                    put(img, x + row as i64, base - col, color);
                }
            }
        }
    }
}

fn draw_rect(img: &mut RgbImage, (x0, y0): (i64, i64), (x1, y1): (i64, i64), color: Rgb<u8>) {
    draw_line(img, (x0, y0), (x1, y0), color, None);
    draw_line(img, (x0, y1), (x1, y1), color, None);
    draw_line(img, (x0, y0), (x0, y1), color, None);
    draw_line(img, (x1, y0), (x1, y1), color, None);
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < i64::from(img.width()) && y < i64::from(img.height()) {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Bresenham line; with `dash = Some(n)` pixels alternate n on, n off.
fn draw_line(
    img: &mut RgbImage,
    (x1, y1): (i64, i64),
    (x2, y2): (i64, i64),
    color: Rgb<u8>,
    dash: Option<u32>,
) {
    let dx = (x2 - x1).abs();
    let dy = (y2 - y1).abs();
    let sx = if x1 < x2 { 1 } else { -1 };
    let sy = if y1 < y2 { 1 } else { -1 };
    let mut err = dx - dy;
    let (mut x, mut y) = (x1, y1);
    let mut step = 0u32;

    loop {
        let on = dash.is_none_or(|n| (step / n) % 2 == 0);
        if on {
            put(img, x, y, color);
        }
        if x == x2 && y == y2 {
            break;
        }
        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            y += sy;
        }
        step += 1;
    }
}
