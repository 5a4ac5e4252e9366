//! # Styled Text Rendering
//!
//! Parses inline markup, word-wraps against the printable width and
//! rasterizes with Spleen bitmap glyphs.
//!
//! ## Markup
//!
//! | Tag | Effect |
//! |-----|--------|
//! | `<L>` `<C>` `<R>` | line alignment (line-leading) |
//! | `<B>` `<I>` `<U>` | bold / italic / underline (anywhere in the line) |
//!
//! Closing tags are accepted and stripped. Styles apply to the whole
//! logical line.
//!
//! ## Glyphs
//!
//! Source glyphs are Spleen 12x24, nearest-neighbor scaled to the
//! configured font size (20px tall, 10px advance). Bold is a 1px
//! horizontal double-strike, italic a row shear, underline a 1px rule
//! below the baseline. The font is monospaced, so a line measures
//! `chars x advance` pixels.

use std::collections::HashMap;

use image::{GrayImage, Luma};
use spleen_font::{FONT_12X24, PSF2Font};

use crate::printer::config::PaperConfig;

/// Spleen source glyph dimensions.
const SRC_W: usize = 12;
const SRC_H: usize = 24;

const WHITE: Luma<u8> = Luma([255]);
const BLACK: Luma<u8> = Luma([0]);

/// Text alignment within the printable width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// One wrapped output line with its resolved style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledLine {
    pub text: String,
    pub align: TextAlign,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl StyledLine {
    fn blank(align: TextAlign) -> Self {
        Self {
            text: String::new(),
            align,
            bold: false,
            italic: false,
            underline: false,
        }
    }
}

/// Pixel width of `text` at the given character advance.
#[inline]
pub fn measure(text: &str, advance: u32) -> u32 {
    text.chars().count() as u32 * advance
}

/// Parse markup and word-wrap into final output lines.
///
/// Each input line is wrapped greedily: words accumulate until the
/// candidate line would exceed the printable width, then the line is
/// flushed. A single word wider than the printable width is still
/// emitted as its own line.
pub fn layout(text: &str, default_align: TextAlign, config: &PaperConfig) -> Vec<StyledLine> {
    let advance = config.font_size / 2;
    let max_width = config.printable_width();

    let mut out = Vec::new();

    for raw in text.split('\n') {
        if raw.trim().is_empty() {
            out.push(StyledLine::blank(default_align));
            continue;
        }

        let mut line = raw.trim().to_string();
        let mut align = default_align;

        if let Some(rest) = line.strip_prefix("<C>") {
            align = TextAlign::Center;
            line = rest.to_string();
        } else if let Some(rest) = line.strip_prefix("<R>") {
            align = TextAlign::Right;
            line = rest.to_string();
        } else if let Some(rest) = line.strip_prefix("<L>") {
            align = TextAlign::Left;
            line = rest.to_string();
        }

        let bold = line.contains("<B>");
        let italic = line.contains("<I>");
        let underline = line.contains("<U>");

        for tag in [
            "<B>", "</B>", "<I>", "</I>", "<U>", "</U>", "<C>", "</C>", "<R>", "</R>", "<L>",
            "</L>",
        ] {
            line = line.replace(tag, "");
        }

        let styled = |text: String| StyledLine {
            text,
            align,
            bold,
            italic,
            underline,
        };

        let mut current = String::new();
        for word in line.split(' ') {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if measure(&candidate, advance) > max_width {
                if !current.is_empty() {
                    out.push(styled(current));
                }
                current = word.to_string();
            } else {
                current = candidate;
            }
        }
        if !current.is_empty() {
            out.push(styled(current));
        }
    }

    out
}

/// Render styled text to a paper-width bitmap.
pub fn render_text(text: &str, default_align: TextAlign, config: &PaperConfig) -> GrayImage {
    let lines = layout(text, default_align, config);
    rasterize(&lines, config)
}

/// Rasterize already-laid-out lines top to bottom.
pub fn rasterize(lines: &[StyledLine], config: &PaperConfig) -> GrayImage {
    let line_height = config.font_size + config.line_spacing;
    let min_height = config.font_size + config.padding * 2;
    let height = (lines.len() as u32 * line_height + config.padding * 2).max(min_height);

    let mut canvas = GrayImage::from_pixel(config.width_dots, height, WHITE);
    let mut glyphs = GlyphSet::new(config.font_size);

    let mut y = config.padding;
    for line in lines {
        let width = measure(&line.text, glyphs.advance());
        let x = match line.align {
            TextAlign::Left => config.padding,
            TextAlign::Center => config.width_dots.saturating_sub(width) / 2,
            TextAlign::Right => config
                .width_dots
                .saturating_sub(width + config.padding),
        };

        let mut pen_x = x;
        for ch in line.text.chars() {
            glyphs.draw(&mut canvas, ch, pen_x, y, line.bold, line.italic);
            pen_x += glyphs.advance();
        }

        if line.underline && !line.text.is_empty() {
            let underline_y = y + config.font_size + 1;
            if underline_y < height {
                for ux in x..(x + width).min(config.width_dots) {
                    canvas.put_pixel(ux, underline_y, BLACK);
                }
            }
        }

        y += line_height;
    }

    canvas
}

/// Glyph source with a per-job cache of scaled bitmaps. The cache is
/// owned by the rasterization call, so memory is bounded by the distinct
/// characters of one job.
struct GlyphSet {
    char_w: u32,
    char_h: u32,
    cache: HashMap<char, Vec<u8>>,
}

impl GlyphSet {
    fn new(font_size: u32) -> Self {
        Self {
            char_w: font_size / 2,
            char_h: font_size,
            cache: HashMap::new(),
        }
    }

    #[inline]
    fn advance(&self) -> u32 {
        self.char_w
    }

    fn draw(&mut self, canvas: &mut GrayImage, ch: char, x: u32, y: u32, bold: bool, italic: bool) {
        let (char_w, char_h) = (self.char_w, self.char_h);
        let glyph = self.scaled_glyph(ch);

        for gy in 0..char_h as usize {
            // Shear rows right-to-left for a slant of ~1px per 6 rows.
            let shear = if italic {
                (char_h as usize - 1 - gy) as u32 / 6
            } else {
                0
            };
            for gx in 0..char_w as usize {
                if glyph[gy * char_w as usize + gx] == 0 {
                    continue;
                }
                let px = x + gx as u32 + shear;
                let py = y + gy as u32;
                put_black(canvas, px, py);
                if bold {
                    put_black(canvas, px + 1, py);
                }
            }
        }
    }

    fn scaled_glyph(&mut self, ch: char) -> &[u8] {
        let (char_w, char_h) = (self.char_w as usize, self.char_h as usize);
        self.cache.entry(ch).or_insert_with(|| {
            let src = base_glyph(ch);
            let mut dst = vec![0u8; char_w * char_h];
            scale_bitmap(&src, SRC_W, SRC_H, &mut dst, char_w, char_h);
            dst
        })
    }
}

/// Fetch the Spleen 12x24 bitmap for a character; unknown characters get
/// a box outline.
fn base_glyph(ch: char) -> Vec<u8> {
    let mut glyph = vec![0u8; SRC_W * SRC_H];

    let mut spleen = match PSF2Font::new(FONT_12X24) {
        Ok(font) => font,
        Err(_) => {
            draw_box(&mut glyph, SRC_W, SRC_H);
            return glyph;
        }
    };

    let utf8 = ch.to_string();
    if let Some(rows) = spleen.glyph_for_utf8(utf8.as_bytes()) {
        for (row_y, row) in rows.enumerate() {
            for (col_x, on) in row.enumerate() {
                if row_y < SRC_H && col_x < SRC_W && on {
                    glyph[row_y * SRC_W + col_x] = 1;
                }
            }
        }
    } else {
        draw_box(&mut glyph, SRC_W, SRC_H);
    }

    glyph
}

/// Nearest-neighbor bitmap scale.
fn scale_bitmap(src: &[u8], src_w: usize, src_h: usize, dst: &mut [u8], dst_w: usize, dst_h: usize) {
    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let sx = dx * src_w / dst_w;
            let sy = dy * src_h / dst_h;
            dst[dy * dst_w + dx] = src[sy * src_w + sx];
        }
    }
}

/// Box outline for characters missing from the font.
fn draw_box(glyph: &mut [u8], width: usize, height: usize) {
    for x in 0..width {
        glyph[x] = 1;
        glyph[(height - 1) * width + x] = 1;
    }
    for y in 0..height {
        glyph[y * width] = 1;
        glyph[y * width + width - 1] = 1;
    }
}

#[inline]
fn put_black(canvas: &mut GrayImage, x: u32, y: u32) {
    if x < canvas.width() && y < canvas.height() {
        canvas.put_pixel(x, y, BLACK);
    }
}
