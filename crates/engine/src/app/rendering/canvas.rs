use std::fmt;

use super::font::{glyph_for, GLYPH_HEIGHT, GLYPH_WIDTH, SPACE_GLYPH};
use super::transform::normalize_pixel_ratio;

pub const DEFAULT_FONT: &str = "10px sans-serif";
/// What `clear_rect` exposes; a window has no page behind the canvas.
const BACKDROP: Color = Color::WHITE;

/// 2D drawing calls available to the render phase.
///
/// Coordinates are logical pixels; implementations apply their own device
/// transform.
pub trait DrawSurface {
    fn clear_rect(&mut self, x: f32, y: f32, width: f32, height: f32);
    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32);
    /// `y` is the text baseline. Glyphs past `max_width` are dropped.
    fn fill_text(&mut self, text: &str, x: f32, y: f32, max_width: Option<f32>);
    fn set_font(&mut self, font: Font);
    fn set_fill_style(&mut self, color: Color);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parses `#rgb`, `#rgba`, `#rrggbb` and `#rrggbbaa`.
    pub fn from_hex(value: &str) -> Option<Self> {
        let digits = value.trim().strip_prefix('#')?;
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let nibble = |index: usize| u8::from_str_radix(&digits[index..index + 1], 16).ok();
        let byte = |index: usize| u8::from_str_radix(&digits[index..index + 2], 16).ok();
        match digits.len() {
            3 | 4 => {
                let expand = |v: u8| v * 17;
                let a = if digits.len() == 4 { expand(nibble(3)?) } else { 255 };
                Some(Self {
                    r: expand(nibble(0)?),
                    g: expand(nibble(1)?),
                    b: expand(nibble(2)?),
                    a,
                })
            }
            6 | 8 => {
                let a = if digits.len() == 8 { byte(6)? } else { 255 };
                Some(Self {
                    r: byte(0)?,
                    g: byte(2)?,
                    b: byte(4)?,
                    a,
                })
            }
            _ => None,
        }
    }

    fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    pub size_px: f32,
    pub family: String,
}

impl Font {
    /// Accepts the `"<size>px <family>"` shorthand. Anything else yields `None`.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.trim().splitn(2, char::is_whitespace);
        let size = parts.next()?.strip_suffix("px")?;
        let size_px = size.parse::<f32>().ok().filter(|px| px.is_finite() && *px > 0.0)?;
        let family = parts.next().map(str::trim).unwrap_or_default().to_string();
        Some(Self { size_px, family })
    }

    /// Integer scale of the 3x5 bitmap font that best approximates this size.
    fn glyph_scale(&self, pixel_ratio: f32) -> i32 {
        let line_height = (GLYPH_HEIGHT + 2) as f32;
        ((self.size_px * pixel_ratio) / line_height).round().max(1.0) as i32
    }
}

impl Default for Font {
    fn default() -> Self {
        Self {
            size_px: 10.0,
            family: "sans-serif".to_string(),
        }
    }
}

impl fmt::Display for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}px {}", self.size_px, self.family)
    }
}

/// Software RGBA8 canvas over a borrowed frame buffer.
pub struct PixelCanvas<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
    pixel_ratio: f32,
    fill_style: Color,
    font: Font,
}

impl<'a> PixelCanvas<'a> {
    /// `width`/`height` are the physical size of `frame`; drawing calls are
    /// scaled by `pixel_ratio`.
    pub fn new(frame: &'a mut [u8], width: u32, height: u32, pixel_ratio: f32) -> Self {
        Self {
            frame,
            width,
            height,
            pixel_ratio: normalize_pixel_ratio(pixel_ratio),
            fill_style: Color::BLACK,
            font: Font::default(),
        }
    }

    fn to_device(&self, value: f32) -> i32 {
        (value * self.pixel_ratio).round() as i32
    }

    fn fill_device_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: [u8; 4]) {
        let start_x = x.max(0);
        let start_y = y.max(0);
        let end_x = x.saturating_add(width).min(self.width as i32);
        let end_y = y.saturating_add(height).min(self.height as i32);
        if end_x <= start_x || end_y <= start_y {
            return;
        }

        let row_width = self.width as usize;
        for py in start_y..end_y {
            for px in start_x..end_x {
                write_pixel_rgba(self.frame, row_width, px as usize, py as usize, color);
            }
        }
    }
}

impl DrawSurface for PixelCanvas<'_> {
    fn clear_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let color = BACKDROP.to_rgba();
        self.fill_device_rect(
            self.to_device(x),
            self.to_device(y),
            self.to_device(width),
            self.to_device(height),
            color,
        );
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let color = self.fill_style.to_rgba();
        self.fill_device_rect(
            self.to_device(x),
            self.to_device(y),
            self.to_device(width),
            self.to_device(height),
            color,
        );
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, max_width: Option<f32>) {
        // A glyph cell never needs to be taller than the frame.
        let max_scale = (self.height as i32).max(1);
        let scale = self.font.glyph_scale(self.pixel_ratio).clamp(1, max_scale);
        let glyph_width = GLYPH_WIDTH.saturating_mul(scale);
        let advance = glyph_width.saturating_add(scale);
        let color = self.fill_style.to_rgba();
        let left = self.to_device(x);
        let top = self
            .to_device(y)
            .saturating_sub(GLYPH_HEIGHT.saturating_mul(scale));
        let limit = max_width.map(|w| left.saturating_add(self.to_device(w)));
        let right_edge = self.width as i32;

        let mut pen_x = left;
        for ch in text.chars() {
            if pen_x >= right_edge
                || limit.is_some_and(|limit| pen_x.saturating_add(glyph_width) > limit)
            {
                break;
            }
            let glyph = glyph_for(ch).unwrap_or(SPACE_GLYPH);
            for row in 0..GLYPH_HEIGHT {
                for col in 0..GLYPH_WIDTH {
                    if glyph.is_set(col, row) {
                        self.fill_device_rect(
                            pen_x.saturating_add(col.saturating_mul(scale)),
                            top.saturating_add(row.saturating_mul(scale)),
                            scale,
                            scale,
                            color,
                        );
                    }
                }
            }
            pen_x = pen_x.saturating_add(advance);
        }
    }

    fn set_font(&mut self, font: Font) {
        self.font = font;
    }

    fn set_fill_style(&mut self, color: Color) {
        self.fill_style = color;
    }
}

fn write_pixel_rgba(frame: &mut [u8], width: usize, x: usize, y: usize, color: [u8; 4]) {
    let Some(pixel_offset) = y.checked_mul(width).and_then(|row| row.checked_add(x)) else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }

    frame[byte_offset..end].copy_from_slice(&color);
}
