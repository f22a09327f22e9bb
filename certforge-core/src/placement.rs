//! Text Placement - percentage positions to pixel draw origins

use serde::{Deserialize, Serialize};

use crate::error::{CertError, Result};
use crate::fonts::{LoadedFont, TextBox};

/// Where and how a name is drawn on a template.
///
/// Percentages are fractions of the template size, so one configuration
/// works for any template resolution. They are not clamped:
/// values outside 0..=100 place text off the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementConfig {
    #[serde(default = "default_x_pct")]
    pub x_pct: f64,
    #[serde(default = "default_y_pct")]
    pub y_pct: f64,
    #[serde(default = "default_font_name")]
    pub font_name: String,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_x_pct() -> f64 { 50.0 }
fn default_y_pct() -> f64 { 60.0 }
fn default_font_name() -> String { "Arial Bold".to_string() }
fn default_font_size() -> u32 { 72 }
fn default_color() -> String { "#1a1a1a".to_string() }

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            x_pct: default_x_pct(),
            y_pct: default_y_pct(),
            font_name: default_font_name(),
            font_size: default_font_size(),
            color: default_color(),
        }
    }
}

impl PlacementConfig {
    /// Checks the fields the renderer cannot recover from.
    pub fn validate(&self) -> Result<()> {
        if self.font_size == 0 {
            return Err(CertError::InvalidPlacement("font size must be positive".into()));
        }
        Rgb::from_hex(&self.color)?;
        Ok(())
    }

    pub fn rgb(&self) -> Result<Rgb> {
        Rgb::from_hex(&self.color)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parses `#rrggbb` or `rrggbb`.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CertError::InvalidPlacement(format!(
                "color must be 6 hex digits, got {:?}",
                hex
            )));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|e| CertError::InvalidPlacement(e.to_string()))
        };
        Ok(Self(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Result of placing a string on a canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Target centre in canvas pixels.
    pub center: (f64, f64),
    /// Top-left corner of the ink box, rounded to the nearest pixel.
    pub origin: (i32, i32),
    /// Measured ink box in layout coordinates.
    pub text_box: TextBox,
}

impl Placement {
    /// Offset to add to layout coordinates so the ink box lands on `origin`.
    pub fn draw_offset(&self) -> (i32, i32) {
        (self.origin.0 - self.text_box.x, self.origin.1 - self.text_box.y)
    }
}

/// Centers `text` on (`canvas_w * x_pct / 100`, `canvas_h * y_pct / 100`).
pub fn place(
    canvas_w: u32,
    canvas_h: u32,
    text: &str,
    font: &LoadedFont,
    x_pct: f64,
    y_pct: f64,
) -> Placement {
    let cx = canvas_w as f64 * x_pct / 100.0;
    let cy = canvas_h as f64 * y_pct / 100.0;
    let text_box = font.measure(text);
    let ox = cx - text_box.width as f64 / 2.0;
    let oy = cy - text_box.height as f64 / 2.0;
    Placement {
        center: (cx, cy),
        origin: (ox.round() as i32, oy.round() as i32),
        text_box,
    }
}
