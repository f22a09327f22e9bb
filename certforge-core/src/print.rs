//! Print Geometry
//!
//! Physical page sizes and raster resolution for certificate output.

use serde::{Deserialize, Serialize};

const POINTS_PER_MM: f32 = 72.0 / 25.4;
const METERS_PER_INCH: f64 = 0.0254;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// A physical page in PostScript points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageSize {
    pub fn a4(orientation: Orientation) -> Self {
        let short = 210.0 * POINTS_PER_MM;
        let long = 297.0 * POINTS_PER_MM;
        match orientation {
            Orientation::Portrait => Self { width_pt: short, height_pt: long },
            Orientation::Landscape => Self { width_pt: long, height_pt: short },
        }
    }

    /// Scale and offset that fit an `image_w` x `image_h` image inside the page.
    ///
    /// The bound axis can round one step past the page edge in `f32`, so the
    /// fitted size is clamped to the page.
    pub fn fit(&self, image_w: u32, image_h: u32) -> PageFit {
        let iw = image_w as f32;
        let ih = image_h as f32;
        let scale = (self.width_pt / iw).min(self.height_pt / ih);
        let width = (iw * scale).min(self.width_pt);
        let height = (ih * scale).min(self.height_pt);
        PageFit {
            scale,
            x: (self.width_pt - width) / 2.0,
            y: (self.height_pt - height) / 2.0,
            width,
            height,
        }
    }
}

/// Uniform fit of an image on a page: never crops, never exceeds either axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFit {
    pub scale: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Resolution tag written into raster output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintSpec {
    pub dpi: u32,
}

impl Default for PrintSpec {
    fn default() -> Self {
        Self { dpi: 300 }
    }
}

impl PrintSpec {
    pub fn pixels_per_meter(&self) -> u32 {
        (self.dpi as f64 / METERS_PER_INCH).round() as u32
    }
}
