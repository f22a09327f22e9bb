//! Certificate Renderer
//!
//! Text goes onto a transparent overlay the size of the template, which is
//! then alpha-composited onto the template and flattened to opaque RGB.

use image::{imageops, DynamicImage, Rgba, RgbaImage};

use crate::error::Result;
use crate::fonts::{FontResolver, LoadedFont};
use crate::placement::{place, Placement, PlacementConfig};
use crate::print::PrintSpec;

/// A flattened PNG certificate. Fresh per call, owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCertificate {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Renders `name` onto the template described by `template_bytes`.
///
/// Fails with [`crate::CertError::Decode`] when the template is not a
/// supported raster format. Output is byte-identical for identical inputs
/// given the same font resolution outcome.
pub fn render(
    template_bytes: &[u8],
    name: &str,
    config: &PlacementConfig,
    fonts: &FontResolver,
) -> Result<RenderedCertificate> {
    render_with(template_bytes, name, config, fonts, PrintSpec::default())
}

pub fn render_with(
    template_bytes: &[u8],
    name: &str,
    config: &PlacementConfig,
    fonts: &FontResolver,
    print: PrintSpec,
) -> Result<RenderedCertificate> {
    let mut base = image::load_from_memory(template_bytes)?.to_rgba8();
    let (width, height) = base.dimensions();
    let color = config.rgb()?;

    let font = fonts.resolve(&config.font_name, config.font_size);
    let placement = place(width, height, name, &font, config.x_pct, config.y_pct);
    tracing::debug!(
        name,
        width,
        height,
        origin_x = placement.origin.0,
        origin_y = placement.origin.1,
        degraded_font = font.is_degraded(),
        "rendering certificate"
    );

    let overlay = text_overlay(width, height, name, &placement, &font, [color.0, color.1, color.2]);
    imageops::overlay(&mut base, &overlay, 0, 0);
    let flat = DynamicImage::ImageRgba8(base).to_rgb8();

    let png = encode_png(flat.as_raw(), width, height, print)?;
    Ok(RenderedCertificate { png, width, height })
}

fn text_overlay(
    width: u32,
    height: u32,
    text: &str,
    placement: &Placement,
    font: &LoadedFont,
    rgb: [u8; 3],
) -> RgbaImage {
    let mut layer = RgbaImage::new(width, height);
    if placement.text_box.is_empty() {
        return layer;
    }
    let (dx, dy) = placement.draw_offset();
    font.draw(text, dx, dy, |x, y, coverage| {
        if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
            return;
        }
        let alpha = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
        let px = layer.get_pixel_mut(x as u32, y as u32);
        // Neighbouring glyph boxes can overlap; keep the stronger coverage.
        if alpha > px[3] {
            *px = Rgba([rgb[0], rgb[1], rgb[2], alpha]);
        }
    });
    layer
}

/// 8-bit RGB PNG carrying a pHYs resolution chunk.
pub fn encode_png(rgb: &[u8], width: u32, height: u32, print: PrintSpec) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let ppm = print.pixels_per_meter();
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: ppm,
            yppu: ppm,
            unit: png::Unit::Meter,
        }));
        let mut writer = encoder.write_header()?;
        writer.write_image_data(rgb)?;
        writer.finish()?;
    }
    Ok(out)
}
