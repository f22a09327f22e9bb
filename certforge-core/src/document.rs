//! Page Compositor - rendered certificate to a single-page PDF

use std::io::Write;

use chrono::NaiveDate;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use crate::error::{CertError, Result};
use crate::print::{Orientation, PageFit, PageSize};

const CAPTION_FONT: &str = "Helvetica-Bold";
const CAPTION_SIZE: f32 = 9.0;
const CAPTION_BASELINE: f32 = 14.0;
const CAPTION_GRAY: f32 = 0.5;
const MISSING_WIDTH: u16 = 556;

/// Helvetica-Bold advance widths for 0x20..=0x7E, in 1/1000 em.
#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// A single-page PDF plus the geometry used to place the image.
#[derive(Debug, Clone)]
pub struct CertificateDocument {
    pub pdf: Vec<u8>,
    pub fit: PageFit,
}

/// Footer caption: `name  |  event  |  YYYY-MM-DD`.
pub fn caption(name: &str, event: &str, date: NaiveDate) -> String {
    format!("{}  |  {}  |  {}", name, event, date.format("%Y-%m-%d"))
}

/// Places `raster_bytes` on an A4 landscape page with `caption_text` below.
///
/// An undecodable raster fails with [`CertError::Encode`].
pub fn to_document(raster_bytes: &[u8], caption_text: &str) -> Result<CertificateDocument> {
    to_document_on(raster_bytes, caption_text, PageSize::a4(Orientation::Landscape))
}

pub fn to_document_on(
    raster_bytes: &[u8],
    caption_text: &str,
    page: PageSize,
) -> Result<CertificateDocument> {
    let image = image::load_from_memory(raster_bytes)
        .map_err(|e| CertError::Encode(format!("raster unreadable: {}", e)))?
        .to_rgb8();
    let (iw, ih) = image.dimensions();
    let fit = page.fit(iw, ih);

    let mut zlib = ZlibEncoder::new(Vec::new(), Compression::default());
    zlib.write_all(image.as_raw())
        .map_err(|e| CertError::Encode(e.to_string()))?;
    let pixels = zlib.finish().map_err(|e| CertError::Encode(e.to_string()))?;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => CAPTION_FONT,
        "Encoding" => "WinAnsiEncoding",
    });
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => iw as i64,
            "Height" => ih as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        pixels,
    ));

    let (text, text_width) = win_ansi(caption_text);
    let caption_x = (page.width_pt - text_width) / 2.0;
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    fit.width.into(),
                    0.into(),
                    0.into(),
                    fit.height.into(),
                    fit.x.into(),
                    fit.y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), CAPTION_SIZE.into()]),
            Operation::new(
                "rg",
                vec![CAPTION_GRAY.into(), CAPTION_GRAY.into(), CAPTION_GRAY.into()],
            ),
            Operation::new("Td", vec![caption_x.into(), CAPTION_BASELINE.into()]),
            Operation::new("Tj", vec![Object::String(text, StringFormat::Literal)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
            "XObject" => dictionary! { "Im0" => image_id },
        },
        "MediaBox" => vec![0.into(), 0.into(), page.width_pt.into(), page.height_pt.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut pdf = Vec::new();
    doc.save_to(&mut pdf).map_err(|e| CertError::Encode(e.to_string()))?;
    Ok(CertificateDocument { pdf, fit })
}

/// WinAnsi bytes for `text` and its set width in points at the caption size.
/// Characters outside Latin-1 become `?`.
fn win_ansi(text: &str) -> (Vec<u8>, f32) {
    let mut bytes = Vec::with_capacity(text.len());
    let mut units = 0u32;
    for ch in text.chars() {
        let code = ch as u32;
        let byte = match code {
            0x20..=0x7E | 0xA0..=0xFF => code as u8,
            _ => b'?',
        };
        let width = match byte {
            0x20..=0x7E => HELVETICA_BOLD_WIDTHS[(byte - 0x20) as usize],
            _ => MISSING_WIDTH,
        };
        units += u32::from(width);
        bytes.push(byte);
    }
    (bytes, units as f32 * CAPTION_SIZE / 1000.0)
}
