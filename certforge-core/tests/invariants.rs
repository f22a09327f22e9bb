//! Contract Invariant Tests
//!
//! These tests verify the rendering, page-fit and batch guarantees.

use std::io::{Cursor, Read};

use certforge_core::{
    fonts::{FontResolver, FontTable},
    pipeline::{ArtifactFormat, CertificatePipeline, OutputFormats, RenderRequest},
    placement::PlacementConfig,
    print::{Orientation, PageSize},
    render::render,
    roster::RegistrantRecord,
    to_document, CertError,
};
use chrono::NaiveDate;
use image::{ImageFormat, Rgb, RgbImage};

const PAPER: [u8; 3] = [255, 255, 255];

fn create_template(w: u32, h: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(w, h, Rgb(PAPER));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn offline_fonts() -> FontResolver {
    FontResolver::offline(FontTable::builtin())
}

fn create_pipeline() -> CertificatePipeline {
    CertificatePipeline::new(offline_fonts())
}

fn black_text(x_pct: f64, y_pct: f64) -> PlacementConfig {
    PlacementConfig {
        x_pct,
        y_pct,
        font_name: "DejaVu Sans".to_string(),
        font_size: 72,
        color: "#000000".to_string(),
    }
}

fn record(name: &str, category: &str) -> RegistrantRecord {
    RegistrantRecord {
        name: name.to_string(),
        roll_no: format!("R-{}", name),
        category: category.to_string(),
        ..Default::default()
    }
}

fn fixed_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 11, 20).unwrap()
}

/// Center of the box covering every pixel that differs from the paper color.
fn ink_center(png: &[u8]) -> Option<(f64, f64)> {
    let img = image::load_from_memory(png).unwrap().to_rgb8();
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, px) in img.enumerate_pixels() {
        if px.0 == PAPER {
            continue;
        }
        bounds = Some(match bounds {
            Some((a, b, c, d)) => (a.min(x), b.min(y), c.max(x), d.max(y)),
            None => (x, y, x, y),
        });
    }
    bounds.map(|(x0, y0, x1, y1)| {
        ((x0 + x1 + 1) as f64 / 2.0, (y0 + y1 + 1) as f64 / 2.0)
    })
}

fn archive_names(archive: &[u8]) -> Vec<String> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
    (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect()
}

#[test]
fn invariant_render_deterministic() {
    let fonts = offline_fonts();
    let template = create_template(320, 200);
    let config = black_text(50.0, 50.0);

    let first = render(&template, "Jane Doe", &config, &fonts).unwrap();
    let second = render(&template, "Jane Doe", &config, &fonts).unwrap();
    assert_eq!(first.png, second.png);
}

#[test]
fn invariant_text_centered_on_target() {
    let fonts = offline_fonts();
    let template = create_template(400, 300);

    for (x_pct, y_pct) in [(50.0, 50.0), (25.0, 80.0), (73.0, 11.0), (60.0, 90.0)] {
        let cert = render(&template, "Jane Doe", &black_text(x_pct, y_pct), &fonts).unwrap();
        let (cx, cy) = ink_center(&cert.png).expect("text drawn");
        let tx = 400.0 * x_pct / 100.0;
        let ty = 300.0 * y_pct / 100.0;
        assert!((cx - tx).abs() <= 1.0, "x {} vs {} at {}%", cx, tx, x_pct);
        assert!((cy - ty).abs() <= 1.0, "y {} vs {} at {}%", cy, ty, y_pct);
    }
}

#[test]
fn invariant_empty_name_is_plain_template() {
    let fonts = offline_fonts();
    let template = create_template(120, 80);
    let cert = render(&template, "", &black_text(50.0, 50.0), &fonts).unwrap();

    let out = image::load_from_memory(&cert.png).unwrap().to_rgb8();
    let original = image::load_from_memory(&template).unwrap().to_rgb8();
    assert_eq!(out, original);
}

#[test]
fn invariant_output_matches_template_size() {
    let fonts = offline_fonts();
    let template = create_template(1000, 700);
    let cert = render(&template, "Jane Doe", &black_text(50.0, 60.0), &fonts).unwrap();
    assert_eq!((cert.width, cert.height), (1000, 700));

    let decoded = image::load_from_memory(&cert.png).unwrap();
    assert_eq!(decoded.color(), image::ColorType::Rgb8);
}

#[test]
fn invariant_document_preserves_aspect() {
    let fonts = offline_fonts();
    let page = PageSize::a4(Orientation::Landscape);

    for (w, h) in [(1000, 700), (300, 900), (2000, 200), (23, 1), (2481, 1754)] {
        let cert = render(&create_template(w, h), "Ali", &black_text(50.0, 50.0), &fonts).unwrap();
        let document = to_document(&cert.png, "Ali  |  Event  |  2024-11-20").unwrap();

        let doc = lopdf::Document::load_mem(&document.pdf).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);
        let page_id = *pages.values().next().unwrap();
        let content =
            lopdf::content::Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        let cm = content
            .operations
            .iter()
            .find(|op| op.operator == "cm")
            .expect("image transform");
        let m: Vec<f32> = cm.operands.iter().map(|o| o.as_float().unwrap()).collect();

        let scale = (page.width_pt / w as f32).min(page.height_pt / h as f32);
        assert!((m[0] / w as f32 - scale).abs() < 1e-3);
        assert!((m[3] / h as f32 - scale).abs() < 1e-3);
        assert!(m[0] <= page.width_pt, "{}x{} width {}", w, h, m[0]);
        assert!(m[3] <= page.height_pt, "{}x{} height {}", w, h, m[3]);
        assert!((m[4] - (page.width_pt - m[0]) / 2.0).abs() < 1e-2);
        assert!((m[5] - (page.height_pt - m[3]) / 2.0).abs() < 1e-2);
    }
}

#[test]
fn invariant_batch_entry_count_and_layout() {
    let pipeline = create_pipeline();
    let template = create_template(300, 200);
    let registrants = vec![
        record("Ali", "Participant"),
        record("Sara", "Teacher"),
        record("Omar", ""),
    ];
    let request = RenderRequest::new(&template, black_text(50.0, 50.0), "Tech Fest")
        .with_caption_date(fixed_date());

    let output = pipeline.generate_all(&registrants, &request, |_| {}).unwrap();
    let names = archive_names(&output.archive);
    assert_eq!(names.len(), registrants.len() * 2);
    assert_eq!(
        names,
        vec![
            "PNG/Participant/Ali.png",
            "PDF/Participant/Ali.pdf",
            "PNG/Teacher/Sara.png",
            "PDF/Teacher/Sara.pdf",
            "PNG/Other/Omar.png",
            "PDF/Other/Omar.pdf",
        ]
    );
    assert_eq!(output.manifest.entries.len(), 6);
    assert!(output.manifest.overwritten.is_empty());
    assert_eq!(output.manifest.categories.len(), 3);
}

#[test]
fn invariant_batch_respects_format_flags() {
    let pipeline = create_pipeline();
    let template = create_template(200, 100);
    let registrants = vec![record("A", "X"), record("B", "X")];
    let request = RenderRequest::new(&template, black_text(50.0, 50.0), "E")
        .with_formats(OutputFormats { raster: false, document: true });

    let output = pipeline.generate_all(&registrants, &request, |_| {}).unwrap();
    assert!(output
        .manifest
        .entries
        .iter()
        .all(|e| e.format == ArtifactFormat::Pdf));
    assert_eq!(archive_names(&output.archive).len(), 2);
}

#[test]
fn invariant_duplicate_name_overwrites() {
    let pipeline = create_pipeline();
    let template = create_template(200, 100);
    let registrants = vec![record("Ali", "Participant"), record("Ali", "Participant")];
    let request = RenderRequest::new(&template, black_text(50.0, 50.0), "E")
        .with_formats(OutputFormats { raster: true, document: false });

    let output = pipeline.generate_all(&registrants, &request, |_| {}).unwrap();
    assert_eq!(archive_names(&output.archive), vec!["PNG/Participant/Ali.png"]);
    assert_eq!(output.manifest.overwritten, vec!["PNG/Participant/Ali.png"]);
    assert_eq!(output.manifest.total_records, 2);
}

#[test]
fn invariant_batch_progress_in_order() {
    let pipeline = create_pipeline();
    let template = create_template(200, 100);
    let registrants = vec![record("A", "X"), record("B", "Y"), record("C", "X")];
    let request = RenderRequest::new(&template, black_text(50.0, 50.0), "E");

    let mut seen = Vec::new();
    pipeline
        .generate_all(&registrants, &request, |p| {
            seen.push((p.processed, p.total, p.name.to_string()));
        })
        .unwrap();
    assert_eq!(
        seen,
        vec![
            (1, 3, "A".to_string()),
            (2, 3, "B".to_string()),
            (3, 3, "C".to_string()),
        ]
    );
}

#[test]
fn invariant_batch_aborts_on_bad_template() {
    let pipeline = create_pipeline();
    let registrants = vec![record("A", "X"), record("B", "X")];
    let request = RenderRequest::new(b"definitely not an image", black_text(50.0, 50.0), "E");

    let mut calls = 0;
    let result = pipeline.generate_all(&registrants, &request, |_| calls += 1);
    assert!(matches!(result, Err(CertError::Decode(_))));
    assert_eq!(calls, 0);
}

#[test]
fn invariant_archive_deterministic() {
    let pipeline = create_pipeline();
    let template = create_template(240, 160);
    let registrants = vec![record("Ali", "Participant"), record("Sara", "Teacher")];
    let request = RenderRequest::new(&template, black_text(40.0, 55.0), "Tech Fest")
        .with_caption_date(fixed_date());

    let first = pipeline.generate_all(&registrants, &request, |_| {}).unwrap();
    let second = pipeline.generate_all(&registrants, &request, |_| {}).unwrap();
    assert_eq!(first.archive, second.archive);
    assert_eq!(first.manifest.request_hash, second.manifest.request_hash);
    assert_ne!(first.manifest.id, second.manifest.id);
}

#[test]
fn invariant_archive_entries_match_manifest_hashes() {
    let pipeline = create_pipeline();
    let template = create_template(200, 100);
    let registrants = vec![record("Ali", "Participant")];
    let request = RenderRequest::new(&template, black_text(50.0, 50.0), "E");

    let output = pipeline.generate_all(&registrants, &request, |_| {}).unwrap();
    let mut zip = zip::ZipArchive::new(Cursor::new(&output.archive)).unwrap();
    for entry in &output.manifest.entries {
        let mut data = Vec::new();
        zip.by_name(&entry.path).unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(certforge_core::sha256_hex(&data), entry.sha256);
    }
}

#[test]
fn scenario_jane_doe_with_dejavu() {
    let fonts = FontResolver::with_system_fonts();
    let config = PlacementConfig {
        x_pct: 50.0,
        y_pct: 60.0,
        font_name: "DejaVu Sans".to_string(),
        font_size: 72,
        color: "#1a1a1a".to_string(),
    };
    if fonts.resolve(&config.font_name, config.font_size).is_degraded() {
        eprintln!("DejaVu Sans not installed; skipping outline font scenario");
        return;
    }

    let cert = render(&create_template(1000, 700), "Jane Doe", &config, &fonts).unwrap();
    assert_eq!((cert.width, cert.height), (1000, 700));
    let (cx, cy) = ink_center(&cert.png).expect("text drawn");
    assert!((cx - 500.0).abs() <= 1.0, "x center {}", cx);
    assert!((cy - 420.0).abs() <= 1.0, "y center {}", cy);
}
