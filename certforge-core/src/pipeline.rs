//! Batch Pipeline - Single Entry Point
//!
//! Renders every registrant in order and packs the results into one zip
//! archive. Any failure aborts the whole batch; no partial archive escapes.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::document::{caption, to_document, CertificateDocument};
use crate::error::Result;
use crate::fonts::FontResolver;
use crate::hashing::{compute_request_hash, sha256_hex};
use crate::placement::PlacementConfig;
use crate::render::{render, RenderedCertificate};
use crate::roster::RegistrantRecord;
use crate::ENGINE_VERSION;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    Png,
    Pdf,
}

impl ArtifactFormat {
    /// Top-level archive folder for this format.
    pub fn folder(self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Pdf => "PDF",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Pdf => "pdf",
        }
    }
}

/// Which artifacts to produce per registrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFormats {
    pub raster: bool,
    pub document: bool,
}

impl Default for OutputFormats {
    fn default() -> Self {
        Self { raster: true, document: true }
    }
}

impl OutputFormats {
    pub fn count(&self) -> usize {
        self.raster as usize + self.document as usize
    }
}

/// Immutable inputs for one generation run.
#[derive(Debug, Clone)]
pub struct RenderRequest<'a> {
    pub template: &'a [u8],
    pub placement: PlacementConfig,
    pub formats: OutputFormats,
    pub event_label: String,
    pub caption_date: NaiveDate,
}

impl<'a> RenderRequest<'a> {
    /// Request dated today (local time).
    pub fn new(template: &'a [u8], placement: PlacementConfig, event_label: impl Into<String>) -> Self {
        Self {
            template,
            placement,
            formats: OutputFormats::default(),
            event_label: event_label.into(),
            caption_date: Local::now().date_naive(),
        }
    }

    pub fn with_formats(mut self, formats: OutputFormats) -> Self {
        self.formats = formats;
        self
    }

    pub fn with_caption_date(mut self, date: NaiveDate) -> Self {
        self.caption_date = date;
        self
    }

    fn fingerprint(&self) -> Result<String> {
        let settings = serde_json::json!({
            "placement": self.placement,
            "formats": self.formats,
            "eventLabel": self.event_label,
            "captionDate": self.caption_date,
        });
        Ok(compute_request_hash(self.template, &settings, ENGINE_VERSION)?)
    }
}

/// Progress after each processed record.
#[derive(Debug, Clone)]
pub struct BatchProgress<'a> {
    pub processed: usize,
    pub total: usize,
    pub name: &'a str,
    pub category: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub path: String,
    pub format: ArtifactFormat,
    pub category: String,
    pub name: String,
    pub size: usize,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub category: String,
    pub records: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchManifest {
    pub id: String,
    pub engine_version: String,
    pub created_at: DateTime<Utc>,
    pub request_hash: String,
    pub total_records: usize,
    pub entries: Vec<ManifestEntry>,
    pub categories: Vec<CategoryCount>,
    /// Archive paths written more than once; only the last write survives.
    pub overwritten: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub archive: Vec<u8>,
    pub manifest: BatchManifest,
}

struct ArchiveEntry {
    manifest: ManifestEntry,
    data: Vec<u8>,
}

/// Entries keyed by archive path. A repeated path replaces the earlier
/// entry in its original slot, so the archive never holds duplicates.
#[derive(Default)]
struct ArchiveBuffer {
    entries: Vec<ArchiveEntry>,
    index: HashMap<String, usize>,
    overwritten: Vec<String>,
}

impl ArchiveBuffer {
    fn insert(&mut self, format: ArtifactFormat, record: &RegistrantRecord, data: Vec<u8>) {
        let category = record.effective_category();
        let path = archive_path(format, category, &record.name);
        let entry = ArchiveEntry {
            manifest: ManifestEntry {
                path: path.clone(),
                format,
                category: category.to_string(),
                name: record.name.clone(),
                size: data.len(),
                sha256: sha256_hex(&data),
            },
            data,
        };
        match self.index.get(&path) {
            Some(&slot) => {
                tracing::warn!(path = %path, "archive path already written, replacing earlier certificate");
                self.overwritten.push(path);
                self.entries[slot] = entry;
            }
            None => {
                self.index.insert(path, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    fn write_zip(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        // Fixed timestamp keeps archives byte-identical across runs.
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());
        for entry in &self.entries {
            zip.start_file(entry.manifest.path.as_str(), options)?;
            zip.write_all(&entry.data)?;
        }
        Ok(zip.finish()?.into_inner())
    }
}

/// `PNG/<category>/<name>.png`. Separators inside components become `_`,
/// and a component of `.` or `..` becomes `_` so no entry leaves its folder.
pub fn archive_path(format: ArtifactFormat, category: &str, name: &str) -> String {
    let clean = |s: &str| match s {
        "." | ".." => "_".to_string(),
        _ => s.replace(['/', '\\'], "_"),
    };
    format!(
        "{}/{}/{}.{}",
        format.folder(),
        clean(category),
        clean(name),
        format.extension()
    )
}

/// The certificate pipeline - owns the resolved font table
pub struct CertificatePipeline {
    fonts: FontResolver,
}

impl CertificatePipeline {
    pub fn new(fonts: FontResolver) -> Self {
        Self { fonts }
    }

    pub fn fonts(&self) -> &FontResolver {
        &self.fonts
    }

    /// Single raster certificate.
    pub fn render(&self, template: &[u8], name: &str, placement: &PlacementConfig) -> Result<RenderedCertificate> {
        render(template, name, placement, &self.fonts)
    }

    /// Single raster plus its page document, captioned like batch output.
    pub fn render_document(
        &self,
        request: &RenderRequest<'_>,
        name: &str,
    ) -> Result<(RenderedCertificate, CertificateDocument)> {
        let raster = self.render(request.template, name, &request.placement)?;
        let text = caption(name, &request.event_label, request.caption_date);
        let document = to_document(&raster.png, &text)?;
        Ok((raster, document))
    }

    /// Renders every registrant in input order into one archive.
    #[tracing::instrument(skip_all, fields(records = registrants.len()))]
    pub fn generate_all(
        &self,
        registrants: &[RegistrantRecord],
        request: &RenderRequest<'_>,
        mut progress: impl FnMut(&BatchProgress<'_>),
    ) -> Result<BatchOutput> {
        let id = Uuid::new_v4().to_string();
        let total = registrants.len();
        tracing::info!(batch = %id, total, formats = request.formats.count(), "starting batch");

        let mut buffer = ArchiveBuffer::default();
        let mut categories: Vec<CategoryCount> = Vec::new();

        for (i, record) in registrants.iter().enumerate() {
            let category = record.effective_category();
            let raster = self.render(request.template, &record.name, &request.placement)?;
            if request.formats.document {
                let text = caption(&record.name, &request.event_label, request.caption_date);
                let document = to_document(&raster.png, &text)?;
                if request.formats.raster {
                    buffer.insert(ArtifactFormat::Png, record, raster.png);
                }
                buffer.insert(ArtifactFormat::Pdf, record, document.pdf);
            } else if request.formats.raster {
                buffer.insert(ArtifactFormat::Png, record, raster.png);
            }

            match categories.iter_mut().find(|c| c.category == category) {
                Some(count) => count.records += 1,
                None => categories.push(CategoryCount {
                    category: category.to_string(),
                    records: 1,
                }),
            }

            progress(&BatchProgress {
                processed: i + 1,
                total,
                name: &record.name,
                category,
            });
        }

        let archive = buffer.write_zip()?;
        let manifest = BatchManifest {
            id,
            engine_version: ENGINE_VERSION.to_string(),
            created_at: Utc::now(),
            request_hash: request.fingerprint()?,
            total_records: total,
            entries: buffer.entries.into_iter().map(|e| e.manifest).collect(),
            categories,
            overwritten: buffer.overwritten,
        };
        tracing::info!(
            batch = %manifest.id,
            entries = manifest.entries.len(),
            overwritten = manifest.overwritten.len(),
            "batch complete"
        );
        Ok(BatchOutput { archive, manifest })
    }
}

impl Default for CertificatePipeline {
    fn default() -> Self {
        Self::new(FontResolver::with_system_fonts())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_path_layout() {
        assert_eq!(archive_path(ArtifactFormat::Png, "Teacher", "Ali"), "PNG/Teacher/Ali.png");
        assert_eq!(archive_path(ArtifactFormat::Pdf, "A/B", "x\\y"), "PDF/A_B/x_y.pdf");
    }

    #[test]
    fn test_archive_path_stays_in_format_folder() {
        assert_eq!(archive_path(ArtifactFormat::Png, "..", "Ali"), "PNG/_/Ali.png");
        assert_eq!(archive_path(ArtifactFormat::Png, ".", ".."), "PNG/_/_.png");
        assert_eq!(archive_path(ArtifactFormat::Pdf, "../..", "Ali"), "PDF/.._../Ali.pdf");
        assert_eq!(archive_path(ArtifactFormat::Png, "Dr. Who", "J.R."), "PNG/Dr. Who/J.R..png");
    }

    #[test]
    fn test_output_format_count() {
        assert_eq!(OutputFormats::default().count(), 2);
        assert_eq!(OutputFormats { raster: false, document: true }.count(), 1);
        assert_eq!(OutputFormats { raster: false, document: false }.count(), 0);
    }

    #[test]
    fn test_buffer_replaces_in_place() {
        let mut buffer = ArchiveBuffer::default();
        let a = RegistrantRecord { name: "Ali".into(), category: "Participant".into(), ..Default::default() };
        let b = RegistrantRecord { name: "Sara".into(), category: "Participant".into(), ..Default::default() };
        buffer.insert(ArtifactFormat::Png, &a, vec![1]);
        buffer.insert(ArtifactFormat::Png, &b, vec![2]);
        buffer.insert(ArtifactFormat::Png, &a, vec![3]);
        assert_eq!(buffer.entries.len(), 2);
        assert_eq!(buffer.entries[0].data, vec![3]);
        assert_eq!(buffer.overwritten, vec!["PNG/Participant/Ali.png"]);
    }
}
