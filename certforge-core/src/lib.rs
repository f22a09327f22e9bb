//! Certificate Forge Core - personalized certificate rendering
//!
//! Pipeline, leaf to root:
//! 1. Font Resolver - logical font name to a loaded face, with fallback
//! 2. Text Placement - percentage position to a centered draw origin
//! 3. Certificate Renderer - name composited onto a template, PNG out
//! 4. Page Compositor - rendered PNG fitted onto an A4 landscape PDF
//! 5. Batch Pipeline - every registrant, grouped by category, zipped
//!
//! Registrations are collected by [`roster`] and exported as text or xlsx.

pub mod bitmap_font;
pub mod document;
pub mod error;
pub mod export;
pub mod fonts;
pub mod hashing;
pub mod pipeline;
pub mod placement;
pub mod print;
pub mod render;
pub mod roster;
pub mod settings;

pub use document::{caption, to_document, CertificateDocument};
pub use error::{CertError, Result};
pub use fonts::{FontResolver, FontSource, FontSpec, FontTable, LoadedFont};
pub use hashing::{canonical_json, sha256_hex};
pub use pipeline::{BatchOutput, BatchProgress, CertificatePipeline, OutputFormats, RenderRequest};
pub use placement::{place, Placement, PlacementConfig};
pub use print::{PageSize, PrintSpec};
pub use render::{render, RenderedCertificate};
pub use roster::{RegistrantRecord, RegistrationForm, Roster};
pub use settings::{EventSettings, JsonSettingsStore, SettingsStore};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
