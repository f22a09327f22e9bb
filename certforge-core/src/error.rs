//! Error kinds surfaced by the rendering core.
//!
//! Font problems never show up here: the resolver degrades to the built-in
//! bitmap face instead (see [`crate::fonts::FontSource::Unavailable`]).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CertError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Invalid placement: {0}")]
    InvalidPlacement(String),

    #[error("Export error: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    #[error("Registration rejected: {0}")]
    Registration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<image::ImageError> for CertError {
    fn from(err: image::ImageError) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<png::EncodingError> for CertError {
    fn from(err: png::EncodingError) -> Self {
        Self::Encode(err.to_string())
    }
}

impl From<lopdf::Error> for CertError {
    fn from(err: lopdf::Error) -> Self {
        Self::Encode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CertError>;
