//! Error taxonomy shared by ingestion, the library and playback.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReaderError {
    #[error("no readable content found ({reason}, extracted {extracted_len} chars)")]
    ExtractionFailed {
        reason: String,
        extracted_len: usize,
    },
    #[error("failed to fetch {url}: {message}")]
    Network {
        url: String,
        status: Option<u16>,
        message: String,
    },
    #[error("could not decode {name} with any supported encoding")]
    DecodingFailed { name: String },
    #[error("text recognition failed for {name}: {reason}")]
    OcrFailed { name: String, reason: String },
    #[error("speech synthesis failed: {reason}")]
    Synthesis { reason: String },
    #[error("index {index} is out of range for {len} documents")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("library is full ({capacity} documents)")]
    LibraryFull { capacity: usize },
    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T, E = ReaderError> = std::result::Result<T, E>;
