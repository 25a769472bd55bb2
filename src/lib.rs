//! Read-aloud assistant: ingest text from files, pasted text or web pages, cut
//! it into speakable chunks and drive a speech synthesizer through them while
//! keeping a resumable bookmark.

pub mod bookmark;
pub mod chunker;
pub mod config;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod library;
pub mod playback;
pub mod session;
pub mod text_utils;
pub mod view;

pub use error::{ReaderError, Result};
