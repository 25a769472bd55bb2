//! Turning raw input into documents: pasted text, remote pages and files.
//!
//! Text files are decoded by trying each encoding in [`decode_order`] until
//! one yields clean text. Images go through the OCR service; `.html` files go
//! through the content extractor like a fetched page.

use crate::config::AppConfig;
use crate::error::{ReaderError, Result};
use crate::extractor::{ContentExtractor, normalize_plain_text};
use crate::library::NewDocument;
use crate::text_utils::clean_text;
use encoding_rs::Encoding;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "webp", "gif", "bmp", "tif", "tiff", "heic",
];
const HTML_EXTENSIONS: &[&str] = &["html", "htm", "xhtml"];
const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md", "markdown", "csv", "log", "srt"];
const PASTE_NAME_CHARS: usize = 40;

pub trait PageFetcher {
    /// Fetch the page body as text.
    fn fetch(&self, url: &str) -> Result<String>;
}

pub trait OcrService {
    fn recognize(&self, image: &[u8]) -> Result<String>;
}

/// Blocking HTTP fetcher, optionally routed through a CORS-style proxy that
/// takes the target URL appended to its own.
pub struct HttpPageFetcher {
    client: reqwest::blocking::Client,
    proxy_prefix: Option<String>,
}

impl HttpPageFetcher {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|err| ReaderError::Network {
                url: String::new(),
                status: None,
                message: format!("failed to build HTTP client: {err}"),
            })?;
        Ok(Self {
            client,
            proxy_prefix: config
                .proxy_prefix
                .clone()
                .filter(|prefix| !prefix.trim().is_empty()),
        })
    }

    pub fn request_url(&self, url: &str) -> String {
        match &self.proxy_prefix {
            Some(prefix) => format!("{prefix}{url}"),
            None => url.to_string(),
        }
    }
}

impl PageFetcher for HttpPageFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        let target = self.request_url(url);
        debug!(url, target = %target, "Fetching page");
        let network_error = |status: Option<u16>, message: String| ReaderError::Network {
            url: url.to_string(),
            status,
            message,
        };
        let response = self
            .client
            .get(&target)
            .send()
            .map_err(|err| network_error(err.status().map(|s| s.as_u16()), err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(network_error(
                Some(status.as_u16()),
                format!("server answered {status}"),
            ));
        }
        response
            .text()
            .map_err(|err| network_error(Some(status.as_u16()), err.to_string()))
    }
}

/// Encodings tried for uploaded text files, in order.
pub fn decode_order() -> [&'static Encoding; 2] {
    [encoding_rs::UTF_8, encoding_rs::EUC_KR]
}

pub fn decode_text(name: &str, bytes: &[u8]) -> Result<String> {
    for encoding in decode_order() {
        let (text, _, had_errors) = encoding.decode(bytes);
        if !had_errors && is_clean_decode(&text) {
            debug!(name, encoding = encoding.name(), "Decoded text file");
            return Ok(text.into_owned());
        }
        debug!(name, encoding = encoding.name(), "Decode attempt rejected");
    }
    Err(ReaderError::DecodingFailed {
        name: name.to_string(),
    })
}

fn is_clean_decode(text: &str) -> bool {
    !text.trim().is_empty() && !text.contains('\u{FFFD}')
}

fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Image by extension, or by magic bytes when the extension does not already
/// name a text format.
pub fn looks_like_image(name: &str, bytes: &[u8]) -> bool {
    match extension(name) {
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => true,
        Some(ext)
            if TEXT_EXTENSIONS.contains(&ext.as_str())
                || HTML_EXTENSIONS.contains(&ext.as_str()) =>
        {
            false
        }
        _ => image::guess_format(bytes).is_ok(),
    }
}

fn looks_like_html(name: &str) -> bool {
    extension(name).is_some_and(|ext| HTML_EXTENSIONS.contains(&ext.as_str()))
}

/// An uploaded file: display name plus raw contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .map_err(|err| ReaderError::Storage(format!("{}: {err}", path.display())))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

/// Name for pasted text: its first non-blank line, shortened.
pub fn paste_name(text: &str) -> String {
    let first_line = text.lines().map(str::trim).find(|line| !line.is_empty());
    match first_line {
        Some(line) if line.chars().count() > PASTE_NAME_CHARS => {
            let short: String = line.chars().take(PASTE_NAME_CHARS).collect();
            format!("{}…", short.trim_end())
        }
        Some(line) => line.to_string(),
        None => "Pasted text".to_string(),
    }
}

pub struct Ingestor {
    extractor: ContentExtractor,
    fetcher: Box<dyn PageFetcher>,
    ocr: Option<Box<dyn OcrService>>,
}

impl Ingestor {
    pub fn new(
        extractor: ContentExtractor,
        fetcher: Box<dyn PageFetcher>,
        ocr: Option<Box<dyn OcrService>>,
    ) -> Self {
        Self {
            extractor,
            fetcher,
            ocr,
        }
    }

    /// Pasted text only gets whitespace cleanup.
    pub fn from_paste(&self, text: &str) -> Result<NewDocument> {
        let cleaned = normalize_plain_text(text);
        if cleaned.is_empty() {
            return Err(ReaderError::ExtractionFailed {
                reason: "pasted text is empty".to_string(),
                extracted_len: 0,
            });
        }
        Ok(NewDocument::new(paste_name(&cleaned), cleaned))
    }

    pub fn from_url(&self, url: &str) -> Result<NewDocument> {
        let url = url.trim();
        let html = self.fetcher.fetch(url)?;
        let extracted = self.extractor.extract(&html)?;
        let name = extracted
            .title
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| url.to_string());
        info!(url, chars = extracted.text.chars().count(), source = ?extracted.source, "Extracted page");
        Ok(NewDocument::new(name, extracted.text))
    }

    pub fn from_file(&self, file: &SourceFile) -> Result<NewDocument> {
        if looks_like_image(&file.name, &file.bytes) {
            return self.recognize(file);
        }
        let text = decode_text(&file.name, &file.bytes)?;
        if looks_like_html(&file.name) {
            let extracted = self.extractor.extract(&text)?;
            return Ok(NewDocument::new(file.name.clone(), extracted.text));
        }
        Ok(NewDocument::new(file.name.clone(), clean_text(&text)))
    }

    fn recognize(&self, file: &SourceFile) -> Result<NewDocument> {
        let Some(ocr) = self.ocr.as_ref() else {
            warn!(name = %file.name, "Image upload without an OCR service");
            return Err(ReaderError::OcrFailed {
                name: file.name.clone(),
                reason: "no OCR service configured".to_string(),
            });
        };
        let text = ocr.recognize(&file.bytes).map_err(|err| match err {
            ReaderError::OcrFailed { .. } => err,
            other => ReaderError::OcrFailed {
                name: file.name.clone(),
                reason: other.to_string(),
            },
        })?;
        let cleaned = clean_text(&text);
        if cleaned.is_empty() {
            return Err(ReaderError::OcrFailed {
                name: file.name.clone(),
                reason: "no text recognized".to_string(),
            });
        }
        info!(name = %file.name, chars = cleaned.chars().count(), "Recognized image text");
        Ok(NewDocument::new(file.name.clone(), cleaned))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::extractor::ExtractionSettings;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Serves canned pages; unknown URLs answer 404.
    #[derive(Default)]
    pub(crate) struct StaticFetcher {
        pub(crate) pages: HashMap<String, String>,
    }

    impl PageFetcher for StaticFetcher {
        fn fetch(&self, url: &str) -> Result<String> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| ReaderError::Network {
                    url: url.to_string(),
                    status: Some(404),
                    message: "not found".to_string(),
                })
        }
    }

    pub(crate) struct ScriptedOcr {
        pub(crate) text: String,
        pub(crate) calls: RefCell<usize>,
    }

    impl OcrService for ScriptedOcr {
        fn recognize(&self, _image: &[u8]) -> Result<String> {
            *self.calls.borrow_mut() += 1;
            Ok(self.text.clone())
        }
    }

    pub(crate) const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn ingestor(ocr: Option<Box<dyn OcrService>>) -> Ingestor {
        Ingestor::new(
            ContentExtractor::new(ExtractionSettings::default()),
            Box::new(StaticFetcher::default()),
            ocr,
        )
    }

    #[test]
    fn utf8_is_tried_first() {
        assert_eq!(decode_text("a.txt", "héllo".as_bytes()).unwrap(), "héllo");
    }

    #[test]
    fn falls_back_to_euc_kr() {
        let (bytes, _, _) = encoding_rs::EUC_KR.encode("안녕하세요. 반갑습니다.");
        assert!(std::str::from_utf8(&bytes).is_err());
        assert_eq!(
            decode_text("korean.txt", &bytes).unwrap(),
            "안녕하세요. 반갑습니다."
        );
    }

    #[test]
    fn undecodable_or_empty_input_fails() {
        assert_eq!(
            decode_text("empty.txt", b"").unwrap_err(),
            ReaderError::DecodingFailed {
                name: "empty.txt".into()
            }
        );
        assert!(decode_text("junk.bin", &[0xc3, 0x28, 0xff]).is_err());
    }

    #[test]
    fn images_detected_by_extension_or_magic_bytes() {
        assert!(looks_like_image("scan.JPG", b"whatever"));
        assert!(looks_like_image("upload", PNG_MAGIC));
        assert!(!looks_like_image("notes.txt", b"plain words"));
    }

    #[test]
    fn images_are_routed_through_ocr() {
        let ocr = ScriptedOcr {
            text: "  Recognized   words \n\n\n here ".into(),
            calls: RefCell::new(0),
        };
        let ingest = ingestor(Some(Box::new(ocr)));
        let doc = ingest
            .from_file(&SourceFile::new("page.png", PNG_MAGIC))
            .unwrap();
        assert_eq!(doc.name, "page.png");
        assert_eq!(doc.text, "Recognized words\n\nhere");
    }

    #[test]
    fn text_extension_wins_over_image_magic() {
        let text = "BMW announced a new model today. GIF89a is not an image here.";
        assert!(!looks_like_image("news.txt", text.as_bytes()));
        assert!(!looks_like_image("page.html", b"P1 looks like a bitmap header"));
        assert!(looks_like_image("upload", text.as_bytes()));

        let doc = ingestor(None)
            .from_file(&SourceFile::new("news.txt", text))
            .unwrap();
        assert_eq!(doc.text, text);
    }

    #[test]
    fn image_without_ocr_service_fails() {
        let err = ingestor(None)
            .from_file(&SourceFile::new("page.png", PNG_MAGIC))
            .unwrap_err();
        assert!(matches!(err, ReaderError::OcrFailed { .. }));
    }

    #[test]
    fn html_files_go_through_extraction() {
        let body = "Readable sentence number one. ".repeat(4);
        let html = format!(
            "<html><head><title>T</title></head><body><nav>menu</nav><article>{body}</article></body></html>"
        );
        let doc = ingestor(None)
            .from_file(&SourceFile::new("saved.html", html.into_bytes()))
            .unwrap();
        assert_eq!(doc.name, "saved.html");
        assert!(!doc.text.contains("menu"));
        assert!(doc.text.starts_with("Readable sentence"));
    }

    #[test]
    fn paste_is_cleaned_and_named_from_first_line() {
        let ingest = ingestor(None);
        let doc = ingest.from_paste("\n\n  My  notes \nline two").unwrap();
        assert_eq!(doc.name, "My notes");
        assert_eq!(doc.text, "My notes\nline two");
        assert!(ingest.from_paste(" \n\t ").is_err());

        let long = "word ".repeat(20);
        assert!(paste_name(&long).ends_with('…'));
        assert!(paste_name(&long).chars().count() <= PASTE_NAME_CHARS + 1);
    }

    #[test]
    fn url_documents_use_title_or_url() {
        let body = "Readable sentence number one. ".repeat(4);
        let mut fetcher = StaticFetcher::default();
        fetcher.pages.insert(
            "https://example.com/a".into(),
            format!("<html><head><title>Story</title></head><body><main>{body}</main></body></html>"),
        );
        fetcher.pages.insert(
            "https://example.com/b".into(),
            format!("<html><body><main>{body}</main></body></html>"),
        );
        let ingest = Ingestor::new(
            ContentExtractor::new(ExtractionSettings::default()),
            Box::new(fetcher),
            None,
        );
        assert_eq!(ingest.from_url("https://example.com/a").unwrap().name, "Story");
        assert_eq!(
            ingest.from_url(" https://example.com/b ").unwrap().name,
            "https://example.com/b"
        );
        assert!(matches!(
            ingest.from_url("https://example.com/missing"),
            Err(ReaderError::Network {
                status: Some(404),
                ..
            })
        ));
    }

    #[test]
    fn proxy_prefix_is_prepended() {
        let config = AppConfig {
            proxy_prefix: Some("https://proxy.example/?url=".into()),
            ..AppConfig::default()
        };
        let fetcher = HttpPageFetcher::new(&config).unwrap();
        assert_eq!(
            fetcher.request_url("https://example.com"),
            "https://proxy.example/?url=https://example.com"
        );
        let direct = HttpPageFetcher::new(&AppConfig::default()).unwrap();
        assert_eq!(direct.request_url("https://example.com"), "https://example.com");
    }
}
