//! Content extraction: turn a fetched HTML page into clean prose.
//!
//! Non-content subtrees (scripts, navigation, ads, comment threads, sidebars)
//! never count as candidates and are skipped while collecting text. Candidate containers come from a fixed selector list and are scored by
//! cleaned length; short results fall back to the page's paragraphs and
//! finally to the whole body.

use crate::config::AppConfig;
use crate::error::{ReaderError, Result};
use crate::text_utils::{char_len, clean_text};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::node::Element;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, info, warn};

/// Priority-ordered content containers. Earlier entries win length ties.
const CANDIDATE_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role=main]",
    "#content",
    ".content",
    ".post-content",
    ".entry-content",
    ".article-body",
    ".article-content",
    ".post-body",
    ".story-body",
    ".se-main-container",
    "#postViewArea",
    "#dic_area",
    "#articleBodyContents",
    ".tt_article_useless_p_margin",
];

const NOISE_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "aside", "footer", "form", "iframe", "svg", "button",
    "template", "select", "option",
];

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "header", "h1", "h2", "h3", "h4", "h5", "h6", "li",
    "ul", "ol", "blockquote", "pre", "tr", "table", "figure", "figcaption", "dd", "dt",
];

static RE_NOISE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:ad|ads|adsbygoogle|advert[\w-]*|sponsor[\w-]*|side-?bar[\w-]*|comments?(?:[-_][\w-]+)?|disqus[\w-]*|menu[\w-]*|nav(?:bar|igation)?(?:[-_][\w-]+)?|share[\w-]*|social[\w-]*|related[\w-]*|popup[\w-]*|cookie[\w-]*|banner[\w-]*|breadcrumbs?|footer[\w-]*|subscribe[\w-]*|newsletter[\w-]*)$",
    )
    .unwrap()
});

static CANDIDATES: Lazy<Vec<(&'static str, Selector)>> = Lazy::new(|| {
    CANDIDATE_SELECTORS
        .iter()
        .filter_map(|raw| Selector::parse(raw).ok().map(|sel| (*raw, sel)))
        .collect()
});
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static OG_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:title"]"#).unwrap());

/// Thresholds for the fallback tiers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractionSettings {
    pub min_content_chars: usize,
    /// The paragraph pass replaces a short candidate when
    /// `paragraph_len >= candidate_len * ratio`.
    pub paragraph_fallback_ratio: f64,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            min_content_chars: 50,
            paragraph_fallback_ratio: 1.0,
        }
    }
}

impl From<&AppConfig> for ExtractionSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            min_content_chars: config.min_content_chars,
            paragraph_fallback_ratio: config.paragraph_fallback_ratio,
        }
    }
}

/// Which tier produced the final text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    Candidate(&'static str),
    Paragraphs,
    Body,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub title: Option<String>,
    pub text: String,
    pub source: ExtractionSource,
}

#[derive(Debug, Clone, Default)]
pub struct ContentExtractor {
    settings: ExtractionSettings,
}

impl ContentExtractor {
    pub fn new(settings: ExtractionSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> ExtractionSettings {
        self.settings
    }

    pub fn extract(&self, html: &str) -> Result<Extracted> {
        let document = Html::parse_document(html);
        let title = page_title(&document);
        let min_chars = self.settings.min_content_chars;

        let mut best = String::new();
        let mut best_len = 0usize;
        let mut source = ExtractionSource::Body;
        for (raw, selector) in CANDIDATES.iter() {
            let raw: &'static str = *raw;
            for element in document
                .select(selector)
                .filter(|el| !is_noise(el.value()) && !inside_noise(*el))
            {
                let text = element_text(element);
                let len = char_len(&text);
                if len > best_len {
                    debug!(selector = raw, chars = len, "New best content candidate");
                    best = text;
                    best_len = len;
                    source = ExtractionSource::Candidate(raw);
                }
            }
        }

        if best_len < min_chars {
            let paragraphs = paragraph_text(&document);
            let paragraph_len = char_len(&paragraphs);
            let threshold = best_len as f64 * self.settings.paragraph_fallback_ratio;
            debug!(
                candidate_chars = best_len,
                paragraph_chars = paragraph_len,
                "Candidate too short; trying paragraph fallback"
            );
            if paragraph_len > 0 && paragraph_len as f64 >= threshold {
                best = paragraphs;
                best_len = paragraph_len;
                source = ExtractionSource::Paragraphs;
            }
        }

        if best_len < min_chars {
            let body = document
                .select(&BODY)
                .next()
                .map(element_text)
                .unwrap_or_else(|| element_text(document.root_element()));
            let body_len = char_len(&body);
            if body_len > best_len {
                debug!(body_chars = body_len, "Falling back to whole body text");
                best = body;
                best_len = body_len;
                source = ExtractionSource::Body;
            }
        }

        if best_len < min_chars {
            warn!(
                extracted = best_len,
                required = min_chars,
                "Extraction produced too little content"
            );
            return Err(ReaderError::ExtractionFailed {
                reason: "content too short".to_string(),
                extracted_len: best_len,
            });
        }

        info!(chars = best_len, ?source, "Extracted page content");
        Ok(Extracted {
            title,
            text: best,
            source,
        })
    }
}

/// Pasted text skips extraction; only whitespace is normalized.
pub fn normalize_plain_text(text: &str) -> String {
    clean_text(text)
}

fn page_title(document: &Html) -> Option<String> {
    let og = document
        .select(&OG_TITLE)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(clean_text);
    og.filter(|title| !title.is_empty()).or_else(|| {
        document
            .select(&TITLE)
            .next()
            .map(|title| clean_text(&title.text().collect::<String>()))
            .filter(|title| !title.is_empty())
    })
}

fn paragraph_text(document: &Html) -> String {
    let paragraphs: Vec<String> = document
        .select(&PARAGRAPH)
        .filter(|p| !inside_noise(*p))
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect();
    clean_text(&paragraphs.join("\n\n"))
}

fn element_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(element, &mut out);
    clean_text(&out)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&text.replace(['\n', '\r', '\t'], " ")),
            Node::Element(el) => {
                if is_noise(el) {
                    continue;
                }
                if el.name() == "br" {
                    out.push('\n');
                    continue;
                }
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCK_TAGS.contains(&el.name());
                if block {
                    out.push_str("\n\n");
                }
                collect_text(child_ref, out);
                if block {
                    out.push_str("\n\n");
                }
            }
            _ => {}
        }
    }
}

fn is_noise(element: &Element) -> bool {
    if NOISE_TAGS.contains(&element.name()) {
        return true;
    }
    if element.attr("aria-hidden") == Some("true") {
        return true;
    }
    element.classes().any(|class| RE_NOISE_TOKEN.is_match(class))
        || element.id().is_some_and(|id| RE_NOISE_TOKEN.is_match(id))
}

fn inside_noise(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| is_noise(ancestor.value()))
}
