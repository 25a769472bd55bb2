//! Ties ingestion to the playback engine.

use crate::bookmark::{BookmarkStore, FileStore};
use crate::config::AppConfig;
use crate::error::{ReaderError, Result};
use crate::extractor::{ContentExtractor, ExtractionSettings};
use crate::ingest::{HttpPageFetcher, Ingestor, OcrService, SourceFile};
use crate::library::{InsertPosition, NewDocument};
use crate::playback::{PlaybackEngine, SpeechSynthesizer, resolve_suspend_strategy};
use crate::view::PresentationAdapter;
use tracing::{info, warn};

/// Outcome of a multi-file upload. Failures do not affect the other files.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchReport {
    pub added: Vec<String>,
    pub failed: Vec<(String, ReaderError)>,
    /// Files dropped because the library had no room for them.
    pub skipped: usize,
}

pub struct ReaderSession {
    engine: PlaybackEngine,
    ingestor: Ingestor,
}

impl ReaderSession {
    pub fn new(engine: PlaybackEngine, ingestor: Ingestor) -> Self {
        Self { engine, ingestor }
    }

    /// Build the default stack from configuration and restore the bookmark.
    pub fn from_config(
        config: &AppConfig,
        speech: Box<dyn SpeechSynthesizer>,
        view: Box<dyn PresentationAdapter>,
        ocr: Option<Box<dyn OcrService>>,
    ) -> Result<Self> {
        let fetcher = HttpPageFetcher::new(config)?;
        let ingestor = Ingestor::new(
            ContentExtractor::new(ExtractionSettings::from(config)),
            Box::new(fetcher),
            ocr,
        );
        let store = FileStore::new(&config.state_path);
        info!(path = %store.path().display(), "Using state store");
        let mut engine = PlaybackEngine::new(
            config,
            speech,
            view,
            resolve_suspend_strategy(config.suspend_strategy, &config.user_agent),
            BookmarkStore::new(Box::new(store)),
        );
        engine.restore_bookmark();
        Ok(Self::new(engine, ingestor))
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut PlaybackEngine {
        &mut self.engine
    }

    /// Pasted text goes to the front of the library.
    pub fn open_paste(&mut self, text: &str) -> Result<usize> {
        let result = self.ingestor.from_paste(text);
        self.insert(result, InsertPosition::Front, "pasted text")
    }

    /// A fetched page goes to the front of the library.
    pub fn open_url(&mut self, url: &str) -> Result<usize> {
        let result = self.ingestor.from_url(url);
        self.insert(result, InsertPosition::Front, url)
    }

    /// Files are appended in order. The batch is cut to the room left in the
    /// library and each failing file is reported once.
    pub fn open_files(&mut self, files: Vec<SourceFile>) -> BatchReport {
        let mut report = BatchReport::default();
        let room = self.engine.library().remaining_room();
        if files.len() > room {
            report.skipped = files.len() - room;
            warn!(room, skipped = report.skipped, "Upload exceeds library capacity");
            self.engine.notify(&format!(
                "Library limit reached: added {room} of {} files",
                files.len()
            ));
        }

        for file in files.into_iter().take(room) {
            let added = self
                .ingestor
                .from_file(&file)
                .and_then(|doc| self.engine.add_document(doc, InsertPosition::Back));
            match added {
                Ok(_) => report.added.push(file.name),
                Err(err) => {
                    warn!(name = %file.name, "Failed to load file: {err}");
                    self.engine.notify_error(&format!("{}: {err}", file.name));
                    report.failed.push((file.name, err));
                }
            }
        }
        info!(
            added = report.added.len(),
            failed = report.failed.len(),
            skipped = report.skipped,
            "Processed upload batch"
        );
        report
    }

    /// Save the bookmark and release the synthesizer.
    pub fn shutdown(&mut self) {
        self.engine.shutdown();
    }

    fn insert(
        &mut self,
        doc: Result<NewDocument>,
        position: InsertPosition,
        label: &str,
    ) -> Result<usize> {
        let inserted = doc.and_then(|doc| self.engine.add_document(doc, position));
        match inserted {
            Ok(inserted) => Ok(inserted.index),
            Err(err) => {
                warn!(source = label, "Failed to open document: {err}");
                self.engine.notify_error(&err.to_string());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmark::{Bookmark, KeyValueStore, MemoryStore, BOOKMARK_KEY};
    use crate::config::OverflowPolicy;
    use crate::ingest::tests::{PNG_MAGIC, StaticFetcher};
    use crate::playback::{PlaybackPhase, Settings, TruePause, Utterance};
    use crate::view::{PlaylistEntry, TranscriptWindow};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Spoken(Vec<String>);

    struct RecordingSpeech(Rc<RefCell<Spoken>>);

    impl SpeechSynthesizer for RecordingSpeech {
        fn speak(&mut self, utterance: &Utterance) -> Result<()> {
            self.0.borrow_mut().0.push(utterance.text.clone());
            Ok(())
        }
        fn cancel(&mut self) {}
        fn pause(&mut self) {}
        fn resume(&mut self) {}
        fn is_speaking(&self) -> bool {
            false
        }
    }

    #[derive(Default)]
    struct Notices {
        info: Vec<String>,
        errors: Vec<String>,
        playlist: Vec<String>,
    }

    struct RecordingView(Rc<RefCell<Notices>>);

    impl PresentationAdapter for RecordingView {
        fn render_transcript_window(&mut self, _window: TranscriptWindow<'_>) {}
        fn render_playlist(&mut self, entries: &[PlaylistEntry]) {
            self.0.borrow_mut().playlist = entries.iter().map(|e| e.name.clone()).collect();
        }
        fn notify_error(&mut self, message: &str) {
            self.0.borrow_mut().errors.push(message.to_string());
        }
        fn notify(&mut self, message: &str) {
            self.0.borrow_mut().info.push(message.to_string());
        }
        fn confirm_resume(&mut self, _document_name: &str, _chunk_index: usize) -> bool {
            true
        }
    }

    struct Fixture {
        session: ReaderSession,
        spoken: Rc<RefCell<Spoken>>,
        notices: Rc<RefCell<Notices>>,
    }

    fn fixture(max_documents: usize, store: MemoryStore) -> Fixture {
        let config = AppConfig {
            max_documents,
            overflow: OverflowPolicy::EvictOldest,
            ..AppConfig::default()
        };
        let spoken = Rc::new(RefCell::new(Spoken::default()));
        let notices = Rc::new(RefCell::new(Notices::default()));
        let mut fetcher = StaticFetcher::default();
        fetcher.pages.insert(
            "https://news.example/story".into(),
            format!(
                "<html><head><title>Story</title></head><body><article>{}</article></body></html>",
                "A sentence worth reading aloud. ".repeat(3)
            ),
        );
        let mut engine = PlaybackEngine::new(
            &config,
            Box::new(RecordingSpeech(spoken.clone())),
            Box::new(RecordingView(notices.clone())),
            Box::new(TruePause),
            BookmarkStore::new(Box::new(store)),
        );
        engine.restore_bookmark();
        let ingestor = Ingestor::new(
            ContentExtractor::new(ExtractionSettings::from(&config)),
            Box::new(fetcher),
            None,
        );
        Fixture {
            session: ReaderSession::new(engine, ingestor),
            spoken,
            notices,
        }
    }

    fn names(session: &ReaderSession) -> Vec<String> {
        session
            .engine()
            .library()
            .iter()
            .map(|doc| doc.name().to_string())
            .collect()
    }

    #[test]
    fn paste_and_url_go_to_front_files_to_back() {
        let mut fx = fixture(10, MemoryStore::new());
        fx.session
            .open_files(vec![SourceFile::new("one.txt", "File one.")]);
        fx.session.open_paste("Pasted words here.").unwrap();
        fx.session.open_url("https://news.example/story").unwrap();
        assert_eq!(
            names(&fx.session),
            vec!["Story", "Pasted words here.", "one.txt"]
        );
        assert_eq!(fx.notices.borrow().playlist, names(&fx.session));
    }

    #[test]
    fn failures_are_reported_once_and_isolated() {
        let mut fx = fixture(10, MemoryStore::new());
        let (korean, _, _) = encoding_rs::EUC_KR.encode("한국어 문장입니다.");
        let report = fx.session.open_files(vec![
            SourceFile::new("good.txt", "Plain text."),
            SourceFile::new("broken.txt", vec![0xc3u8, 0x28, 0xff]),
            SourceFile::new("korean.txt", korean.into_owned()),
            SourceFile::new("scan.png", PNG_MAGIC),
        ]);

        assert_eq!(report.added, vec!["good.txt", "korean.txt"]);
        assert_eq!(report.failed.len(), 2);
        assert!(matches!(
            report.failed[0].1,
            ReaderError::DecodingFailed { .. }
        ));
        assert!(matches!(report.failed[1].1, ReaderError::OcrFailed { .. }));
        assert_eq!(fx.notices.borrow().errors.len(), 2);
        assert_eq!(names(&fx.session), vec!["good.txt", "korean.txt"]);
    }

    #[test]
    fn batch_is_truncated_to_remaining_room() {
        let mut fx = fixture(3, MemoryStore::new());
        fx.session.open_paste("Already here.").unwrap();
        let files = (0..4)
            .map(|i| SourceFile::new(format!("f{i}.txt"), format!("File {i}.")))
            .collect();
        let report = fx.session.open_files(files);

        assert_eq!(report.added, vec!["f0.txt", "f1.txt"]);
        assert_eq!(report.skipped, 2);
        assert_eq!(fx.notices.borrow().info.len(), 1);
        assert_eq!(fx.session.engine().library().len(), 3);
    }

    #[test]
    fn failed_url_is_reported() {
        let mut fx = fixture(10, MemoryStore::new());
        let err = fx
            .session
            .open_url("https://news.example/missing")
            .unwrap_err();
        assert!(matches!(err, ReaderError::Network { .. }));
        assert_eq!(fx.notices.borrow().errors.len(), 1);
        assert!(fx.session.engine().library().is_empty());
    }

    #[test]
    fn matching_upload_resumes_from_bookmark() {
        let mut store = MemoryStore::new();
        let bookmark = Bookmark {
            file_id: "doc-0-000000000000".into(),
            file_name: "book.txt".into(),
            chunk_index: 1,
            is_sequential: true,
            settings: Settings {
                voice_id: "v".into(),
                rate: 1.0,
            },
        };
        store
            .set(BOOKMARK_KEY, serde_json::to_string(&bookmark).unwrap())
            .unwrap();
        let mut fx = fixture(10, store);
        assert!(fx.session.engine().is_sequential());

        let text = format!("{}\n{}", "a".repeat(400), "b".repeat(400));
        fx.session
            .open_files(vec![SourceFile::new("book.txt", text)]);

        assert_eq!(fx.session.engine().phase(), PlaybackPhase::Playing);
        assert_eq!(fx.session.engine().cursor().chunk_index, 1);
        assert_eq!(fx.spoken.borrow().0, vec!["b".repeat(400)]);

        fx.session.shutdown();
    }
}
