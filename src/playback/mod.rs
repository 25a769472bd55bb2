//! Playback engine: walks the active document chunk by chunk through the
//! speech synthesizer.
//!
//! Every request becomes a [`Command`]; `reduce` mutates [`PlaybackState`] and
//! returns the [`Effect`]s to perform, and `run_effect` performs them against
//! the synthesizer, the view and the bookmark store. An effect may feed a
//! follow-up command back in (a synchronous synthesis rejection, for one).

mod speech;
mod state;
mod suspend;
mod transitions;


pub use speech::{SpeechEvent, SpeechEventKind, SpeechSynthesizer, Utterance};
pub use state::{Cursor, PlaybackPhase, PlaybackState, Settings, Snapshot, UtteranceId};
pub use suspend::{
    CancelAndRestart, SuspendStrategy, Suspension, TruePause, resolve as resolve_suspend_strategy,
};

use crate::bookmark::{Bookmark, BookmarkStore};
use crate::config::AppConfig;
use crate::error::{ReaderError, Result};
use crate::library::{InsertPosition, Inserted, Library, NewDocument};
use crate::view::{PlaylistEntry, PresentationAdapter, TranscriptWindow};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Requests the engine understands.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    SelectDocument(usize),
    Play,
    Pause,
    Resume,
    Stop,
    JumpToChunk(usize),
    ResumeAt { document: usize, chunk: usize },
    Speech(SpeechEvent),
    VisibilityChanged { visible: bool },
    SetSettings(Settings),
    SetSequential(bool),
}

/// Work that must be performed outside the reducer.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Effect {
    Speak(Utterance),
    CancelSpeech,
    PauseSpeech,
    ResumeSpeech,
    KeepAwake(bool),
    RenderTranscript,
    RenderPlaylist,
    SaveBookmark,
    Notify(String),
    NotifyError(String),
}

/// Number of chunks rendered around the active one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub before: usize,
    pub after: usize,
}

impl Default for WindowSize {
    fn default() -> Self {
        Self {
            before: 20,
            after: 30,
        }
    }
}

pub struct PlaybackEngine {
    library: Library,
    state: PlaybackState,
    settings: Settings,
    sequential: bool,
    chunk_limit: usize,
    window: WindowSize,
    speech: Box<dyn SpeechSynthesizer>,
    view: Box<dyn PresentationAdapter>,
    suspend: Box<dyn SuspendStrategy>,
    bookmarks: BookmarkStore,
    pending_resume: Option<Bookmark>,
}

impl PlaybackEngine {
    pub fn new(
        config: &AppConfig,
        speech: Box<dyn SpeechSynthesizer>,
        view: Box<dyn PresentationAdapter>,
        suspend: Box<dyn SuspendStrategy>,
        bookmarks: BookmarkStore,
    ) -> Self {
        Self {
            library: Library::from(config),
            state: PlaybackState::default(),
            settings: Settings::from(config),
            sequential: config.sequential,
            chunk_limit: config.chunk_max_chars.max(1),
            window: WindowSize {
                before: config.transcript_before,
                after: config.transcript_after,
            },
            speech,
            view,
            suspend,
            bookmarks,
            pending_resume: None,
        }
    }

    /// Restore sequential mode and settings from the stored bookmark. The
    /// position itself is only offered once a document with the same name is
    /// added.
    pub fn restore_bookmark(&mut self) -> Option<&Bookmark> {
        let bookmark = self.bookmarks.load()?;
        info!(
            file = %bookmark.file_name,
            chunk = bookmark.chunk_index,
            sequential = bookmark.is_sequential,
            "Restored bookmark settings"
        );
        self.sequential = bookmark.is_sequential;
        self.settings = bookmark.settings.clone();
        self.pending_resume = Some(bookmark);
        self.pending_resume.as_ref()
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.state.phase
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_sequential(&self) -> bool {
        self.sequential
    }

    pub fn cursor(&self) -> Cursor {
        Cursor {
            document_index: self.library.active_index(),
            chunk_index: self.state.chunk_index,
            char_offset: self.state.char_offset,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let active = self.library.active();
        Snapshot {
            phase: self.state.phase,
            cursor: self.cursor(),
            speaking: self.state.is_speaking(),
            paused: self.state.is_paused(),
            sequential: self.sequential,
            settings: self.settings.clone(),
            document_name: active.map(|doc| doc.name().to_string()),
            chunk_count: active.map(|doc| doc.chunks().len()).unwrap_or(0),
            document_count: self.library.len(),
        }
    }

    pub fn select_document(&mut self, index: usize) -> Result<()> {
        self.check_document(index)?;
        self.apply(Command::SelectDocument(index));
        Ok(())
    }

    pub fn play(&mut self) {
        self.apply(Command::Play);
    }

    pub fn pause(&mut self) {
        self.apply(Command::Pause);
    }

    pub fn resume(&mut self) {
        self.apply(Command::Resume);
    }

    pub fn stop(&mut self) {
        self.apply(Command::Stop);
    }

    pub fn jump_to_chunk(&mut self, index: usize) -> Result<()> {
        let len = self.active_chunk_count();
        if index >= len {
            return Err(ReaderError::IndexOutOfRange { index, len });
        }
        self.apply(Command::JumpToChunk(index));
        Ok(())
    }

    pub fn next_chunk(&mut self) -> Result<()> {
        self.jump_to_chunk(self.state.chunk_index + 1)
    }

    pub fn previous_chunk(&mut self) -> Result<()> {
        self.jump_to_chunk(self.state.chunk_index.saturating_sub(1))
    }

    pub fn next_document(&mut self) -> Result<()> {
        let next = self.library.active_index().map_or(0, |idx| idx + 1);
        self.select_document(next)
    }

    pub fn previous_document(&mut self) -> Result<()> {
        let previous = self.library.active_index().unwrap_or(0).saturating_sub(1);
        self.select_document(previous)
    }

    pub fn handle_speech_event(&mut self, event: SpeechEvent) {
        self.apply(Command::Speech(event));
    }

    pub fn visibility_changed(&mut self, visible: bool) {
        self.apply(Command::VisibilityChanged { visible });
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.apply(Command::SetSettings(settings));
    }

    pub fn set_sequential_mode(&mut self, sequential: bool) {
        self.apply(Command::SetSequential(sequential));
    }

    /// Add a document and, if it matches the restored bookmark, offer to resume it.
    pub fn add_document(&mut self, doc: NewDocument, position: InsertPosition) -> Result<Inserted> {
        let inserted = self.library.add_document(doc, position)?;
        self.render_playlist();
        self.offer_resume(inserted.index);
        Ok(inserted)
    }

    pub fn remove_document(&mut self, index: usize) -> Result<()> {
        self.check_document(index)?;
        if self.library.active_index() == Some(index) {
            self.apply(Command::Stop);
        }
        self.library.remove_document(index)?;
        if self.library.active_index().is_none() {
            self.state.phase = PlaybackPhase::Idle;
            self.state.reset_cursor();
        }
        self.render_playlist();
        Ok(())
    }

    pub fn reorder(&mut self, old_index: usize, new_index: usize) -> Result<()> {
        self.library.reorder(old_index, new_index)?;
        self.render_playlist();
        Ok(())
    }

    pub fn clear_library(&mut self) {
        self.apply(Command::Stop);
        self.library.clear();
        self.state.phase = PlaybackPhase::Idle;
        self.pending_resume = None;
        if let Err(err) = self.bookmarks.clear() {
            warn!("Failed to clear bookmark: {err}");
        }
        self.render_playlist();
    }

    pub fn notify(&mut self, message: &str) {
        self.view.notify(message);
    }

    pub fn notify_error(&mut self, message: &str) {
        self.view.notify_error(message);
    }

    /// Persist the current position; called before the host exits.
    pub fn shutdown(&mut self) {
        info!(phase = %self.state.phase, "Shutting down playback");
        self.save_bookmark();
        if self.state.utterance.take().is_some() {
            self.speech.cancel();
        }
        self.view.keep_awake(false);
    }

    pub(crate) fn apply(&mut self, command: Command) {
        let mut queue = VecDeque::from([command]);
        while let Some(command) = queue.pop_front() {
            let effects = self.reduce(command);
            for effect in effects {
                if let Some(follow_up) = self.run_effect(effect) {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    fn reduce(&mut self, command: Command) -> Vec<Effect> {
        let mut effects = Vec::new();
        match command {
            Command::SelectDocument(index) => self.handle_select_document(index, &mut effects),
            Command::Play => self.handle_play(&mut effects),
            Command::Pause => self.handle_pause(false, &mut effects),
            Command::Resume => self.handle_resume(&mut effects),
            Command::Stop => self.handle_stop(&mut effects),
            Command::JumpToChunk(index) => self.handle_jump_to_chunk(index, &mut effects),
            Command::ResumeAt { document, chunk } => {
                self.handle_resume_at(document, chunk, &mut effects)
            }
            Command::Speech(event) => self.handle_speech(event, &mut effects),
            Command::VisibilityChanged { visible } => {
                self.handle_visibility_changed(visible, &mut effects)
            }
            Command::SetSettings(settings) => self.handle_set_settings(settings, &mut effects),
            Command::SetSequential(sequential) => {
                self.handle_set_sequential(sequential, &mut effects)
            }
        }
        effects
    }

    fn run_effect(&mut self, effect: Effect) -> Option<Command> {
        match effect {
            Effect::Speak(utterance) => {
                debug!(
                    utterance = %utterance.id,
                    chunk = self.state.chunk_index,
                    offset = self.state.utterance_base,
                    "Speaking chunk"
                );
                if let Err(err) = self.speech.speak(&utterance) {
                    warn!(utterance = %utterance.id, "Synthesizer rejected utterance: {err}");
                    let reason = match err {
                        ReaderError::Synthesis { reason } => reason,
                        other => other.to_string(),
                    };
                    return Some(Command::Speech(SpeechEvent::new(
                        utterance.id,
                        SpeechEventKind::Failed { reason },
                    )));
                }
            }
            Effect::CancelSpeech => self.speech.cancel(),
            Effect::PauseSpeech => self.speech.pause(),
            Effect::ResumeSpeech => self.speech.resume(),
            Effect::KeepAwake(enabled) => self.view.keep_awake(enabled),
            Effect::RenderTranscript => self.render_transcript(),
            Effect::RenderPlaylist => self.render_playlist(),
            Effect::SaveBookmark => self.save_bookmark(),
            Effect::Notify(message) => self.view.notify(&message),
            Effect::NotifyError(message) => self.view.notify_error(&message),
        }
        None
    }

    fn render_transcript(&mut self) {
        let Some(doc) = self.library.active() else {
            return;
        };
        let chunks = doc.chunks();
        let active = self.state.chunk_index;
        let first = active.saturating_sub(self.window.before).min(chunks.len());
        let end = active
            .saturating_add(self.window.after)
            .saturating_add(1)
            .min(chunks.len());
        self.view.render_transcript_window(TranscriptWindow {
            document_name: doc.name(),
            first_index: first,
            chunks: &chunks[first..end.max(first)],
            active_index: (active < chunks.len()).then_some(active),
            chunk_count: chunks.len(),
        });
    }

    fn render_playlist(&mut self) {
        let active = self.library.active_index();
        let entries: Vec<PlaylistEntry> = self
            .library
            .iter()
            .enumerate()
            .map(|(idx, doc)| PlaylistEntry {
                name: doc.name().to_string(),
                active: Some(idx) == active,
            })
            .collect();
        self.view.render_playlist(&entries);
    }

    fn save_bookmark(&mut self) {
        let Some(doc) = self.library.active() else {
            return;
        };
        let bookmark = Bookmark {
            file_id: doc.id().to_string(),
            file_name: doc.name().to_string(),
            chunk_index: self.state.chunk_index,
            is_sequential: self.sequential,
            settings: self.settings.clone(),
        };
        if let Err(err) = self.bookmarks.save(&bookmark) {
            warn!("Failed to save bookmark: {err}");
        }
    }

    fn offer_resume(&mut self, index: usize) {
        let Some(name) = self.library.get(index).map(|doc| doc.name().to_string()) else {
            return;
        };
        let matches = self
            .pending_resume
            .as_ref()
            .is_some_and(|bookmark| bookmark.file_name == name);
        if !matches {
            return;
        }
        let Some(bookmark) = self.pending_resume.take() else {
            return;
        };
        if self.view.confirm_resume(&name, bookmark.chunk_index) {
            info!(file = %name, chunk = bookmark.chunk_index, "Resuming from bookmark");
            self.apply(Command::ResumeAt {
                document: index,
                chunk: bookmark.chunk_index,
            });
        } else {
            info!(file = %name, "Bookmark resume declined");
        }
    }

    fn active_chunk_count(&mut self) -> usize {
        let limit = self.chunk_limit;
        self.library
            .active_mut()
            .map(|doc| doc.ensure_chunked(limit).len())
            .unwrap_or(0)
    }

    fn check_document(&self, index: usize) -> Result<()> {
        if index < self.library.len() {
            Ok(())
        } else {
            Err(ReaderError::IndexOutOfRange {
                index,
                len: self.library.len(),
            })
        }
    }
}
