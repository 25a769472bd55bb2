use super::speech::{SpeechEvent, SpeechEventKind, Utterance};
use super::state::{PlaybackPhase, Settings};
use super::suspend::Suspension;
use super::{Effect, PlaybackEngine};
use crate::text_utils::{char_len, tail_from_char, word_start};
use tracing::{debug, info, warn};

impl PlaybackEngine {
    pub(super) fn handle_select_document(&mut self, index: usize, effects: &mut Vec<Effect>) {
        let was_speaking = self.state.is_speaking();
        self.cancel_utterance(effects);
        if let Err(err) = self.library.set_active(index) {
            warn!("Cannot select document: {err}");
            return;
        }
        self.state.phase = PlaybackPhase::Loading;
        self.state.suspended_by_visibility = false;
        self.state.reset_cursor();
        let chunk_count = self.ensure_active_chunked();
        info!(index, chunk_count, was_speaking, "Selected document");

        effects.push(Effect::RenderPlaylist);
        if was_speaking {
            self.state.phase = PlaybackPhase::Playing;
            self.speak_current(effects);
        } else {
            self.state.phase = PlaybackPhase::Stopped;
        }
        effects.push(Effect::RenderTranscript);
        effects.push(Effect::SaveBookmark);
    }

    pub(super) fn handle_play(&mut self, effects: &mut Vec<Effect>) {
        match self.state.phase {
            PlaybackPhase::Suspended => return self.handle_resume(effects),
            PlaybackPhase::Playing | PlaybackPhase::Loading => {
                debug!(phase = %self.state.phase, "Play ignored; already speaking");
                return;
            }
            PlaybackPhase::Idle | PlaybackPhase::Stopped => {}
        }

        if self.library.active_index().is_none() {
            if self.library.is_empty() {
                debug!("Play ignored; library is empty");
                return;
            }
            if let Err(err) = self.library.set_active(0) {
                warn!("Cannot select first document: {err}");
                return;
            }
            self.state.reset_cursor();
            effects.push(Effect::RenderPlaylist);
        }

        self.state.phase = PlaybackPhase::Loading;
        let chunk_count = self.ensure_active_chunked();
        if self.state.chunk_index >= chunk_count {
            self.state.reset_cursor();
        }
        self.state.phase = PlaybackPhase::Playing;
        info!(
            chunk = self.state.chunk_index,
            offset = self.state.char_offset,
            "Starting playback from cursor"
        );
        effects.push(Effect::KeepAwake(true));
        self.speak_current(effects);
        effects.push(Effect::RenderTranscript);
    }

    pub(super) fn handle_pause(&mut self, by_visibility: bool, effects: &mut Vec<Effect>) {
        if self.state.phase != PlaybackPhase::Playing {
            debug!(phase = %self.state.phase, "Pause ignored; not playing");
            return;
        }
        self.state.phase = PlaybackPhase::Suspended;
        self.state.suspended_by_visibility = by_visibility;
        match self.suspend.suspension() {
            Suspension::PausedInPlace => effects.push(Effect::PauseSpeech),
            Suspension::Cancelled => self.cancel_utterance(effects),
        }
        info!(
            strategy = %self.suspend.kind(),
            by_visibility,
            chunk = self.state.chunk_index,
            offset = self.state.char_offset,
            "Suspended playback"
        );
        effects.push(Effect::SaveBookmark);
    }

    pub(super) fn handle_resume(&mut self, effects: &mut Vec<Effect>) {
        if self.state.phase != PlaybackPhase::Suspended {
            debug!(phase = %self.state.phase, "Resume ignored; not suspended");
            return;
        }
        self.state.phase = PlaybackPhase::Playing;
        self.state.suspended_by_visibility = false;
        effects.push(Effect::KeepAwake(true));
        if self.suspend.suspension() == Suspension::PausedInPlace && self.state.utterance.is_some()
        {
            info!("Resuming paused utterance");
            effects.push(Effect::ResumeSpeech);
            return;
        }
        self.snap_offset_to_word();
        info!(
            chunk = self.state.chunk_index,
            offset = self.state.char_offset,
            "Restarting chunk from recorded offset"
        );
        self.speak_current(effects);
        effects.push(Effect::RenderTranscript);
    }

    pub(super) fn handle_stop(&mut self, effects: &mut Vec<Effect>) {
        self.cancel_utterance(effects);
        self.halt(effects);
        info!(phase = %self.state.phase, "Stopped playback");
        effects.push(Effect::RenderTranscript);
    }

    pub(super) fn handle_jump_to_chunk(&mut self, index: usize, effects: &mut Vec<Effect>) {
        let chunk_count = self.ensure_active_chunked();
        if index >= chunk_count {
            warn!(index, chunk_count, "Jump target out of range");
            return;
        }
        self.cancel_utterance(effects);
        self.state.move_to_chunk(index);
        self.state.phase = PlaybackPhase::Playing;
        self.state.suspended_by_visibility = false;
        info!(index, "Jumping to chunk");
        effects.push(Effect::KeepAwake(true));
        self.speak_current(effects);
        effects.push(Effect::RenderTranscript);
        effects.push(Effect::SaveBookmark);
    }

    pub(super) fn handle_resume_at(
        &mut self,
        document: usize,
        chunk: usize,
        effects: &mut Vec<Effect>,
    ) {
        self.cancel_utterance(effects);
        if let Err(err) = self.library.set_active(document) {
            warn!("Cannot resume document: {err}");
            return;
        }
        self.state.phase = PlaybackPhase::Loading;
        let chunk_count = self.ensure_active_chunked();
        let clamped = chunk.min(chunk_count.saturating_sub(1));
        self.state.move_to_chunk(clamped);
        self.state.phase = PlaybackPhase::Playing;
        self.state.suspended_by_visibility = false;
        info!(document, chunk = clamped, requested = chunk, "Resuming at saved chunk");
        effects.push(Effect::RenderPlaylist);
        effects.push(Effect::KeepAwake(true));
        self.speak_current(effects);
        effects.push(Effect::RenderTranscript);
        effects.push(Effect::SaveBookmark);
    }

    pub(super) fn handle_speech(&mut self, event: SpeechEvent, effects: &mut Vec<Effect>) {
        if Some(event.utterance) != self.state.utterance {
            debug!(
                utterance = %event.utterance,
                current = ?self.state.utterance,
                "Ignoring stale speech event"
            );
            return;
        }

        match event.kind {
            SpeechEventKind::Started => {
                debug!(utterance = %event.utterance, "Utterance started");
            }
            SpeechEventKind::Boundary { char_index } => {
                let chunk_len = self.current_chunk().map(char_len).unwrap_or(0);
                let offset = self.state.utterance_base.saturating_add(char_index);
                self.state.char_offset = offset.min(chunk_len.saturating_sub(1));
            }
            SpeechEventKind::Ended => {
                self.state.utterance = None;
                self.state.move_to_chunk(self.state.chunk_index + 1);
                debug!(next_chunk = self.state.chunk_index, "Utterance ended");
                effects.push(Effect::SaveBookmark);
                if self.state.phase == PlaybackPhase::Playing {
                    self.speak_current(effects);
                }
                effects.push(Effect::RenderTranscript);
            }
            SpeechEventKind::Failed { reason } => {
                self.state.utterance = None;
                warn!(utterance = %event.utterance, %reason, "Speech synthesis failed");
                effects.push(Effect::NotifyError(format!("Speech synthesis failed: {reason}")));
                self.halt(effects);
                effects.push(Effect::RenderTranscript);
            }
        }
    }

    pub(super) fn handle_visibility_changed(&mut self, visible: bool, effects: &mut Vec<Effect>) {
        if !visible {
            if self.state.phase == PlaybackPhase::Playing {
                self.handle_pause(true, effects);
            }
            return;
        }
        if self.state.phase == PlaybackPhase::Suspended && self.state.suspended_by_visibility {
            self.handle_resume(effects);
        } else {
            debug!(phase = %self.state.phase, "Visibility regained; nothing to resume");
        }
    }

    pub(super) fn handle_set_settings(&mut self, settings: Settings, effects: &mut Vec<Effect>) {
        if settings == self.settings {
            return;
        }
        info!(voice = %settings.voice_id, rate = settings.rate, "Updated speech settings");
        self.settings = settings;
        match self.state.phase {
            PlaybackPhase::Playing => {
                self.cancel_utterance(effects);
                self.snap_offset_to_word();
                self.speak_current(effects);
            }
            // A held utterance would keep the old voice; resume speaks afresh.
            PlaybackPhase::Suspended => self.cancel_utterance(effects),
            _ => {}
        }
        effects.push(Effect::SaveBookmark);
    }

    pub(super) fn handle_set_sequential(&mut self, sequential: bool, effects: &mut Vec<Effect>) {
        if self.sequential != sequential {
            self.sequential = sequential;
            info!(sequential, "Updated sequential mode");
            effects.push(Effect::SaveBookmark);
        }
    }

    /// Queue the chunk under the cursor, skipping blank chunks and crossing
    /// into the next document when the current one runs out.
    fn speak_current(&mut self, effects: &mut Vec<Effect>) {
        loop {
            let limit = self.chunk_limit;
            let Some(doc) = self.library.active_mut() else {
                self.halt(effects);
                return;
            };
            let chunks = doc.ensure_chunked(limit);
            let Some(chunk) = chunks.get(self.state.chunk_index) else {
                if self.advance_document(effects) {
                    continue;
                }
                return;
            };
            if chunk.trim().is_empty() {
                debug!(chunk = self.state.chunk_index, "Skipping empty chunk");
                let next = self.state.chunk_index + 1;
                self.state.move_to_chunk(next);
                continue;
            }

            let text = tail_from_char(chunk, self.state.char_offset).to_string();
            let id = self.state.next_utterance_id();
            self.state.utterance = Some(id);
            self.state.utterance_base = self.state.char_offset;
            effects.push(Effect::Speak(Utterance {
                id,
                text,
                voice: self.settings.voice_id.clone(),
                rate: self.settings.rate,
            }));
            return;
        }
    }

    /// Move past the end of the active document. Returns true when playback
    /// continues in the next document.
    fn advance_document(&mut self, effects: &mut Vec<Effect>) -> bool {
        let next = self.library.active_index().map(|idx| idx + 1);
        if !self.sequential {
            info!("Reached end of document");
            self.halt(effects);
            return false;
        }
        match next {
            Some(next) if next < self.library.len() => {
                if let Err(err) = self.library.set_active(next) {
                    warn!("Cannot advance to next document: {err}");
                    self.halt(effects);
                    return false;
                }
                self.state.reset_cursor();
                info!(index = next, "Advancing to next document");
                effects.push(Effect::RenderPlaylist);
                effects.push(Effect::SaveBookmark);
                true
            }
            _ => {
                info!("Reached end of library");
                effects.push(Effect::Notify("End of library".to_string()));
                self.halt(effects);
                false
            }
        }
    }

    /// Stop bookkeeping shared by `stop()`, failures and the end of playback.
    fn halt(&mut self, effects: &mut Vec<Effect>) {
        self.state.utterance = None;
        self.state.suspended_by_visibility = false;
        self.state.reset_cursor();
        self.state.phase = if self.library.active_index().is_some() {
            PlaybackPhase::Stopped
        } else {
            PlaybackPhase::Idle
        };
        effects.push(Effect::KeepAwake(false));
    }

    fn cancel_utterance(&mut self, effects: &mut Vec<Effect>) {
        if let Some(id) = self.state.utterance.take() {
            debug!(utterance = %id, "Cancelling utterance");
            effects.push(Effect::CancelSpeech);
        } else if self.state.phase == PlaybackPhase::Suspended {
            effects.push(Effect::CancelSpeech);
        }
    }

    fn snap_offset_to_word(&mut self) {
        let snapped = self
            .current_chunk()
            .map(|chunk| word_start(chunk, self.state.char_offset))
            .unwrap_or(0);
        self.state.char_offset = snapped;
    }

    fn current_chunk(&self) -> Option<&str> {
        self.library
            .active()
            .and_then(|doc| doc.chunks().get(self.state.chunk_index))
            .map(String::as_str)
    }

    fn ensure_active_chunked(&mut self) -> usize {
        let limit = self.chunk_limit;
        self.library
            .active_mut()
            .map(|doc| doc.ensure_chunked(limit).len())
            .unwrap_or(0)
    }
}
