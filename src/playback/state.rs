use crate::config::AppConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    /// No document selected.
    Idle,
    /// A document is being chunked before playback starts.
    Loading,
    Playing,
    Suspended,
    Stopped,
}

impl fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlaybackPhase::Idle => "idle",
            PlaybackPhase::Loading => "loading",
            PlaybackPhase::Playing => "playing",
            PlaybackPhase::Suspended => "suspended",
            PlaybackPhase::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

/// Identifies one queued utterance. Ids only ever grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Voice and speaking rate applied to every utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "voice")]
    pub voice_id: String,
    pub rate: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            voice_id: String::new(),
            rate: 1.0,
        }
    }
}

impl From<&AppConfig> for Settings {
    fn from(config: &AppConfig) -> Self {
        Self {
            voice_id: config.voice.clone(),
            rate: config.rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub document_index: Option<usize>,
    pub chunk_index: usize,
    pub char_offset: usize,
}

/// Mutable engine state; only engine transitions touch it.
#[derive(Debug, Clone)]
pub struct PlaybackState {
    pub(super) phase: PlaybackPhase,
    pub(super) chunk_index: usize,
    pub(super) char_offset: usize,
    /// Utterance whose callbacks are currently accepted.
    pub(super) utterance: Option<UtteranceId>,
    /// Character offset within the chunk where the current utterance starts.
    pub(super) utterance_base: usize,
    pub(super) last_utterance: u64,
    pub(super) suspended_by_visibility: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            phase: PlaybackPhase::Idle,
            chunk_index: 0,
            char_offset: 0,
            utterance: None,
            utterance_base: 0,
            last_utterance: 0,
            suspended_by_visibility: false,
        }
    }
}

impl PlaybackState {
    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn is_speaking(&self) -> bool {
        matches!(
            self.phase,
            PlaybackPhase::Playing | PlaybackPhase::Loading | PlaybackPhase::Suspended
        )
    }

    pub fn is_paused(&self) -> bool {
        self.phase == PlaybackPhase::Suspended
    }

    pub(super) fn next_utterance_id(&mut self) -> UtteranceId {
        self.last_utterance = self.last_utterance.wrapping_add(1);
        UtteranceId(self.last_utterance)
    }

    pub(super) fn reset_cursor(&mut self) {
        self.chunk_index = 0;
        self.char_offset = 0;
    }

    pub(super) fn move_to_chunk(&mut self, chunk_index: usize) {
        self.chunk_index = chunk_index;
        self.char_offset = 0;
    }
}

/// Read-only view of the engine for status lines and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub phase: PlaybackPhase,
    pub cursor: Cursor,
    pub speaking: bool,
    pub paused: bool,
    pub sequential: bool,
    pub settings: Settings,
    pub document_name: Option<String>,
    pub chunk_count: usize,
    pub document_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_follow_phase() {
        let mut state = PlaybackState::default();
        assert!(!state.is_speaking());
        state.phase = PlaybackPhase::Playing;
        assert!(state.is_speaking() && !state.is_paused());
        state.phase = PlaybackPhase::Suspended;
        assert!(state.is_speaking() && state.is_paused());
        state.phase = PlaybackPhase::Stopped;
        assert!(!state.is_speaking() && !state.is_paused());
    }

    #[test]
    fn utterance_ids_increase() {
        let mut state = PlaybackState::default();
        let first = state.next_utterance_id();
        let second = state.next_utterance_id();
        assert!(second > first);
    }
}
