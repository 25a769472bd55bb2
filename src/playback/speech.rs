use super::state::UtteranceId;
use crate::error::Result;

/// One chunk (or the unspoken rest of it) handed to the synthesizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    pub voice: String,
    pub rate: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpeechEventKind {
    Started,
    /// Character index relative to the utterance text.
    Boundary { char_index: usize },
    Ended,
    Failed { reason: String },
}

/// Callback from the synthesizer, tagged with the utterance it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechEvent {
    pub utterance: UtteranceId,
    pub kind: SpeechEventKind,
}

impl SpeechEvent {
    pub fn new(utterance: UtteranceId, kind: SpeechEventKind) -> Self {
        Self { utterance, kind }
    }
}

/// The speech engine. Events come back through
/// [`PlaybackEngine::handle_speech_event`](super::PlaybackEngine::handle_speech_event).
pub trait SpeechSynthesizer {
    /// Queue an utterance. A synchronous rejection is treated like a failure callback.
    fn speak(&mut self, utterance: &Utterance) -> Result<()>;
    fn cancel(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);
    fn is_speaking(&self) -> bool;
}
