//! The narrow surface the engine uses to talk to whatever displays it.

/// Slice of the transcript around the active chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranscriptWindow<'a> {
    pub document_name: &'a str,
    /// Chunk index of `chunks[0]` within the document.
    pub first_index: usize,
    pub chunks: &'a [String],
    /// Absolute chunk index to highlight, when it falls inside the document.
    pub active_index: Option<usize>,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub name: String,
    pub active: bool,
}

pub trait PresentationAdapter {
    fn render_transcript_window(&mut self, window: TranscriptWindow<'_>);
    fn render_playlist(&mut self, entries: &[PlaylistEntry]);
    fn notify_error(&mut self, message: &str);
    fn notify(&mut self, message: &str);
    /// Ask whether to continue a saved position. Hosts without a prompt decline.
    fn confirm_resume(&mut self, document_name: &str, chunk_index: usize) -> bool;

    /// Hold (or release) the host's screen wake lock.
    fn keep_awake(&mut self, _enabled: bool) {}
}
