pub(crate) fn default_voice() -> String {
    String::new()
}

pub(crate) fn default_rate() -> f32 {
    1.0
}

pub(crate) fn default_chunk_max_chars() -> usize {
    crate::chunker::DEFAULT_CHUNK_CHARS
}

pub(crate) fn default_transcript_before() -> usize {
    20
}

pub(crate) fn default_transcript_after() -> usize {
    30
}

pub(crate) fn default_max_documents() -> usize {
    50
}

pub(crate) fn default_min_content_chars() -> usize {
    50
}

pub(crate) fn default_paragraph_fallback_ratio() -> f64 {
    1.0
}

pub(crate) fn default_request_timeout_secs() -> u64 {
    20
}

pub(crate) fn default_user_agent() -> String {
    format!("readaloud/{}", env!("CARGO_PKG_VERSION"))
}

pub(crate) fn default_state_path() -> String {
    ".cache/state.json".to_string()
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Info
}
