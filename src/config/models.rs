use serde::Deserialize;

/// High-level app configuration; deserializable from TOML.
#[derive(Debug, Clone, Deserialize, serde::Serialize, PartialEq)]
pub struct AppConfig {
    #[serde(default = "crate::config::defaults::default_voice")]
    pub voice: String,
    #[serde(default = "crate::config::defaults::default_rate")]
    pub rate: f32,
    #[serde(default)]
    pub sequential: bool,
    #[serde(default = "crate::config::defaults::default_chunk_max_chars")]
    pub chunk_max_chars: usize,
    #[serde(default)]
    pub suspend_strategy: SuspendStrategyKind,
    #[serde(default = "crate::config::defaults::default_transcript_before")]
    pub transcript_before: usize,
    #[serde(default = "crate::config::defaults::default_transcript_after")]
    pub transcript_after: usize,
    #[serde(default = "crate::config::defaults::default_max_documents")]
    pub max_documents: usize,
    #[serde(default)]
    pub overflow: OverflowPolicy,
    #[serde(default = "crate::config::defaults::default_min_content_chars")]
    pub min_content_chars: usize,
    #[serde(default = "crate::config::defaults::default_paragraph_fallback_ratio")]
    pub paragraph_fallback_ratio: f64,
    #[serde(default)]
    pub proxy_prefix: Option<String>,
    #[serde(default = "crate::config::defaults::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "crate::config::defaults::default_user_agent")]
    pub user_agent: String,
    #[serde(default = "crate::config::defaults::default_state_path")]
    pub state_path: String,
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            voice: crate::config::defaults::default_voice(),
            rate: crate::config::defaults::default_rate(),
            sequential: false,
            chunk_max_chars: crate::config::defaults::default_chunk_max_chars(),
            suspend_strategy: SuspendStrategyKind::Auto,
            transcript_before: crate::config::defaults::default_transcript_before(),
            transcript_after: crate::config::defaults::default_transcript_after(),
            max_documents: crate::config::defaults::default_max_documents(),
            overflow: OverflowPolicy::EvictOldest,
            min_content_chars: crate::config::defaults::default_min_content_chars(),
            paragraph_fallback_ratio: crate::config::defaults::default_paragraph_fallback_ratio(),
            proxy_prefix: None,
            request_timeout_secs: crate::config::defaults::default_request_timeout_secs(),
            user_agent: crate::config::defaults::default_user_agent(),
            state_path: crate::config::defaults::default_state_path(),
            log_level: crate::config::defaults::default_log_level(),
        }
    }
}

/// How "pause" is realized on the host platform.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SuspendStrategyKind {
    /// Pick from the host's user agent at startup.
    #[default]
    Auto,
    TruePause,
    CancelAndRestart,
}

impl std::fmt::Display for SuspendStrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SuspendStrategyKind::Auto => "auto",
            SuspendStrategyKind::TruePause => "true-pause",
            SuspendStrategyKind::CancelAndRestart => "cancel-and-restart",
        };
        write!(f, "{}", label)
    }
}

/// What the library does when an insertion would exceed its capacity.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    #[default]
    EvictOldest,
    Reject,
}

impl std::fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            OverflowPolicy::EvictOldest => "evict-oldest",
            OverflowPolicy::Reject => "reject",
        };
        write!(f, "{}", label)
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
