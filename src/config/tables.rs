use super::defaults;
use super::models::{AppConfig, LogLevel, OverflowPolicy, SuspendStrategyKind};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    playback: PlaybackConfig,
    #[serde(default)]
    library: LibraryConfig,
    #[serde(default)]
    extraction: ExtractionConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            voice: tables.playback.voice,
            rate: tables.playback.rate,
            sequential: tables.playback.sequential,
            chunk_max_chars: tables.playback.chunk_max_chars,
            suspend_strategy: tables.playback.suspend_strategy,
            transcript_before: tables.playback.transcript_before,
            transcript_after: tables.playback.transcript_after,
            max_documents: tables.library.max_documents,
            overflow: tables.library.overflow,
            min_content_chars: tables.extraction.min_content_chars,
            paragraph_fallback_ratio: tables.extraction.paragraph_fallback_ratio,
            proxy_prefix: tables.extraction.proxy_prefix,
            request_timeout_secs: tables.extraction.request_timeout_secs,
            user_agent: tables.extraction.user_agent,
            state_path: tables.storage.state_path,
            log_level: tables.logging.log_level,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            playback: PlaybackConfig {
                voice: config.voice.clone(),
                rate: config.rate,
                sequential: config.sequential,
                chunk_max_chars: config.chunk_max_chars,
                suspend_strategy: config.suspend_strategy,
                transcript_before: config.transcript_before,
                transcript_after: config.transcript_after,
            },
            library: LibraryConfig {
                max_documents: config.max_documents,
                overflow: config.overflow,
            },
            extraction: ExtractionConfig {
                min_content_chars: config.min_content_chars,
                paragraph_fallback_ratio: config.paragraph_fallback_ratio,
                proxy_prefix: config.proxy_prefix.clone(),
                request_timeout_secs: config.request_timeout_secs,
                user_agent: config.user_agent.clone(),
            },
            storage: StorageConfig {
                state_path: config.state_path.clone(),
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct PlaybackConfig {
    #[serde(default = "defaults::default_voice")]
    voice: String,
    #[serde(default = "defaults::default_rate")]
    rate: f32,
    #[serde(default)]
    sequential: bool,
    #[serde(default = "defaults::default_chunk_max_chars")]
    chunk_max_chars: usize,
    #[serde(default)]
    suspend_strategy: SuspendStrategyKind,
    #[serde(default = "defaults::default_transcript_before")]
    transcript_before: usize,
    #[serde(default = "defaults::default_transcript_after")]
    transcript_after: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            voice: defaults::default_voice(),
            rate: defaults::default_rate(),
            sequential: false,
            chunk_max_chars: defaults::default_chunk_max_chars(),
            suspend_strategy: SuspendStrategyKind::default(),
            transcript_before: defaults::default_transcript_before(),
            transcript_after: defaults::default_transcript_after(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LibraryConfig {
    #[serde(default = "defaults::default_max_documents")]
    max_documents: usize,
    #[serde(default)]
    overflow: OverflowPolicy,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        LibraryConfig {
            max_documents: defaults::default_max_documents(),
            overflow: OverflowPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ExtractionConfig {
    #[serde(default = "defaults::default_min_content_chars")]
    min_content_chars: usize,
    #[serde(default = "defaults::default_paragraph_fallback_ratio")]
    paragraph_fallback_ratio: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    proxy_prefix: Option<String>,
    #[serde(default = "defaults::default_request_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default = "defaults::default_user_agent")]
    user_agent: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            min_content_chars: defaults::default_min_content_chars(),
            paragraph_fallback_ratio: defaults::default_paragraph_fallback_ratio(),
            proxy_prefix: None,
            request_timeout_secs: defaults::default_request_timeout_secs(),
            user_agent: defaults::default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct StorageConfig {
    #[serde(default = "defaults::default_state_path")]
    state_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            state_path: defaults::default_state_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}
