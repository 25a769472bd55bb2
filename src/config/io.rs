use super::models::AppConfig;
use super::tables::ConfigTables;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return AppConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err}");
            AppConfig::default()
        }
    }
}

pub fn parse_config(contents: &str) -> Result<AppConfig, toml::de::Error> {
    let tables: ConfigTables = toml::from_str(contents)?;
    Ok(AppConfig::from(tables))
}

pub fn serialize_config(config: &AppConfig) -> Result<String, toml::ser::Error> {
    toml::to_string(&ConfigTables::from(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogLevel, OverflowPolicy, SuspendStrategyKind};

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = parse_config("").expect("empty TOML should parse");
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.chunk_max_chars, 500);
        assert_eq!(cfg.max_documents, 50);
        assert_eq!(cfg.min_content_chars, 50);
    }

    #[test]
    fn reads_sectioned_tables() {
        let cfg = parse_config(
            r#"
            [playback]
            voice = "ko-KR-Standard-A"
            rate = 1.5
            sequential = true
            suspend_strategy = "cancel-and-restart"

            [library]
            max_documents = 3
            overflow = "reject"

            [extraction]
            paragraph_fallback_ratio = 0.8
            proxy_prefix = "https://proxy.example/?url="

            [logging]
            log_level = "debug"
            "#,
        )
        .expect("valid config");

        assert_eq!(cfg.voice, "ko-KR-Standard-A");
        assert!((cfg.rate - 1.5).abs() < f32::EPSILON);
        assert!(cfg.sequential);
        assert_eq!(cfg.suspend_strategy, SuspendStrategyKind::CancelAndRestart);
        assert_eq!(cfg.max_documents, 3);
        assert_eq!(cfg.overflow, OverflowPolicy::Reject);
        assert!((cfg.paragraph_fallback_ratio - 0.8).abs() < f64::EPSILON);
        assert_eq!(
            cfg.proxy_prefix.as_deref(),
            Some("https://proxy.example/?url=")
        );
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert_eq!(cfg.chunk_max_chars, 500);
    }

    #[test]
    fn serialized_config_parses_back() {
        let mut cfg = AppConfig::default();
        cfg.voice = "en-GB".to_string();
        cfg.transcript_after = 7;
        let text = serialize_config(&cfg).expect("serializable");
        assert!(text.contains("[playback]"));
        assert_eq!(parse_config(&text).expect("parses"), cfg);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("readaloud-config-does-not-exist.toml");
        assert_eq!(load_config(&path), AppConfig::default());
    }
}
