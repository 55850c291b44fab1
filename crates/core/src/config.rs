//! Runtime configuration, persisted as JSON.
//!
//! Every field has a default, so a config file only needs the keys it
//! changes.
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::infrastructure::onnx_blazeface_detector::DEFAULT_CONFIDENCE;
use crate::pipeline::narration_loop::{
    NarrationMode, NarrationSettings, DEFAULT_MAX_READ_FAILURES, DEFAULT_NARRATION_PERIOD,
};
use crate::shared::constants::{
    DEFAULT_AUDIO_DIR, DEFAULT_COUNT_FILE, DEFAULT_FONT_PATH, DEFAULT_LANGUAGE,
    DEFAULT_MODEL_FILE, DEFAULT_WINDOW_TITLE, TRANSLATE_TTS_URL,
};

pub const DEFAULT_DEVICE: &str = "/dev/video0";

/// Upper bound for the per-write settle delay.
const MAX_SETTLE_DELAY_MS: u64 = 10_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: String,
    pub input_format: Option<String>,
    pub model_path: PathBuf,
    pub confidence: f64,
    pub window_title: String,
    pub snapshot_path: Option<PathBuf>,
    pub font_path: PathBuf,
    pub count_path: PathBuf,
    pub settle_delay_ms: u64,
    pub audio_dir: PathBuf,
    pub language: String,
    pub tts_endpoint: String,
    pub mute: bool,
    pub narration_period_ms: u64,
    pub narration_mode: NarrationMode,
    pub max_read_failures: u32,
    pub exit_with_detection: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            input_format: default_input_format(),
            model_path: PathBuf::from(DEFAULT_MODEL_FILE),
            confidence: DEFAULT_CONFIDENCE,
            window_title: DEFAULT_WINDOW_TITLE.to_string(),
            snapshot_path: None,
            font_path: PathBuf::from(DEFAULT_FONT_PATH),
            count_path: PathBuf::from(DEFAULT_COUNT_FILE),
            settle_delay_ms: 0,
            audio_dir: PathBuf::from(DEFAULT_AUDIO_DIR),
            language: DEFAULT_LANGUAGE.to_string(),
            tts_endpoint: TRANSLATE_TTS_URL.to_string(),
            mute: false,
            narration_period_ms: DEFAULT_NARRATION_PERIOD.as_millis() as u64,
            narration_mode: NarrationMode::default(),
            max_read_failures: DEFAULT_MAX_READ_FAILURES,
            exit_with_detection: false,
        }
    }
}

#[cfg(target_os = "linux")]
fn default_input_format() -> Option<String> {
    Some("v4l2".to_string())
}

#[cfg(not(target_os = "linux"))]
fn default_input_format() -> Option<String> {
    None
}

impl Config {
    /// `<config dir>/FaceWatch/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FaceWatch").join("config.json"))
    }

    /// Loads `path`, which must exist, or else the default config file when
    /// there is one, or else the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(default) if default.is_file() => Self::from_file(&default),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(path, json).map_err(write_error)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid {
                field,
                reason: reason.into(),
            }
        }

        if self.device.trim().is_empty() {
            return Err(invalid("device", "must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(invalid(
                "confidence",
                format!("{} is outside 0.0-1.0", self.confidence),
            ));
        }
        if self.narration_period_ms == 0 {
            return Err(invalid("narration_period_ms", "must be greater than 0"));
        }
        if self.max_read_failures == 0 {
            return Err(invalid("max_read_failures", "must be at least 1"));
        }
        if self.settle_delay_ms > MAX_SETTLE_DELAY_MS {
            return Err(invalid(
                "settle_delay_ms",
                format!("{} exceeds {MAX_SETTLE_DELAY_MS}", self.settle_delay_ms),
            ));
        }
        if self.language.trim().is_empty() {
            return Err(invalid("language", "must not be empty"));
        }
        if !self.tts_endpoint.starts_with("http://") && !self.tts_endpoint.starts_with("https://")
        {
            return Err(invalid(
                "tts_endpoint",
                format!("'{}' is not an http(s) URL", self.tts_endpoint),
            ));
        }
        if self.count_path.as_os_str().is_empty() {
            return Err(invalid("count_path", "must not be empty"));
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn narration_settings(&self) -> NarrationSettings {
        NarrationSettings {
            period: Duration::from_millis(self.narration_period_ms),
            mode: self.narration_mode,
            max_read_failures: self.max_read_failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.device, "/dev/video0");
        assert_eq!(config.count_path, PathBuf::from("face_count.log"));
        assert_eq!(config.language, "en");
        assert_eq!(config.narration_mode, NarrationMode::Repeat);
        assert_eq!(config.narration_settings().period, Duration::from_secs(1));
        assert_eq!(config.settle_delay(), Duration::ZERO);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "device": "/dev/video2", "narration_mode": "on-change", "mute": true }"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.device, "/dev/video2");
        assert_eq!(config.narration_mode, NarrationMode::OnChange);
        assert!(config.mute);
        assert_eq!(config.max_read_failures, DEFAULT_MAX_READ_FAILURES);
    }

    #[test]
    fn test_save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            snapshot_path: Some(PathBuf::from("view/latest.jpg")),
            settle_delay_ms: 500,
            ..Config::default()
        };

        config.save(&path).unwrap();
        assert_eq!(Config::load(Some(&path)).unwrap(), config);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let result = Config::load(Some(Path::new("/nonexistent/facewatch.json")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_unknown_narration_mode_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "narration_mode": "sometimes" }"#).unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[rstest]
    #[case::confidence_high(Config { confidence: 1.5, ..Config::default() }, "confidence")]
    #[case::confidence_nan(Config { confidence: f64::NAN, ..Config::default() }, "confidence")]
    #[case::zero_period(
        Config { narration_period_ms: 0, ..Config::default() },
        "narration_period_ms"
    )]
    #[case::zero_failures(
        Config { max_read_failures: 0, ..Config::default() },
        "max_read_failures"
    )]
    #[case::long_settle(Config { settle_delay_ms: 60_000, ..Config::default() }, "settle_delay_ms")]
    #[case::empty_device(Config { device: " ".into(), ..Config::default() }, "device")]
    #[case::bad_endpoint(
        Config { tts_endpoint: "ftp://x".into(), ..Config::default() },
        "tts_endpoint"
    )]
    fn test_validate_rejects(#[case] config: Config, #[case] expected_field: &str) {
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected_field),
            other => panic!("expected invalid {expected_field}, got {other:?}"),
        }
    }
}
