//! Configuration for keytempo.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main configuration for the metrics service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Thresholds driving the metrics engine and broadcaster
    pub metrics: MetricsConfig,

    /// Where the streaming endpoint listens
    pub server: ServerSettings,

    /// Newline-separated word list used for accuracy
    pub dictionary_path: Option<PathBuf>,

    /// What to do with a word when the dictionary cannot answer
    pub dictionary_failure: DictionaryFailurePolicy,

    /// How keystrokes arrive on stdin
    #[serde(default)]
    pub input: InputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metrics: MetricsConfig::default(),
            server: ServerSettings::default(),
            dictionary_path: Some(PathBuf::from("/usr/share/dict/words")),
            dictionary_failure: DictionaryFailurePolicy::default(),
            input: InputFormat::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults when absent.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content).map_err(ConfigError::Parse)?;
        config.metrics.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("keytempo")
            .join("config.json")
    }
}

/// Timing constants for word-rate and idle detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Gap between keystrokes after which time stops counting as active
    #[serde(with = "duration_serde")]
    pub idle_threshold: Duration,

    /// Broadcast tick
    #[serde(with = "duration_serde")]
    pub update_interval: Duration,

    /// Age beyond which a completed word no longer contributes to WPM
    #[serde(with = "duration_serde")]
    pub sliding_window: Duration,

    /// Capacity of the word timestamp ring
    pub max_word_events: usize,

    /// Pause after the last word beyond which WPM is held instead of recomputed
    #[serde(with = "duration_serde")]
    pub inactive_wpm_freeze: Duration,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            idle_threshold: Duration::from_secs(10),
            update_interval: Duration::from_secs(1),
            sliding_window: Duration::from_secs(60),
            max_word_events: 500,
            inactive_wpm_freeze: Duration::from_secs(5),
        }
    }
}

impl MetricsConfig {
    /// Reject combinations the engine cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.idle_threshold.is_zero() {
            return Err(ConfigError::Invalid("idle_threshold must be positive".into()));
        }
        if self.update_interval.is_zero() {
            return Err(ConfigError::Invalid("update_interval must be positive".into()));
        }
        if self.sliding_window.is_zero() {
            return Err(ConfigError::Invalid("sliding_window must be positive".into()));
        }
        if self.max_word_events == 0 {
            return Err(ConfigError::Invalid("max_word_events must be at least 1".into()));
        }
        // The idle transition has to stay reachable while WPM is frozen.
        if self.inactive_wpm_freeze >= self.idle_threshold {
            return Err(ConfigError::Invalid(format!(
                "inactive_wpm_freeze ({:.1}s) must be shorter than idle_threshold ({:.1}s)",
                self.inactive_wpm_freeze.as_secs_f64(),
                self.idle_threshold.as_secs_f64()
            )));
        }
        Ok(())
    }
}

/// Listen address and per-subscriber limits for the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    pub bind: String,
    pub port: u16,
    /// Snapshots queued per subscriber before it is considered dead
    pub subscriber_buffer: usize,
    /// Upper bound on a single frame write to a client
    #[serde(with = "duration_serde")]
    pub send_timeout: Duration,
    /// Browser origins allowed to read the stream; `None` allows any
    #[serde(default)]
    pub cors_origins: Option<Vec<String>>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8765,
            subscriber_buffer: 16,
            send_timeout: Duration::from_secs(2),
            cors_origins: None,
        }
    }
}

/// Wire format of the keystroke feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    /// Raw UTF-8 keystrokes, stamped when they are read
    #[default]
    Keys,
    /// One `{"key": .., "t": ..}` JSON record per line, stamped by the hook
    Records,
}

impl std::str::FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keys" => Ok(InputFormat::Keys),
            "records" => Ok(InputFormat::Records),
            other => Err(format!(
                "unknown input format '{other}' (expected 'keys' or 'records')"
            )),
        }
    }
}

/// Outcome for a completed word whose dictionary lookup failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DictionaryFailurePolicy {
    /// Count the word, give no correctness credit
    #[default]
    CountAsIncorrect,
    /// Drop the word entirely
    SkipWord,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(serde_json::Error),

    #[error("Serialize error: {0}")]
    Serialize(serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Serde support for Duration as fractional seconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.metrics.idle_threshold, Duration::from_secs(10));
        assert_eq!(config.metrics.update_interval, Duration::from_secs(1));
        assert_eq!(config.metrics.sliding_window, Duration::from_secs(60));
        assert_eq!(config.metrics.max_word_events, 500);
        assert_eq!(config.metrics.inactive_wpm_freeze, Duration::from_secs(5));
        assert_eq!(config.server.port, 8765);
        assert_eq!(
            config.dictionary_failure,
            DictionaryFailurePolicy::CountAsIncorrect
        );
        assert!(config.metrics.validate().is_ok());
    }

    #[test]
    fn test_freeze_must_be_shorter_than_idle() {
        let metrics = MetricsConfig {
            inactive_wpm_freeze: Duration::from_secs(10),
            ..MetricsConfig::default()
        };
        assert!(matches!(metrics.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let metrics = MetricsConfig {
            max_word_events: 0,
            ..MetricsConfig::default()
        };
        assert!(metrics.validate().is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.metrics.idle_threshold = Duration::from_millis(7500);
        config.dictionary_failure = DictionaryFailurePolicy::SkipWord;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_older_config_without_new_fields_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut value = serde_json::to_value(Config::default()).unwrap();
        value.as_object_mut().unwrap().remove("input");
        value["server"].as_object_mut().unwrap().remove("cors_origins");
        std::fs::write(&path, value.to_string()).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.input, InputFormat::Keys);
        assert!(loaded.server.cors_origins.is_none());
    }

    #[test]
    fn test_input_format_parses() {
        assert_eq!("records".parse::<InputFormat>(), Ok(InputFormat::Records));
        assert_eq!("keys".parse::<InputFormat>(), Ok(InputFormat::Keys));
        assert!("json".parse::<InputFormat>().is_err());
    }

    #[test]
    fn test_policy_serializes_snake_case() {
        let json = serde_json::to_string(&DictionaryFailurePolicy::SkipWord).unwrap();
        assert_eq!(json, "\"skip_word\"");
    }
}
