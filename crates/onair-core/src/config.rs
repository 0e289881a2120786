//! TOML-based indicator configuration.
//!
//! Holds:
//! - Network credentials and the two routing parameters
//! - Where and how to fetch the schedule page
//! - Refresh cadences, retry intervals and the soon horizon
//! - Which output lines to drive
//!
//! Configuration is read from `~/.config/onair/config.toml` unless a path is
//! given explicitly. Unlike most settings files a missing file is an error:
//! the indicator cannot join a network without credentials.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::decode::MUSIC_CATEGORY;
use crate::error::ConfigError;
use crate::extract::DEFAULT_CHUNK_SIZE;
use crate::status::LINE_COUNT;
use crate::time::TimeInstant;

/// Network credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub ssid: String,
    #[serde(default)]
    pub passphrase: String,
}

/// Two numeric routing parameters (`00`-`99`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default)]
    pub route_one: u8,
    #[serde(default)]
    pub route_two: u8,
}

/// Schedule page fetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// The date key (`YYYYMMDD`) is appended to this.
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
    /// Sent as `User-Agent`; the schedule server answers 403 without a
    /// browser-like value.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-request deadline. Unset means a stalled server blocks forever.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

/// Cadences, all in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_schedule_interval")]
    pub schedule_interval_secs: u64,
    #[serde(default = "default_display_interval")]
    pub display_interval_secs: u64,
    #[serde(default = "default_soon_horizon")]
    pub soon_horizon_secs: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_connectivity_retry")]
    pub connectivity_retry_secs: u64,
    #[serde(default = "default_schedule_interval")]
    pub decode_retry_secs: u64,
    #[serde(default = "default_time_sync_retry")]
    pub time_sync_retry_secs: u64,
    /// 0 retries forever.
    #[serde(default)]
    pub time_sync_max_attempts: u32,
    /// The clock counts as synchronized once it reads later than this
    /// (`YYYY-MM-DDThh:mm:ss.sssZ`).
    #[serde(default = "default_clock_floor")]
    pub clock_floor: String,
}

/// Indicator output lines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputsConfig {
    /// Four sysfs GPIO `value` files, green/yellow/orange/red. Unset logs
    /// the pattern instead.
    #[serde(default)]
    pub lines: Option<Vec<PathBuf>>,
}

/// Indicator configuration.
///
/// Serialized to/from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub outputs: OutputsConfig,
}

// Default functions
fn default_url_prefix() -> String {
    "https://www.bbc.co.uk/iplayer/guide/bbcalba/".into()
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/140.0.0.0 Safari/537.36".into()
}
fn default_category() -> String {
    MUSIC_CATEGORY.into()
}
fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_schedule_interval() -> u64 {
    3600
}
fn default_display_interval() -> u64 {
    10
}
fn default_soon_horizon() -> u64 {
    3600
}
fn default_poll_interval() -> u64 {
    1
}
fn default_connectivity_retry() -> u64 {
    60
}
fn default_time_sync_retry() -> u64 {
    1
}
fn default_clock_floor() -> String {
    "2025-01-01T00:00:00.000Z".into()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            url_prefix: default_url_prefix(),
            user_agent: default_user_agent(),
            timeout_secs: None,
            category: default_category(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            schedule_interval_secs: default_schedule_interval(),
            display_interval_secs: default_display_interval(),
            soon_horizon_secs: default_soon_horizon(),
            poll_interval_secs: default_poll_interval(),
            connectivity_retry_secs: default_connectivity_retry(),
            decode_retry_secs: default_schedule_interval(),
            time_sync_retry_secs: default_time_sync_retry(),
            time_sync_max_attempts: 0,
            clock_floor: default_clock_floor(),
        }
    }
}

impl TimingConfig {
    pub fn schedule_interval(&self) -> Duration {
        Duration::from_secs(self.schedule_interval_secs)
    }

    pub fn display_interval(&self) -> Duration {
        Duration::from_secs(self.display_interval_secs)
    }

    pub fn soon_horizon(&self) -> Duration {
        Duration::from_secs(self.soon_horizon_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn connectivity_retry(&self) -> Duration {
        Duration::from_secs(self.connectivity_retry_secs)
    }

    pub fn decode_retry(&self) -> Duration {
        Duration::from_secs(self.decode_retry_secs)
    }

    pub fn time_sync_retry(&self) -> Duration {
        Duration::from_secs(self.time_sync_retry_secs)
    }

    /// # Errors
    ///
    /// Returns an error if `clock_floor` is not in the schedule timestamp format.
    pub fn clock_floor(&self) -> Result<TimeInstant, ConfigError> {
        TimeInstant::parse_schedule_timestamp(&self.clock_floor).map_err(|e| {
            ConfigError::InvalidValue {
                key: "timing.clock_floor".into(),
                message: e.to_string(),
            }
        })
    }
}

/// Returns `~/.config/onair[-dev]/` based on ONAIR_ENV.
///
/// Set ONAIR_ENV=dev to use a development config directory.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir().ok_or(ConfigError::NoConfigDir)?.join(".config");

    let env = std::env::var("ONAIR_ENV").unwrap_or_else(|_| "production".to_string());

    Ok(if env == "dev" {
        base_dir.join("onair-dev")
    } else {
        base_dir.join("onair")
    })
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: "unknown config key".into(),
        };
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    // Unset optional: take JSON if it parses, a plain string otherwise.
                    serde_json::Value::Null => serde_json::from_str(value)
                        .unwrap_or_else(|_| serde_json::Value::String(value.into())),
                    serde_json::Value::String(_) => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default location of the config file.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(config_dir()?.join("config.toml"))
    }

    /// Load and validate the config at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML for
    /// this schema, or fails [`Config::validate`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let cfg = Self::read(path)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse the config at `path` without validating it, for editing.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Persist to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Check values the type system does not.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.ssid.is_empty() {
            return Err(ConfigError::MissingKey("network.ssid".into()));
        }
        for (key, route) in [
            ("routing.route_one", self.routing.route_one),
            ("routing.route_two", self.routing.route_two),
        ] {
            if route > 99 {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: format!("{route} is not a two-digit route"),
                });
            }
        }
        url::Url::parse(&self.fetch.url_prefix).map_err(|e| ConfigError::InvalidValue {
            key: "fetch.url_prefix".into(),
            message: e.to_string(),
        })?;
        if self.fetch.user_agent.is_empty() {
            return Err(ConfigError::MissingKey("fetch.user_agent".into()));
        }
        if self.fetch.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "fetch.chunk_size".into(),
                message: "must be at least 1".into(),
            });
        }
        for (key, secs) in [
            ("timing.schedule_interval_secs", self.timing.schedule_interval_secs),
            ("timing.display_interval_secs", self.timing.display_interval_secs),
            ("timing.poll_interval_secs", self.timing.poll_interval_secs),
            ("timing.connectivity_retry_secs", self.timing.connectivity_retry_secs),
            ("timing.decode_retry_secs", self.timing.decode_retry_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: "must be at least 1 second".into(),
                });
            }
        }
        self.timing.clock_floor()?;
        if let Some(lines) = &self.outputs.lines {
            if lines.len() != LINE_COUNT {
                return Err(ConfigError::InvalidValue {
                    key: "outputs.lines".into(),
                    message: format!("expected {LINE_COUNT} paths, got {}", lines.len()),
                });
            }
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// field. The config is left unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Config {
        let mut cfg = Config::default();
        cfg.network.ssid = "studio".into();
        cfg.network.passphrase = "hunter2".into();
        cfg.routing.route_one = 12;
        cfg.routing.route_two = 34;
        cfg
    }

    #[test]
    fn default_config_roundtrip() {
        let cfg = configured();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.network.ssid, "studio");
        assert_eq!(parsed.routing.route_two, 34);
        assert_eq!(parsed.timing.display_interval_secs, 10);
    }

    #[test]
    fn config_default_values() {
        let cfg = Config::default();
        assert_eq!(cfg.fetch.category, "Music");
        assert_eq!(cfg.fetch.chunk_size, 2048);
        assert_eq!(cfg.fetch.timeout_secs, None);
        assert_eq!(cfg.timing.schedule_interval(), Duration::from_secs(3600));
        assert_eq!(cfg.timing.display_interval(), Duration::from_secs(10));
        assert_eq!(cfg.timing.soon_horizon(), Duration::from_secs(3600));
        assert_eq!(cfg.timing.time_sync_retry(), Duration::from_secs(1));
        assert!(cfg.outputs.lines.is_none());
    }

    #[test]
    fn minimal_file_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [network]
            ssid = "studio"
            passphrase = "pw"

            [routing]
            route_one = 7
            route_two = 42
            "#,
        )
        .unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.fetch.url_prefix, "https://www.bbc.co.uk/iplayer/guide/bbcalba/");
        assert_eq!(cfg.timing.connectivity_retry_secs, 60);
    }

    #[test]
    fn missing_ssid_fails_validation() {
        assert!(matches!(
            Config::default().validate(),
            Err(ConfigError::MissingKey(ref key)) if key == "network.ssid"
        ));
    }

    #[test]
    fn three_digit_route_fails_validation() {
        let mut cfg = configured();
        cfg.routing.route_one = 100;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn wrong_number_of_lines_fails_validation() {
        let mut cfg = configured();
        cfg.outputs.lines = Some(vec![PathBuf::from("/sys/class/gpio/gpio15/value")]);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn bad_clock_floor_fails_validation() {
        let mut cfg = configured();
        cfg.timing.clock_floor = "2025-01-01".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_retry_intervals_fail_validation() {
        for key in ["timing.connectivity_retry_secs", "timing.decode_retry_secs"] {
            let mut cfg = configured();
            cfg.set(key, "0").unwrap();
            assert!(
                matches!(cfg.validate(), Err(ConfigError::InvalidValue { key: ref k, .. }) if k == key),
                "{key}"
            );
        }
        assert!(configured().validate().is_ok());
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = configured();
        assert_eq!(cfg.get("network.ssid").as_deref(), Some("studio"));
        assert_eq!(cfg.get("timing.display_interval_secs").as_deref(), Some("10"));
        assert_eq!(cfg.get("fetch.timeout_secs").as_deref(), Some("null"));
        assert!(cfg.get("fetch.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_number() {
        let mut cfg = configured();
        cfg.set("timing.soon_horizon_secs", "1800").unwrap();
        assert_eq!(cfg.timing.soon_horizon(), Duration::from_secs(1800));
    }

    #[test]
    fn set_updates_unset_optional() {
        let mut cfg = configured();
        cfg.set("fetch.timeout_secs", "30").unwrap();
        assert_eq!(cfg.fetch.timeout_secs, Some(30));
        cfg.set(
            "outputs.lines",
            r#"["/a/value", "/b/value", "/c/value", "/d/value"]"#,
        )
        .unwrap();
        assert_eq!(cfg.outputs.lines.as_ref().map(Vec::len), Some(4));
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = configured();
        assert!(cfg.set("network.nonexistent_key", "value").is_err());
        assert!(cfg.set("", "value").is_err());
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = configured();
        assert!(cfg.set("routing.route_one", "twelve").is_err());
        // Out of range for u8: rejected when converting back.
        assert!(cfg.set("routing.route_one", "1000").is_err());
        assert_eq!(cfg.routing.route_one, 12);
    }

    #[test]
    fn load_missing_file_is_load_failed() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::LoadFailed { .. }));
    }

    #[test]
    fn load_malformed_file_is_parse_failed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[network\nssid = ").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::ParseFailed(_))));
    }

    #[test]
    fn read_skips_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        Config::default().save(&path).unwrap();
        assert!(Config::read(&path).is_ok());
        assert!(matches!(Config::load(&path), Err(ConfigError::MissingKey(_))));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        configured().save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.network.passphrase, "hunter2");
        assert_eq!(loaded.routing.route_one, 12);
    }
}
