//! Configuration management for the reconnection service.
//!
//! This module handles loading and saving configuration from disk,
//! including the adapter selection and the reconnect timing parameters.

use std::{env, fs, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::{
   error::{ReconnectError, Result},
   reconnect::attempt::AttemptTiming,
};

/// Main configuration structure for the service.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
   /// Adapter to use, e.g. `hci0`. The default adapter when unset.
   #[serde(default)]
   pub adapter: Option<SmolStr>,

   #[serde(default = "default_reconnect_on_start")]
   pub reconnect_on_start: bool,

   #[serde(default = "default_fast_poll_ms")]
   pub fast_poll_ms: u64,

   #[serde(default = "default_slow_poll_ms")]
   pub slow_poll_ms: u64,

   /// Upper bound on waiting for the first state change after a connect
   /// request. Zero disables the bound.
   #[serde(default = "default_first_change_timeout_ms")]
   pub first_change_timeout_ms: u64,

   #[serde(default = "default_connect_timeout_sec")]
   pub connect_timeout_sec: u64,

   #[serde(default = "default_link_check_interval_sec")]
   pub link_check_interval_sec: u64,
}

const fn default_reconnect_on_start() -> bool {
   true
}

const fn default_fast_poll_ms() -> u64 {
   100
}

const fn default_slow_poll_ms() -> u64 {
   1000
}

const fn default_first_change_timeout_ms() -> u64 {
   30_000
}

const fn default_connect_timeout_sec() -> u64 {
   30
}

const fn default_link_check_interval_sec() -> u64 {
   5
}

impl Default for Config {
   fn default() -> Self {
      Self {
         adapter: None,
         reconnect_on_start: default_reconnect_on_start(),
         fast_poll_ms: default_fast_poll_ms(),
         slow_poll_ms: default_slow_poll_ms(),
         first_change_timeout_ms: default_first_change_timeout_ms(),
         connect_timeout_sec: default_connect_timeout_sec(),
         link_check_interval_sec: default_link_check_interval_sec(),
      }
   }
}

impl Config {
   /// Loads configuration from disk or creates default if not exists.
   pub fn load() -> Result<Self> {
      let config_path = Self::config_path()?;

      if config_path.exists() {
         let contents = fs::read_to_string(&config_path)?;
         Ok(toml::from_str(&contents)?)
      } else {
         let config = Self::default();
         config.save()?;
         Ok(config)
      }
   }

   /// Saves the current configuration to disk.
   pub fn save(&self) -> Result<()> {
      let config_path = Self::config_path()?;

      if let Some(parent) = config_path.parent() {
         fs::create_dir_all(parent)?;
      }

      let contents = toml::to_string_pretty(self)?;
      fs::write(&config_path, contents)?;

      Ok(())
   }

   fn config_path() -> Result<PathBuf> {
      let config_dir = if let Ok(home) = env::var("A2DP_RECONNECT_HOME") {
         PathBuf::from(home)
      } else if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
         PathBuf::from(config_home)
      } else if let Ok(home) = env::var("HOME") {
         PathBuf::from(home).join(".config")
      } else {
         return Err(ReconnectError::ConfigDirNotFound);
      };

      Ok(config_dir.join("a2dp-reconnect").join("config.toml"))
   }

   /// Polling and deadline parameters for connection attempts.
   pub fn attempt_timing(&self) -> AttemptTiming {
      AttemptTiming {
         fast_poll: Duration::from_millis(self.fast_poll_ms.max(1)),
         slow_poll: Duration::from_millis(self.slow_poll_ms.max(1)),
         first_change_timeout: (self.first_change_timeout_ms > 0)
            .then(|| Duration::from_millis(self.first_change_timeout_ms)),
      }
   }

   pub const fn connect_timeout(&self) -> Duration {
      Duration::from_secs(self.connect_timeout_sec)
   }

   pub fn link_check_interval(&self) -> Duration {
      Duration::from_secs(self.link_check_interval_sec.max(1))
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_missing_fields_take_defaults() {
      let config: Config = toml::from_str("adapter = \"hci1\"").unwrap();
      assert_eq!(config.adapter.as_deref(), Some("hci1"));
      assert!(config.reconnect_on_start);
      assert_eq!(config.fast_poll_ms, 100);
      assert_eq!(config.slow_poll_ms, 1000);
      assert_eq!(config.first_change_timeout_ms, 30_000);
   }

   #[test]
   fn test_zero_first_change_timeout_is_unbounded() {
      let config: Config = toml::from_str("first_change_timeout_ms = 0").unwrap();
      let timing = config.attempt_timing();
      assert!(timing.first_change_timeout.is_none());
      assert_eq!(timing.fast_poll, Duration::from_millis(100));
      assert_eq!(timing.slow_poll, Duration::from_secs(1));
   }

   #[test]
   fn test_default_round_trips_through_toml() {
      let text = toml::to_string_pretty(&Config::default()).unwrap();
      let config: Config = toml::from_str(&text).unwrap();
      assert_eq!(
         config.attempt_timing().first_change_timeout,
         Some(Duration::from_secs(30))
      );
      assert_eq!(config.connect_timeout(), Duration::from_secs(30));
      assert_eq!(config.link_check_interval(), Duration::from_secs(5));
   }
}
