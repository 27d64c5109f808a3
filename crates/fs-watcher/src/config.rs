//! Watcher configuration

use crate::{Error, Result};

use td_entry_metadata::RelativePath;
use td_utils::error::FileIOError;

use std::{
	fs,
	path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherConfig {
	/// Config schema version
	pub version: u32,

	/// Directory being synchronized
	pub sync_path: PathBuf,

	/// Default tracing filter, `RUST_LOG` wins when set
	#[serde(default = "default_log_level")]
	pub log_level: String,

	/// Watch directories created or moved in after the initial scan
	#[serde(default = "default_watch_new_directories")]
	pub watch_new_directories: bool,

	/// Raw event batches buffered between the backend and the source
	#[serde(default = "default_event_channel_capacity")]
	pub event_channel_capacity: usize,

	/// Entries under these prefixes are neither watched nor reported
	#[serde(default)]
	pub ignored: Vec<RelativePath>,
}

fn default_log_level() -> String {
	"info".to_string()
}

const fn default_watch_new_directories() -> bool {
	true
}

const fn default_event_channel_capacity() -> usize {
	1024
}

impl WatcherConfig {
	#[must_use]
	pub fn default_with_sync_path(sync_path: impl Into<PathBuf>) -> Self {
		Self {
			version: CURRENT_VERSION,
			sync_path: sync_path.into(),
			log_level: default_log_level(),
			watch_new_directories: default_watch_new_directories(),
			event_channel_capacity: default_event_channel_capacity(),
			ignored: vec![],
		}
	}

	/// Loads the configuration file at `config_path`, writing a default one pointing at
	/// `sync_path` if there is none yet.
	pub fn load_from(config_path: impl AsRef<Path>, sync_path: impl Into<PathBuf>) -> Result<Self> {
		let config_path = config_path.as_ref();

		match fs::read_to_string(config_path) {
			Ok(json) => {
				info!(config_path = %config_path.display(), "Loading watcher config");
				let mut config = serde_json::from_str::<Self>(&json)?;

				if config.version > CURRENT_VERSION {
					return Err(Error::ConfigVersion {
						found: config.version,
						supported: CURRENT_VERSION,
					});
				}

				if config.version < CURRENT_VERSION {
					info!(
						from = config.version,
						to = CURRENT_VERSION,
						"Migrating watcher config"
					);
					// Every field added since version 0 has a serde default
					config.version = CURRENT_VERSION;
					config.save_to(config_path)?;
				}

				Ok(config)
			}

			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				warn!(config_path = %config_path.display(), "No watcher config found, creating default");
				let config = Self::default_with_sync_path(sync_path);
				config.save_to(config_path)?;
				Ok(config)
			}

			Err(e) => Err(FileIOError::from((config_path, e, "Failed to read watcher config")).into()),
		}
	}

	pub fn save_to(&self, config_path: impl AsRef<Path>) -> Result<()> {
		let config_path = config_path.as_ref();

		if let Some(parent) = config_path.parent() {
			fs::create_dir_all(parent).map_err(|e| {
				FileIOError::from((parent, e, "Failed to create watcher config directory"))
			})?;
		}

		let json = serde_json::to_string_pretty(self)?;
		fs::write(config_path, json)
			.map_err(|e| FileIOError::from((config_path, e, "Failed to write watcher config")))?;

		info!(config_path = %config_path.display(), "Saved watcher config");

		Ok(())
	}
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
	use super::*;

	use tempfile::tempdir;

	#[test]
	fn missing_file_writes_the_default() {
		let dir = tempdir().unwrap();
		let config_path = dir.path().join("nested").join("watcher.json");

		let config = WatcherConfig::load_from(&config_path, "/sync").unwrap();

		assert_eq!(config, WatcherConfig::default_with_sync_path("/sync"));
		assert!(config.watch_new_directories);
		assert_eq!(config.event_channel_capacity, 1024);
		assert!(config_path.exists());

		// Loading again reads what we just wrote, whatever sync path we pass
		assert_eq!(
			WatcherConfig::load_from(&config_path, "/elsewhere").unwrap(),
			config
		);
	}

	#[test]
	fn old_versions_get_defaults_and_are_rewritten() {
		let dir = tempdir().unwrap();
		let config_path = dir.path().join("watcher.json");
		fs::write(
			&config_path,
			r#"{"version":0,"sync_path":"/sync","ignored":[".cache"]}"#,
		)
		.unwrap();

		let config = WatcherConfig::load_from(&config_path, "/unused").unwrap();

		assert_eq!(config.version, CURRENT_VERSION);
		assert_eq!(config.log_level, "info");
		assert_eq!(config.ignored, vec![RelativePath::new(".cache").unwrap()]);

		let rewritten = fs::read_to_string(&config_path).unwrap();
		assert!(rewritten.contains(r#""version": 1"#));
	}

	#[test]
	fn newer_versions_are_refused() {
		let dir = tempdir().unwrap();
		let config_path = dir.path().join("watcher.json");
		fs::write(&config_path, r#"{"version":42,"sync_path":"/sync"}"#).unwrap();

		assert!(matches!(
			WatcherConfig::load_from(&config_path, "/sync"),
			Err(Error::ConfigVersion {
				found: 42,
				supported: CURRENT_VERSION
			})
		));
	}
}
