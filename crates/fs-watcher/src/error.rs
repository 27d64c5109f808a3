use td_entry_metadata::{PathError, RelativePath};
use td_utils::error::FileIOError;

use std::path::Path;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
	/// The event source sent an action we don't know about, which means it doesn't speak
	/// our protocol and nothing it sends afterwards can be trusted.
	#[error("unknown raw event action: <action='{action}', path='{path}'>")]
	UnknownAction { action: String, path: RelativePath },
	#[error("renamed event without an origin path: <path='{0}'>")]
	MissingOldPath(RelativePath),
	#[error("failed to watch directory: <path='{}'>: {source}", .path.display())]
	Watch {
		path: Box<Path>,
		#[source]
		source: notify::Error,
	},
	#[error("next layer failed to handle the batch: {0}")]
	Downstream(String),

	// Configuration
	#[error("failed to parse watcher configuration: {0}")]
	ConfigParse(#[from] serde_json::Error),
	#[error("unsupported watcher configuration version: <found={found}, supported={supported}>")]
	ConfigVersion { found: u32, supported: u32 },

	// Internal errors
	#[error(transparent)]
	FileIO(#[from] FileIOError),
	#[error(transparent)]
	Path(#[from] PathError),
}
