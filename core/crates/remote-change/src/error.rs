use td_entry_metadata::{EntryKind, PathError, RelativePath};

use thiserror::Error;

/// Why a remote document could not be turned into an actionable change
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidChangeError {
	#[error("remote document has an invalid path: <id='{id}', path='{path}'>: {source}")]
	InvalidPath {
		id: String,
		path: String,
		#[source]
		source: PathError,
	},
	#[error("remote document changed kind from {was:?} to {now:?}: <path='{path}'>")]
	KindChanged {
		path: RelativePath,
		was: EntryKind,
		now: EntryKind,
	},
}
