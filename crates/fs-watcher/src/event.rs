use td_entry_metadata::{EntryMetadata, RelativePath};

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a raw notification says happened.
///
/// Anything we don't recognize is kept in [`RawAction::Other`] so the normalizer can refuse it
/// with the offending value instead of losing it at deserialization time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RawAction {
	Created,
	Updated,
	Deleted,
	Renamed,
	Other(String),
}

impl RawAction {
	#[must_use]
	pub fn as_str(&self) -> &str {
		match self {
			Self::Created => "created",
			Self::Updated => "updated",
			Self::Deleted => "deleted",
			Self::Renamed => "renamed",
			Self::Other(action) => action,
		}
	}
}

impl From<String> for RawAction {
	fn from(action: String) -> Self {
		match action.as_str() {
			"created" => Self::Created,
			"updated" => Self::Updated,
			"deleted" => Self::Deleted,
			"renamed" => Self::Renamed,
			_ => Self::Other(action),
		}
	}
}

impl From<RawAction> for String {
	fn from(action: RawAction) -> Self {
		match action {
			RawAction::Other(action) => action,
			known => known.as_str().to_string(),
		}
	}
}

impl fmt::Display for RawAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A notification as emitted by a watch backend, paths relative to the synchronized root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
	pub action: RawAction,
	pub path: RelativePath,
	#[serde(rename = "oldPath", default, skip_serializing_if = "Option::is_none")]
	pub old_path: Option<RelativePath>,
}

impl RawEvent {
	#[must_use]
	pub const fn created(path: RelativePath) -> Self {
		Self {
			action: RawAction::Created,
			path,
			old_path: None,
		}
	}

	#[must_use]
	pub const fn updated(path: RelativePath) -> Self {
		Self {
			action: RawAction::Updated,
			path,
			old_path: None,
		}
	}

	#[must_use]
	pub const fn deleted(path: RelativePath) -> Self {
		Self {
			action: RawAction::Deleted,
			path,
			old_path: None,
		}
	}

	#[must_use]
	pub const fn renamed(old_path: RelativePath, path: RelativePath) -> Self {
		Self {
			action: RawAction::Renamed,
			path,
			old_path: Some(old_path),
		}
	}
}

/// A normalized local change, ready for the next layer.
///
/// The `doc` of a [`LocalChange::Remove`] and the `src` of a [`LocalChange::Move`] describe
/// entries that no longer exist on disk, so they're built from empty stats: only their path
/// is meaningful.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum LocalChange {
	Add { doc: EntryMetadata },
	Update { doc: EntryMetadata },
	Remove { doc: EntryMetadata },
	/// `src` is the entry before the move.
	///
	/// A moved directory is watched again under its new path and listed, so its entries
	/// follow as [`LocalChange::Add`]s in later batches, including the ones that moved along
	/// with it. Downstream must treat an `Add` of an entry it already knows there as a no-op.
	Move { doc: EntryMetadata, src: EntryMetadata },
}

impl LocalChange {
	#[must_use]
	pub const fn doc(&self) -> &EntryMetadata {
		match self {
			Self::Add { doc } | Self::Update { doc } | Self::Remove { doc } | Self::Move { doc, .. } => {
				doc
			}
		}
	}

	#[must_use]
	pub const fn action_name(&self) -> &'static str {
		match self {
			Self::Add { .. } => "add",
			Self::Update { .. } => "update",
			Self::Remove { .. } => "remove",
			Self::Move { .. } => "move",
		}
	}

	/// A directory that appeared under the root, either created or moved in place.
	#[must_use]
	pub fn new_folder(&self) -> Option<&RelativePath> {
		match self {
			Self::Add { doc } | Self::Move { doc, .. } if doc.is_folder() => Some(doc.path()),
			_ => None,
		}
	}
}
