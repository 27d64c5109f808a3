use td_entry_metadata::{EntryMetadata, RelativePath, RemoteDoc};

use super::error::InvalidChangeError;

/// A file moved on the remote side
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileMove {
	pub doc: EntryMetadata,
	pub was: EntryMetadata,
	pub need_refetch: bool,
	/// Content was also modified during the move
	pub update: bool,
}

/// A directory moved on the remote side, with the moves of its descendants folded in
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirMove {
	pub doc: EntryMetadata,
	pub was: EntryMetadata,
	pub need_refetch: bool,
	pub(crate) descendant_moves: Vec<RemoteChange>,
}

impl DirMove {
	#[must_use]
	pub fn new(doc: EntryMetadata, was: EntryMetadata) -> Self {
		Self {
			doc,
			was,
			need_refetch: false,
			descendant_moves: Vec::new(),
		}
	}

	#[must_use]
	pub fn descendant_moves(&self) -> &[RemoteChange] {
		&self.descendant_moves
	}
}

/// An entry that only changed because one of its ancestors moved
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DescendantChange {
	pub doc: EntryMetadata,
	pub was: EntryMetadata,
	pub ancestor_path: RelativePath,
	pub update: bool,
	pub(crate) descendant_moves: Vec<RemoteChange>,
}

impl DescendantChange {
	#[must_use]
	pub fn descendant_moves(&self) -> &[RemoteChange] {
		&self.descendant_moves
	}
}

/// A change on the remote side, ready to be ordered and merged.
///
/// Each variant carries exactly the snapshots its kind of change implies: moves, trashings,
/// restorations, descendant changes and up to date records always know the previous state,
/// additions and deletions never do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteChange {
	FileAddition {
		doc: EntryMetadata,
	},
	FileDeletion {
		doc: EntryMetadata,
	},
	FileMove(FileMove),
	FileRestoration {
		doc: EntryMetadata,
		was: EntryMetadata,
	},
	FileTrashing {
		doc: EntryMetadata,
		was: EntryMetadata,
	},
	FileUpdate {
		doc: EntryMetadata,
	},
	DirAddition {
		doc: EntryMetadata,
	},
	DirDeletion {
		doc: EntryMetadata,
	},
	DirMove(DirMove),
	DirRestoration {
		doc: EntryMetadata,
		was: EntryMetadata,
	},
	DirTrashing {
		doc: EntryMetadata,
		was: EntryMetadata,
	},
	DescendantChange(DescendantChange),
	UpToDate {
		doc: EntryMetadata,
		was: EntryMetadata,
	},
	IgnoredChange {
		doc: RemoteDoc,
		detail: String,
	},
	InvalidChange {
		doc: RemoteDoc,
		error: InvalidChangeError,
	},
}

impl RemoteChange {
	#[must_use]
	pub const fn type_name(&self) -> &'static str {
		match self {
			Self::FileAddition { .. } => "FileAddition",
			Self::FileDeletion { .. } => "FileDeletion",
			Self::FileMove(_) => "FileMove",
			Self::FileRestoration { .. } => "FileRestoration",
			Self::FileTrashing { .. } => "FileTrashing",
			Self::FileUpdate { .. } => "FileUpdate",
			Self::DirAddition { .. } => "DirAddition",
			Self::DirDeletion { .. } => "DirDeletion",
			Self::DirMove(_) => "DirMove",
			Self::DirRestoration { .. } => "DirRestoration",
			Self::DirTrashing { .. } => "DirTrashing",
			Self::DescendantChange(_) => "DescendantChange",
			Self::UpToDate { .. } => "UpToDate",
			Self::IgnoredChange { .. } => "IgnoredChange",
			Self::InvalidChange { .. } => "InvalidChange",
		}
	}

	/// Current snapshot, absent for changes we could not make sense of
	#[must_use]
	pub const fn doc(&self) -> Option<&EntryMetadata> {
		match self {
			Self::FileAddition { doc }
			| Self::FileDeletion { doc }
			| Self::FileRestoration { doc, .. }
			| Self::FileTrashing { doc, .. }
			| Self::FileUpdate { doc }
			| Self::DirAddition { doc }
			| Self::DirDeletion { doc }
			| Self::DirRestoration { doc, .. }
			| Self::DirTrashing { doc, .. }
			| Self::UpToDate { doc, .. }
			| Self::FileMove(FileMove { doc, .. })
			| Self::DirMove(DirMove { doc, .. })
			| Self::DescendantChange(DescendantChange { doc, .. }) => Some(doc),
			Self::IgnoredChange { .. } | Self::InvalidChange { .. } => None,
		}
	}

	#[must_use]
	pub const fn was(&self) -> Option<&EntryMetadata> {
		match self {
			Self::FileRestoration { was, .. }
			| Self::FileTrashing { was, .. }
			| Self::DirRestoration { was, .. }
			| Self::DirTrashing { was, .. }
			| Self::UpToDate { was, .. }
			| Self::FileMove(FileMove { was, .. })
			| Self::DirMove(DirMove { was, .. })
			| Self::DescendantChange(DescendantChange { was, .. }) => Some(was),
			_ => None,
		}
	}

	#[must_use]
	pub fn descendant_moves(&self) -> &[RemoteChange] {
		match self {
			Self::DirMove(dir_move) => dir_move.descendant_moves(),
			Self::DescendantChange(change) => change.descendant_moves(),
			_ => &[],
		}
	}

	pub(crate) fn take_descendant_moves(&mut self) -> Vec<Self> {
		match self {
			Self::DirMove(DirMove {
				descendant_moves, ..
			})
			| Self::DescendantChange(DescendantChange {
				descendant_moves, ..
			}) => std::mem::take(descendant_moves),
			_ => Vec::new(),
		}
	}

	#[must_use]
	pub const fn is_addition(&self) -> bool {
		matches!(self, Self::FileAddition { .. } | Self::DirAddition { .. })
	}

	#[must_use]
	pub const fn is_deletion(&self) -> bool {
		matches!(self, Self::FileDeletion { .. } | Self::DirDeletion { .. })
	}

	#[must_use]
	pub const fn is_move(&self) -> bool {
		matches!(self, Self::FileMove(_) | Self::DirMove(_))
	}

	#[must_use]
	pub const fn is_trashing(&self) -> bool {
		matches!(self, Self::FileTrashing { .. } | Self::DirTrashing { .. })
	}

	#[must_use]
	pub const fn is_restoration(&self) -> bool {
		matches!(
			self,
			Self::FileRestoration { .. } | Self::DirRestoration { .. }
		)
	}
}
