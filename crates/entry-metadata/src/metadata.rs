use td_utils::error::FileIOError;

use std::{fs::Metadata, path::Path};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use super::{path::RelativePath, remote::RemoteRef, PathError, RemoteDoc, RemoteDocType};

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
	File,
	Folder,
}

impl EntryKind {
	#[must_use]
	pub const fn is_file(self) -> bool {
		matches!(self, Self::File)
	}

	#[must_use]
	pub const fn is_folder(self) -> bool {
		matches!(self, Self::Folder)
	}
}

/// What we keep from a `stat` call.
///
/// [`EntryStats::empty`] stands for an entry we can't stat anymore, like the origin of a rename
/// or a deleted path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryStats {
	pub is_dir: bool,
	pub size: u64,
	pub modified_at: Option<DateTime<Utc>>,
	pub inode: Option<u64>,
	pub device: Option<u64>,
}

impl EntryStats {
	#[must_use]
	pub fn empty() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn from_metadata(metadata: &Metadata) -> Self {
		#[cfg(target_family = "unix")]
		let (inode, device) = {
			use std::os::unix::fs::MetadataExt;

			(Some(metadata.ino()), Some(metadata.dev()))
		};

		#[cfg(not(target_family = "unix"))]
		let (inode, device) = (None, None);

		Self {
			is_dir: metadata.is_dir(),
			size: metadata.len(),
			modified_at: metadata.modified().ok().map(Into::into),
			inode,
			device,
		}
	}

	/// Stats `full_path`, following symlinks
	pub async fn stat(full_path: impl AsRef<Path> + Send) -> Result<Self, FileIOError> {
		let full_path = full_path.as_ref();
		fs::metadata(full_path)
			.await
			.map(|metadata| Self::from_metadata(&metadata))
			.map_err(|e| FileIOError::from((full_path, e, "stat")))
	}
}

/// One file or directory as currently known by one side of the synchronization
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
	path: RelativePath,
	kind: EntryKind,
	pub size: Option<u64>,
	pub updated_at: Option<DateTime<Utc>>,
	pub inode: Option<u64>,
	pub device: Option<u64>,
	/// Content checksum; empty while a freshly discovered file waits to be hashed
	pub md5sum: Option<String>,
	pub remote: Option<RemoteRef>,
	#[serde(default)]
	pub trashed: bool,
}

impl EntryMetadata {
	#[must_use]
	pub const fn path(&self) -> &RelativePath {
		&self.path
	}

	#[must_use]
	pub const fn kind(&self) -> EntryKind {
		self.kind
	}

	#[must_use]
	pub const fn is_file(&self) -> bool {
		self.kind.is_file()
	}

	#[must_use]
	pub const fn is_folder(&self) -> bool {
		self.kind.is_folder()
	}

	/// Same entry at another path; the kind never changes
	#[must_use]
	pub fn with_path(&self, path: RelativePath) -> Self {
		Self {
			path,
			..self.clone()
		}
	}

	pub fn from_remote(doc: &RemoteDoc) -> Result<Self, PathError> {
		let path = RelativePath::new(doc.path.trim_start_matches('/'))?;

		Ok(match doc.doc_type {
			RemoteDocType::File => Self {
				path,
				kind: EntryKind::File,
				size: doc.size,
				updated_at: doc.updated_at,
				inode: None,
				device: None,
				md5sum: doc.md5sum.clone(),
				remote: Some(RemoteRef::from(doc)),
				trashed: doc.trashed,
			},
			RemoteDocType::Directory => Self {
				path,
				kind: EntryKind::Folder,
				size: None,
				updated_at: doc.updated_at,
				inode: None,
				device: None,
				md5sum: None,
				remote: Some(RemoteRef::from(doc)),
				trashed: doc.trashed,
			},
		})
	}
}

#[must_use]
pub fn build_dir(path: RelativePath, stats: &EntryStats) -> EntryMetadata {
	EntryMetadata {
		path,
		kind: EntryKind::Folder,
		size: None,
		updated_at: stats.modified_at,
		inode: stats.inode,
		device: stats.device,
		md5sum: None,
		remote: None,
		trashed: false,
	}
}

#[must_use]
pub fn build_file(path: RelativePath, stats: &EntryStats, md5sum: impl Into<String>) -> EntryMetadata {
	EntryMetadata {
		path,
		kind: EntryKind::File,
		size: Some(stats.size),
		updated_at: stats.modified_at,
		inode: stats.inode,
		device: stats.device,
		md5sum: Some(md5sum.into()),
		remote: None,
		trashed: false,
	}
}
