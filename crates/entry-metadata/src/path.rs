use std::{
	fmt,
	path::{Component, Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The only separator used in relative paths, whatever the platform
pub const SEPARATOR: char = '/';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
	#[error("expected a relative path, got an absolute one: <path='{0}'>")]
	Absolute(String),
	#[error("path escapes the synchronized root: <path='{0}'>")]
	ParentSegment(String),
	#[error("path contains a NUL byte: <path='{0:?}'>")]
	NulByte(String),
	#[error("path is outside of the synchronized root: <root='{}', path='{}'>", .root.display(), .path.display())]
	OutsideRoot { root: Box<Path>, path: Box<Path> },
	#[error("received a non UTF-8 path: <path='{}'>", .0.display())]
	NonUtf8(Box<Path>),
}

/// A path relative to the synchronized root, in canonical form.
///
/// Canonical form means: no leading or trailing separator, no empty or `.` segments, no `..`
/// segments and `/` as separator. The root itself is the empty path.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativePath(String);

impl RelativePath {
	pub fn new(raw: impl AsRef<str>) -> Result<Self, PathError> {
		let raw = raw.as_ref();

		if raw.contains('\0') {
			return Err(PathError::NulByte(raw.to_string()));
		}

		if raw.starts_with(SEPARATOR) {
			return Err(PathError::Absolute(raw.to_string()));
		}

		let mut segments = Vec::new();
		for segment in raw.split(SEPARATOR) {
			match segment {
				"" | "." => {}
				".." => return Err(PathError::ParentSegment(raw.to_string())),
				name => segments.push(name),
			}
		}

		Ok(Self(segments.join("/")))
	}

	/// Builds the relative path of `full_path` inside `root`
	pub fn from_full_path(
		root: impl AsRef<Path>,
		full_path: impl AsRef<Path>,
	) -> Result<Self, PathError> {
		let root = root.as_ref();
		let full_path = full_path.as_ref();

		let stripped = full_path
			.strip_prefix(root)
			.map_err(|_| PathError::OutsideRoot {
				root: root.into(),
				path: full_path.into(),
			})?;

		let mut segments = Vec::new();
		for component in stripped.components() {
			match component {
				Component::Normal(name) => segments.push(
					name.to_str()
						.ok_or_else(|| PathError::NonUtf8(full_path.into()))?,
				),
				Component::CurDir => {}
				Component::ParentDir => {
					return Err(PathError::ParentSegment(
						stripped.to_string_lossy().into_owned(),
					))
				}
				Component::RootDir | Component::Prefix(_) => {
					return Err(PathError::Absolute(
						stripped.to_string_lossy().into_owned(),
					))
				}
			}
		}

		Self::new(segments.join("/"))
	}

	#[must_use]
	pub fn root() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}

	#[must_use]
	pub fn is_root(&self) -> bool {
		self.0.is_empty()
	}

	/// Last segment of the path, empty for the root
	#[must_use]
	pub fn name(&self) -> &str {
		self.0
			.rsplit_once(SEPARATOR)
			.map_or(self.0.as_str(), |(_, name)| name)
	}

	#[must_use]
	pub fn parent(&self) -> Option<Self> {
		if self.is_root() {
			return None;
		}

		Some(Self(
			self.0
				.rsplit_once(SEPARATOR)
				.map(|(parent, _)| parent.to_string())
				.unwrap_or_default(),
		))
	}

	pub fn join(&self, name: impl AsRef<str>) -> Result<Self, PathError> {
		let name = Self::new(name)?;
		if self.is_root() {
			Ok(name)
		} else if name.is_root() {
			Ok(self.clone())
		} else {
			Ok(Self(format!("{}{SEPARATOR}{}", self.0, name.0)))
		}
	}

	#[must_use]
	pub fn to_full_path(&self, root: impl AsRef<Path>) -> PathBuf {
		let root = root.as_ref();
		if self.is_root() {
			root.to_path_buf()
		} else {
			root.join(&self.0)
		}
	}

	/// Identity used to compare paths the way the local file system does
	#[must_use]
	pub fn id(&self) -> String {
		id(&self.0)
	}

	/// Whether `self` is a strict ancestor of `other`, comparing identities
	#[must_use]
	pub fn is_ancestor_of(&self, other: &Self) -> bool {
		is_ancestor(&self.id(), &other.id())
	}

	/// What remains of `self` below `ancestor`, if `self` is strictly below it
	#[must_use]
	pub fn strip_ancestor(&self, ancestor: &Self) -> Option<&str> {
		if ancestor.is_root() {
			return (!self.is_root()).then_some(self.0.as_str());
		}

		self.0
			.strip_prefix(ancestor.0.as_str())
			.and_then(|rest| rest.strip_prefix(SEPARATOR))
			.filter(|rest| !rest.is_empty())
	}

	/// Identity of what remains of `self` below `ancestor`, if `self` is strictly below it
	/// identity wise
	#[must_use]
	pub fn id_below(&self, ancestor: &Self) -> Option<String> {
		if !ancestor.is_ancestor_of(self) {
			return None;
		}

		let (id, ancestor_id) = (self.id(), ancestor.id());
		let rest = id.get(ancestor_id.len()..)?;

		Some(rest.strip_prefix(SEPARATOR).unwrap_or(rest).to_string())
	}

	/// Substitutes the `from` prefix of `self` by `to`.
	///
	/// Returns `None` when `self` is neither `from` nor one of its descendants.
	#[must_use]
	pub fn replace_prefix(&self, from: &Self, to: &Self) -> Option<Self> {
		if self == from {
			return Some(to.clone());
		}

		self.strip_ancestor(from).map(|rest| {
			if to.is_root() {
				Self(rest.to_string())
			} else {
				Self(format!("{}{SEPARATOR}{rest}", to.0))
			}
		})
	}
}

impl fmt::Display for RelativePath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl AsRef<str> for RelativePath {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl TryFrom<String> for RelativePath {
	type Error = PathError;

	fn try_from(raw: String) -> Result<Self, Self::Error> {
		Self::new(raw)
	}
}

impl TryFrom<&str> for RelativePath {
	type Error = PathError;

	fn try_from(raw: &str) -> Result<Self, Self::Error> {
		Self::new(raw)
	}
}

impl From<RelativePath> for String {
	fn from(path: RelativePath) -> Self {
		path.0
	}
}

/// Identity of a relative path.
///
/// Two paths with the same identity designate the same entry on the local file system. Linux file
/// systems are case sensitive so the identity is the path itself, macOS and Windows ones usually
/// are not.
#[must_use]
pub fn id(path: &str) -> String {
	#[cfg(any(target_os = "macos", target_os = "windows"))]
	{
		path.to_uppercase()
	}

	#[cfg(not(any(target_os = "macos", target_os = "windows")))]
	{
		path.to_string()
	}
}

/// Whether `parent` is a strict ancestor of `child`, up to a full path segment.
///
/// The root (empty path) is an ancestor of every other path. A path is never its own ancestor.
#[must_use]
pub fn is_ancestor(parent: &str, child: &str) -> bool {
	if parent.is_empty() {
		return !child.is_empty();
	}

	child
		.strip_prefix(parent)
		.is_some_and(|rest| rest.len() > 1 && rest.starts_with(SEPARATOR))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
	use super::*;

	#[test]
	fn canonical_form() {
		assert_eq!(RelativePath::new("a//b/./c/").unwrap().as_str(), "a/b/c");
		assert_eq!(RelativePath::new("./").unwrap(), RelativePath::root());
		assert!(matches!(
			RelativePath::new("/a"),
			Err(PathError::Absolute(_))
		));
		assert!(matches!(
			RelativePath::new("a/../b"),
			Err(PathError::ParentSegment(_))
		));
		assert!(matches!(
			RelativePath::new("a\0b"),
			Err(PathError::NulByte(_))
		));
	}

	#[test]
	fn from_full_path() {
		let path = RelativePath::from_full_path("/sync", "/sync/photos/cat.jpg").unwrap();
		assert_eq!(path.as_str(), "photos/cat.jpg");
		assert_eq!(path.name(), "cat.jpg");
		assert_eq!(path.parent().unwrap().as_str(), "photos");
		assert_eq!(
			path.to_full_path("/sync"),
			PathBuf::from("/sync/photos/cat.jpg")
		);

		assert!(RelativePath::from_full_path("/sync", "/sync")
			.unwrap()
			.is_root());
		assert!(matches!(
			RelativePath::from_full_path("/sync", "/other/file"),
			Err(PathError::OutsideRoot { .. })
		));
	}

	#[test]
	fn ancestors_are_strict_and_segment_aligned() {
		assert!(is_ancestor("a", "a/b"));
		assert!(is_ancestor("a", "a/b/c"));
		assert!(is_ancestor("", "a"));
		assert!(!is_ancestor("a", "a"));
		assert!(!is_ancestor("a", "ab/c"));
		assert!(!is_ancestor("a", "a/"));
		assert!(!is_ancestor("a/b", "a"));
		assert!(!is_ancestor("", ""));
	}

	#[test]
	fn id_below_compares_identities() {
		let path = RelativePath::new("a/b/c").unwrap();

		assert_eq!(
			path.id_below(&RelativePath::new("a").unwrap()),
			Some(id("b/c"))
		);
		assert_eq!(path.id_below(&RelativePath::root()), Some(id("a/b/c")));
		assert_eq!(path.id_below(&path), None);
		assert_eq!(path.id_below(&RelativePath::new("a/b/c/d").unwrap()), None);

		// Only below `A` where the file system ignores case
		let upper = RelativePath::new("A").unwrap();
		assert_eq!(
			path.id_below(&upper).is_some(),
			upper.is_ancestor_of(&path)
		);
	}

	#[test]
	fn replace_prefix() {
		let from = RelativePath::new("a").unwrap();
		let to = RelativePath::new("a2").unwrap();

		assert_eq!(
			RelativePath::new("a/b/c")
				.unwrap()
				.replace_prefix(&from, &to)
				.unwrap()
				.as_str(),
			"a2/b/c"
		);
		assert_eq!(from.replace_prefix(&from, &to).unwrap(), to);
		assert!(RelativePath::new("ab/c")
			.unwrap()
			.replace_prefix(&from, &to)
			.is_none());
	}

	#[test]
	fn join_and_root() {
		let root = RelativePath::root();
		let dir = root.join("dir").unwrap();
		assert_eq!(dir.as_str(), "dir");
		assert_eq!(dir.join("file.txt").unwrap().as_str(), "dir/file.txt");
		assert!(dir.join("../x").is_err());
		assert_eq!(root.name(), "");
		assert!(root.parent().is_none());
		assert_eq!(dir.parent().unwrap(), root);
	}

	#[test]
	fn serde_validates() {
		let path: RelativePath = serde_json::from_str("\"a/b\"").unwrap();
		assert_eq!(path.as_str(), "a/b");
		assert!(serde_json::from_str::<RelativePath>("\"/etc/passwd\"").is_err());
		assert_eq!(serde_json::to_string(&path).unwrap(), "\"a/b\"");
	}
}
