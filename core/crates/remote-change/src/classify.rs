use td_entry_metadata::{EntryMetadata, RelativePath, RemoteDoc};

use tracing::trace;

use super::{
	change::{DescendantChange, DirMove, FileMove, RemoteChange},
	error::InvalidChangeError,
};

#[must_use]
pub fn added(doc: EntryMetadata) -> RemoteChange {
	if doc.is_file() {
		RemoteChange::FileAddition { doc }
	} else {
		RemoteChange::DirAddition { doc }
	}
}

#[must_use]
pub fn trashed(doc: EntryMetadata, was: EntryMetadata) -> RemoteChange {
	if doc.is_file() {
		RemoteChange::FileTrashing { doc, was }
	} else {
		RemoteChange::DirTrashing { doc, was }
	}
}

#[must_use]
pub fn deleted(doc: EntryMetadata) -> RemoteChange {
	if doc.is_file() {
		RemoteChange::FileDeletion { doc }
	} else {
		RemoteChange::DirDeletion { doc }
	}
}

#[must_use]
pub fn restored(doc: EntryMetadata, was: EntryMetadata) -> RemoteChange {
	if doc.is_file() {
		RemoteChange::FileRestoration { doc, was }
	} else {
		RemoteChange::DirRestoration { doc, was }
	}
}

#[must_use]
pub const fn up_to_date(doc: EntryMetadata, was: EntryMetadata) -> RemoteChange {
	RemoteChange::UpToDate { doc, was }
}

/// Directories have no content, so an updated directory is handled as a fresh addition
#[must_use]
pub fn updated(doc: EntryMetadata) -> RemoteChange {
	if doc.is_file() {
		RemoteChange::FileUpdate { doc }
	} else {
		RemoteChange::DirAddition { doc }
	}
}

#[must_use]
pub fn moved(doc: EntryMetadata, was: EntryMetadata) -> RemoteChange {
	if doc.is_file() {
		let update = doc.md5sum != was.md5sum;
		RemoteChange::FileMove(FileMove {
			doc,
			was,
			need_refetch: false,
			update,
		})
	} else {
		RemoteChange::DirMove(DirMove::new(doc, was))
	}
}

#[must_use]
pub const fn descendant(
	doc: EntryMetadata,
	was: EntryMetadata,
	ancestor_path: RelativePath,
) -> RemoteChange {
	RemoteChange::DescendantChange(DescendantChange {
		doc,
		was,
		ancestor_path,
		update: false,
		descendant_moves: Vec::new(),
	})
}

#[must_use]
pub fn ignored(doc: RemoteDoc, detail: impl Into<String>) -> RemoteChange {
	RemoteChange::IgnoredChange {
		doc,
		detail: detail.into(),
	}
}

#[must_use]
pub const fn invalid(doc: RemoteDoc, error: InvalidChangeError) -> RemoteChange {
	RemoteChange::InvalidChange { doc, error }
}

/// Turns the last known state of an entry and its current remote snapshot into a change.
///
/// Never fails: documents we can't make sense of become [`RemoteChange::InvalidChange`] so a
/// single bad document doesn't block the rest of the batch.
#[must_use]
pub fn classify(was: Option<&EntryMetadata>, remote: RemoteDoc) -> RemoteChange {
	if remote.deleted {
		return match was {
			Some(was) => deleted(was.clone()),
			None => ignored(remote, "deleted document was never synced"),
		};
	}

	let doc = match EntryMetadata::from_remote(&remote) {
		Ok(doc) => doc,
		Err(source) => {
			let error = InvalidChangeError::InvalidPath {
				id: remote.id.clone(),
				path: remote.path.clone(),
				source,
			};
			return invalid(remote, error);
		}
	};

	let Some(was) = was else {
		if doc.trashed {
			return ignored(remote, "trashed document was never synced");
		}
		return added(doc);
	};

	if was.kind() != doc.kind() {
		let error = InvalidChangeError::KindChanged {
			path: doc.path().clone(),
			was: was.kind(),
			now: doc.kind(),
		};
		return invalid(remote, error);
	}

	let change = match (was.trashed, doc.trashed) {
		(false, true) => trashed(doc, was.clone()),
		(true, false) => restored(doc, was.clone()),
		_ if doc.path().id() != was.path().id() => moved(doc, was.clone()),
		_ if same_revision(&doc, was) => up_to_date(doc, was.clone()),
		_ => updated(doc),
	};

	trace!(change = change.type_name(), id = %remote.id, "Classified remote document;");

	change
}

fn same_revision(doc: &EntryMetadata, was: &EntryMetadata) -> bool {
	matches!((&doc.remote, &was.remote), (Some(now), Some(before)) if now.rev == before.rev)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
	use super::*;

	use td_entry_metadata::{build_dir, build_file, EntryStats, RemoteDocType};
	use tracing_test::traced_test;

	fn remote(path: &str, doc_type: RemoteDocType, rev: &str) -> RemoteDoc {
		RemoteDoc {
			id: format!("id:{path}"),
			rev: rev.to_string(),
			doc_type,
			path: format!("/{path}"),
			size: None,
			updated_at: None,
			md5sum: None,
			trashed: false,
			deleted: false,
		}
	}

	fn known(doc: &RemoteDoc) -> EntryMetadata {
		EntryMetadata::from_remote(doc).unwrap()
	}

	fn file(path: &str) -> EntryMetadata {
		build_file(RelativePath::new(path).unwrap(), &EntryStats::empty(), "")
	}

	fn dir(path: &str) -> EntryMetadata {
		build_dir(RelativePath::new(path).unwrap(), &EntryStats::empty())
	}

	#[test]
	fn constructors_dispatch_on_kind() {
		assert_eq!(added(file("a")).type_name(), "FileAddition");
		assert_eq!(added(dir("a")).type_name(), "DirAddition");
		assert_eq!(deleted(file("a")).type_name(), "FileDeletion");
		assert_eq!(deleted(dir("a")).type_name(), "DirDeletion");
		assert_eq!(trashed(file("a"), file("a")).type_name(), "FileTrashing");
		assert_eq!(trashed(dir("a"), dir("a")).type_name(), "DirTrashing");
		assert_eq!(restored(file("a"), file("a")).type_name(), "FileRestoration");
		assert_eq!(restored(dir("a"), dir("a")).type_name(), "DirRestoration");
		assert_eq!(moved(file("b"), file("a")).type_name(), "FileMove");
		assert_eq!(moved(dir("b"), dir("a")).type_name(), "DirMove");
		assert_eq!(up_to_date(dir("a"), dir("a")).type_name(), "UpToDate");
	}

	#[test]
	fn updated_directory_is_an_addition() {
		assert_eq!(updated(file("a")).type_name(), "FileUpdate");

		let change = updated(dir("a"));
		assert_eq!(change.type_name(), "DirAddition");
		assert!(change.was().is_none());
	}

	#[test]
	fn snapshots_follow_the_change_kind() {
		assert!(added(file("a")).was().is_none());
		assert!(deleted(file("a")).was().is_none());
		assert_eq!(
			trashed(file(".trash/a"), file("a")).was().unwrap().path().as_str(),
			"a"
		);
		assert_eq!(
			descendant(file("b/x"), file("a/x"), RelativePath::new("b").unwrap())
				.was()
				.unwrap()
				.path()
				.as_str(),
			"a/x"
		);
	}

	#[test]
	fn classify_new_document() {
		let change = classify(None, remote("docs", RemoteDocType::Directory, "1-a"));
		assert_eq!(change.type_name(), "DirAddition");
		assert_eq!(change.doc().unwrap().path().as_str(), "docs");
	}

	#[test]
	fn classify_deletions() {
		let doc = remote("docs/a.txt", RemoteDocType::File, "2-a");
		let was = known(&doc);

		let mut gone = doc.clone();
		gone.deleted = true;

		let change = classify(Some(&was), gone.clone());
		assert_eq!(change.type_name(), "FileDeletion");
		assert_eq!(change.doc(), Some(&was));

		assert_eq!(classify(None, gone).type_name(), "IgnoredChange");
	}

	#[test]
	fn classify_trash_and_restore() {
		let doc = remote("docs", RemoteDocType::Directory, "1-a");
		let was = known(&doc);

		let mut in_trash = doc.clone();
		in_trash.rev = "2-b".to_string();
		in_trash.trashed = true;
		let change = classify(Some(&was), in_trash.clone());
		assert_eq!(change.type_name(), "DirTrashing");
		assert_eq!(change.was(), Some(&was));

		let trashed_was = known(&in_trash);
		let change = classify(Some(&trashed_was), doc);
		assert_eq!(change.type_name(), "DirRestoration");

		assert_eq!(classify(None, in_trash).type_name(), "IgnoredChange");
	}

	#[test]
	fn classify_move_update_and_up_to_date() {
		let doc = remote("a.txt", RemoteDocType::File, "1-a");
		let was = known(&doc);

		assert_eq!(classify(Some(&was), doc.clone()).type_name(), "UpToDate");

		let mut renamed = doc.clone();
		renamed.path = "/b.txt".to_string();
		renamed.rev = "2-a".to_string();
		let RemoteChange::FileMove(file_move) = classify(Some(&was), renamed) else {
			panic!("expected a file move");
		};
		assert_eq!(file_move.was.path().as_str(), "a.txt");
		assert_eq!(file_move.doc.path().as_str(), "b.txt");
		assert!(!file_move.update);

		let mut edited = doc;
		edited.rev = "3-a".to_string();
		edited.md5sum = Some("new".to_string());
		assert_eq!(classify(Some(&was), edited).type_name(), "FileUpdate");
	}

	#[test]
	fn classify_invalid_documents() {
		let mut escaping = remote("x", RemoteDocType::File, "1-a");
		escaping.path = "/../etc/passwd".to_string();
		let RemoteChange::InvalidChange { error, .. } = classify(None, escaping) else {
			panic!("expected an invalid change");
		};
		assert!(matches!(error, InvalidChangeError::InvalidPath { .. }));

		let was = dir("x");
		let now = remote("x", RemoteDocType::File, "2-a");
		let RemoteChange::InvalidChange { error, .. } = classify(Some(&was), now) else {
			panic!("expected an invalid change");
		};
		assert!(matches!(error, InvalidChangeError::KindChanged { .. }));
	}

	#[test]
	#[traced_test]
	fn classify_documents_as_the_remote_store_sends_them() {
		let doc = serde_json::from_str::<RemoteDoc>(
			r#"{
				"_id": "f1",
				"_rev": "2-b",
				"type": "file",
				"path": "/Photos/2024/beach.jpg",
				"size": 1024,
				"md5sum": "rL0Y20zC+Fzt72VPzMSk2A=="
			}"#,
		)
		.unwrap();
		let was = serde_json::from_str::<RemoteDoc>(
			r#"{"_id": "f1", "_rev": "1-a", "type": "file", "path": "/Photos/beach.jpg"}"#,
		)
		.unwrap();

		let change = classify(Some(&known(&was)), doc);

		let RemoteChange::FileMove(file_move) = &change else {
			panic!("expected a file move, got {change:?}");
		};
		assert_eq!(file_move.doc.path().as_str(), "Photos/2024/beach.jpg");
		assert_eq!(file_move.was.path().as_str(), "Photos/beach.jpg");
		assert!(file_move.update);
		assert!(logs_contain("Classified remote document"));
	}
}
