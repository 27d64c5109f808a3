use td_entry_metadata::RelativePath;

use std::collections::VecDeque;

use tracing::trace;

use super::change::{DescendantChange, DirMove, FileMove, RemoteChange};

/// Whether `child` moved along with `parent`: it was below `parent` before the move and is still
/// below it after
#[must_use]
pub fn is_child_move(parent: &DirMove, child: &RemoteChange) -> bool {
	let (doc, was) = match child {
		RemoteChange::FileMove(FileMove { doc, was, .. })
		| RemoteChange::DirMove(DirMove { doc, was, .. })
		| RemoteChange::DescendantChange(DescendantChange { doc, was, .. }) => (doc, was),
		_ => return false,
	};

	parent.doc.path().is_ancestor_of(doc.path()) && parent.was.path().is_ancestor_of(was.path())
}

/// Whether `child` only moved because `parent` did.
///
/// ```text
///              was       doc
///   parent     a    ->   a2
///   child      a/b  ->   a2/b
/// ```
///
/// When the child also moved relative to its parent, the merge layer can't just replay the parent
/// offset and has to handle the child move on its own.
#[must_use]
pub fn is_only_child_move(parent: &DirMove, child: &RemoteChange) -> bool {
	if !is_child_move(parent, child) {
		return false;
	}

	match (child.doc(), child.was()) {
		(Some(doc), Some(was)) => {
			doc.path().id_below(parent.doc.path()) == was.path().id_below(parent.was.path())
		}
		_ => false,
	}
}

/// Where `path` ends up once `dir_move` is applied; paths outside the moved directory are kept
#[must_use]
pub fn apply_move_to_path(dir_move: &DirMove, path: &RelativePath) -> RelativePath {
	path.replace_prefix(dir_move.was.path(), dir_move.doc.path())
		.unwrap_or_else(|| path.clone())
}

/// Folds `child`, and everything already folded into it, into `parent`
pub fn include_descendant(parent: &mut DirMove, mut child: RemoteChange) {
	let grandchildren = child.take_descendant_moves();

	trace!(
		parent = %parent.doc.path(),
		child = ?child.doc().map(|doc| doc.path().as_str()),
		grandchildren = grandchildren.len(),
		"Folding descendant move;"
	);

	parent.descendant_moves.push(child);
	parent.descendant_moves.extend(grandchildren);
}

/// Folds every move that happened below a moved directory into that directory's change.
///
/// Children are folded whether they come before or after their ancestor in the batch. The
/// returned batch keeps the relative order of the changes that were not folded.
#[must_use]
pub fn fold_descendant_moves(changes: Vec<RemoteChange>) -> Vec<RemoteChange> {
	let mut queue = VecDeque::from(changes);
	let mut folded: Vec<RemoteChange> = Vec::with_capacity(queue.len());

	while let Some(change) = queue.pop_front() {
		let maybe_parent_idx = folded.iter().position(|candidate| {
			matches!(candidate, RemoteChange::DirMove(parent) if is_child_move(parent, &change))
		});

		if let Some(parent_idx) = maybe_parent_idx {
			if let RemoteChange::DirMove(parent) = &mut folded[parent_idx] {
				include_descendant(parent, change);
				continue;
			}
		}

		let mut change = change;
		if let RemoteChange::DirMove(parent) = &mut change {
			let (children, others): (Vec<_>, Vec<_>) = folded
				.into_iter()
				.partition(|candidate| is_child_move(parent, candidate));

			folded = others;
			for child in children {
				include_descendant(parent, child);
			}
		}

		folded.push(change);
	}

	folded
}
