use td_entry_metadata::is_ancestor;

use std::cmp::Ordering;

use tracing::trace;

use super::change::RemoteChange;

/// Identity of the path a change makes appear on the local side
#[must_use]
pub fn created_id(change: &RemoteChange) -> Option<String> {
	if change.is_addition() || change.is_move() || change.is_restoration() {
		change.doc().map(|doc| doc.path().id())
	} else {
		None
	}
}

/// Identity of the path a change makes disappear from the local side
#[must_use]
pub fn deleted_id(change: &RemoteChange) -> Option<String> {
	if change.is_deletion() {
		change.doc().map(|doc| doc.path().id())
	} else if change.is_move() || change.is_trashing() {
		change.was().map(|was| was.path().id())
	} else {
		None
	}
}

fn parent_child(parent: Option<&str>, child: Option<&str>) -> bool {
	matches!((parent, child), (Some(parent), Some(child)) if is_ancestor(parent, child))
}

/// The identities [`compare`] works on, computed once per change
struct Ids {
	created: Option<String>,
	deleted: Option<String>,
}

impl Ids {
	fn of(change: &RemoteChange) -> Self {
		Self {
			created: created_id(change),
			deleted: deleted_id(change),
		}
	}
}

/// Rules 1 to 4 of [`compare`], `None` when the two changes touch unrelated paths
fn dependency(a: &Ids, b: &Ids) -> Option<Ordering> {
	let (created_a, created_b) = (a.created.as_deref(), b.created.as_deref());
	let (deleted_a, deleted_b) = (a.deleted.as_deref(), b.deleted.as_deref());

	if parent_child(created_a, deleted_b) {
		return Some(Ordering::Less);
	}
	if parent_child(created_b, deleted_a) {
		return Some(Ordering::Greater);
	}

	if parent_child(created_a, created_b) {
		return Some(Ordering::Less);
	}
	if parent_child(created_b, created_a) {
		return Some(Ordering::Greater);
	}
	if parent_child(deleted_b, deleted_a) {
		return Some(Ordering::Less);
	}
	if parent_child(deleted_a, deleted_b) {
		return Some(Ordering::Greater);
	}

	if deleted_a.is_some() && deleted_a == created_b {
		return Some(Ordering::Less);
	}
	if deleted_b.is_some() && deleted_b == created_a {
		return Some(Ordering::Greater);
	}

	None
}

/// Rule 5 of [`compare`], a total order on identities
fn tie_break(a: &Ids, b: &Ids) -> Ordering {
	a.created
		.cmp(&b.created)
		.then_with(|| b.deleted.cmp(&a.deleted))
}

/// Both sides agree that `earlier` must come before `later`
fn must_precede(earlier: &Ids, later: &Ids) -> bool {
	dependency(earlier, later) == Some(Ordering::Less)
		&& dependency(later, earlier) == Some(Ordering::Greater)
}

/// Decides which of two changes must be applied first.
///
/// Rules are tried in order, the first one that applies wins:
/// 1. a change creating an ancestor of the path another one removes goes first;
/// 2. parents are created before their children;
/// 3. children are removed before their parents;
/// 4. a path is vacated before being reoccupied;
/// 5. otherwise by created path, then by removed path in descending order. Changes creating
///    nothing come first, and changes removing nothing come last among equals.
///
/// Rules 1 to 4 are not transitive for every input, so this is a heuristic rather than a total
/// order. Two changes with the same identities compare as [`Ordering::Equal`].
#[must_use]
pub fn compare(a: &RemoteChange, b: &RemoteChange) -> Ordering {
	let (a, b) = (Ids::of(a), Ids::of(b));

	dependency(&a, &b).unwrap_or_else(|| tie_break(&a, &b))
}

/// Orders a batch of remote changes so they can be applied one at a time.
///
/// Rules 1 to 4 of [`compare`] are dependencies: a change is only picked once every change it
/// depends on was, wherever they sit in the batch. Among the changes ready to go, the lowest by
/// rule 5 is picked, then the earliest in the batch. When every remaining change waits on
/// another one, the dependency cycle is broken by picking the lowest of them all.
///
/// The result only depends on the batch content and on the relative order of changes with the
/// same identities, so sorting a sorted batch leaves it untouched.
pub fn sort(changes: &mut Vec<RemoteChange>) {
	let ids = changes.iter().map(Ids::of).collect::<Vec<_>>();
	let count = ids.len();

	let mut waiting_on = vec![0_usize; count];
	let mut dependents = vec![vec![]; count];

	for (i, a) in ids.iter().enumerate() {
		for (j, b) in ids.iter().enumerate().skip(i + 1) {
			let (first, then) = if must_precede(a, b) {
				(i, j)
			} else if must_precede(b, a) {
				(j, i)
			} else {
				continue;
			};

			dependents[first].push(then);
			waiting_on[then] += 1;
		}
	}

	let lowest = |a: &usize, b: &usize| tie_break(&ids[*a], &ids[*b]).then(a.cmp(b));

	let mut picked = vec![false; count];
	let mut order = Vec::with_capacity(count);

	while order.len() < count {
		let remaining = (0..count).filter(|i| !picked[*i]);

		let Some(next) = remaining
			.clone()
			.filter(|i| waiting_on[*i] == 0)
			.min_by(lowest)
			.or_else(|| {
				trace!("Breaking a dependency cycle between remote changes");
				remaining.min_by(lowest)
			})
		else {
			break;
		};

		picked[next] = true;
		order.push(next);

		for then in &dependents[next] {
			waiting_on[*then] = waiting_on[*then].saturating_sub(1);
		}
	}

	let mut slots = changes.drain(..).map(Some).collect::<Vec<_>>();
	changes.extend(order.into_iter().filter_map(|i| slots[i].take()));

	trace!(count, "Sorted remote changes;");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
	use super::*;

	use crate::classify::{added, deleted, moved, restored, trashed, updated};

	use td_entry_metadata::{build_dir, build_file, EntryMetadata, EntryStats, RelativePath};

	fn file(path: &str) -> EntryMetadata {
		build_file(RelativePath::new(path).unwrap(), &EntryStats::empty(), "")
	}

	fn dir(path: &str) -> EntryMetadata {
		build_dir(RelativePath::new(path).unwrap(), &EntryStats::empty())
	}

	fn paths(changes: &[RemoteChange]) -> Vec<String> {
		changes
			.iter()
			.map(|change| {
				format!(
					"{} {}",
					change.type_name(),
					change.doc().unwrap().path().as_str()
				)
			})
			.collect()
	}

	#[test]
	fn identities() {
		let file_move = moved(file("b/x"), file("a/x"));
		assert_eq!(created_id(&file_move).as_deref(), Some("b/x"));
		assert_eq!(deleted_id(&file_move).as_deref(), Some("a/x"));

		let addition = added(dir("a"));
		assert_eq!(created_id(&addition).as_deref(), Some("a"));
		assert_eq!(deleted_id(&addition), None);

		let deletion = deleted(dir("a"));
		assert_eq!(created_id(&deletion), None);
		assert_eq!(deleted_id(&deletion).as_deref(), Some("a"));

		let trashing = trashed(file(".trash/x"), file("x"));
		assert_eq!(created_id(&trashing), None);
		assert_eq!(deleted_id(&trashing).as_deref(), Some("x"));

		let restoration = restored(file("x"), file(".trash/x"));
		assert_eq!(created_id(&restoration).as_deref(), Some("x"));
		assert_eq!(deleted_id(&restoration), None);

		let update = updated(file("x"));
		assert_eq!(created_id(&update), None);
		assert_eq!(deleted_id(&update), None);
	}

	#[test]
	fn parents_are_added_before_children() {
		let mut changes = vec![
			added(file("a/b/c.txt")),
			added(dir("a/b")),
			added(dir("a")),
		];
		sort(&mut changes);

		assert_eq!(
			paths(&changes),
			["DirAddition a", "DirAddition a/b", "FileAddition a/b/c.txt"]
		);
	}

	#[test]
	fn children_are_deleted_before_parents() {
		let mut changes = vec![
			deleted(dir("a")),
			deleted(dir("a/b")),
			deleted(file("a/b/c.txt")),
		];
		sort(&mut changes);

		assert_eq!(
			paths(&changes),
			["FileDeletion a/b/c.txt", "DirDeletion a/b", "DirDeletion a"]
		);
	}

	#[test]
	fn path_is_vacated_before_being_reoccupied() {
		let mut changes = vec![added(file("x")), deleted(file("x"))];
		sort(&mut changes);
		assert_eq!(paths(&changes), ["FileDeletion x", "FileAddition x"]);

		let mut changes = vec![moved(file("y"), file("z")), moved(file("x"), file("y"))];
		sort(&mut changes);
		assert_eq!(
			changes
				.iter()
				.map(|change| change.was().unwrap().path().as_str())
				.collect::<Vec<_>>(),
			["y", "z"]
		);
	}

	#[test]
	fn created_ancestor_before_removed_descendant() {
		// `a2` must exist before `a2/b` can be moved away from it
		let mut changes = vec![moved(file("c"), file("a2/b")), added(dir("a2"))];
		sort(&mut changes);
		assert_eq!(changes[0].type_name(), "DirAddition");
	}

	#[test]
	fn dir_move_before_child_move() {
		let mut changes = vec![
			moved(file("a2/b"), file("a/b")),
			moved(dir("a2"), dir("a")),
		];
		sort(&mut changes);
		assert_eq!(paths(&changes), ["DirMove a2", "FileMove a2/b"]);
	}

	#[test]
	fn unrelated_changes_are_ordered_by_path() {
		let mut changes = vec![added(file("c")), added(file("a")), added(file("b"))];
		sort(&mut changes);
		assert_eq!(
			paths(&changes),
			["FileAddition a", "FileAddition b", "FileAddition c"]
		);

		// Removed paths go in descending order
		let mut changes = vec![deleted(file("x")), deleted(file("z")), deleted(file("y"))];
		sort(&mut changes);
		assert_eq!(
			paths(&changes),
			["FileDeletion z", "FileDeletion y", "FileDeletion x"]
		);
	}

	#[test]
	fn changes_creating_nothing_come_first_among_unrelated_ones() {
		let mut changes = vec![added(file("a")), updated(file("u")), deleted(file("x"))];
		sort(&mut changes);
		assert_eq!(
			paths(&changes),
			["FileDeletion x", "FileUpdate u", "FileAddition a"]
		);
	}

	#[test]
	fn related_changes_are_ordered_across_unrelated_ones() {
		let mut changes = vec![added(file("a/b")), deleted(file("x")), added(dir("a"))];
		sort(&mut changes);
		assert_eq!(
			paths(&changes),
			["FileDeletion x", "DirAddition a", "FileAddition a/b"]
		);

		let mut changes = vec![deleted(dir("a")), added(file("z")), deleted(file("a/b"))];
		sort(&mut changes);
		assert_eq!(
			paths(&changes),
			["FileDeletion a/b", "DirDeletion a", "FileAddition z"]
		);
	}

	fn permutations(items: &[RemoteChange]) -> Vec<Vec<RemoteChange>> {
		if items.len() <= 1 {
			return vec![items.to_vec()];
		}

		let mut all = vec![];
		for i in 0..items.len() {
			let mut rest = items.to_vec();
			let first = rest.remove(i);
			for mut tail in permutations(&rest) {
				tail.insert(0, first.clone());
				all.push(tail);
			}
		}
		all
	}

	#[test]
	fn every_shuffle_of_a_batch_sorts_the_same() {
		let batch = vec![
			added(dir("a")),
			added(file("a/b")),
			deleted(dir("d")),
			deleted(file("d/e")),
			added(file("z")),
			deleted(file("x")),
			moved(file("m2"), file("m")),
		];
		let expected = [
			"FileDeletion x",
			"FileDeletion d/e",
			"DirDeletion d",
			"DirAddition a",
			"FileAddition a/b",
			"FileMove m2",
			"FileAddition z",
		];

		let shuffles = permutations(&batch);
		assert_eq!(shuffles.len(), 5040);

		for mut changes in shuffles {
			sort(&mut changes);

			let sorted = paths(&changes);
			let position = |needle: &str| sorted.iter().position(|p| p == needle).unwrap();
			assert!(position("DirAddition a") < position("FileAddition a/b"));
			assert!(position("FileDeletion d/e") < position("DirDeletion d"));
			assert_eq!(sorted, expected);

			let once = changes.clone();
			sort(&mut changes);
			assert_eq!(changes, once);
		}
	}

	#[test]
	fn sorting_is_idempotent() {
		let mut changes = vec![
			deleted(dir("old")),
			moved(dir("new/sub"), dir("old/sub")),
			added(dir("new")),
			added(file("new/sub/file")),
			deleted(file("old/sub2/file")),
			trashed(dir(".trash/t"), dir("t")),
			restored(dir("t"), dir(".trash/t")),
			updated(file("u")),
			moved(file("q"), file("p")),
			moved(file("p"), file("q")),
		];
		sort(&mut changes);
		let sorted = changes.clone();
		sort(&mut changes);

		assert_eq!(changes, sorted);
	}

	#[test]
	fn compare_is_antisymmetric_on_rules() {
		let parent = added(dir("a"));
		let child = added(file("a/b"));
		assert_eq!(compare(&parent, &child), Ordering::Less);
		assert_eq!(compare(&child, &parent), Ordering::Greater);

		let update = updated(file("u"));
		assert_eq!(compare(&update, &update), Ordering::Equal);
	}
}
