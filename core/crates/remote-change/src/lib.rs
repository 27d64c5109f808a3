//! Remote changes.
//!
//! The remote store tells us about documents, not about what happened to them. This crate turns
//! (previous snapshot, current snapshot) pairs into [`RemoteChange`]s, then orders a batch of them
//! so the merge layer can apply them one by one: parents are created before their children,
//! children are deleted before their parents, and moves of a directory carry the moves of its
//! descendants.

#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::dbg_macro,
	deprecated
)]
#![forbid(deprecated_in_future)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod change;
mod classify;
mod descendants;
mod error;
mod order;

pub use change::{DescendantChange, DirMove, FileMove, RemoteChange};
pub use classify::{
	added, classify, deleted, descendant, ignored, invalid, moved, restored, trashed, up_to_date,
	updated,
};
pub use descendants::{
	apply_move_to_path, fold_descendant_moves, include_descendant, is_child_move,
	is_only_child_move,
};
pub use error::InvalidChangeError;
pub use order::{compare, created_id, deleted_id, sort};
