//! Entry metadata for Tandem.
//!
//! Both sides of the synchronization speak in terms of [`EntryMetadata`]: the local watcher builds
//! it from `stat` results, the remote side builds it from [`RemoteDoc`] snapshots. Paths are always
//! [`RelativePath`]s, relative to the synchronized root and using `/` as the only separator.

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

mod metadata;
mod path;
mod remote;

pub use metadata::{build_dir, build_file, EntryKind, EntryMetadata, EntryStats};
pub use path::{id, is_ancestor, PathError, RelativePath, SEPARATOR};
pub use remote::{RemoteDoc, RemoteDocType, RemoteRef};
