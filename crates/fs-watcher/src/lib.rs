//! Local filesystem watching for the synchronized directory.
//!
//! Native recursive watching isn't available (or isn't reliable) everywhere, so we emulate it:
//! one non-recursive watch per directory, registered before the directory is listed so nothing
//! created in between slips through. Raw notifications coming out of those watches are then
//! normalized into [`LocalChange`]s carrying full entry metadata and handed to the next [`Layer`].
//!
//! The pieces:
//! - [`WatchBackend`] subscribes to a single directory; [`NotifyBackend`] does it with `notify`.
//! - [`WatchTree`] keeps one handle per watched directory and walks new directories.
//! - [`Normalizer`] turns [`RawEvent`]s into [`LocalChange`]s.
//! - [`LinuxSource`] glues everything together and keeps the watches in sync with the tree.

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

mod backend;
mod config;
mod error;
mod event;
mod layer;
mod normalizer;
mod platform;
mod tree;

pub use backend::{NotifyBackend, WatchBackend, WatchHandle};
pub use config::WatcherConfig;
pub use error::{Error, Result};
pub use event::{LocalChange, RawAction, RawEvent};
pub use layer::{ChannelLayer, Layer, LayerMessage};
pub use normalizer::Normalizer;
pub use platform::LinuxSource;
pub use tree::WatchTree;
