//! Event sources.
//!
//! Only the inotify flavor exists for now: non-recursive watches per directory, kept in sync
//! with the tree as batches come in. Backends with native recursive watching can skip the
//! [`WatchTree`](crate::WatchTree) entirely.

mod linux;

pub use linux::LinuxSource;
