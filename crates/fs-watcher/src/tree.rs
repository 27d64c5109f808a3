use crate::{
	backend::{WatchBackend, WatchHandle},
	event::LocalChange,
	layer::Layer,
	normalizer::Normalizer,
	Result,
};

use td_entry_metadata::RelativePath;
use td_utils::error::FileIOError;

use std::{
	collections::HashMap,
	path::{Path, PathBuf},
};

use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

/// One watch handle per directory of the synchronized tree.
///
/// Recursive watching is emulated: every directory gets its own non-recursive subscription,
/// registered *before* the directory is listed so entries created during the listing are either
/// listed or notified.
pub struct WatchTree<B: WatchBackend> {
	sync_path: PathBuf,
	backend: B,
	handles: HashMap<RelativePath, B::Handle>,
	stop: CancellationToken,
}

impl<B: WatchBackend> WatchTree<B> {
	pub fn new(sync_path: impl Into<PathBuf>, backend: B) -> Self {
		Self {
			sync_path: sync_path.into(),
			backend,
			handles: HashMap::new(),
			stop: CancellationToken::new(),
		}
	}

	pub fn sync_path(&self) -> &Path {
		&self.sync_path
	}

	/// Cancelling it from anywhere stops the tree; in-flight registrations dispose their
	/// handle instead of storing it.
	pub fn stop_token(&self) -> CancellationToken {
		self.stop.clone()
	}

	pub fn is_running(&self) -> bool {
		!self.stop.is_cancelled()
	}

	pub fn is_watching(&self, path: &RelativePath) -> bool {
		self.handles.contains_key(path)
	}

	pub fn watched(&self) -> impl Iterator<Item = &RelativePath> {
		self.handles.keys()
	}

	/// Watches `path` and every directory below it, depth first.
	///
	/// Each directory's entries are delivered to `layer` as one batch of
	/// [`LocalChange::Add`], right after its handle is registered. Directories that vanish
	/// along the way are skipped without error; only the layer failing is reported.
	#[instrument(skip_all, fields(%path))]
	pub async fn watch_directory<L: Layer + ?Sized>(
		&mut self,
		path: RelativePath,
		normalizer: &Normalizer,
		layer: &L,
	) -> Result<()> {
		let mut pending = vec![path];

		while let Some(dir) = pending.pop() {
			let Some(batch) = self.watch_single(&dir, normalizer).await else {
				continue;
			};

			let mut folders = batch
				.iter()
				.filter_map(LocalChange::new_folder)
				.cloned()
				.collect::<Vec<_>>();

			if !batch.is_empty() {
				layer.process(batch).await?;
			}

			// Reversed so siblings are walked in listing order
			folders.reverse();
			pending.extend(folders);
		}

		if !self.is_running() {
			self.dispose_all();
		}

		Ok(())
	}

	/// Registers the handle for `dir` and lists it; `None` if the directory is gone or if
	/// we were stopped meanwhile.
	async fn watch_single(
		&mut self,
		dir: &RelativePath,
		normalizer: &Normalizer,
	) -> Option<Vec<LocalChange>> {
		if !self.is_running() {
			return None;
		}

		let full_path = dir.to_full_path(&self.sync_path);

		// Backends may key subscriptions by path, so the old one must go first
		self.stop_handle(dir);

		let mut handle = match self.backend.watch(&full_path).await {
			Ok(handle) => handle,
			Err(e) => {
				debug!(?e, "Directory vanished before we could watch it;");
				return None;
			}
		};

		if !self.is_running() {
			trace!("Stopped while registering, disposing fresh handle");
			handle.dispose();
			return None;
		}

		self.handles.insert(dir.clone(), handle);

		match list(&full_path, dir, normalizer).await {
			Ok(batch) => Some(batch),
			Err(e) => {
				debug!(?e, "Directory vanished while we were listing it;");
				self.stop_handle(dir);
				None
			}
		}
	}

	/// Disposes the handle of `path` and of every directory below it, returns how many.
	pub fn unwatch_subtree(&mut self, path: &RelativePath) -> usize {
		let doomed = self
			.handles
			.keys()
			.filter(|watched| *watched == path || path.is_ancestor_of(watched))
			.cloned()
			.collect::<Vec<_>>();

		for watched in &doomed {
			self.stop_handle(watched);
		}

		doomed.len()
	}

	fn stop_handle(&mut self, path: &RelativePath) {
		if let Some(mut handle) = self.handles.remove(path) {
			trace!(%path, "Unwatching directory");
			handle.dispose();
		}
	}

	fn dispose_all(&mut self) {
		for (_, mut handle) in self.handles.drain() {
			handle.dispose();
		}
	}

	/// Stops the tree and disposes every handle, idempotent.
	pub fn stop_watching(&mut self) {
		self.stop.cancel();

		let count = self.handles.len();
		self.dispose_all();

		debug!(handles_count = count, "Stopped watching");
	}
}

impl<B: WatchBackend> Drop for WatchTree<B> {
	fn drop(&mut self) {
		self.dispose_all();
	}
}

/// Lists `full_path`, building an addition for each entry.
///
/// Only failing to read the directory itself is an error, entries we can't describe are
/// skipped. A directory removed during the listing may still list fine, so we check it
/// still exists at the end.
async fn list(
	full_path: &Path,
	dir: &RelativePath,
	normalizer: &Normalizer,
) -> Result<Vec<LocalChange>> {
	let mut read_dir = fs::read_dir(full_path)
		.await
		.map_err(|e| FileIOError::from((full_path, e, "Failed to read directory")))?;

	let mut batch = vec![];

	while let Some(entry) = read_dir
		.next_entry()
		.await
		.map_err(|e| FileIOError::from((full_path, e, "Failed to read directory entry")))?
	{
		let Some(name) = entry.file_name().to_str().map(str::to_string) else {
			warn!(path = %entry.path().display(), "Skipping entry with a non UTF-8 name");
			continue;
		};

		let path = match dir.join(&name) {
			Ok(path) => path,
			Err(e) => {
				warn!(?e, "Skipping entry with an unusable name;");
				continue;
			}
		};

		if normalizer.is_ignored(&path) {
			trace!(%path, "Skipping ignored entry");
			continue;
		}

		match normalizer.build_add(path).await {
			Ok(change) => batch.push(change),
			Err(e) => debug!(?e, "Failed to describe directory entry;"),
		}
	}

	fs::metadata(full_path)
		.await
		.map_err(|e| FileIOError::from((full_path, e, "Directory removed during listing")))?;

	Ok(batch)
}
