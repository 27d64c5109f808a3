//! inotify flavored event source
//!
//! inotify can't watch a tree recursively, so the source keeps one watch per directory through
//! a [`WatchTree`] and updates it as directories come and go. Raw notifications are
//! normalized and forwarded batch by batch to the next layer.

use crate::{
	backend::WatchBackend,
	config::WatcherConfig,
	event::{LocalChange, RawEvent},
	layer::Layer,
	normalizer::Normalizer,
	tree::WatchTree,
	Result,
};

use td_entry_metadata::RelativePath;

use async_channel as chan;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

pub struct LinuxSource<B: WatchBackend, L: Layer> {
	tree: WatchTree<B>,
	normalizer: Normalizer,
	next: L,
	watch_new_directories: bool,
	started: bool,
}

impl<B: WatchBackend, L: Layer> LinuxSource<B, L> {
	pub fn new(config: &WatcherConfig, backend: B, next: L) -> Self {
		Self {
			tree: WatchTree::new(config.sync_path.clone(), backend),
			normalizer: Normalizer::from_config(config),
			next,
			watch_new_directories: config.watch_new_directories,
			started: false,
		}
	}

	pub const fn tree(&self) -> &WatchTree<B> {
		&self.tree
	}

	pub fn stop_token(&self) -> CancellationToken {
		self.tree.stop_token()
	}

	/// Walks and watches the whole tree, then tells the next layer the initial scan is done.
	#[instrument(skip_all, fields(sync_path = %self.normalizer.sync_path().display()))]
	pub async fn start(&mut self) -> Result<()> {
		if self.started {
			warn!("Source already started");
			return Ok(());
		}
		self.started = true;

		self.tree
			.watch_directory(RelativePath::root(), &self.normalizer, &self.next)
			.await?;

		if !self.tree.is_running() {
			debug!("Stopped during the initial scan, not signaling it");
			return Ok(());
		}

		self.next.initial().await?;
		info!("Initial scan done");

		Ok(())
	}

	/// Normalizes a batch of raw notifications, forwards it and updates our watches.
	#[instrument(skip_all, fields(events_count = events.len()))]
	pub async fn handle_raw_events(&mut self, events: Vec<RawEvent>) -> Result<()> {
		let batch = self.normalizer.normalize(events).await?;
		if batch.is_empty() {
			trace!("Nothing left after normalization");
			return Ok(());
		}

		let (appeared, vanished) = directory_changes(&batch);

		self.next.process(batch).await?;

		if !self.watch_new_directories {
			return Ok(());
		}

		for path in &vanished {
			let count = self.tree.unwatch_subtree(path);
			if count > 0 {
				debug!(%path, handles_count = count, "Unwatched vanished directory");
			}
		}

		for path in appeared {
			self.tree
				.watch_directory(path, &self.normalizer, &self.next)
				.await?;
		}

		Ok(())
	}

	/// Handles raw batches until stopped or until every sender is gone.
	///
	/// A failing batch is logged and skipped, the next one gets processed as usual.
	pub async fn run(&mut self, events_rx: chan::Receiver<Vec<RawEvent>>) {
		let stop = self.stop_token();

		loop {
			tokio::select! {
				() = stop.cancelled() => {
					debug!("Source received stop signal");
					break;
				}

				maybe_events = events_rx.recv() => {
					let Ok(events) = maybe_events else {
						debug!("Raw events channel closed");
						break;
					};

					if let Err(e) = self.handle_raw_events(events).await {
						error!(?e, "Failed to handle raw events;");
					}
				}
			}
		}

		self.stop();
	}

	pub fn stop(&mut self) {
		self.tree.stop_watching();
	}
}

/// Directories to watch and directories whose watches must go, in that batch.
fn directory_changes(batch: &[LocalChange]) -> (Vec<RelativePath>, Vec<RelativePath>) {
	let mut appeared = vec![];
	let mut vanished = vec![];

	for change in batch {
		match change {
			LocalChange::Add { doc } if doc.is_folder() => appeared.push(doc.path().clone()),
			LocalChange::Move { doc, src } => {
				vanished.push(src.path().clone());
				if doc.is_folder() {
					appeared.push(doc.path().clone());
				}
			}
			// Removals don't know the entry kind, files just have no watch to drop
			LocalChange::Remove { doc } => vanished.push(doc.path().clone()),
			LocalChange::Add { .. } | LocalChange::Update { .. } => {}
		}
	}

	(appeared, vanished)
}
