//! [`WatchBackend`] on top of the platform's recommended `notify` watcher.
//!
//! A single watcher is shared by every handle, each handle owning one non-recursive
//! subscription. Rename notifications come in pieces (`From`, `To` and then `Both` when inotify
//! manages to pair them) so a translation task stitches them back together before anything
//! reaches the source. An origin never paired after [`HUNDRED_MILLIS`] means the entry left the
//! watched tree and is reported as deleted.

use crate::{
	backend::{WatchBackend, WatchHandle},
	event::RawEvent,
	Error, RawAction, Result,
};

use td_entry_metadata::RelativePath;

use std::{
	path::{Path, PathBuf},
	sync::{Arc, Mutex, PoisonError},
	time::Duration,
};

use async_channel as chan;
use async_trait::async_trait;
use notify::{
	event::{AccessKind, AccessMode, ModifyKind, RenameMode},
	Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use tokio::{
	spawn,
	time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, error, trace};

const HUNDRED_MILLIS: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct NotifyBackend {
	watcher: Arc<Mutex<RecommendedWatcher>>,
}

impl NotifyBackend {
	/// Spawns the translation task, so it must be called from within a tokio runtime.
	pub fn new(
		sync_path: impl AsRef<Path>,
		events_tx: chan::Sender<Vec<RawEvent>>,
	) -> Result<Self> {
		let sync_path = sync_path.as_ref().to_path_buf();
		let (notify_tx, notify_rx) = chan::unbounded();

		let watcher = RecommendedWatcher::new(
			move |result: notify::Result<Event>| {
				if !notify_tx.is_closed() {
					// SAFETY: we are not blocking the thread as this is an unbounded channel
					if notify_tx.send_blocking(result).is_err() {
						error!("Unable to send watcher event to the translation task");
					}
				} else {
					error!("Tried to send file system events to a closed channel");
				}
			},
			Config::default(),
		)
		.map_err(|source| Error::Watch {
			path: sync_path.clone().into_boxed_path(),
			source,
		})?;

		spawn(translate(
			RenameTracker::new(sync_path),
			notify_rx,
			events_tx,
		));

		Ok(Self {
			watcher: Arc::new(Mutex::new(watcher)),
		})
	}
}

#[async_trait]
impl WatchBackend for NotifyBackend {
	type Handle = NotifyHandle;

	async fn watch(&self, full_path: &Path) -> Result<NotifyHandle> {
		self.watcher
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.watch(full_path, RecursiveMode::NonRecursive)
			.map_err(|source| Error::Watch {
				path: full_path.into(),
				source,
			})?;

		trace!(full_path = %full_path.display(), "Watching directory");

		Ok(NotifyHandle {
			watcher: Arc::clone(&self.watcher),
			full_path: full_path.to_path_buf(),
			disposed: false,
		})
	}
}

#[derive(Debug)]
pub struct NotifyHandle {
	watcher: Arc<Mutex<RecommendedWatcher>>,
	full_path: PathBuf,
	disposed: bool,
}

impl WatchHandle for NotifyHandle {
	fn dispose(&mut self) {
		if self.disposed {
			return;
		}
		self.disposed = true;

		if let Err(e) = self
			.watcher
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.unwatch(&self.full_path)
		{
			// inotify already dropped the watch if the directory was removed
			trace!(?e, full_path = %self.full_path.display(), "Unable to unwatch directory;");
		}
	}
}

impl Drop for NotifyHandle {
	fn drop(&mut self) {
		self.dispose();
	}
}

async fn translate(
	mut tracker: RenameTracker,
	notify_rx: chan::Receiver<notify::Result<Event>>,
	events_tx: chan::Sender<Vec<RawEvent>>,
) {
	let mut tick = interval_at(Instant::now() + HUNDRED_MILLIS, HUNDRED_MILLIS);
	// In case of doubt check: https://docs.rs/tokio/latest/tokio/time/enum.MissedTickBehavior.html
	tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		let mut batch = tokio::select! {
			maybe_result = notify_rx.recv() => {
				let Ok(result) = maybe_result else {
					trace!("Watcher dropped, stopping translation");
					break;
				};

				let now = Instant::now();
				let mut batch = tracker.handle(result, now);
				while let Ok(result) = notify_rx.try_recv() {
					batch.extend(tracker.handle(result, now));
				}

				batch
			}

			_ = tick.tick() => tracker.evict(Instant::now()),
		};

		// A removed directory is reported both by its parent and by its own watch
		batch.dedup();

		if batch.is_empty() {
			continue;
		}

		if events_tx.send(batch).await.is_err() {
			debug!("Raw events receiver dropped, stopping translation");
			break;
		}
	}
}

/// Turns `notify` events into [`RawEvent`]s, pairing the halves of renames.
#[derive(Debug)]
struct RenameTracker {
	root: PathBuf,
	pending_origin: Option<PendingOrigin>,
}

#[derive(Debug)]
struct PendingOrigin {
	tracker: usize,
	path: RelativePath,
	since: Instant,
}

impl RenameTracker {
	const fn new(root: PathBuf) -> Self {
		Self {
			root,
			pending_origin: None,
		}
	}

	fn handle(&mut self, result: notify::Result<Event>, now: Instant) -> Vec<RawEvent> {
		match result {
			Ok(event) => self.handle_event(event, now),
			Err(e) => {
				error!(?e, "Watcher error;");
				vec![]
			}
		}
	}

	fn handle_event(&mut self, event: Event, now: Instant) -> Vec<RawEvent> {
		let mut events = Vec::new();

		let pairs_with_pending = matches!(
			event.kind,
			EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Both))
		) && self
			.pending_origin
			.as_ref()
			.is_some_and(|origin| Some(origin.tracker) == event.tracker());

		if !pairs_with_pending {
			events.extend(self.flush());
		}

		let first = event.paths.first().and_then(|path| self.relative(path));

		match event.kind {
			EventKind::Create(_) => events.extend(first.map(RawEvent::created)),

			EventKind::Remove(_) => events.extend(first.map(RawEvent::deleted)),

			// Writes are only reported once the file is closed
			EventKind::Access(AccessKind::Close(AccessMode::Write))
			| EventKind::Modify(ModifyKind::Metadata(_)) => events.extend(first.map(RawEvent::updated)),

			EventKind::Modify(ModifyKind::Name(RenameMode::From)) => match (first, event.tracker()) {
				(Some(path), Some(tracker)) => {
					self.pending_origin = Some(PendingOrigin {
						tracker,
						path,
						since: now,
					});
				}
				(Some(path), None) => events.push(RawEvent::deleted(path)),
				(None, _) => {}
			},

			// The `Both` event carrying both paths comes right after
			EventKind::Modify(ModifyKind::Name(RenameMode::To)) if pairs_with_pending => {}

			EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
				events.extend(first.map(RawEvent::created));
			}

			EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
				self.pending_origin = None;

				let to = event.paths.get(1).and_then(|path| self.relative(path));
				match (first, to) {
					(Some(from), Some(to)) => events.push(RawEvent::renamed(from, to)),
					(None, Some(to)) => events.push(RawEvent::created(to)),
					(Some(from), None) => events.push(RawEvent::deleted(from)),
					(None, None) => {}
				}
			}

			EventKind::Other => {
				if let Some(path) = first {
					events.push(RawEvent {
						action: RawAction::Other(format!("{:?}", event.kind)),
						path,
						old_path: None,
					});
				}
			}

			kind => trace!(?kind, "Ignoring event;"),
		}

		events
	}

	fn evict(&mut self, now: Instant) -> Vec<RawEvent> {
		if self
			.pending_origin
			.as_ref()
			.is_some_and(|origin| now.duration_since(origin.since) > HUNDRED_MILLIS)
		{
			self.flush()
		} else {
			vec![]
		}
	}

	fn flush(&mut self) -> Vec<RawEvent> {
		self.pending_origin
			.take()
			.map(|origin| {
				trace!(path = %origin.path, "Rename origin never paired, entry left the tree");
				RawEvent::deleted(origin.path)
			})
			.into_iter()
			.collect()
	}

	fn relative(&self, full_path: &Path) -> Option<RelativePath> {
		match RelativePath::from_full_path(&self.root, full_path) {
			Ok(path) if path.is_root() => None,
			Ok(path) => Some(path),
			Err(e) => {
				trace!(?e, "Ignoring event outside of the synchronized directory;");
				None
			}
		}
	}
}
