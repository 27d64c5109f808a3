use crate::{
	config::WatcherConfig,
	event::{LocalChange, RawAction, RawEvent},
	Error, Result,
};

use td_entry_metadata::{build_dir, build_file, EntryMetadata, EntryStats, RelativePath};

use std::path::{Path, PathBuf};

use tracing::{debug, instrument, trace};

/// Turns raw notifications into [`LocalChange`]s with fresh metadata.
#[derive(Debug, Clone)]
pub struct Normalizer {
	sync_path: PathBuf,
	ignored: Vec<RelativePath>,
}

impl Normalizer {
	#[must_use]
	pub fn new(sync_path: impl Into<PathBuf>, ignored: Vec<RelativePath>) -> Self {
		Self {
			sync_path: sync_path.into(),
			ignored,
		}
	}

	#[must_use]
	pub fn from_config(config: &WatcherConfig) -> Self {
		Self::new(config.sync_path.clone(), config.ignored.clone())
	}

	#[must_use]
	pub fn sync_path(&self) -> &Path {
		&self.sync_path
	}

	#[must_use]
	pub fn is_ignored(&self, path: &RelativePath) -> bool {
		self.ignored
			.iter()
			.any(|prefix| prefix == path || prefix.is_ancestor_of(path))
	}

	async fn stat(&self, path: &RelativePath) -> Result<EntryStats> {
		EntryStats::stat(path.to_full_path(&self.sync_path))
			.await
			.map_err(Into::into)
	}

	pub async fn build_add(&self, path: RelativePath) -> Result<LocalChange> {
		let stats = self.stat(&path).await?;
		Ok(LocalChange::Add {
			doc: entry(path, &stats),
		})
	}

	pub async fn build_update(&self, path: RelativePath) -> Result<LocalChange> {
		let stats = self.stat(&path).await?;
		Ok(LocalChange::Update {
			doc: entry(path, &stats),
		})
	}

	/// The entry is gone so we can't know its kind, downstream resolves it from its own records.
	#[must_use]
	pub fn build_remove(path: RelativePath) -> LocalChange {
		LocalChange::Remove {
			doc: build_dir(path, &EntryStats::empty()),
		}
	}

	pub async fn build_move(&self, path: RelativePath, old_path: RelativePath) -> Result<LocalChange> {
		let stats = self.stat(&path).await?;
		let doc = entry(path, &stats);

		// Same kind as the destination, nothing left to stat at the origin
		let src = if doc.is_folder() {
			build_dir(old_path, &EntryStats::empty())
		} else {
			build_file(old_path, &EntryStats::empty(), "")
		};

		Ok(LocalChange::Move { doc, src })
	}

	/// Normalizes a whole batch, keeping its order.
	///
	/// Entries that vanished before we could stat them are skipped, as their removal is
	/// already on its way. An unknown action or a rename without origin fails the whole batch.
	#[instrument(skip_all, fields(events_count = events.len()))]
	pub async fn normalize(&self, events: Vec<RawEvent>) -> Result<Vec<LocalChange>> {
		let mut changes = Vec::with_capacity(events.len());

		for RawEvent {
			action,
			path,
			old_path,
		} in events
		{
			let res = match action {
				RawAction::Created | RawAction::Updated if self.is_ignored(&path) => Ok(None),
				RawAction::Created => self.build_add(path).await.map(Some),
				RawAction::Updated => self.build_update(path).await.map(Some),
				RawAction::Deleted => Ok((!self.is_ignored(&path)).then(|| Self::build_remove(path))),
				RawAction::Renamed => {
					let old_path = old_path.ok_or_else(|| Error::MissingOldPath(path.clone()))?;

					match (self.is_ignored(&old_path), self.is_ignored(&path)) {
						(true, true) => Ok(None),
						(true, false) => self.build_add(path).await.map(Some),
						(false, true) => Ok(Some(Self::build_remove(old_path))),
						(false, false) => self.build_move(path, old_path).await.map(Some),
					}
				}
				RawAction::Other(action) => return Err(Error::UnknownAction { action, path }),
			};

			match res {
				Ok(Some(change)) => changes.push(change),
				Ok(None) => trace!("Skipping event on ignored path"),
				Err(Error::FileIO(e)) if e.is_not_found() => {
					debug!(%e, "Entry vanished before we could stat it;");
				}
				Err(e) => return Err(e),
			}
		}

		Ok(changes)
	}
}

fn entry(path: RelativePath, stats: &EntryStats) -> EntryMetadata {
	if stats.is_dir {
		build_dir(path, stats)
	} else {
		// Hashing happens downstream
		build_file(path, stats, "")
	}
}
