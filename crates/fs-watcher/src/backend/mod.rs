use crate::Result;

use std::path::Path;

use async_trait::async_trait;

mod recommended;

pub use recommended::NotifyBackend;

/// Subscribes to the direct children of a single directory.
///
/// Backends send what they observe, as [`RawEvent`](crate::RawEvent) batches, to whatever
/// channel they were built with.
#[async_trait]
pub trait WatchBackend: Send + Sync + 'static {
	type Handle: WatchHandle;

	/// Fails if the directory can't be watched, usually because it doesn't exist anymore.
	async fn watch(&self, full_path: &Path) -> Result<Self::Handle>;
}

/// A live subscription.
pub trait WatchHandle: Send + Sync + 'static {
	/// Ends the subscription. Disposing twice is a no-op.
	fn dispose(&mut self);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod mock {
	use super::{WatchBackend, WatchHandle};
	use crate::{Error, Result};

	use std::{
		collections::{HashMap, HashSet},
		path::{Path, PathBuf},
		sync::{Arc, Mutex},
	};

	use async_trait::async_trait;

	type Hook = Box<dyn FnOnce() + Send>;

	#[derive(Default)]
	struct State {
		active: HashSet<PathBuf>,
		disposed: Vec<PathBuf>,
		hooks: HashMap<PathBuf, Hook>,
	}

	/// Backend that records subscriptions instead of watching anything.
	#[derive(Clone, Default)]
	pub struct MockBackend {
		state: Arc<Mutex<State>>,
	}

	impl MockBackend {
		/// Runs `hook` right after `full_path` gets subscribed, before the handle is returned.
		pub fn after_watch(&self, full_path: impl Into<PathBuf>, hook: impl FnOnce() + Send + 'static) {
			self.state
				.lock()
				.unwrap()
				.hooks
				.insert(full_path.into(), Box::new(hook));
		}

		pub fn active(&self) -> HashSet<PathBuf> {
			self.state.lock().unwrap().active.clone()
		}

		pub fn disposed(&self) -> Vec<PathBuf> {
			self.state.lock().unwrap().disposed.clone()
		}
	}

	#[async_trait]
	impl WatchBackend for MockBackend {
		type Handle = MockHandle;

		async fn watch(&self, full_path: &Path) -> Result<MockHandle> {
			if !full_path.is_dir() {
				return Err(Error::Watch {
					path: full_path.into(),
					source: notify::Error::path_not_found().add_path(full_path.to_path_buf()),
				});
			}

			let hook = {
				let mut state = self.state.lock().unwrap();
				state.active.insert(full_path.to_path_buf());
				state.hooks.remove(full_path)
			};

			if let Some(hook) = hook {
				hook();
			}

			Ok(MockHandle {
				full_path: full_path.to_path_buf(),
				state: Arc::clone(&self.state),
				disposed: false,
			})
		}
	}

	pub struct MockHandle {
		full_path: PathBuf,
		state: Arc<Mutex<State>>,
		disposed: bool,
	}

	impl WatchHandle for MockHandle {
		fn dispose(&mut self) {
			if self.disposed {
				return;
			}
			self.disposed = true;

			let mut state = self.state.lock().unwrap();
			state.active.remove(&self.full_path);
			state.disposed.push(self.full_path.clone());
		}
	}
}
