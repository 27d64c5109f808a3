use crate::{event::LocalChange, Error, Result};

use async_channel as chan;
use async_trait::async_trait;
use tracing::trace;

/// Whatever consumes our normalized changes, usually the merge layer.
#[async_trait]
pub trait Layer: Send + Sync {
	/// The whole synchronized tree was walked and is being watched.
	async fn initial(&self) -> Result<()>;

	/// An ordered, non empty batch of changes.
	async fn process(&self, batch: Vec<LocalChange>) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerMessage {
	Initial,
	Batch(Vec<LocalChange>),
}

/// Forwards everything to a channel, for consumers living in another task.
#[derive(Debug, Clone)]
pub struct ChannelLayer {
	tx: chan::Sender<LayerMessage>,
}

impl ChannelLayer {
	#[must_use]
	pub fn new(capacity: usize) -> (Self, chan::Receiver<LayerMessage>) {
		let (tx, rx) = chan::bounded(capacity);
		(Self { tx }, rx)
	}

	async fn send(&self, msg: LayerMessage) -> Result<()> {
		self.tx
			.send(msg)
			.await
			.map_err(|_| Error::Downstream("layer channel closed".to_string()))
	}
}

#[async_trait]
impl Layer for ChannelLayer {
	async fn initial(&self) -> Result<()> {
		trace!("Forwarding initial scan completion");
		self.send(LayerMessage::Initial).await
	}

	async fn process(&self, batch: Vec<LocalChange>) -> Result<()> {
		trace!(changes_count = batch.len(), "Forwarding batch");
		self.send(LayerMessage::Batch(batch)).await
	}
}
