use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteDocType {
	File,
	Directory,
}

/// A document snapshot as sent by the remote store
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDoc {
	#[serde(rename = "_id")]
	pub id: String,
	#[serde(rename = "_rev")]
	pub rev: String,
	#[serde(rename = "type")]
	pub doc_type: RemoteDocType,
	/// Remote paths are absolute, rooted at the remote store root
	pub path: String,
	#[serde(default)]
	pub size: Option<u64>,
	#[serde(default)]
	pub updated_at: Option<DateTime<Utc>>,
	#[serde(default)]
	pub md5sum: Option<String>,
	#[serde(default)]
	pub trashed: bool,
	#[serde(default, rename = "_deleted")]
	pub deleted: bool,
}

/// Where an entry lives on the remote store
#[derive(Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRef {
	pub id: String,
	pub rev: String,
}

impl From<&RemoteDoc> for RemoteRef {
	fn from(doc: &RemoteDoc) -> Self {
		Self {
			id: doc.id.clone(),
			rev: doc.rev.clone(),
		}
	}
}
