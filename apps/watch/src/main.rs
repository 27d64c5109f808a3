use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use async_channel as chan;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use td_core_remote_change::{classify, fold_descendant_moves, sort, RemoteChange};
use td_entry_metadata::{EntryMetadata, RemoteDoc};
use td_fs_watcher::{Layer, LinuxSource, LocalChange, NotifyBackend, WatcherConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "td-watch", about = "Tandem local and remote change inspector")]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Watch a directory and print normalized batches as JSON lines
	Watch {
		sync_path: PathBuf,
		/// Watcher configuration, created with defaults when missing
		#[arg(long, default_value = "tandem-watch.json")]
		config: PathBuf,
	},
	/// Classify remote snapshots and print them in the order they would be applied
	Order {
		/// JSON array of `{ "was": <entry or null>, "doc": <remote document> }`
		input: PathBuf,
	},
}

#[derive(Deserialize)]
struct Snapshot {
	#[serde(default)]
	was: Option<EntryMetadata>,
	doc: RemoteDoc,
}

/// Prints every batch on stdout, one change per line.
struct PrintLayer;

#[async_trait]
impl Layer for PrintLayer {
	async fn initial(&self) -> td_fs_watcher::Result<()> {
		info!("Initial scan done, now watching");
		Ok(())
	}

	async fn process(&self, batch: Vec<LocalChange>) -> td_fs_watcher::Result<()> {
		for change in &batch {
			let line = serde_json::to_string(change)
				.map_err(|e| td_fs_watcher::Error::Downstream(e.to_string()))?;
			println!("{line}");
		}
		Ok(())
	}
}

fn init_tracing(default_filter: &str) -> Result<()> {
	let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_filter))?;

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();

	Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
	match Cli::parse().command {
		Commands::Watch { sync_path, config } => watch(sync_path, config).await,
		Commands::Order { input } => {
			init_tracing("info")?;
			order(input)
		}
	}
}

async fn watch(sync_path: PathBuf, config_path: PathBuf) -> Result<()> {
	let sync_path = fs::canonicalize(&sync_path)
		.with_context(|| format!("Unable to resolve sync path {}", sync_path.display()))?;

	let mut config = WatcherConfig::load_from(&config_path, &sync_path)
		.with_context(|| format!("Unable to load config from {}", config_path.display()))?;
	init_tracing(&config.log_level)?;

	if config.sync_path != sync_path {
		warn!(
			configured = %config.sync_path.display(),
			requested = %sync_path.display(),
			"Config points at another directory, using the requested one"
		);
		config.sync_path = sync_path;
	}

	let (events_tx, events_rx) = chan::bounded(config.event_channel_capacity);
	let backend = NotifyBackend::new(&config.sync_path, events_tx)?;
	let mut source = LinuxSource::new(&config, backend, PrintLayer);

	let stop = source.stop_token();
	tokio::spawn(async move {
		if let Err(e) = tokio::signal::ctrl_c().await {
			warn!(?e, "Unable to listen for Ctrl+C, stop with a signal instead;");
			return;
		}
		info!("Received Ctrl+C, stopping");
		stop.cancel();
	});

	source.start().await?;
	source.run(events_rx).await;

	info!("Stopped watching {}", config.sync_path.display());

	Ok(())
}

fn order(input: PathBuf) -> Result<()> {
	let json = fs::read_to_string(&input)
		.with_context(|| format!("Unable to read {}", input.display()))?;
	let snapshots = serde_json::from_str::<Vec<Snapshot>>(&json)?;

	let changes = snapshots
		.into_iter()
		.map(|Snapshot { was, doc }| classify(was.as_ref(), doc))
		.collect::<Vec<_>>();

	let mut changes = fold_descendant_moves(changes);
	sort(&mut changes);

	for change in &changes {
		print_change(change, 0);
	}

	Ok(())
}

fn print_change(change: &RemoteChange, depth: usize) {
	let indent = "  ".repeat(depth);

	match (change.was(), change.doc()) {
		(Some(was), Some(doc)) if was.path() != doc.path() => {
			println!("{indent}{} {} -> {}", change.type_name(), was.path(), doc.path());
		}
		(_, Some(doc)) => println!("{indent}{} {}", change.type_name(), doc.path()),
		(_, None) => println!("{indent}{}", change.type_name()),
	}

	for descendant in change.descendant_moves() {
		print_change(descendant, depth + 1);
	}
}
