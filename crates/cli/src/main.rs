//! `lineage` command line front end.
//!
//! Builds a resolver tree from a TOML configuration and resolves names
//! through it, or sweeps stale native library copies.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lineage_host::native::{self, STAGING_DIR_NAME};
use lineage_host::{Platform, ThreadFactory, shutdown};
use lineage_resolver::{ParentRef, Resolve, ResolutionNode, ResolutionTracker, ResolverConfig};
use tracing::{debug, info};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "lineage")]
#[command(about = "Hierarchical symbol resolution")]
struct Cli {
	/// Resolver configuration file (TOML)
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Resolve names through a host node and the configured node beneath it
	Resolve {
		/// Fully-qualified names, e.g. `app.Main`
		#[arg(required = true)]
		names: Vec<String>,
	},
	/// Remove staged native libraries whose owning process has exited
	Sweep {
		/// Staging directory (defaults to the system temp dir)
		#[arg(long, value_name = "DIR")]
		dir: Option<PathBuf>,
	},
}

fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	let subscriber = tracing_subscriber::fmt()
		.with_max_level(if cli.verbose {
			tracing::Level::DEBUG
		} else {
			tracing::Level::INFO
		})
		.with_writer(std::io::stderr)
		.finish();
	tracing::subscriber::set_global_default(subscriber)?;

	let _exit = shutdown::exit_guard();

	match cli.command {
		Command::Resolve { names } => resolve(cli.config, names),
		Command::Sweep { dir } => {
			let dir = dir.unwrap_or_else(|| Platform::current().tmp_dir().join(STAGING_DIR_NAME));
			let report = native::sweep(&dir, &native::process_alive);
			for path in &report.removed {
				println!("removed {}", path.display());
			}
			info!(removed = report.removed.len(), dirs = report.dirs_removed, "Sweep finished");
			Ok(())
		}
	}
}

fn resolve(config_path: Option<PathBuf>, names: Vec<String>) -> anyhow::Result<()> {
	let (config, base_dir) = match &config_path {
		Some(path) => {
			let config = ResolverConfig::load(path).with_context(|| format!("loading {}", path.display()))?;
			let base = path.parent().map(PathBuf::from).unwrap_or_default();
			(config, base)
		}
		None => (ResolverConfig::default(), std::env::current_dir()?),
	};

	let tracker = Arc::new(ResolutionTracker::new());
	let host: ParentRef = Arc::new(ResolutionNode::builder().instrumentation(tracker.clone()).build()?);
	let node = Arc::new(
		config
			.node_builder(&base_dir)?
			.parent(host)
			.instrumentation(tracker)
			.build()?,
	);
	info!(node = %node, "Resolver ready");

	let threads = ThreadFactory::new("lineage-resolve");
	let mut pending = Vec::with_capacity(names.len());
	for name in names {
		let node = node.clone();
		let handle = threads.new_thread(move || {
			let result = node.resolve(&name);
			(name, result)
		})?;
		pending.push(handle);
	}

	let mut failures = 0usize;
	for handle in pending {
		let (name, result) = handle.join().map_err(|_| anyhow::anyhow!("resolver thread panicked"))?;
		match result {
			Ok(symbol) => println!("{name}\t{}\t{} bytes", symbol.origin(), symbol.bytes().len()),
			Err(e) => {
				failures += 1;
				eprintln!("{name}\t{e}");
			}
		}
	}
	debug!(cached = node.cache_len(), "resolve finished");

	if failures > 0 {
		anyhow::bail!("{failures} name(s) failed to resolve");
	}
	Ok(())
}
