pub mod worker;

mod error;

pub use error::{Error, Result};

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tempo_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = tempo_cli::VERSION,
	rename_all = "kebab",
	styles = tempo_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = tempo_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema(config.providers.embedding.dimensions).await?;

	let state = worker::WorkerState {
		db,
		embedding: config.providers.embedding,
		settings: config.worker,
	};

	worker::run_worker(state).await;

	Ok(())
}
