use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = tempo_worker::Args::parse();

	tempo_worker::run(args).await
}
