use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = tempo_api::Args::parse();

	tempo_api::run(args).await
}
