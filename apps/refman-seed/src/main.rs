use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = refman_seed::Args::parse();
	refman_seed::run(args).await
}
