use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = refman_api::Args::parse();
	refman_api::run(args).await
}
