use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = arkive_listener::Args::parse();

	arkive_listener::run(args).await
}
