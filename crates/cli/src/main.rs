use clap::Parser;
use composer_cli::{cli::Cli, dispatch, logging};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = dispatch(cli).await {
		eprintln!("error: {err:#}");
		std::process::exit(1);
	}
}
