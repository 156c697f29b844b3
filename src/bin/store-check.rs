use std::io;
use std::process::ExitCode;

use clap::Parser;
use storefront_probe::cli::{self, Cli};
use storefront_probe::logging;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_logging(logging::CLI_DEFAULT_FILTER);

    let cli = Cli::parse();
    let mut stdout = io::stdout().lock();
    match cli::run(cli, &mut stdout).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
